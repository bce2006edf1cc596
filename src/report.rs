// Evaluation Report
// Final result aggregate plus the two renderings callers consume: a
// human-readable text summary and a machine-readable JSON document.

use serde_json::{json, Value};

use crate::anomalies::AnomalyFinding;
use crate::risk::RiskLevel;
use crate::schema::CleaningStats;
use crate::validator::Issue;

// Examples shown per finding in the text report. The JSON rendering carries
// the full capped sample.
const EXAMPLE_LINES: usize = 2;

/// Everything one evaluation run produced. Immutable once built; rendering
/// never mutates or reorders.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub accounts_count: usize,
    pub transactions_count: usize,
    pub vendors_count: Option<usize>,
    pub cleaning: CleaningStats,
    pub issues: Vec<Issue>,
    pub anomalies: Vec<AnomalyFinding>,
    pub risk: RiskLevel,
}

impl EvaluationResult {
    /// Human-readable CLI report. Counts plus up to two examples per finding
    /// to keep the output scannable.
    pub fn render_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push("Migration Summary".to_string());
        lines.push("-----------------".to_string());
        lines.push(format!("Accounts processed: {}", self.accounts_count));
        lines.push(format!("Transactions processed: {}", self.transactions_count));
        if let Some(vendors) = self.vendors_count {
            lines.push(format!("Vendors processed: {}", vendors));
        }
        lines.push(String::new());
        lines.push("Issues detected:".to_string());

        if self.issues.is_empty() && self.anomalies.is_empty() {
            lines.push("- none".to_string());
        } else {
            for issue in &self.issues {
                lines.push(format!("- {} ({})", issue.message, issue.count));
                for example in issue.examples.iter().take(EXAMPLE_LINES) {
                    lines.push(format!("    example: {}", example));
                }
            }
            if !self.anomalies.is_empty() {
                let flagged = self.anomalies.iter().filter(|f| f.outlier).count();
                let ranked = self.anomalies.iter().filter(|f| f.rank.is_some()).count();
                lines.push(format!(
                    "- Anomalous transaction amounts: {} flagged, top {} by absolute value",
                    flagged, ranked
                ));
                for finding in self.anomalies.iter().take(EXAMPLE_LINES) {
                    lines.push(format!(
                        "    example: transaction_id={}, amount={}",
                        finding.transaction_id, finding.amount
                    ));
                }
            }
        }

        lines.push(String::new());
        lines.push(format!("Migration risk level: {}", self.risk));
        lines.join("\n")
    }

    /// Machine-readable report for automation (CI gates, dashboards,
    /// regression baselines).
    pub fn to_json(&self) -> Value {
        json!({
            "counts": {
                "accounts": self.accounts_count,
                "transactions": self.transactions_count,
                "vendors": self.vendors_count,
            },
            "cleaning": self.cleaning,
            "issues": self.issues,
            "anomalies": self.anomalies,
            "risk": self.risk,
        })
    }

    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json())
    }
}

// ============================================================================
// TESTS
// ============================================================================
