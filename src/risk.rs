// Risk Aggregation
// Folds issues, anomaly findings, and cleaning stats into a single verdict.
// First matching policy clause wins.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::anomalies::AnomalyFinding;
use crate::config::{EvalConfig, DEFAULT_UNRESOLVED_FRACTION};
use crate::schema::CleaningStats;
use crate::validator::{Issue, IssueKind, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Process exit code contract for automation callers.
    pub fn exit_code(&self) -> i32 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 2,
            RiskLevel::High => 5,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct RiskPolicy {
    unresolved_fraction: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        RiskPolicy::new(DEFAULT_UNRESOLVED_FRACTION)
    }
}

impl RiskPolicy {
    pub fn new(unresolved_fraction: f64) -> Self {
        RiskPolicy {
            unresolved_fraction,
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        RiskPolicy::new(config.unresolved_fraction)
    }

    /// A single high-severity defect dominates no matter how clean the rest
    /// of the dataset looks. Anomaly findings alone never clear LOW: the
    /// top-N listing is an inspection queue, and an inspection queue with
    /// entries is not a green light.
    pub fn assess(
        &self,
        issues: &[Issue],
        findings: &[AnomalyFinding],
        stats: &CleaningStats,
    ) -> RiskLevel {
        let unresolved = issues
            .iter()
            .find(|i| i.kind == IssueKind::UnresolvedAccountReference)
            .map_or(0, |i| i.count);
        let any_high = issues
            .iter()
            .any(|i| i.severity == Severity::High && i.count > 0);
        let over_budget =
            (unresolved as f64) > self.unresolved_fraction * (stats.rows_out as f64);
        if any_high || over_budget {
            debug!(unresolved, over_budget, "risk HIGH");
            return RiskLevel::High;
        }

        let any_medium = issues
            .iter()
            .any(|i| i.severity == Severity::Medium && i.count > 0);
        if any_medium || !findings.is_empty() {
            debug!(findings = findings.len(), "risk MEDIUM");
            return RiskLevel::Medium;
        }

        RiskLevel::Low
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(kind: IssueKind, count: usize) -> Issue {
        Issue {
            kind,
            severity: kind.severity(),
            message: kind.message().to_string(),
            count,
            examples: Vec::new(),
        }
    }

    fn finding(id: &str, amount: f64) -> AnomalyFinding {
        AnomalyFinding {
            transaction_id: id.to_string(),
            amount,
            score: None,
            rank: Some(1),
            outlier: false,
        }
    }

    fn stats(rows_out: usize) -> CleaningStats {
        let mut s = CleaningStats::new();
        s.rows_in = rows_out;
        s.rows_out = rows_out;
        s
    }

    #[test]
    fn test_clean_dataset_is_low() {
        let level = RiskPolicy::default().assess(&[], &[], &stats(100));
        assert_eq!(level, RiskLevel::Low);
        assert_eq!(level.exit_code(), 0);
    }

    #[test]
    fn test_low_severity_issues_stay_low() {
        let issues = vec![
            issue(IssueKind::ZeroAmount, 3),
            issue(IssueKind::InvalidDate, 1),
        ];
        assert_eq!(
            RiskPolicy::default().assess(&issues, &[], &stats(100)),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_single_high_issue_dominates() {
        // Well under the unresolved budget, still HIGH on severity alone.
        let issues = vec![issue(IssueKind::UnresolvedAccountReference, 1)];
        let level = RiskPolicy::default().assess(&issues, &[], &stats(10_000));
        assert_eq!(level, RiskLevel::High);
        assert_eq!(level.exit_code(), 5);
    }

    #[test]
    fn test_medium_issue_is_medium() {
        let issues = vec![issue(IssueKind::DuplicateTransactionId, 2)];
        let level = RiskPolicy::default().assess(&issues, &[], &stats(100));
        assert_eq!(level, RiskLevel::Medium);
        assert_eq!(level.exit_code(), 2);
    }

    #[test]
    fn test_findings_alone_gate_medium() {
        let findings = vec![finding("t1", 500.0)];
        assert_eq!(
            RiskPolicy::default().assess(&[], &findings, &stats(100)),
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(RiskLevel::Low.as_str(), "LOW");
        assert_eq!(RiskLevel::Medium.as_str(), "MEDIUM");
        assert_eq!(RiskLevel::High.as_str(), "HIGH");
    }
}
