// Evaluation Pipeline
// Wires raw input through adapter, validator, anomaly detector, and risk
// policy into one EvaluationResult.

use tracing::info;

use crate::adapters::{get_adapter, AdaptedData};
use crate::anomalies::AnomalyDetector;
use crate::config::EvalConfig;
use crate::error::PreflightError;
use crate::loader::RawInput;
use crate::report::EvaluationResult;
use crate::risk::RiskPolicy;
use crate::stress::apply_stress;
use crate::validator::Validator;

/// Run one full evaluation. Configuration is rejected up front; from there
/// every data-level defect is recovered and reported, never raised.
pub fn evaluate(raw: &RawInput, config: &EvalConfig) -> Result<EvaluationResult, PreflightError> {
    config.validate()?;
    let data = get_adapter(config.format).adapt(raw, config.currency_hint.as_deref())?;
    debug_assert!(data.stats.is_conserved(), "row conservation violated");
    Ok(finish(data, config))
}

/// Same as [`evaluate`], with deterministic defect injection between
/// normalization and validation.
pub fn evaluate_stressed(
    raw: &RawInput,
    config: &EvalConfig,
    seed: u64,
) -> Result<EvaluationResult, PreflightError> {
    config.validate()?;
    let mut data = get_adapter(config.format).adapt(raw, config.currency_hint.as_deref())?;
    debug_assert!(data.stats.is_conserved(), "row conservation violated");
    apply_stress(&mut data.transactions, seed);
    Ok(finish(data, config))
}

fn finish(data: AdaptedData, config: &EvalConfig) -> EvaluationResult {
    let issues = Validator::from_config(config).validate(&data.accounts, &data.transactions);
    let anomalies = AnomalyDetector::from_config(config).detect(&data.transactions);
    let risk = RiskPolicy::from_config(config).assess(&issues, &anomalies, &data.stats);

    info!(
        accounts = data.accounts.len(),
        transactions = data.transactions.len(),
        issues = issues.len(),
        anomalies = anomalies.len(),
        risk = %risk,
        "evaluation complete"
    );

    EvaluationResult {
        accounts_count: data.accounts.len(),
        transactions_count: data.transactions.len(),
        vendors_count: data.vendors.as_ref().map(|v| v.len()),
        cleaning: data.stats,
        issues,
        anomalies,
        risk,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceFormat;
    use crate::loader::{RawRow, RawTable};
    use crate::risk::RiskLevel;

    fn kaggle_table(rows: &[&[&str]]) -> RawTable {
        let headers = [
            "Date",
            "Account",
            "Debit",
            "Category",
            "Transaction_Type",
            "Description",
            "Customer_Vendor",
        ];
        RawTable {
            source: "book.csv".to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| RawRow {
                    index: i + 1,
                    cells: cells.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn config() -> EvalConfig {
        EvalConfig::new(SourceFormat::KaggleAccounting)
            .with_reference_date("2024-06-30".parse().expect("date"))
    }

    #[test]
    fn test_invalid_config_rejected_before_adaptation() {
        let raw = RawInput::from_table(kaggle_table(&[]));
        let err = evaluate(&raw, &config().with_top_n(0)).unwrap_err();
        assert!(matches!(err, PreflightError::InvalidConfig(_)));
    }

    #[test]
    fn test_full_run_over_clean_rows() {
        let raw = RawInput::from_table(kaggle_table(&[
            &["2024-01-02", "Cash", "10.0", "Asset", "Sale", "a", "Acme"],
            &["2024-01-03", "Cash", "20.0", "Asset", "Sale", "b", "Acme"],
        ]));
        let result = evaluate(&raw, &config()).expect("evaluate");

        // Cash + sentinel
        assert_eq!(result.accounts_count, 2);
        assert_eq!(result.transactions_count, 2);
        assert_eq!(result.vendors_count, Some(1));
        assert!(result.issues.is_empty());
        // Two ranked review candidates still gate MEDIUM.
        assert_eq!(result.anomalies.len(), 2);
        assert_eq!(result.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_stressed_run_is_deterministic() {
        let rows: Vec<Vec<String>> = (0..600)
            .map(|i| {
                vec![
                    "2024-01-02".to_string(),
                    "Cash".to_string(),
                    format!("{}.50", 10 + (i % 40)),
                    "Asset".to_string(),
                    "Sale".to_string(),
                    format!("row {}", i),
                    "Acme".to_string(),
                ]
            })
            .collect();
        let borrowed: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(|c| c.as_str()).collect())
            .collect();
        let slices: Vec<&[&str]> = borrowed.iter().map(|r| r.as_slice()).collect();
        let raw = RawInput::from_table(kaggle_table(&slices));

        let first = evaluate_stressed(&raw, &config(), 42).expect("run");
        let second = evaluate_stressed(&raw, &config(), 42).expect("run");

        assert_eq!(
            first.render_json().expect("json"),
            second.render_json().expect("json")
        );
        // Injected dangling references push the verdict to HIGH.
        assert_eq!(first.risk, RiskLevel::High);
    }
}
