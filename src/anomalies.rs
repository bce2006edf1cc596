// Amount Anomaly Detection
// Modified z-scores (MAD-based) for statistical outliers, plus a
// deterministic top-N largest-absolute-amount listing for manual review.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{EvalConfig, DEFAULT_TOP_N, DEFAULT_Z_THRESHOLD};
use crate::schema::Transaction;

/// Below this many parsed amounts the distribution is too thin to score.
pub const MIN_SAMPLE: usize = 8;

const MAD_SCALE: f64 = 0.6745;

/// One transaction surfaced by the detector. `rank` is set for members of
/// the top-N listing, `score` whenever the modified z-score was computable,
/// and `outlier` when that score clears the threshold.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyFinding {
    pub transaction_id: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    pub outlier: bool,
}

pub struct AnomalyDetector {
    top_n: usize,
    z_threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        AnomalyDetector::new(DEFAULT_TOP_N, DEFAULT_Z_THRESHOLD)
    }
}

impl AnomalyDetector {
    pub fn new(top_n: usize, z_threshold: f64) -> Self {
        AnomalyDetector { top_n, z_threshold }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        AnomalyDetector::new(config.top_n, config.z_threshold)
    }

    /// Findings come back as the top-N listing in rank order, followed by
    /// any remaining statistical outliers in input order. Transactions
    /// without a parsed amount never participate.
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<AnomalyFinding> {
        let values: Vec<(usize, &str, f64)> = transactions
            .iter()
            .enumerate()
            .filter_map(|(i, tx)| tx.amount.map(|a| (i, tx.transaction_id.as_str(), a)))
            .collect();
        if values.is_empty() {
            return Vec::new();
        }

        // Median/MAD need a minimum sample, and a zero MAD means the data
        // has no variability worth scoring.
        let spread = if values.len() >= MIN_SAMPLE {
            let mut amounts: Vec<f64> = values.iter().map(|v| v.2).collect();
            let center = median(&mut amounts);
            let mut deviations: Vec<f64> = values.iter().map(|v| (v.2 - center).abs()).collect();
            let mad = median(&mut deviations);
            if mad > 0.0 {
                Some((center, mad))
            } else {
                debug!(samples = values.len(), "flat amount distribution, skipping z-scores");
                None
            }
        } else {
            debug!(samples = values.len(), "sample too small, skipping z-scores");
            None
        };
        let score_of =
            |amount: f64| spread.map(|(center, mad)| MAD_SCALE * (amount - center) / mad);

        let mut ranked: Vec<&(usize, &str, f64)> = values.iter().collect();
        ranked.sort_by(|l, r| r.2.abs().total_cmp(&l.2.abs()).then(l.0.cmp(&r.0)));
        ranked.truncate(self.top_n);

        let in_top: HashSet<usize> = ranked.iter().map(|entry| entry.0).collect();

        let mut findings = Vec::with_capacity(ranked.len());
        for (position, entry) in ranked.iter().enumerate() {
            let score = score_of(entry.2);
            let outlier = score.map_or(false, |s| s.abs() > self.z_threshold);
            findings.push(AnomalyFinding {
                transaction_id: entry.1.to_string(),
                amount: entry.2,
                score,
                rank: Some(position + 1),
                outlier,
            });
        }

        if spread.is_some() {
            for entry in &values {
                if in_top.contains(&entry.0) {
                    continue;
                }
                let Some(score) = score_of(entry.2) else { continue };
                if score.abs() <= self.z_threshold {
                    continue;
                }
                findings.push(AnomalyFinding {
                    transaction_id: entry.1.to_string(),
                    amount: entry.2,
                    score: Some(score),
                    rank: None,
                    outlier: true,
                });
            }
        }

        info!(findings = findings.len(), "anomaly detection complete");
        findings
    }
}

/// Median of a non-empty slice; sorts in place.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|l, r| l.total_cmp(r));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, amount: f64) -> Transaction {
        Transaction::new(id.to_string(), "10".to_string()).with_amount(amount)
    }

    fn unparsed(id: &str) -> Transaction {
        Transaction::new(id.to_string(), "10".to_string()).with_raw_amount("n/a")
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_no_parsed_amounts_no_findings() {
        let transactions = vec![unparsed("a"), unparsed("b")];
        let findings = AnomalyDetector::default().detect(&transactions);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_small_sample_ranks_without_scores() {
        let transactions = vec![tx("a", 5.0), tx("b", -9.0), tx("c", 1.0)];
        let findings = AnomalyDetector::new(2, 3.5).detect(&transactions);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].transaction_id, "b");
        assert_eq!(findings[0].rank, Some(1));
        assert!(findings[0].score.is_none());
        assert!(!findings[0].outlier);
        assert_eq!(findings[1].transaction_id, "a");
    }

    #[test]
    fn test_flat_distribution_skips_scores() {
        let transactions: Vec<Transaction> =
            (0..10).map(|i| tx(&format!("t{}", i), 25.0)).collect();
        let findings = AnomalyDetector::new(3, 3.5).detect(&transactions);

        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.score.is_none() && !f.outlier));
    }

    #[test]
    fn test_rank_ties_break_by_input_order() {
        let transactions = vec![tx("first", 5.0), tx("second", -5.0), tx("third", 3.0)];
        let findings = AnomalyDetector::new(2, 3.5).detect(&transactions);

        assert_eq!(findings[0].transaction_id, "first");
        assert_eq!(findings[1].transaction_id, "second");
    }

    #[test]
    fn test_outlier_flag_clears_threshold() {
        // median 10, MAD 1; 15 scores ~3.37, 16 scores ~4.05
        let amounts = [9.0, 10.0, 11.0, 9.0, 10.0, 11.0, 9.0, 10.0, 15.0, 16.0];
        let transactions: Vec<Transaction> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| tx(&format!("t{}", i), *a))
            .collect();
        let findings = AnomalyDetector::new(10, 3.5).detect(&transactions);

        let by_id = |id: &str| findings.iter().find(|f| f.transaction_id == id).unwrap();
        assert!(by_id("t9").outlier);
        assert!(!by_id("t8").outlier);
        assert!(by_id("t8").score.is_some());
    }

    #[test]
    fn test_score_only_outliers_appended_after_ranked() {
        // median 10, MAD 1; both extremes are outliers, only one fits top-1
        let amounts = [9.0, 10.0, 11.0, 9.0, 10.0, 11.0, 9.0, 10.0, 1000.0, -2000.0];
        let transactions: Vec<Transaction> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| tx(&format!("t{}", i), *a))
            .collect();
        let findings = AnomalyDetector::new(1, 3.5).detect(&transactions);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].transaction_id, "t9");
        assert_eq!(findings[0].rank, Some(1));
        assert!(findings[0].outlier);
        assert_eq!(findings[1].transaction_id, "t8");
        assert_eq!(findings[1].rank, None);
        assert!(findings[1].outlier);
    }

    #[test]
    fn test_top_n_larger_than_dataset() {
        let transactions = vec![tx("a", 1.0), tx("b", 2.0)];
        let findings = AnomalyDetector::new(10, 3.5).detect(&transactions);
        assert_eq!(findings.len(), 2);
    }
}
