// Format Adapters - per-source normalization into the canonical schema
// One adapter per supported export format, selected by format identifier.
// Adapters own every fallback decision and count each one in CleaningStats.

use crate::config::SourceFormat;
use crate::error::PreflightError;
use crate::loader::RawInput;
use crate::schema::{Account, CleaningStats, Transaction, Vendor};
use chrono::NaiveDate;

pub mod canonical;
pub mod gov_ca;
pub mod kaggle;

pub use canonical::CanonicalCsvAdapter;
pub use gov_ca::GovCanadaGlAdapter;
pub use kaggle::KaggleAccountingAdapter;

// ============================================================================
// ADAPTER CONTRACT
// ============================================================================

/// AdaptedData - everything one adapter run produces
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedData {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub vendors: Option<Vec<Vendor>>,
    pub stats: CleaningStats,
}

/// FormatAdapter - maps raw rows into canonical records plus cleaning stats
///
/// Implementations must be lossless: every raw row is either emitted as a
/// canonical transaction (flagged where fields failed to parse) or counted
/// in `structurally_dropped`. Field defects never abort the run; missing
/// required columns do, before any row is touched.
pub trait FormatAdapter: Send + Sync {
    /// Normalize raw rows. The currency hint overrides the adapter's default
    /// currency for rows that carry none of their own.
    fn adapt(
        &self,
        raw: &RawInput,
        currency_hint: Option<&str>,
    ) -> Result<AdaptedData, PreflightError>;

    /// The source format this adapter handles.
    fn format(&self) -> SourceFormat;
}

/// Get the adapter for a source format.
///
/// Factory pattern: returns Box<dyn FormatAdapter> so callers stay
/// format-agnostic.
pub fn get_adapter(format: SourceFormat) -> Box<dyn FormatAdapter> {
    match format {
        SourceFormat::KaggleAccounting => Box::new(KaggleAccountingAdapter::new()),
        SourceFormat::GovCanadaGl => Box::new(GovCanadaGlAdapter::new()),
        SourceFormat::Canonical => Box::new(CanonicalCsvAdapter::new()),
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Try a fixed, ordered list of date formats; first hit wins.
pub fn parse_date(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse an amount string, rejecting NaN and infinities so a poisoned value
/// can never masquerade as a real amount.
pub fn parse_amount(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_covers_all_formats() {
        for format in [
            SourceFormat::KaggleAccounting,
            SourceFormat::GovCanadaGl,
            SourceFormat::Canonical,
        ] {
            let adapter = get_adapter(format);
            assert_eq!(adapter.format(), format);
        }
    }

    #[test]
    fn test_parse_date_first_format_wins() {
        let formats = &["%Y-%m-%d", "%m/%d/%Y"];
        assert_eq!(
            parse_date("2024-03-05", formats),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_date("03/05/2024", formats),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(parse_date("05.03.2024", formats), None);
        assert_eq!(parse_date("", formats), None);
    }

    #[test]
    fn test_parse_amount_rejects_non_finite() {
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount("-3"), Some(-3.0));
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("twelve"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(-45.678), -45.68);
        assert_eq!(round2(10.0), 10.0);
    }
}
