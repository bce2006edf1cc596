// Evaluation Configuration - source format selection and run settings
// Invalid values fail the run before any normalization starts.

use crate::error::PreflightError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_Z_THRESHOLD: f64 = 3.5;
pub const DEFAULT_EXTREME_CEILING: f64 = 10_000_000.0;
pub const DEFAULT_UNRESOLVED_FRACTION: f64 = 0.01;

// ============================================================================
// SOURCE FORMAT
// ============================================================================

/// SourceFormat - identifies which adapter normalizes the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    KaggleAccounting,
    GovCanadaGl,
    Canonical,
}

impl SourceFormat {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceFormat::KaggleAccounting => "Kaggle financial accounting export",
            SourceFormat::GovCanadaGl => "Receiver General (Canada) general ledger",
            SourceFormat::Canonical => "Canonical CSV folder",
        }
    }

    /// Short code used on the command line and in fallback ids
    pub fn code(&self) -> &str {
        match self {
            SourceFormat::KaggleAccounting => "kaggle",
            SourceFormat::GovCanadaGl => "gov-ca",
            SourceFormat::Canonical => "canonical",
        }
    }

    /// Resolve a format code; unknown codes are a fatal configuration error.
    pub fn from_code(code: &str) -> Result<SourceFormat, PreflightError> {
        match code.trim().to_lowercase().as_str() {
            "kaggle" => Ok(SourceFormat::KaggleAccounting),
            "gov-ca" => Ok(SourceFormat::GovCanadaGl),
            "canonical" => Ok(SourceFormat::Canonical),
            other => Err(PreflightError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = PreflightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceFormat::from_code(s)
    }
}

// ============================================================================
// EVALUATION CONFIG
// ============================================================================

/// EvalConfig - resolved settings for one evaluation run
///
/// The reference date is part of the configuration rather than an ambient
/// clock read, so identical input + identical config is fully reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub format: SourceFormat,
    pub currency_hint: Option<String>,
    pub top_n: usize,
    pub z_threshold: f64,
    pub extreme_amount_ceiling: f64,
    pub unresolved_fraction: f64,
    pub reference_date: NaiveDate,
}

impl EvalConfig {
    /// Defaults for a format; the reference date starts at today's wall-clock
    /// date and should be pinned with `with_reference_date` for reproducible
    /// runs.
    pub fn new(format: SourceFormat) -> Self {
        EvalConfig {
            format,
            currency_hint: None,
            top_n: DEFAULT_TOP_N,
            z_threshold: DEFAULT_Z_THRESHOLD,
            extreme_amount_ceiling: DEFAULT_EXTREME_CEILING,
            unresolved_fraction: DEFAULT_UNRESOLVED_FRACTION,
            reference_date: chrono::Local::now().date_naive(),
        }
    }

    /// Builder pattern: currency applied when rows carry none
    pub fn with_currency_hint(mut self, hint: &str) -> Self {
        self.currency_hint = Some(hint.to_string());
        self
    }

    /// Builder pattern: how many top-|amount| transactions to surface
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Builder pattern: modified z-score threshold
    pub fn with_z_threshold(mut self, z_threshold: f64) -> Self {
        self.z_threshold = z_threshold;
        self
    }

    /// Builder pattern: absolute amount sanity ceiling
    pub fn with_extreme_ceiling(mut self, ceiling: f64) -> Self {
        self.extreme_amount_ceiling = ceiling;
        self
    }

    /// Builder pattern: unresolved-reference fraction that forces HIGH risk
    pub fn with_unresolved_fraction(mut self, fraction: f64) -> Self {
        self.unresolved_fraction = fraction;
        self
    }

    /// Builder pattern: pin the date future-dated checks compare against
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Reject out-of-range settings before any data is touched.
    pub fn validate(&self) -> Result<(), PreflightError> {
        if self.top_n < 1 {
            return Err(PreflightError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(PreflightError::InvalidConfig(format!(
                "z_threshold must be a positive number, got {}",
                self.z_threshold
            )));
        }
        if !self.extreme_amount_ceiling.is_finite() || self.extreme_amount_ceiling <= 0.0 {
            return Err(PreflightError::InvalidConfig(format!(
                "extreme_amount_ceiling must be a positive number, got {}",
                self.extreme_amount_ceiling
            )));
        }
        if !self.unresolved_fraction.is_finite()
            || self.unresolved_fraction <= 0.0
            || self.unresolved_fraction > 1.0
        {
            return Err(PreflightError::InvalidConfig(format!(
                "unresolved_fraction must be in (0, 1], got {}",
                self.unresolved_fraction
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
