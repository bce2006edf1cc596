// Ledger Preflight - Core Library
// Exposes all modules for use in the CLI and tests

pub mod adapters;
pub mod anomalies;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod schema;
pub mod stress;
pub mod validator;

// Re-export commonly used types
pub use adapters::{
    get_adapter, AdaptedData, CanonicalCsvAdapter, FormatAdapter, GovCanadaGlAdapter,
    KaggleAccountingAdapter,
};
pub use anomalies::{AnomalyDetector, AnomalyFinding};
pub use config::{EvalConfig, SourceFormat};
pub use error::PreflightError;
pub use loader::{load_input, load_table, RawInput, RawRow, RawTable};
pub use pipeline::{evaluate, evaluate_stressed};
pub use report::EvaluationResult;
pub use risk::{RiskLevel, RiskPolicy};
pub use schema::{Account, AccountKind, CleaningStats, Transaction, Vendor};
pub use stress::apply_stress;
pub use validator::{Issue, IssueExample, IssueKind, Severity, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
