// Error Types - fatal failure taxonomy for the evaluation library
//
// Data-level defects (bad dates, bad amounts, dangling references) are never
// errors; they are counted and reported. Everything here aborts the run
// before a result is produced.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("unknown source format: {0} (expected one of: kaggle, gov-ca, canonical)")]
    UnknownFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{table} is missing required columns: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("missing {0} table for the canonical format")]
    MissingTable(String),

    #[error("no data rows in {0}")]
    EmptyInput(String),

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

// ============================================================================
// TESTS
// ============================================================================
