// Input Loader - CSV files into uninterpreted raw row tables
// Loading is deliberately dumb: headers and string cells only, no parsing.
// Flexible mode keeps ragged rows so adapters can count them as structural
// drops instead of the whole read failing.

use crate::config::SourceFormat;
use crate::error::PreflightError;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

// ============================================================================
// RAW TYPES
// ============================================================================

/// RawRow - one data row, cells in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data-row ordinal (header excluded); stable across the run and
    /// the basis for fallback identifiers.
    pub index: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    /// Trimmed cell value at a resolved column, empty when the column is
    /// absent or unresolved.
    pub fn cell(&self, column: Option<usize>) -> &str {
        column
            .and_then(|idx| self.cells.get(idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// RawTable - headers plus rows from one CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Position of a header, by exact (trimmed) name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fatal check that every required column is present; missing names are
    /// reported together, sorted.
    pub fn require_columns(&self, required: &[&str], table: &str) -> Result<(), PreflightError> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(PreflightError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// RawInput - everything an adapter receives for one run
///
/// Single-file sources populate only `transactions`; the canonical folder
/// format also carries its side tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    pub transactions: RawTable,
    pub accounts: Option<RawTable>,
    pub vendors: Option<RawTable>,
}

impl RawInput {
    pub fn from_table(transactions: RawTable) -> Self {
        RawInput {
            transactions,
            accounts: None,
            vendors: None,
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Read one CSV file into a raw table.
///
/// Fails on unreadable files, malformed CSV, or files with no data rows;
/// ragged rows are kept as-is for the adapter to count.
pub fn load_table(path: &Path) -> Result<RawTable, PreflightError> {
    let file = File::open(path).map_err(|source| PreflightError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        rows.push(RawRow {
            index: i + 1,
            cells: record.iter().map(|c| c.to_string()).collect(),
        });
    }

    if rows.is_empty() {
        return Err(PreflightError::EmptyInput(path.display().to_string()));
    }

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    debug!(rows = rows.len(), source = %source, "loaded raw table");

    Ok(RawTable {
        source,
        headers,
        rows,
    })
}

/// Load the input for a format: a single CSV file, or for the canonical
/// format a folder holding accounts.csv, transactions.csv, and optionally
/// vendors.csv.
pub fn load_input(path: &Path, format: SourceFormat) -> Result<RawInput, PreflightError> {
    match format {
        SourceFormat::Canonical => {
            let accounts = load_table(&path.join("accounts.csv"))?;
            let transactions = load_table(&path.join("transactions.csv"))?;
            let vendors_path = path.join("vendors.csv");
            let vendors = if vendors_path.exists() {
                Some(load_table(&vendors_path)?)
            } else {
                None
            };
            Ok(RawInput {
                transactions,
                accounts: Some(accounts),
                vendors,
            })
        }
        SourceFormat::KaggleAccounting | SourceFormat::GovCanadaGl => {
            Ok(RawInput::from_table(load_table(path)?))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn test_load_table_headers_and_rows() {
        let file = write_csv("a, b ,c\n1,2,3\n4,5,6\n");
        let table = load_table(file.path()).expect("load");

        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].index, 1);
        assert_eq!(table.rows[1].index, 2);
        assert_eq!(table.rows[1].cells, vec!["4", "5", "6"]);
    }

    #[test]
    fn test_load_table_keeps_ragged_rows() {
        let file = write_csv("a,b,c\n1,2,3\n1,2\n1,2,3,4\n");
        let table = load_table(file.path()).expect("load");

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].cells.len(), 2);
        assert_eq!(table.rows[2].cells.len(), 4);
    }

    #[test]
    fn test_load_table_empty_is_fatal() {
        let file = write_csv("a,b,c\n");
        let err = load_table(file.path()).unwrap_err();
        assert!(matches!(err, PreflightError::EmptyInput(_)));
    }

    #[test]
    fn test_load_table_missing_file_is_fatal() {
        let err = load_table(Path::new("/nonexistent/input.csv")).unwrap_err();
        assert!(matches!(err, PreflightError::Io { .. }));
    }

    #[test]
    fn test_cell_trims_and_defaults() {
        let row = RawRow {
            index: 1,
            cells: vec!["  padded  ".to_string(), "x".to_string()],
        };
        assert_eq!(row.cell(Some(0)), "padded");
        assert_eq!(row.cell(Some(5)), "");
        assert_eq!(row.cell(None), "");
    }

    #[test]
    fn test_require_columns_reports_all_missing_sorted() {
        let file = write_csv("Date,Amount\n2024-01-01,5\n");
        let table = load_table(file.path()).expect("load");

        assert!(table.require_columns(&["Date", "Amount"], "transactions").is_ok());

        let err = table
            .require_columns(&["Date", "Debit", "Account"], "transactions")
            .unwrap_err();
        match err {
            PreflightError::MissingColumns { table, columns } => {
                assert_eq!(table, "transactions");
                assert_eq!(columns, vec!["Account".to_string(), "Debit".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_input_canonical_folder() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("accounts.csv"),
            "account_id,account_name,type,currency\n10,Cash,asset,USD\n",
        )
        .expect("accounts");
        std::fs::write(
            dir.path().join("transactions.csv"),
            "transaction_id,account_id,amount,currency,date\nt1,10,5.0,USD,2024-01-01\n",
        )
        .expect("transactions");

        let input = load_input(dir.path(), SourceFormat::Canonical).expect("load");
        assert!(input.accounts.is_some());
        assert!(input.vendors.is_none());
        assert_eq!(input.transactions.rows.len(), 1);
    }

    #[test]
    fn test_load_input_single_file_formats() {
        let file = write_csv("x\n1\n");
        let input = load_input(file.path(), SourceFormat::GovCanadaGl).expect("load");
        assert!(input.accounts.is_none());
        assert!(input.vendors.is_none());
    }
}
