// Canonical CSV Adapter
// Folder layout: accounts.csv + transactions.csv, optional vendors.csv.
// Columns already use canonical names, so this adapter mostly passes values
// through and fills the gaps the contract requires.

use tracing::{debug, info, warn};

use crate::adapters::{parse_amount, parse_date, round2, AdaptedData, FormatAdapter};
use crate::config::SourceFormat;
use crate::error::PreflightError;
use crate::loader::{RawInput, RawRow, RawTable};
use crate::schema::{
    Account, AccountKind, CleaningStats, Transaction, Vendor, UNKNOWN_ACCOUNT_ID,
};

// ============================================================================
// SOURCE LAYOUT
// ============================================================================

const TX_COLUMNS: &[&str] = &["transaction_id", "account_id", "amount", "currency", "date"];
const ACCOUNT_COLUMNS: &[&str] = &["account_id", "account_name", "type", "currency"];
const VENDOR_COLUMNS: &[&str] = &["vendor_id", "name"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

// ============================================================================
// ADAPTER
// ============================================================================

/// Blank account references go to the sentinel bucket; non-blank references
/// that do not resolve are kept verbatim so the reference check can see them.
pub struct CanonicalCsvAdapter;

impl CanonicalCsvAdapter {
    pub fn new() -> Self {
        CanonicalCsvAdapter
    }
}

impl FormatAdapter for CanonicalCsvAdapter {
    fn adapt(
        &self,
        raw: &RawInput,
        currency_hint: Option<&str>,
    ) -> Result<AdaptedData, PreflightError> {
        let accounts_table = raw
            .accounts
            .as_ref()
            .ok_or_else(|| PreflightError::MissingTable("accounts".to_string()))?;
        accounts_table.require_columns(ACCOUNT_COLUMNS, "accounts")?;

        let table = &raw.transactions;
        table.require_columns(TX_COLUMNS, "transactions")?;

        let a_id = accounts_table.column("account_id");
        let a_name = accounts_table.column("account_name");
        let a_type = accounts_table.column("type");
        let a_currency = accounts_table.column("currency");

        let t_id = table.column("transaction_id");
        let t_account = table.column("account_id");
        let t_amount = table.column("amount");
        let t_currency = table.column("currency");
        let t_date = table.column("date");
        let t_description = table.column("description");
        let t_vendor = table.column("vendor_id");

        let fallback_currency = currency_hint.unwrap_or("");

        let mut accounts = Vec::with_capacity(accounts_table.rows.len() + 1);
        for row in side_rows(accounts_table, "accounts") {
            let id = row.cell(a_id);
            if id.is_empty() {
                warn!(row = row.index, "skipping accounts row without account_id");
                continue;
            }
            let currency = pick_non_blank(row.cell(a_currency), fallback_currency);
            accounts.push(Account::new(
                id.to_string(),
                row.cell(a_name).to_string(),
                AccountKind::classify(row.cell(a_type)),
                currency.to_string(),
            ));
        }
        accounts.push(Account::unknown(fallback_currency));

        let mut stats = CleaningStats::new();
        stats.rows_in = table.rows.len();

        let width = table.headers.len();
        let mut data_rows: Vec<&RawRow> = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            if row.cells.len() != width {
                stats.structurally_dropped += 1;
                debug!(row = row.index, cells = row.cells.len(), "dropping ragged row");
                continue;
            }
            data_rows.push(row);
        }

        let mut transactions = Vec::with_capacity(data_rows.len());
        for row in &data_rows {
            let raw_id = row.cell(t_id);
            let transaction_id = if raw_id.is_empty() {
                stats.fallback_transaction_ids_used += 1;
                format!("canonical_row_{}", row.index)
            } else {
                raw_id.to_string()
            };

            let raw_account = row.cell(t_account);
            let account_id = if raw_account.is_empty() {
                stats.rows_bucketed_to_unknown += 1;
                UNKNOWN_ACCOUNT_ID.to_string()
            } else {
                raw_account.to_string()
            };

            let raw_date = row.cell(t_date);
            let date = parse_date(raw_date, DATE_FORMATS);
            if date.is_none() {
                stats.bad_dates += 1;
            }

            let raw_amount = row.cell(t_amount);
            let amount = match parse_amount(raw_amount) {
                Some(value) => Some(round2(value)),
                None => {
                    stats.bad_amounts += 1;
                    None
                }
            };

            let mut tx = Transaction::new(transaction_id, account_id)
                .with_raw_amount(raw_amount)
                .with_currency(pick_non_blank(row.cell(t_currency), fallback_currency))
                .with_raw_date(raw_date)
                .with_description(row.cell(t_description).to_string());
            if let Some(value) = amount {
                tx = tx.with_amount(value);
            }
            if let Some(parsed) = date {
                tx = tx.with_date(parsed);
            }
            let vendor = row.cell(t_vendor);
            if !vendor.is_empty() {
                tx = tx.with_vendor(vendor);
            }
            transactions.push(tx);
        }

        stats.rows_out = transactions.len();

        let vendors = match &raw.vendors {
            Some(vendor_table) => {
                vendor_table.require_columns(VENDOR_COLUMNS, "vendors")?;
                let v_id = vendor_table.column("vendor_id");
                let v_name = vendor_table.column("name");
                let v_country = vendor_table.column("country");
                let list: Vec<Vendor> = side_rows(vendor_table, "vendors")
                    .map(|row| {
                        Vendor::new(
                            row.cell(v_id).to_string(),
                            row.cell(v_name).to_string(),
                            row.cell(v_country).to_string(),
                        )
                    })
                    .collect();
                Some(list)
            }
            None => None,
        };

        info!(
            accounts = accounts.len(),
            transactions = transactions.len(),
            "canonical normalization complete"
        );

        Ok(AdaptedData {
            accounts,
            transactions,
            vendors,
            stats,
        })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Canonical
    }
}

/// Structurally sound rows of a side table. Ragged rows are logged and
/// skipped; side tables do not participate in row conservation.
fn side_rows<'a>(table: &'a RawTable, name: &'static str) -> impl Iterator<Item = &'a RawRow> {
    let width = table.headers.len();
    table.rows.iter().filter(move |row| {
        if row.cells.len() != width {
            warn!(table = name, row = row.index, "skipping ragged side-table row");
            return false;
        }
        true
    })
}

fn pick_non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

// ============================================================================
// TESTS
// ============================================================================
