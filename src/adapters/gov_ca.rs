// Government of Canada GL Adapter
// Journal-voucher extracts with bilingual column headers, C/D sign codes,
// and locale-mixed amount formatting.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::adapters::{parse_amount, parse_date, round2, AdaptedData, FormatAdapter};
use crate::config::SourceFormat;
use crate::error::PreflightError;
use crate::loader::{RawInput, RawRow};
use crate::schema::{Account, AccountKind, CleaningStats, Transaction, UNKNOWN_ACCOUNT_ID};

// ============================================================================
// SOURCE LAYOUT
// ============================================================================

// Headers are bilingual English-French composites, exactly as published.
const COL_VOUCHER: &str = "Journal-Voucher-Identifier-Identificateur-de-la-pièce-de-journal";
const COL_ITEM: &str =
    "Journal-Voucher-Item-Identifier-Identificateur-de-l'item-de-la-pièce-de-journal";
const COL_DATE: &str = "Accounting-Effective-Date-Date-d'entrée-en-vigueur-comptable";
const COL_DEPT: &str = "DepartmentNumber-Numéro-de-Ministère";
const COL_GL: &str = "General-Ledger-Account-Code-Code-du-compte-du-grand-livre-général";
const COL_CD: &str = "Credit/Debit-Code-Code-Crédit/Débit";
const COL_AMOUNT: &str = "Journal-Voucher-Item-Amount-Montant-de-l'item-de-la-pièce-de-journal";
const COL_CTRL: &str = "Accounting-Control-Number-Numéro-contrôle-comptable";
const COL_FY: &str = "Fiscal-Year-Année-Fiscale";
const COL_FM: &str = "Fiscal-Month-Mois-Fiscal";

const REQUIRED_COLUMNS: &[&str] = &[
    COL_VOUCHER,
    COL_ITEM,
    COL_DATE,
    COL_DEPT,
    COL_GL,
    COL_CD,
    COL_AMOUNT,
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

pub const DEFAULT_CURRENCY: &str = "CAD";

// ============================================================================
// ADAPTER
// ============================================================================

/// Accounts are synthesized from the department + GL code pair. Rows missing
/// either half go to the sentinel bucket rather than minting a half-known
/// account key.
pub struct GovCanadaGlAdapter;

impl GovCanadaGlAdapter {
    pub fn new() -> Self {
        GovCanadaGlAdapter
    }
}

impl FormatAdapter for GovCanadaGlAdapter {
    fn adapt(
        &self,
        raw: &RawInput,
        currency_hint: Option<&str>,
    ) -> Result<AdaptedData, PreflightError> {
        let table = &raw.transactions;
        table.require_columns(REQUIRED_COLUMNS, "transactions")?;
        let currency = currency_hint.unwrap_or(DEFAULT_CURRENCY);

        let c_voucher = table.column(COL_VOUCHER);
        let c_item = table.column(COL_ITEM);
        let c_date = table.column(COL_DATE);
        let c_dept = table.column(COL_DEPT);
        let c_gl = table.column(COL_GL);
        let c_cd = table.column(COL_CD);
        let c_amount = table.column(COL_AMOUNT);
        let c_ctrl = table.column(COL_CTRL);
        let c_fy = table.column(COL_FY);
        let c_fm = table.column(COL_FM);

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

        let mut account_keys: BTreeSet<String> = BTreeSet::new();
        for row in &data_rows {
            let dept = row.cell(c_dept);
            let gl = row.cell(c_gl);
            if !dept.is_empty() && !gl.is_empty() {
                account_keys.insert(format!("{}-{}", dept, gl));
            }
        }
        let account_ids: BTreeMap<String, String> = account_keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), (1001 + i).to_string()))
            .collect();

        let mut accounts: Vec<Account> = account_ids
            .iter()
            .map(|(key, id)| {
                Account::new(
                    id.clone(),
                    format!("Dept/GL {}", key),
                    AccountKind::Unknown,
                    currency.to_string(),
                )
            })
            .collect();
        accounts.push(Account::unknown(currency));

        let mut transactions = Vec::with_capacity(data_rows.len());
        for row in &data_rows {
            let dept = row.cell(c_dept);
            let gl = row.cell(c_gl);
            let key = if dept.is_empty() || gl.is_empty() {
                None
            } else {
                Some(format!("{}-{}", dept, gl))
            };
            let account_id = match key.as_ref().and_then(|k| account_ids.get(k)) {
                Some(id) => id.clone(),
                None => {
                    stats.rows_bucketed_to_unknown += 1;
                    UNKNOWN_ACCOUNT_ID.to_string()
                }
            };

            let voucher = row.cell(c_voucher);
            let item = row.cell(c_item);
            let transaction_id = if voucher.is_empty() || item.is_empty() {
                stats.fallback_transaction_ids_used += 1;
                format!("gov_row_{}", row.index)
            } else {
                format!("gov_{}_{}", voucher, item)
            };

            let raw_date = row.cell(c_date);
            let date = parse_date(raw_date, DATE_FORMATS);
            if date.is_none() {
                stats.bad_dates += 1;
            }

            let raw_amount = row.cell(c_amount);
            let magnitude = parse_amount(&clean_amount_text(raw_amount));
            if magnitude.is_none() {
                stats.bad_amounts += 1;
            }

            let cd_text = row.cell(c_cd);
            let code = normalize_credit_debit(cd_text);
            if code.is_none() {
                stats.bad_credit_debit_codes += 1;
            }

            // Credits post positive, debits negative. Without a usable code
            // the sign is unknowable, so the amount stays unparsed.
            let amount = match (magnitude, code) {
                (Some(value), Some('C')) => Some(round2(value)),
                (Some(value), Some('D')) => Some(round2(-value)),
                _ => None,
            };

            let mut description = format!("JV {} | Item {}", voucher, item);
            if c_ctrl.is_some() {
                description.push_str(" | Ctrl ");
                description.push_str(row.cell(c_ctrl));
            }
            if c_fy.is_some() {
                description.push_str(" | FY ");
                description.push_str(row.cell(c_fy));
            }
            if c_fm.is_some() {
                description.push_str(" | FM ");
                description.push_str(row.cell(c_fm));
            }

            let mut tx = Transaction::new(transaction_id, account_id)
                .with_raw_amount(raw_amount)
                .with_currency(currency)
                .with_raw_date(raw_date)
                .with_description(description);
            if let Some(value) = amount {
                tx = tx.with_amount(value);
            }
            if let Some(parsed) = date {
                tx = tx.with_date(parsed);
            }
            if !cd_text.is_empty() {
                tx = tx.with_meta("credit_debit_code", cd_text);
            }
            let fiscal_year = row.cell(c_fy);
            if !fiscal_year.is_empty() {
                tx = tx.with_meta("fiscal_year", fiscal_year);
            }
            let fiscal_month = row.cell(c_fm);
            if !fiscal_month.is_empty() {
                tx = tx.with_meta("fiscal_month", fiscal_month);
            }
            transactions.push(tx);
        }

        stats.rows_out = transactions.len();

        info!(
            accounts = accounts.len(),
            transactions = transactions.len(),
            "gov-ca normalization complete"
        );

        Ok(AdaptedData {
            accounts,
            transactions,
            vendors: None,
            stats,
        })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::GovCanadaGl
    }
}

// ============================================================================
// FIELD CLEANUP
// ============================================================================

/// Collapse the amount text to something `f64` can parse. The extracts mix
/// "1 234,56", "1,234.56", and "12,5" styles: spaces are grouping, a comma is
/// decimal only when no dot is present, otherwise grouping.
fn clean_amount_text(text: &str) -> String {
    let compact: String = text.chars().filter(|c| *c != ' ').collect();
    let has_comma = compact.contains(',');
    let has_dot = compact.contains('.');
    if has_comma && has_dot {
        compact.replace(',', "")
    } else if has_comma {
        compact.replace(',', ".")
    } else {
        compact
    }
}

fn normalize_credit_debit(text: &str) -> Option<char> {
    match text.to_uppercase().as_str() {
        "C" | "CR" | "CREDIT" | "CRED" | "CRED." => Some('C'),
        "D" | "DR" | "DEBIT" | "DEB" | "DEB." => Some('D'),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
