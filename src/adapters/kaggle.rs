// Kaggle Financial Accounting Adapter
// Single-CSV export: account names in the rows, unsigned Debit amounts, and
// a Transaction_Type column carrying the sign convention.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info};

use crate::adapters::{parse_amount, parse_date, round2, AdaptedData, FormatAdapter};
use crate::config::SourceFormat;
use crate::error::PreflightError;
use crate::loader::{RawInput, RawRow};
use crate::schema::{
    Account, AccountKind, CleaningStats, Transaction, Vendor, UNKNOWN_ACCOUNT_ID,
};

// ============================================================================
// SOURCE LAYOUT
// ============================================================================

const COL_DATE: &str = "Date";
const COL_ACCOUNT: &str = "Account";
const COL_DEBIT: &str = "Debit";
const COL_CATEGORY: &str = "Category";
const COL_TYPE: &str = "Transaction_Type";
const COL_DESCRIPTION: &str = "Description";
const COL_VENDOR: &str = "Customer_Vendor";
const COL_REFERENCE: &str = "Reference";

const REQUIRED_COLUMNS: &[&str] = &[
    COL_DATE,
    COL_ACCOUNT,
    COL_DEBIT,
    COL_CATEGORY,
    COL_TYPE,
    COL_DESCRIPTION,
    COL_VENDOR,
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

pub const DEFAULT_CURRENCY: &str = "USD";

// ============================================================================
// ADAPTER
// ============================================================================

/// Kaggle financial-accounting exports have no transaction id column, so ids
/// are synthesized as `kfa_{row:06}` over the emitted rows. That is the
/// format's primary id scheme, not a per-row fallback, so
/// `fallback_transaction_ids_used` stays zero here.
pub struct KaggleAccountingAdapter;

impl KaggleAccountingAdapter {
    pub fn new() -> Self {
        KaggleAccountingAdapter
    }
}

impl FormatAdapter for KaggleAccountingAdapter {
    fn adapt(
        &self,
        raw: &RawInput,
        currency_hint: Option<&str>,
    ) -> Result<AdaptedData, PreflightError> {
        let table = &raw.transactions;
        table.require_columns(REQUIRED_COLUMNS, "transactions")?;
        let currency = currency_hint.unwrap_or(DEFAULT_CURRENCY);

        let c_date = table.column(COL_DATE);
        let c_account = table.column(COL_ACCOUNT);
        let c_debit = table.column(COL_DEBIT);
        let c_category = table.column(COL_CATEGORY);
        let c_type = table.column(COL_TYPE);
        let c_description = table.column(COL_DESCRIPTION);
        let c_vendor = table.column(COL_VENDOR);
        let c_reference = table.column(COL_REFERENCE);

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

        // Account universe, per-account category tallies, vendor universe.
        let mut account_names: BTreeSet<&str> = BTreeSet::new();
        let mut category_stats: HashMap<&str, HashMap<&str, (usize, usize)>> = HashMap::new();
        let mut vendor_names: BTreeSet<&str> = BTreeSet::new();
        for (pos, row) in data_rows.iter().enumerate() {
            let account = row.cell(c_account);
            if !account.is_empty() {
                account_names.insert(account);
                let tally = category_stats
                    .entry(account)
                    .or_default()
                    .entry(row.cell(c_category))
                    .or_insert((0, pos));
                tally.0 += 1;
            }
            let vendor = row.cell(c_vendor);
            if !vendor.is_empty() {
                vendor_names.insert(vendor);
            }
        }

        let account_ids: BTreeMap<&str, String> = account_names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, (1001 + i).to_string()))
            .collect();
        let vendor_ids: BTreeMap<&str, String> = vendor_names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, format!("v{:05}", i + 1)))
            .collect();

        let mut accounts = Vec::with_capacity(account_ids.len() + 1);
        for (name, id) in &account_ids {
            let kind = category_stats
                .get(name)
                .and_then(dominant_category)
                .map(AccountKind::classify)
                .unwrap_or(AccountKind::Unknown);
            accounts.push(Account::new(
                id.clone(),
                name.to_string(),
                kind,
                currency.to_string(),
            ));
        }
        accounts.push(Account::unknown(currency));

        let mut transactions = Vec::with_capacity(data_rows.len());
        for (pos, row) in data_rows.iter().enumerate() {
            let account_id = match account_ids.get(row.cell(c_account)) {
                Some(id) => id.clone(),
                None => {
                    stats.rows_bucketed_to_unknown += 1;
                    UNKNOWN_ACCOUNT_ID.to_string()
                }
            };

            let raw_date = row.cell(c_date);
            let date = parse_date(raw_date, DATE_FORMATS);
            if date.is_none() {
                stats.bad_dates += 1;
            }

            let raw_amount = row.cell(c_debit);
            let type_text = row.cell(c_type);
            let amount = match parse_amount(raw_amount) {
                Some(value) => {
                    let t = type_text.to_lowercase();
                    let signed = if t == "purchase" || t == "expense" {
                        -value
                    } else {
                        value
                    };
                    Some(round2(signed))
                }
                None => {
                    stats.bad_amounts += 1;
                    None
                }
            };

            let mut description = row.cell(c_description).to_string();
            if c_reference.is_some() {
                description.push_str(" | ref=");
                description.push_str(row.cell(c_reference));
            }

            let mut tx = Transaction::new(format!("kfa_{:06}", pos + 1), account_id)
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
            if !type_text.is_empty() {
                tx = tx.with_meta("transaction_type", type_text);
            }
            if let Some(vendor_id) = vendor_ids.get(row.cell(c_vendor)) {
                tx = tx.with_vendor(vendor_id);
            }
            transactions.push(tx);
        }

        stats.rows_out = transactions.len();

        let vendors: Vec<Vendor> = vendor_ids
            .iter()
            .map(|(name, id)| Vendor::new(id.clone(), name.to_string(), String::new()))
            .collect();
        let vendors = if vendors.is_empty() {
            None
        } else {
            Some(vendors)
        };

        info!(
            accounts = accounts.len(),
            transactions = transactions.len(),
            "kaggle normalization complete"
        );

        Ok(AdaptedData {
            accounts,
            transactions,
            vendors,
            stats,
        })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::KaggleAccounting
    }
}

/// Most frequent category for an account; ties go to the category seen
/// earliest in the file.
fn dominant_category<'a>(tallies: &HashMap<&'a str, (usize, usize)>) -> Option<&'a str> {
    tallies
        .iter()
        .max_by_key(|(_, (count, first_seen))| (*count, Reverse(*first_seen)))
        .map(|(category, _)| *category)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RawTable;

    const HEADERS: &[&str] = &[
        "Date",
        "Account",
        "Debit",
        "Category",
        "Transaction_Type",
        "Description",
        "Customer_Vendor",
    ];

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            source: "test.csv".to_string(),
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

    fn adapt(table: RawTable) -> AdaptedData {
        KaggleAccountingAdapter::new()
            .adapt(&RawInput::from_table(table), None)
            .expect("adapt")
    }

    #[test]
    fn test_ids_follow_sorted_account_order() {
        let data = adapt(table(
            HEADERS,
            &[
                &["2024-01-02", "Cash", "10.0", "Asset", "Sale", "first", "Acme"],
                &["2024-01-03", "Ads", "20.0", "Expense", "Purchase", "second", "Hooli"],
                &["2024-01-04", "Cash", "30.0", "Asset", "Sale", "third", "Acme"],
            ],
        ));

        // Sorted unique names: Ads, Cash
        assert_eq!(data.accounts[0].account_id, "1001");
        assert_eq!(data.accounts[0].name, "Ads");
        assert_eq!(data.accounts[1].account_id, "1002");
        assert_eq!(data.accounts[1].name, "Cash");
        assert_eq!(data.accounts[2].account_id, UNKNOWN_ACCOUNT_ID);

        assert_eq!(data.transactions[0].transaction_id, "kfa_000001");
        assert_eq!(data.transactions[2].transaction_id, "kfa_000003");
        assert_eq!(data.stats.fallback_transaction_ids_used, 0);
    }

    #[test]
    fn test_sign_convention_from_transaction_type() {
        let data = adapt(table(
            HEADERS,
            &[
                &["2024-01-02", "Cash", "45.99", "Asset", "Purchase", "chairs", "Acme"],
                &["2024-01-03", "Cash", "100.567", "Asset", "Sale", "invoice", "Acme"],
                &["2024-01-04", "Cash", "12.5", "Asset", "expense", "stamps", "Acme"],
            ],
        ));

        assert_eq!(data.transactions[0].amount, Some(-45.99));
        assert_eq!(data.transactions[1].amount, Some(100.57));
        assert_eq!(data.transactions[2].amount, Some(-12.5));
        assert_eq!(
            data.transactions[0]
                .metadata
                .get("transaction_type")
                .map(|s| s.as_str()),
            Some("Purchase")
        );
    }

    #[test]
    fn test_vendor_ids_sorted() {
        let data = adapt(table(
            HEADERS,
            &[
                &["2024-01-02", "Cash", "1", "Asset", "Sale", "a", "Zeta Corp"],
                &["2024-01-03", "Cash", "2", "Asset", "Sale", "b", "Acme"],
            ],
        ));

        let vendors = data.vendors.expect("vendors");
        assert_eq!(vendors[0].vendor_id, "v00001");
        assert_eq!(vendors[0].name, "Acme");
        assert_eq!(vendors[1].vendor_id, "v00002");
        assert_eq!(vendors[1].name, "Zeta Corp");

        assert_eq!(data.transactions[0].vendor.as_deref(), Some("v00002"));
        assert_eq!(data.transactions[1].vendor.as_deref(), Some("v00001"));
    }

    #[test]
    fn test_reference_column_appended_to_description() {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        headers.push("Reference");
        let data = adapt(table(
            &headers,
            &[&["2024-01-02", "Cash", "1", "Asset", "Sale", "invoice", "Acme", "INV-7"]],
        ));

        assert_eq!(data.transactions[0].description, "invoice | ref=INV-7");
    }

    #[test]
    fn test_description_untouched_without_reference_column() {
        let data = adapt(table(
            HEADERS,
            &[&["2024-01-02", "Cash", "1", "Asset", "Sale", "invoice", "Acme"]],
        ));

        assert_eq!(data.transactions[0].description, "invoice");
    }

    #[test]
    fn test_bad_date_flagged_not_dropped() {
        let data = adapt(table(
            HEADERS,
            &[&["not-a-date", "Cash", "1", "Asset", "Sale", "x", "Acme"]],
        ));

        assert_eq!(data.stats.bad_dates, 1);
        assert_eq!(data.stats.rows_out, 1);
        assert!(data.transactions[0].date.is_none());
        assert_eq!(data.transactions[0].raw_date, "not-a-date");
    }

    #[test]
    fn test_bad_amount_flagged_not_dropped() {
        let data = adapt(table(
            HEADERS,
            &[&["2024-01-02", "Cash", "12x", "Asset", "Sale", "x", "Acme"]],
        ));

        assert_eq!(data.stats.bad_amounts, 1);
        assert!(data.transactions[0].amount.is_none());
        assert_eq!(data.transactions[0].raw_amount, "12x");
    }

    #[test]
    fn test_ragged_row_is_the_only_exclusion() {
        let data = adapt(table(
            HEADERS,
            &[
                &["2024-01-02", "Cash", "1", "Asset", "Sale", "x", "Acme"],
                &["2024-01-03", "Cash"],
            ],
        ));

        assert_eq!(data.stats.rows_in, 2);
        assert_eq!(data.stats.rows_out, 1);
        assert_eq!(data.stats.structurally_dropped, 1);
        assert!(data.stats.is_conserved());
    }

    #[test]
    fn test_blank_account_bucketed_to_sentinel() {
        let data = adapt(table(
            HEADERS,
            &[&["2024-01-02", "", "1", "Asset", "Sale", "x", "Acme"]],
        ));

        assert_eq!(data.transactions[0].account_id, UNKNOWN_ACCOUNT_ID);
        assert_eq!(data.stats.rows_bucketed_to_unknown, 1);
        assert!(data
            .accounts
            .iter()
            .any(|a| a.account_id == UNKNOWN_ACCOUNT_ID));
    }

    #[test]
    fn test_missing_columns_fatal() {
        let err = KaggleAccountingAdapter::new()
            .adapt(
                &RawInput::from_table(table(&["Date", "Account"], &[&["2024-01-02", "Cash"]])),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, PreflightError::MissingColumns { .. }));
    }

    #[test]
    fn test_account_kind_from_dominant_category() {
        let data = adapt(table(
            HEADERS,
            &[
                &["2024-01-02", "Sales", "1", "Revenue", "Sale", "a", "Acme"],
                &["2024-01-03", "Sales", "2", "Revenue", "Sale", "b", "Acme"],
                &["2024-01-04", "Sales", "3", "Operating costs", "Sale", "c", "Acme"],
            ],
        ));

        assert_eq!(data.accounts[0].name, "Sales");
        assert_eq!(data.accounts[0].kind, AccountKind::Revenue);
    }

    #[test]
    fn test_currency_hint_overrides_default() {
        let input = RawInput::from_table(table(
            HEADERS,
            &[&["2024-01-02", "Cash", "1", "Asset", "Sale", "x", "Acme"]],
        ));
        let data = KaggleAccountingAdapter::new()
            .adapt(&input, Some("MXN"))
            .expect("adapt");

        assert_eq!(data.transactions[0].currency, "MXN");
        assert_eq!(data.accounts[0].currency, "MXN");

        let data = KaggleAccountingAdapter::new().adapt(&input, None).expect("adapt");
        assert_eq!(data.transactions[0].currency, DEFAULT_CURRENCY);
    }
}
