// Canonical Schema - shared record types for validation and anomaly checks
// Every adapter normalizes its source into these shapes; downstream
// components never see format-specific data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// SENTINEL CONVENTIONS
// ============================================================================

/// Account id assigned to rows whose account reference is missing or blank.
/// The sentinel account is created once per run and is always present in the
/// accounts set, so bucketed rows resolve like any other row.
pub const UNKNOWN_ACCOUNT_ID: &str = "UNKNOWN";

/// Display name of the sentinel account.
pub const UNKNOWN_ACCOUNT_NAME: &str = "Unresolved account bucket";

// ============================================================================
// ACCOUNT
// ============================================================================

/// AccountKind - coarse ledger classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Revenue,
    Expense,
    Equity,
    Unknown,
}

impl AccountKind {
    pub fn as_str(&self) -> &str {
        match self {
            AccountKind::Asset => "asset",
            AccountKind::Liability => "liability",
            AccountKind::Revenue => "revenue",
            AccountKind::Expense => "expense",
            AccountKind::Equity => "equity",
            AccountKind::Unknown => "unknown",
        }
    }

    /// Classify free-form category text into a kind.
    ///
    /// Exact names match first (case-insensitive), then substring tests in a
    /// fixed order. Anything unrecognized is Unknown.
    pub fn classify(text: &str) -> AccountKind {
        let c = text.trim().to_lowercase();
        match c.as_str() {
            "asset" => return AccountKind::Asset,
            "liability" => return AccountKind::Liability,
            "revenue" => return AccountKind::Revenue,
            "expense" => return AccountKind::Expense,
            "equity" => return AccountKind::Equity,
            _ => {}
        }
        if c.contains("asset") {
            AccountKind::Asset
        } else if c.contains("liabil") {
            AccountKind::Liability
        } else if c.contains("reven") || c.contains("income") {
            AccountKind::Revenue
        } else if c.contains("expens") || c.contains("cost") {
            AccountKind::Expense
        } else {
            AccountKind::Unknown
        }
    }
}

/// Account - one ledger account in the canonical set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Account {
    pub fn new(account_id: String, name: String, kind: AccountKind, currency: String) -> Self {
        Account {
            account_id,
            name,
            kind,
            currency,
            metadata: BTreeMap::new(),
        }
    }

    /// The per-run sentinel that unresolved rows are bucketed to.
    pub fn unknown(currency: &str) -> Self {
        Account::new(
            UNKNOWN_ACCOUNT_ID.to_string(),
            UNKNOWN_ACCOUNT_NAME.to_string(),
            AccountKind::Unknown,
            currency.to_string(),
        )
    }

    /// Builder pattern: attach a metadata entry
    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Transaction - one canonical ledger movement
///
/// Parse failures are markers, not corrections: `amount == None` means the
/// source text did not yield a signed number (distinguishable from a real
/// zero), and the original text stays in `raw_amount`. Same for dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: Option<f64>,
    pub raw_amount: String,
    pub currency: String,
    pub date: Option<NaiveDate>,
    pub raw_date: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Transaction {
    /// Create a transaction with required identifiers; everything else is
    /// filled through the builder methods.
    pub fn new(transaction_id: String, account_id: String) -> Self {
        Transaction {
            transaction_id,
            account_id,
            amount: None,
            raw_amount: String::new(),
            currency: String::new(),
            date: None,
            raw_date: String::new(),
            description: String::new(),
            vendor: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Builder pattern: set the normalized signed amount
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Builder pattern: keep the source's amount text
    pub fn with_raw_amount(mut self, raw: &str) -> Self {
        self.raw_amount = raw.to_string();
        self
    }

    /// Builder pattern: set the currency code
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// Builder pattern: set the parsed date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Builder pattern: keep the source's date text
    pub fn with_raw_date(mut self, raw: &str) -> Self {
        self.raw_date = raw.to_string();
        self
    }

    /// Builder pattern: set the description
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// Builder pattern: reference a vendor by id
    pub fn with_vendor(mut self, vendor_id: &str) -> Self {
        self.vendor = Some(vendor_id.to_string());
        self
    }

    /// Builder pattern: attach a metadata entry
    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

// ============================================================================
// VENDOR
// ============================================================================

/// Vendor - counterparty referenced by transactions, when the source has one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    pub name: String,
    pub country: String,
}

impl Vendor {
    pub fn new(vendor_id: String, name: String, country: String) -> Self {
        Vendor {
            vendor_id,
            name,
            country,
        }
    }
}

// ============================================================================
// CLEANING STATS
// ============================================================================

/// CleaningStats - per-run normalization counters
///
/// Owned exclusively by the adapter while it runs; immutable once returned.
/// Invariant: rows_in == rows_out + structurally_dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub structurally_dropped: usize,
    pub bad_dates: usize,
    pub bad_amounts: usize,
    pub bad_credit_debit_codes: usize,
    pub rows_bucketed_to_unknown: usize,
    pub fallback_transaction_ids_used: usize,
}

impl CleaningStats {
    pub fn new() -> Self {
        CleaningStats::default()
    }

    /// Row conservation: every input row is either emitted or counted out.
    pub fn is_conserved(&self) -> bool {
        self.rows_in == self.rows_out + self.structurally_dropped
    }
}

// ============================================================================
// TESTS
// ============================================================================
