// Validation Engine
// Fixed-order rule checks over adapted accounts and transactions. Each rule
// contributes at most one aggregated Issue with a capped example sample.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::EvalConfig;
use crate::schema::{Account, Transaction};

const EXAMPLE_CAP: usize = 5;

// ============================================================================
// ISSUE MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateAccountId,
    DuplicateTransactionId,
    UnresolvedAccountReference,
    FutureDatedTransaction,
    InvalidDate,
    ZeroAmount,
    ExtremeAmount,
    CurrencyMismatch,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::DuplicateAccountId => "duplicate_account_id",
            IssueKind::DuplicateTransactionId => "duplicate_transaction_id",
            IssueKind::UnresolvedAccountReference => "unresolved_account_reference",
            IssueKind::FutureDatedTransaction => "future_dated_transaction",
            IssueKind::InvalidDate => "invalid_date",
            IssueKind::ZeroAmount => "zero_amount",
            IssueKind::ExtremeAmount => "extreme_amount",
            IssueKind::CurrencyMismatch => "currency_mismatch",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::DuplicateAccountId => Severity::Medium,
            IssueKind::DuplicateTransactionId => Severity::Medium,
            IssueKind::UnresolvedAccountReference => Severity::High,
            IssueKind::FutureDatedTransaction => Severity::Medium,
            IssueKind::InvalidDate => Severity::Low,
            IssueKind::ZeroAmount => Severity::Low,
            IssueKind::ExtremeAmount => Severity::Medium,
            IssueKind::CurrencyMismatch => Severity::High,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            IssueKind::DuplicateAccountId => "Accounts share duplicate account_id values",
            IssueKind::DuplicateTransactionId => {
                "Transactions share duplicate transaction_id values"
            }
            IssueKind::UnresolvedAccountReference => "Transactions reference missing accounts",
            IssueKind::FutureDatedTransaction => "Transactions dated in the future",
            IssueKind::InvalidDate => "Transactions with unparseable dates",
            IssueKind::ZeroAmount => "Zero-amount transactions",
            IssueKind::ExtremeAmount => "Transaction amounts beyond the sanity ceiling",
            IssueKind::CurrencyMismatch => "Currency mismatch between transaction and account",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete record behind an issue, trimmed to the fields that matter for
/// that rule. Unset fields stay out of the JSON output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueExample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_currency: Option<String>,
}

impl fmt::Display for IssueExample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(v) = &self.transaction_id {
            parts.push(format!("transaction_id={}", v));
        }
        if let Some(v) = &self.account_id {
            parts.push(format!("account_id={}", v));
        }
        if let Some(v) = self.amount {
            parts.push(format!("amount={}", v));
        }
        if let Some(v) = &self.date {
            parts.push(format!("date={}", v));
        }
        if let Some(v) = &self.currency {
            parts.push(format!("currency={}", v));
        }
        if let Some(v) = &self.account_currency {
            parts.push(format!("account_currency={}", v));
        }
        f.write_str(&parts.join(", "))
    }
}

/// One aggregated finding: every affected record is counted, a small sample
/// is kept as examples.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub count: usize,
    pub examples: Vec<IssueExample>,
}

impl Issue {
    fn new(kind: IssueKind, count: usize, examples: Vec<IssueExample>) -> Self {
        Issue {
            kind,
            severity: kind.severity(),
            message: kind.message().to_string(),
            count,
            examples,
        }
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct Validator {
    reference_date: NaiveDate,
    extreme_amount_ceiling: f64,
}

impl Validator {
    pub fn new(reference_date: NaiveDate, extreme_amount_ceiling: f64) -> Self {
        Validator {
            reference_date,
            extreme_amount_ceiling,
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Validator::new(config.reference_date, config.extreme_amount_ceiling)
    }

    /// Run every rule in declaration order. Rules that find nothing emit no
    /// issue, so the result keeps the fixed relative order with gaps.
    pub fn validate(&self, accounts: &[Account], transactions: &[Transaction]) -> Vec<Issue> {
        let mut issues = Vec::new();
        if let Some(issue) = self.check_duplicate_account_ids(accounts) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_duplicate_transaction_ids(transactions) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_unresolved_references(accounts, transactions) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_future_dates(transactions) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_invalid_dates(transactions) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_zero_amounts(transactions) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_extreme_amounts(transactions) {
            issues.push(issue);
        }
        if let Some(issue) = self.check_currency_mismatches(accounts, transactions) {
            issues.push(issue);
        }
        info!(issues = issues.len(), "validation complete");
        issues
    }

    fn check_duplicate_account_ids(&self, accounts: &[Account]) -> Option<Issue> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for account in accounts {
            *counts.entry(account.account_id.as_str()).or_insert(0) += 1;
        }

        let total = accounts
            .iter()
            .filter(|a| counts[a.account_id.as_str()] > 1)
            .count();
        if total == 0 {
            return None;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut examples = Vec::new();
        for account in accounts {
            if counts[account.account_id.as_str()] > 1
                && seen.insert(account.account_id.as_str())
                && examples.len() < EXAMPLE_CAP
            {
                examples.push(IssueExample {
                    account_id: Some(account.account_id.clone()),
                    ..Default::default()
                });
            }
        }
        Some(Issue::new(IssueKind::DuplicateAccountId, total, examples))
    }

    fn check_duplicate_transaction_ids(&self, transactions: &[Transaction]) -> Option<Issue> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tx in transactions {
            *counts.entry(tx.transaction_id.as_str()).or_insert(0) += 1;
        }

        let total = transactions
            .iter()
            .filter(|tx| counts[tx.transaction_id.as_str()] > 1)
            .count();
        if total == 0 {
            return None;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut examples = Vec::new();
        for tx in transactions {
            if counts[tx.transaction_id.as_str()] > 1
                && seen.insert(tx.transaction_id.as_str())
                && examples.len() < EXAMPLE_CAP
            {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    ..Default::default()
                });
            }
        }
        Some(Issue::new(IssueKind::DuplicateTransactionId, total, examples))
    }

    fn check_unresolved_references(
        &self,
        accounts: &[Account],
        transactions: &[Transaction],
    ) -> Option<Issue> {
        let known: HashSet<&str> = accounts.iter().map(|a| a.account_id.as_str()).collect();

        let mut count = 0;
        let mut examples = Vec::new();
        for tx in transactions {
            if known.contains(tx.account_id.as_str()) {
                continue;
            }
            count += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    account_id: Some(tx.account_id.clone()),
                    ..Default::default()
                });
            }
        }
        (count > 0).then(|| Issue::new(IssueKind::UnresolvedAccountReference, count, examples))
    }

    fn check_future_dates(&self, transactions: &[Transaction]) -> Option<Issue> {
        let mut count = 0;
        let mut examples = Vec::new();
        for tx in transactions {
            let Some(date) = tx.date else { continue };
            if date <= self.reference_date {
                continue;
            }
            count += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    date: Some(date.to_string()),
                    ..Default::default()
                });
            }
        }
        (count > 0).then(|| Issue::new(IssueKind::FutureDatedTransaction, count, examples))
    }

    fn check_invalid_dates(&self, transactions: &[Transaction]) -> Option<Issue> {
        let mut count = 0;
        let mut examples = Vec::new();
        for tx in transactions {
            if tx.date.is_some() {
                continue;
            }
            count += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    date: Some(tx.raw_date.clone()),
                    ..Default::default()
                });
            }
        }
        (count > 0).then(|| Issue::new(IssueKind::InvalidDate, count, examples))
    }

    fn check_zero_amounts(&self, transactions: &[Transaction]) -> Option<Issue> {
        let mut count = 0;
        let mut examples = Vec::new();
        for tx in transactions {
            if tx.amount != Some(0.0) {
                continue;
            }
            count += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    amount: tx.amount,
                    ..Default::default()
                });
            }
        }
        (count > 0).then(|| Issue::new(IssueKind::ZeroAmount, count, examples))
    }

    fn check_extreme_amounts(&self, transactions: &[Transaction]) -> Option<Issue> {
        let mut count = 0;
        let mut examples = Vec::new();
        for tx in transactions {
            let Some(amount) = tx.amount else { continue };
            if amount.abs() <= self.extreme_amount_ceiling {
                continue;
            }
            count += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    amount: Some(amount),
                    ..Default::default()
                });
            }
        }
        (count > 0).then(|| Issue::new(IssueKind::ExtremeAmount, count, examples))
    }

    fn check_currency_mismatches(
        &self,
        accounts: &[Account],
        transactions: &[Transaction],
    ) -> Option<Issue> {
        // First occurrence wins when ids collide; the duplicate rule already
        // reports the collision itself.
        let mut by_id: HashMap<&str, &Account> = HashMap::new();
        for account in accounts {
            by_id.entry(account.account_id.as_str()).or_insert(account);
        }

        let mut count = 0;
        let mut examples = Vec::new();
        for tx in transactions {
            let Some(account) = by_id.get(tx.account_id.as_str()) else {
                continue;
            };
            if tx.currency.is_empty() || account.currency.is_empty() {
                continue;
            }
            if tx.currency == account.currency {
                continue;
            }
            count += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(IssueExample {
                    transaction_id: Some(tx.transaction_id.clone()),
                    account_id: Some(tx.account_id.clone()),
                    currency: Some(tx.currency.clone()),
                    account_currency: Some(account.currency.clone()),
                    ..Default::default()
                });
            }
        }
        (count > 0).then(|| Issue::new(IssueKind::CurrencyMismatch, count, examples))
    }
}

// ============================================================================
// TESTS
// ============================================================================
