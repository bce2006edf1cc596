// Stress Injection
// Deterministically corrupts an adapted transaction set so validation and
// anomaly paths can be exercised at volume. Only runs when a seed is
// explicitly requested.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::info;

use crate::schema::Transaction;

const BAD_REF_RATE: f64 = 0.005;
const FOREIGN_CURRENCY_RATE: f64 = 0.005;
const FUTURE_DATE_RATE: f64 = 0.002;
const ZERO_AMOUNT_RATE: f64 = 0.001;
const EXTREME_ROWS: usize = 10;
const EXTREME_AMOUNT: f64 = 9.99e7;
const BAD_ACCOUNT_ID: &str = "999999";
const FOREIGN_CURRENCY: &str = "EUR";

/// Rewrite a deterministic sample of transactions with known defect shapes:
/// dangling account references, foreign currencies, far-future dates, zero
/// amounts, and extreme amounts. Identical seed and input produce identical
/// injections.
pub fn apply_stress(transactions: &mut [Transaction], seed: u64) {
    let n = transactions.len();
    if n == 0 {
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);

    for i in sample(&mut rng, n, BAD_REF_RATE) {
        transactions[i].account_id = BAD_ACCOUNT_ID.to_string();
    }
    for i in sample(&mut rng, n, FOREIGN_CURRENCY_RATE) {
        transactions[i].currency = FOREIGN_CURRENCY.to_string();
    }
    let far_future = NaiveDate::from_ymd_opt(2035, 1, 1);
    for i in sample(&mut rng, n, FUTURE_DATE_RATE) {
        transactions[i].date = far_future;
    }
    for i in sample(&mut rng, n, ZERO_AMOUNT_RATE) {
        transactions[i].amount = Some(0.0);
    }
    for i in index::sample(&mut rng, n, EXTREME_ROWS.min(n)) {
        transactions[i].amount = Some(EXTREME_AMOUNT);
    }

    info!(rows = n, seed, "stress injection applied");
}

fn sample(rng: &mut StdRng, n: usize, rate: f64) -> Vec<usize> {
    let k = ((n as f64) * rate) as usize;
    index::sample(rng, n, k).into_vec()
}

// ============================================================================
// TESTS
// ============================================================================
