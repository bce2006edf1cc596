// Ledger Preflight CLI - migration-readiness evaluation for ledger exports
// Exit code mirrors the verdict: 0 LOW, 2 MEDIUM, 5 HIGH. Fatal errors exit 1.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ledger_preflight::config::{
    EvalConfig, SourceFormat, DEFAULT_EXTREME_CEILING, DEFAULT_TOP_N, DEFAULT_UNRESOLVED_FRACTION,
    DEFAULT_Z_THRESHOLD,
};
use ledger_preflight::loader::load_input;
use ledger_preflight::pipeline::{evaluate, evaluate_stressed};

/// Evaluate a financial dataset's readiness for ledger migration
#[derive(Parser, Debug)]
#[command(name = "ledger-preflight")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV file, or folder for the canonical format
    #[arg(short, long)]
    input: PathBuf,

    /// Source format: kaggle, gov-ca, or canonical
    #[arg(short, long)]
    format: SourceFormat,

    /// Currency applied to rows that carry none of their own
    #[arg(long)]
    currency_hint: Option<String>,

    /// How many top-|amount| transactions to surface for review
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Modified z-score above which an amount is flagged as an outlier
    #[arg(long, default_value_t = DEFAULT_Z_THRESHOLD)]
    z_threshold: f64,

    /// Absolute amount above which a transaction is implausible
    #[arg(long, default_value_t = DEFAULT_EXTREME_CEILING)]
    extreme_ceiling: f64,

    /// Unresolved-reference share of output rows that forces HIGH risk
    #[arg(long, default_value_t = DEFAULT_UNRESOLVED_FRACTION)]
    unresolved_fraction: f64,

    /// Date future-dated checks compare against (YYYY-MM-DD, default: today)
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    /// Inject seeded synthetic defects before validation
    #[arg(long)]
    stress_seed: Option<u64>,

    /// Emit the machine-readable JSON report instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    // Structured logging on stderr so report output stays pipeable
    // (set RUST_LOG=debug for per-table detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = EvalConfig::new(cli.format)
        .with_top_n(cli.top_n)
        .with_z_threshold(cli.z_threshold)
        .with_extreme_ceiling(cli.extreme_ceiling)
        .with_unresolved_fraction(cli.unresolved_fraction);
    if let Some(hint) = cli.currency_hint.as_deref() {
        config = config.with_currency_hint(hint);
    }
    if let Some(date) = cli.reference_date {
        config = config.with_reference_date(date);
    }

    let raw = load_input(&cli.input, cli.format)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;

    let result = match cli.stress_seed {
        Some(seed) => evaluate_stressed(&raw, &config, seed)?,
        None => evaluate(&raw, &config)?,
    };

    if cli.json {
        println!("{}", result.render_json()?);
    } else {
        println!("{}", result.render_text());
    }

    Ok(result.risk.exit_code())
}

// ============================================================================
// TESTS
// ============================================================================
