//! Fixture Audit Binary
//!
//! Re-reads shard files and classifies every account with the platform's
//! solvency rules.
//!
//! ## Usage
//! ```bash
//! cargo run --bin audit_accounts --release -- sample_users0.csv sample_users1.csv
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use collateral_fixtures::audit::{Auditor, Verdict};
use collateral_fixtures::cli::TableArgs;
use collateral_fixtures::telemetry::{init_tracing, DEFAULT_LOG_FILTER};

/// Classify generated accounts as valid or invalid
#[derive(Parser)]
#[command(name = "audit_accounts", version, about)]
struct Args {
    /// Shard files to audit
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    table: TableArgs,

    /// Fail unless each file holds exactly this many invalid accounts
    #[arg(long)]
    expect_invalid: Option<usize>,

    /// Print every invalid account
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);
    let args = Args::parse();

    let config = args.table.config();
    let table = args
        .table
        .load_table(&config)
        .with_context(|| format!("loading asset table {}", args.table.assets.display()))?;
    let auditor = Auditor::new(&table, &config);

    let mut mismatched = Vec::new();
    for file in &args.files {
        let report = auditor
            .audit_file(file)
            .with_context(|| format!("auditing {}", file.display()))?;

        println!("=======================================================");
        println!("  {}", file.display());
        println!("=======================================================");
        report.print();

        if args.verbose {
            for row in report.rows.iter().filter(|r| r.verdict != Verdict::Valid) {
                match &row.verdict {
                    Verdict::EquityInsufficient { token } => {
                        println!("  {} {}: collateral above equity in {}", row.rn, row.id, token)
                    }
                    Verdict::DebtExceedsCollateral { debt, collateral } => {
                        println!("  {} {}: debt {} > collateral {}", row.rn, row.id, debt, collateral)
                    }
                    Verdict::Valid => {}
                }
            }
        }
        println!();

        if let Some(expected) = args.expect_invalid {
            if report.invalid() != expected {
                mismatched.push(format!(
                    "{}: {} invalid, expected {}",
                    file.display(),
                    report.invalid(),
                    expected
                ));
            }
        }
    }

    if !mismatched.is_empty() {
        bail!("invalid account counts differ:\n  {}", mismatched.join("\n  "));
    }
    Ok(())
}
