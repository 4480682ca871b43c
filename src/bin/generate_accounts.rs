//! Fixture Generation Binary
//!
//! Writes one shard of synthetic accounts to `sample_users<ID>.csv`.
//!
//! ## Usage
//! ```bash
//! cargo run --bin generate_accounts --release -- <ID> <TOTAL> <INVALID>
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use collateral_fixtures::cli::TableArgs;
use collateral_fixtures::generator::{generate_shard, AccountMode, ShardSpec};
use collateral_fixtures::output::write_shard_file;
use collateral_fixtures::telemetry::{init_tracing, DEFAULT_LOG_FILTER};

/// Generate synthetic accounts for solvency-check fixtures
#[derive(Parser)]
#[command(name = "generate_accounts", version, about)]
struct Args {
    /// Shard id; accounts are numbered from ID * TOTAL
    id: u64,

    /// Number of accounts in the shard
    total: u64,

    /// Leading accounts made invalid, alternating equity-insufficient and
    /// debt-exceeds-collateral
    invalid: u64,

    #[command(flatten)]
    table: TableArgs,

    /// Directory the shard file is written to
    #[arg(long, short, default_value = ".", env = "FIXTURE_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// RNG seed; drawn from OS entropy and logged when absent
    #[arg(long, env = "FIXTURE_SEED")]
    seed: Option<u64>,
}

impl Args {
    /// Shard counts are checked as a usage error, before the table is read.
    fn shard_spec(&self) -> Result<ShardSpec, clap::Error> {
        ShardSpec::new(self.id, self.total, self.invalid)
            .map_err(|err| Args::command().error(ErrorKind::ValueValidation, err))
    }
}

fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);
    let args = Args::parse();

    let spec = args.shard_spec().unwrap_or_else(|err| err.exit());
    let config = args.table.config();
    let table = args
        .table
        .load_table(&config)
        .with_context(|| format!("loading asset table {}", args.table.assets.display()))?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, shard = spec.id, "seeding account generator");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let records = generate_shard(&spec, &table, &config, &mut rng)?;
    let path = write_shard_file(&args.output_dir, spec.id, &config.tokens, &records)
        .with_context(|| format!("writing shard {} to {}", spec.id, args.output_dir.display()))?;

    println!("=======================================================");
    println!("  Shard {} -> {}", spec.id, path.display());
    println!("=======================================================");
    println!("  Seed:                    {}", seed);
    println!("  Tokens:                  {}", config.tokens.join(", "));
    for mode in AccountMode::all() {
        let count = records.iter().filter(|r| r.mode == mode).count();
        println!("  {:<25}{}", format!("{}:", mode.name()), count);
    }
    Ok(())
}
