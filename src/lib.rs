//! Collateral Fixtures Library
//!
//! Generates synthetic exchange accounts for exercising a lending/margin
//! platform's solvency checks. Every account is valued with the same tiered
//! collateral rules the platform uses, and is either solvent or broken in one
//! controlled way.
//!
//! ## Modules
//!
//! - `tiers`: tier schedule parsing and piecewise tier weighting
//! - `price_table`: per-token prices and tier schedules loaded from CSV
//! - `valuation`: collateral value and debt capacity of posted collateral
//! - `solver`: debt quantities that hit or overshoot a target value
//! - `generator`: valid and invalid account construction per shard
//! - `output`: shard CSV writer
//! - `audit`: re-classifies a shard file with the platform's rules
//!
//! ## Usage
//!
//! ```bash
//! # Shard 0: 1000 accounts, the first 100 invalid
//! cargo run --bin generate_accounts --release -- 0 1000 100 --seed 7
//!
//! # Check the shard
//! cargo run --bin audit_accounts --release -- sample_users0.csv --expect-invalid 100
//! ```

pub mod amount;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod output;
pub mod price_table;
pub mod solver;
pub mod telemetry;
pub mod tiers;
pub mod valuation;

pub use error::{FixtureError, Result};
