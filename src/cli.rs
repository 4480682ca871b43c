//! Command-line options shared by the fixture binaries.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::config::{BeyondTopTier, GeneratorConfig, DEFAULT_DESIGNATED_TOKENS};
use crate::error::Result;
use crate::price_table::PriceTable;

pub const DEFAULT_ASSETS_FILE: &str = "cex_assets_info.csv";

/// Asset table location and the settings that change how it is read.
#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    /// Asset price and tier table (CSV)
    #[arg(long, default_value = DEFAULT_ASSETS_FILE, env = "FIXTURE_ASSETS")]
    pub assets: PathBuf,

    /// Tokens quoted with two decimals instead of eight (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_DESIGNATED_TOKENS.map(String::from),
        env = "FIXTURE_DESIGNATED_TOKENS"
    )]
    pub designated: Vec<String>,

    /// Weighting of collateral value above the highest tier boundary
    #[arg(long, value_enum, default_value = "capped", env = "FIXTURE_BEYOND_TOP_TIER")]
    pub beyond_top_tier: TierPolicyArg,
}

impl TableArgs {
    pub fn config(&self) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_designated_tokens(&self.designated)
            .with_beyond_top_tier(self.beyond_top_tier.to_core_type())
    }

    pub fn load_table(&self, config: &GeneratorConfig) -> Result<PriceTable> {
        PriceTable::load(&self.assets, config)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TierPolicyArg {
    Capped,
    ExtendLastRatio,
}

impl TierPolicyArg {
    pub fn to_core_type(&self) -> BeyondTopTier {
        match self {
            TierPolicyArg::Capped => BeyondTopTier::Capped,
            TierPolicyArg::ExtendLastRatio => BeyondTopTier::ExtendLastRatio,
        }
    }
}
