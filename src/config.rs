//! Generator configuration.
//!
//! Everything the valuation engine and the account generator treat as a
//! constant lives here and is passed around by reference, so tests can build
//! alternative token sets without touching process-wide state.

use std::collections::BTreeSet;

use crate::error::{FixtureError, Result};

/// Tier boundaries are expressed in whole quote units and scaled by this
/// factor to match `units * price`.
pub const TOKEN_VALUE_MULTIPLIER: u128 = 10_000_000_000_000_000;

pub const DEFAULT_TOKENS: [&str; 4] = ["btc", "eth", "bnb", "shib"];
pub const DEFAULT_DESIGNATED_TOKENS: [&str; 1] = ["shib"];

/// Fixed-point representation of one class of tokens.
///
/// Quantities are stored as integer units at `precision` decimals; the same
/// integer is what gets multiplied by the scaled price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenClass {
    pub precision: u32,
    pub price_multiplier: u128,
}

impl TokenClass {
    pub const NORMAL: Self = Self {
        precision: 8,
        price_multiplier: 100_000_000,
    };

    pub const DESIGNATED: Self = Self {
        precision: 2,
        price_multiplier: 100_000_000_000_000,
    };

    /// Units per whole token.
    pub fn unit_scale(&self) -> u64 {
        10u64.pow(self.precision)
    }
}

/// How value above the highest tier boundary is weighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeyondTopTier {
    Capped,          // excess earns nothing
    ExtendLastRatio, // excess weighted by the last bracket's ratio
}

impl BeyondTopTier {
    pub fn all() -> Vec<Self> {
        vec![Self::Capped, Self::ExtendLastRatio]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Capped => "capped",
            Self::ExtendLastRatio => "extend-last-ratio",
        }
    }
}

/// An exact `numerator / denominator` scaling applied to unit counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn apply_floor(&self, units: u64) -> Result<u64> {
        let scaled = units as u128 * self.numerator as u128 / self.denominator as u128;
        u64::try_from(scaled).map_err(|_| FixtureError::Overflow("scaling units by a ratio"))
    }

    pub fn apply_ceil(&self, units: u64) -> Result<u64> {
        let scaled = (units as u128 * self.numerator as u128).div_ceil(self.denominator as u128);
        u64::try_from(scaled).map_err(|_| FixtureError::Overflow("scaling units by a ratio"))
    }
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub tokens: Vec<String>,
    pub designated_tokens: BTreeSet<String>,
    pub normal_class: TokenClass,
    pub designated_class: TokenClass,
    pub token_value_multiplier: u128,
    pub equity_ceiling: u64,      // whole tokens
    pub debt_overshoot: u128,     // value units added before inverting
    pub debt_inflation: Ratio,    // type-B debt multiplier
    pub valid_debt_shrink: Ratio, // keeps balanced debt under capacity
    pub beyond_top_tier: BeyondTopTier,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tokens: DEFAULT_TOKENS.iter().map(|t| t.to_string()).collect(),
            designated_tokens: DEFAULT_DESIGNATED_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            normal_class: TokenClass::NORMAL,
            designated_class: TokenClass::DESIGNATED,
            token_value_multiplier: TOKEN_VALUE_MULTIPLIER,
            equity_ceiling: 1000,
            debt_overshoot: 10,
            debt_inflation: Ratio::new(101, 100),
            valid_debt_shrink: Ratio::new(99, 100),
            beyond_top_tier: BeyondTopTier::Capped,
        }
    }
}

impl GeneratorConfig {
    pub fn with_designated_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.designated_tokens = tokens
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_beyond_top_tier(mut self, policy: BeyondTopTier) -> Self {
        self.beyond_top_tier = policy;
        self
    }

    pub fn is_designated(&self, token: &str) -> bool {
        self.designated_tokens.contains(token)
    }

    pub fn class_of(&self, token: &str) -> TokenClass {
        if self.is_designated(token) {
            self.designated_class
        } else {
            self.normal_class
        }
    }
}
