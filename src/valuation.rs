//! Collateral Valuation Engine
//!
//! Turns posted collateral into debt capacity. A position of `units` is worth
//! `units * price` value units; each collateral class then weights that value
//! through its own tier schedule, and the three weighted values are summed.
//!
//! All arithmetic is integer: prices are bounded by `u64` at load time, so
//! `units * price` always fits in `u128`.

use crate::config::{BeyondTopTier, GeneratorConfig};
use crate::error::Result;
use crate::price_table::{PriceTable, TokenProfile};
use crate::tiers::{CollateralClass, TierSchedule};

/// Units of one token posted to each collateral class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollateralSplit {
    pub vl: u64,
    pub margin: u64,
    pub pm: u64,
}

impl CollateralSplit {
    /// Splits `equity` by integer division, one divisor per class.
    pub fn from_equity(equity: u64, divisors: [u64; 3]) -> Self {
        Self {
            vl: equity / divisors[0],
            margin: equity / divisors[1],
            pm: equity / divisors[2],
        }
    }

    /// Splits `equity` rounding each share up, so shares that sum past one
    /// whole still do after rounding.
    pub fn from_equity_ceil(equity: u64, divisors: [u64; 3]) -> Self {
        Self {
            vl: equity.div_ceil(divisors[0]),
            margin: equity.div_ceil(divisors[1]),
            pm: equity.div_ceil(divisors[2]),
        }
    }

    pub fn amount(&self, class: CollateralClass) -> u64 {
        match class {
            CollateralClass::Vl => self.vl,
            CollateralClass::Margin => self.margin,
            CollateralClass::Pm => self.pm,
        }
    }

    pub fn total(&self) -> u128 {
        self.vl as u128 + self.margin as u128 + self.pm as u128
    }
}

/// Tier-weighted value of `units` of a token under one schedule.
pub fn collateral_value(
    profile: &TokenProfile,
    units: u64,
    schedule: &TierSchedule,
    policy: BeyondTopTier,
) -> u128 {
    schedule.weighted_value(profile.value_of(units), policy)
}

pub struct Valuer<'a> {
    table: &'a PriceTable,
    policy: BeyondTopTier,
}

impl<'a> Valuer<'a> {
    pub fn new(table: &'a PriceTable, config: &GeneratorConfig) -> Self {
        Self {
            table,
            policy: config.beyond_top_tier,
        }
    }

    pub fn table(&self) -> &'a PriceTable {
        self.table
    }

    pub fn collateral_value(&self, token: &str, units: u64, class: CollateralClass) -> Result<u128> {
        let entry = self.table.entry(token)?;
        Ok(collateral_value(
            &entry.profile,
            units,
            entry.schedule(class),
            self.policy,
        ))
    }

    /// Maximum debt value the posted collateral of one token supports.
    pub fn debt_value(&self, token: &str, split: &CollateralSplit) -> Result<u128> {
        let entry = self.table.entry(token)?;
        Ok(CollateralClass::all()
            .iter()
            .map(|&class| {
                collateral_value(
                    &entry.profile,
                    split.amount(class),
                    entry.schedule(class),
                    self.policy,
                )
            })
            .sum())
    }
}
