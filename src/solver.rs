//! Debt Solver
//!
//! Inverts the valuation engine: given a target value, finds the debt
//! quantity (in units) worth that much at the token's price. Debt itself is
//! valued at face, without tiers.

use crate::error::{FixtureError, Result};
use crate::price_table::{PriceTable, TokenProfile};
use crate::valuation::{CollateralSplit, Valuer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down, // stays at or under the target value
    Up,   // reaches at least the target value
}

/// Units of `profile` worth `value`, rounded to the token precision.
pub fn units_for_value(profile: &TokenProfile, value: u128, rounding: Rounding) -> Result<u64> {
    let units = match rounding {
        Rounding::Down => value / profile.price,
        Rounding::Up => value.div_ceil(profile.price),
    };
    u64::try_from(units).map_err(|_| FixtureError::Overflow("converting value to token units"))
}

/// Debt quantity that exceeds the capacity of `split` by `overshoot` value
/// units. Rounds up, so `value_of(result) >= capacity + overshoot`.
pub fn debt_token_quantity(
    valuer: &Valuer<'_>,
    token: &str,
    split: &CollateralSplit,
    overshoot: u128,
) -> Result<u64> {
    let capacity = valuer.debt_value(token, split)?;
    let target = capacity
        .checked_add(overshoot)
        .ok_or(FixtureError::Overflow("adding debt overshoot"))?;
    units_for_value(valuer.table().profile(token)?, target, Rounding::Up)
}

/// Debt quantity worth at most `target` value units.
pub fn debt_token_quantity_from_fixed_value(
    table: &PriceTable,
    token: &str,
    target: u128,
) -> Result<u64> {
    units_for_value(table.profile(token)?, target, Rounding::Down)
}
