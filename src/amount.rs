//! Fixed-point amount parsing and formatting.
//!
//! Token quantities never pass through `f64`: they are parsed exactly with
//! `rust_decimal`, carried as integer units, and formatted back from the
//! integers so `equity - debt` is exact in the emitted text.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a decimal string and scales it by `multiplier`, truncating any
/// digits left below the unit. Negative values and overflow yield `None`.
pub fn parse_scaled(text: &str, multiplier: u128) -> Option<u128> {
    let text = text.trim();
    let value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()?;
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let multiplier = Decimal::new(i64::try_from(multiplier).ok()?, 0);
    value.checked_mul(multiplier)?.trunc().to_u128()
}

/// Parses a token quantity into units at `precision` decimals.
pub fn parse_units(text: &str, precision: u32) -> Option<u64> {
    let scaled = parse_scaled(text, 10u128.pow(precision))?;
    u64::try_from(scaled).ok()
}

/// Formats signed units at `precision` decimals, trimming trailing zeros but
/// keeping at least one fractional digit.
pub fn format_units(units: i128, precision: u32) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let magnitude = units.unsigned_abs();
    let scale = 10u128.pow(precision);
    let whole = magnitude / scale;
    let fraction = magnitude % scale;

    let mut digits = format!("{:0width$}", fraction, width = precision as usize);
    while digits.ends_with('0') {
        digits.pop();
    }
    if digits.is_empty() {
        digits.push('0');
    }
    format!("{sign}{whole}.{digits}")
}
