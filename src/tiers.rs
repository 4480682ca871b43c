//! Collateral tier schedules
//!
//! A schedule is a piecewise marginal-rate table: the part of a position's
//! value that falls between two consecutive boundaries is weighted by that
//! bracket's percent ratio.
//!
//! ## Source format
//! `[lo-hi:ratio, lo-hi:ratio, ...]` where `lo` and `hi` are whole quote
//! units. Only `hi` becomes a boundary; `lo` is checked for consistency.

use crate::amount::parse_scaled;
use crate::config::BeyondTopTier;
use crate::error::{FixtureError, Result};

const PERCENT: u128 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CollateralClass {
    Vl,     // VIP loan
    Margin, // cross margin
    Pm,     // portfolio margin
}

impl CollateralClass {
    pub fn all() -> [Self; 3] {
        [Self::Vl, Self::Margin, Self::Pm]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vl => "vl",
            Self::Margin => "margin",
            Self::Pm => "pm",
        }
    }

    /// Column prefix used in fixture files.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            Self::Vl => "vl",
            Self::Margin => "m",
            Self::Pm => "pm",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Vl => 0,
            Self::Margin => 1,
            Self::Pm => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    pub boundary: u128,
    pub ratio: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierSchedule {
    tiers: Vec<Tier>,
}

impl TierSchedule {
    /// Builds a schedule from already-scaled boundaries.
    ///
    /// Boundaries must be strictly increasing and ratios at most 100.
    pub fn new(tiers: Vec<Tier>) -> Option<Self> {
        let increasing = tiers.windows(2).all(|w| w[0].boundary < w[1].boundary);
        let ratios_ok = tiers.iter().all(|t| t.ratio as u128 <= PERCENT);
        (increasing && ratios_ok).then_some(Self { tiers })
    }

    pub fn parse(text: &str, value_multiplier: u128, row: usize) -> Result<Self> {
        let body = text.trim().trim_start_matches('[').trim_end_matches(']').trim();
        if body.is_empty() {
            return Ok(Self::default());
        }

        let mut tiers: Vec<Tier> = Vec::new();
        for segment in body.split(',') {
            let segment = segment.trim();
            let malformed = |reason| FixtureError::MalformedTier {
                row,
                segment: segment.to_string(),
                reason,
            };

            let parts: Vec<&str> = segment.split(':').collect();
            if parts.len() != 2 {
                return Err(malformed("expected lo-hi:ratio"));
            }
            let range: Vec<&str> = parts[0].split('-').collect();
            if range.len() != 2 {
                return Err(malformed("expected lo-hi range"));
            }

            let low = parse_bound(range[0]).ok_or_else(|| malformed("bad lower bound"))?;
            let high = parse_bound(range[1]).ok_or_else(|| malformed("bad upper bound"))?;
            if high < low {
                return Err(malformed("upper bound below lower bound"));
            }

            let ratio = parts[1]
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|r| *r as u128 <= PERCENT)
                .ok_or_else(|| malformed("ratio must be an integer percent"))?;

            let boundary = high
                .checked_mul(value_multiplier)
                .ok_or_else(|| malformed("boundary overflows"))?;
            if tiers.last().is_some_and(|prev| prev.boundary >= boundary) {
                return Err(malformed("boundaries must be strictly increasing"));
            }
            tiers.push(Tier { boundary, ratio });
        }

        Ok(Self { tiers })
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn top_boundary(&self) -> Option<u128> {
        self.tiers.last().map(|t| t.boundary)
    }

    /// Tier-weighted value of a position worth `value`.
    ///
    /// Every bracket fully below `value` contributes `width * ratio / 100`;
    /// the bracket containing `value` contributes the partial width. An
    /// empty schedule is worth nothing.
    pub fn weighted_value(&self, value: u128, policy: BeyondTopTier) -> u128 {
        let mut total = 0u128;
        let mut last_boundary = 0u128;

        for tier in &self.tiers {
            if value <= tier.boundary {
                return total + (value - last_boundary) * tier.ratio as u128 / PERCENT;
            }
            total += (tier.boundary - last_boundary) * tier.ratio as u128 / PERCENT;
            last_boundary = tier.boundary;
        }

        match (policy, self.tiers.last()) {
            (BeyondTopTier::ExtendLastRatio, Some(last)) => {
                let excess = (value - last_boundary).saturating_mul(last.ratio as u128) / PERCENT;
                total.saturating_add(excess)
            }
            _ => total,
        }
    }
}

fn parse_bound(text: &str) -> Option<u128> {
    parse_scaled(text, 1).filter(|v| *v <= u64::MAX as u128)
}
