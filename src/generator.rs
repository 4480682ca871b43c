//! Account Generator
//!
//! Builds synthetic accounts for one shard. Each local index selects a mode
//! once; the mode decides how every token's equity, debt, and collateral
//! split are drawn.
//!
//! ## Modes
//! - `EquityInsufficient` (even invalid indices): collateral posted across the
//!   three classes adds up to 1.25x equity.
//! - `DebtExceedsCollateral` (odd invalid indices): debt is solved to land just
//!   above the tier-weighted capacity, then inflated by 1%.
//! - `Valid`: total capacity is shared evenly across tokens as debt, shrunk by
//!   1% so the account stays solvent.
//!
//! Quantities are integer units at each token's precision. Solvent splits are
//! floor divisions and never exceed their share of equity; overcommitted
//! splits round up and always exceed it.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::error::{FixtureError, Result};
use crate::price_table::{PriceTable, TokenProfile};
use crate::solver::{debt_token_quantity, debt_token_quantity_from_fixed_value};
use crate::tiers::CollateralClass;
use crate::valuation::{CollateralSplit, Valuer};

/// vl, margin, pm divisors of equity for solvent collateral.
const SOLVENT_SPLIT: [u64; 3] = [2, 4, 8];
/// vl, margin, pm divisors of equity that overshoot equity by a quarter.
const OVERCOMMITTED_SPLIT: [u64; 3] = [2, 4, 2];
/// Type-A debt is half the equity.
const OVERCOMMITTED_DEBT_DIVISOR: u64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountMode {
    Valid,
    EquityInsufficient,    // e < vl + m + pm
    DebtExceedsCollateral, // d * price > tier-weighted collateral
}

impl AccountMode {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Valid,
            Self::EquityInsufficient,
            Self::DebtExceedsCollateral,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::EquityInsufficient => "equity insufficient",
            Self::DebtExceedsCollateral => "debt exceeds collateral",
        }
    }

    /// The first `invalid_count` indices are invalid, alternating by parity.
    pub fn for_index(local_index: u64, invalid_count: u64) -> Self {
        if local_index >= invalid_count {
            Self::Valid
        } else if local_index % 2 == 0 {
            Self::EquityInsufficient
        } else {
            Self::DebtExceedsCollateral
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenPosition {
    pub equity: u64,
    pub debt: u64,
    pub collateral: CollateralSplit,
}

impl TokenPosition {
    pub fn net_balance(&self) -> i128 {
        self.equity as i128 - self.debt as i128
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRow {
    pub symbol: String,
    pub precision: u32,
    pub position: TokenPosition,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    pub index: u64,
    pub mode: AccountMode,
    pub tokens: Vec<TokenRow>,
}

impl AccountRecord {
    /// Account id: the global index as 64 lowercase hex digits.
    pub fn id_hex(&self) -> String {
        format!("{:064x}", self.index)
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenRow> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }
}

/// One generator invocation: shard id, account count, invalid account count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardSpec {
    pub id: u64,
    pub total: u64,
    pub invalid: u64,
}

impl ShardSpec {
    pub fn new(id: u64, total: u64, invalid: u64) -> Result<Self> {
        if invalid > total {
            return Err(FixtureError::InvalidCounts { total, invalid });
        }
        id.checked_mul(total)
            .and_then(|start| start.checked_add(total))
            .ok_or(FixtureError::Overflow("numbering shard accounts"))?;
        Ok(Self { id, total, invalid })
    }

    /// Global account index of `local_index`; shards never overlap.
    pub fn global_index(&self, local_index: u64) -> u64 {
        self.id * self.total + local_index
    }
}

pub struct AccountGenerator<'a> {
    config: &'a GeneratorConfig,
    table: &'a PriceTable,
    valuer: Valuer<'a>,
}

impl<'a> AccountGenerator<'a> {
    pub fn new(table: &'a PriceTable, config: &'a GeneratorConfig) -> Result<Self> {
        table.ensure_tokens(&config.tokens)?;
        Ok(Self {
            config,
            table,
            valuer: Valuer::new(table, config),
        })
    }

    pub fn generate(&self, index: u64, mode: AccountMode, rng: &mut impl Rng) -> Result<AccountRecord> {
        let positions = match mode {
            AccountMode::EquityInsufficient => self.equity_insufficient(rng)?,
            AccountMode::DebtExceedsCollateral => self.debt_exceeds_collateral(index, rng)?,
            AccountMode::Valid => self.valid(rng)?,
        };

        let tokens = self
            .config
            .tokens
            .iter()
            .zip(positions)
            .map(|(symbol, position)| {
                let profile = self.table.profile(symbol)?;
                Ok(TokenRow {
                    symbol: symbol.clone(),
                    precision: profile.precision(),
                    position,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(index, mode = mode.name(), "generated account");
        Ok(AccountRecord {
            index,
            mode,
            tokens,
        })
    }

    fn equity_insufficient(&self, rng: &mut impl Rng) -> Result<Vec<TokenPosition>> {
        self.config
            .tokens
            .iter()
            .map(|token| {
                let profile = self.table.profile(token)?;
                let equity = sample_units(1, self.equity_ceiling_units(profile)?, &mut *rng);
                Ok(TokenPosition {
                    equity,
                    debt: equity / OVERCOMMITTED_DEBT_DIVISOR,
                    collateral: CollateralSplit::from_equity_ceil(equity, OVERCOMMITTED_SPLIT),
                })
            })
            .collect()
    }

    fn debt_exceeds_collateral(&self, index: u64, rng: &mut impl Rng) -> Result<Vec<TokenPosition>> {
        let mut positions = Vec::with_capacity(self.config.tokens.len());
        for token in &self.config.tokens {
            let entry = self.table.entry(token)?;
            let profile = &entry.profile;

            let Some(top_boundary) = entry.schedule(CollateralClass::Vl).top_boundary() else {
                warn!(
                    index,
                    token = token.as_str(),
                    class = CollateralClass::Vl.name(),
                    "no tiers for class; token cannot exceed its collateral"
                );
                let equity = sample_units(0, self.equity_ceiling_units(profile)?, rng);
                positions.push(TokenPosition {
                    equity,
                    debt: profile.unit_scale(),
                    collateral: CollateralSplit::from_equity(equity, SOLVENT_SPLIT),
                });
                continue;
            };

            let max_equity = u64::try_from(top_boundary / profile.price)
                .map_err(|_| FixtureError::Overflow("bounding equity by the top vl tier"))?;
            let equity = sample_units(0, max_equity, rng);
            let collateral = CollateralSplit::from_equity(equity, SOLVENT_SPLIT);
            let debt = debt_token_quantity(&self.valuer, token, &collateral, self.config.debt_overshoot)?;

            positions.push(TokenPosition {
                equity,
                debt: self.config.debt_inflation.apply_ceil(debt)?,
                collateral,
            });
        }
        Ok(positions)
    }

    fn valid(&self, rng: &mut impl Rng) -> Result<Vec<TokenPosition>> {
        let mut positions = Vec::with_capacity(self.config.tokens.len());
        let mut capacity = 0u128;
        for token in &self.config.tokens {
            let profile = self.table.profile(token)?;
            let equity = sample_units(0, self.equity_ceiling_units(profile)?, rng);
            let collateral = CollateralSplit::from_equity(equity, SOLVENT_SPLIT);
            capacity += self.valuer.debt_value(token, &collateral)?;
            positions.push(TokenPosition {
                equity,
                debt: 0,
                collateral,
            });
        }

        let average = capacity / self.config.tokens.len().max(1) as u128;
        for (token, position) in self.config.tokens.iter().zip(positions.iter_mut()) {
            let debt = debt_token_quantity_from_fixed_value(self.table, token, average)?;
            position.debt = self.config.valid_debt_shrink.apply_floor(debt)?;
        }
        Ok(positions)
    }

    fn equity_ceiling_units(&self, profile: &TokenProfile) -> Result<u64> {
        self.config
            .equity_ceiling
            .checked_mul(profile.unit_scale())
            .ok_or(FixtureError::Overflow("scaling the equity ceiling"))
    }
}

fn sample_units(min_units: u64, max_units: u64, rng: &mut impl Rng) -> u64 {
    Uniform::new_inclusive(min_units, max_units.max(min_units)).sample(rng)
}

/// Generates every account of `spec` in local index order.
pub fn generate_shard(
    spec: &ShardSpec,
    table: &PriceTable,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> Result<Vec<AccountRecord>> {
    let generator = AccountGenerator::new(table, config)?;
    let records = (0..spec.total)
        .map(|local| {
            let mode = AccountMode::for_index(local, spec.invalid);
            generator.generate(spec.global_index(local), mode, &mut *rng)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        shard = spec.id,
        accounts = records.len(),
        invalid = spec.invalid,
        "generated shard"
    );
    Ok(records)
}
