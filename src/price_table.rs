//! Asset price and tier table.
//!
//! Loaded once per process from a CSV with a header row and the columns
//! `token, price, vl_tiers, margin_tiers, pm_tiers`. Prices are scaled by the
//! token class multiplier and tier boundaries by the token value multiplier.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::amount::parse_scaled;
use crate::config::{GeneratorConfig, TokenClass};
use crate::error::{FixtureError, Result};
use crate::tiers::{CollateralClass, TierSchedule};

const REQUIRED_FIELDS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenProfile {
    pub symbol: String,
    pub price: u128,
    pub class: TokenClass,
}

impl TokenProfile {
    pub fn precision(&self) -> u32 {
        self.class.precision
    }

    pub fn unit_scale(&self) -> u64 {
        self.class.unit_scale()
    }

    /// Value of `units` of this token, in token value units.
    pub fn value_of(&self, units: u64) -> u128 {
        units as u128 * self.price
    }
}

#[derive(Clone, Debug)]
pub struct TokenEntry {
    pub profile: TokenProfile,
    schedules: [TierSchedule; 3],
}

impl TokenEntry {
    pub fn new(profile: TokenProfile, vl: TierSchedule, margin: TierSchedule, pm: TierSchedule) -> Self {
        Self {
            profile,
            schedules: [vl, margin, pm],
        }
    }

    pub fn schedule(&self, class: CollateralClass) -> &TierSchedule {
        &self.schedules[class.index()]
    }
}

#[derive(Clone, Debug, Default)]
pub struct PriceTable {
    entries: BTreeMap<String, TokenEntry>,
}

impl PriceTable {
    pub fn load(path: &Path, config: &GeneratorConfig) -> Result<Self> {
        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file), config)?;
        debug!(path = %path.display(), tokens = table.len(), "loaded asset table");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, config: &GeneratorConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut table = Self::default();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 2; // 1-based, after the header
            if record.len() < REQUIRED_FIELDS {
                return Err(FixtureError::ShortRow {
                    row,
                    expected: REQUIRED_FIELDS,
                    actual: record.len(),
                });
            }

            let symbol = record[0].trim().to_lowercase();
            let class = config.class_of(&symbol);
            let price = parse_scaled(&record[1], class.price_multiplier).ok_or_else(|| {
                FixtureError::InvalidAmount {
                    row,
                    token: symbol.clone(),
                    text: record[1].to_string(),
                }
            })?;
            if price == 0 {
                return Err(FixtureError::ZeroPrice(symbol));
            }
            // keeps units * price inside u128
            if price > u64::MAX as u128 {
                return Err(FixtureError::Overflow("scaling token price"));
            }

            let multiplier = config.token_value_multiplier;
            let entry = TokenEntry::new(
                TokenProfile {
                    symbol: symbol.clone(),
                    price,
                    class,
                },
                TierSchedule::parse(&record[2], multiplier, row)?,
                TierSchedule::parse(&record[3], multiplier, row)?,
                TierSchedule::parse(&record[4], multiplier, row)?,
            );
            table.insert(entry)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, entry: TokenEntry) -> Result<()> {
        let symbol = entry.profile.symbol.clone();
        if self.entries.contains_key(&symbol) {
            return Err(FixtureError::DuplicateToken(symbol));
        }
        self.entries.insert(symbol, entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, token: &str) -> Result<&TokenEntry> {
        self.entries
            .get(token)
            .ok_or_else(|| FixtureError::UnknownToken(token.to_string()))
    }

    pub fn profile(&self, token: &str) -> Result<&TokenProfile> {
        self.entry(token).map(|e| &e.profile)
    }

    pub fn schedule(&self, token: &str, class: CollateralClass) -> Result<&TierSchedule> {
        self.entry(token).map(|e| e.schedule(class))
    }

    /// Fails on the first token the table does not know.
    pub fn ensure_tokens(&self, tokens: &[String]) -> Result<()> {
        tokens.iter().try_for_each(|t| self.entry(t).map(|_| ()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TOKEN_VALUE_MULTIPLIER;

    pub(crate) const SAMPLE_TABLE: &str = "\
symbol,price,vl_tiers,margin_tiers,pm_tiers
BTC,27000,\"[0-500000:100, 500000-1000000:95, 1000000-5000000:80]\",\"[0-1000000:90, 1000000-10000000:70]\",\"[0-2000000:95]\"
ETH,1600.5,\"[0-300000:100, 300000-2000000:90]\",\"[0-500000:85]\",\"[0-1000000:90, 1000000-3000000:60]\"
BNB,210.25,,\"[0-200000:80]\",\"[0-200000:80]\"
SHIB,0.00000845,\"[0-10000:50, 10000-50000:30]\",\"[0-20000:40]\",[]
";

    /// Every token carries vl tiers, so type-B rows violate at account level.
    pub(crate) const FULLY_TIERED_TABLE: &str = "\
symbol,price,vl_tiers,margin_tiers,pm_tiers
btc,27000,\"[0-500000:100, 500000-1000000:95, 1000000-5000000:80]\",\"[0-1000000:90]\",\"[0-2000000:95]\"
eth,1600.5,\"[0-300000:100, 300000-2000000:90]\",\"[0-500000:85]\",\"[0-1000000:90]\"
bnb,210.25,\"[0-100000:70, 100000-400000:50]\",\"[0-200000:80]\",\"[0-200000:80]\"
shib,0.00000845,\"[0-10000:50, 10000-50000:30]\",\"[0-20000:40]\",\"[0-20000:40]\"
";

    pub(crate) fn sample_table(config: &GeneratorConfig) -> PriceTable {
        PriceTable::from_reader(SAMPLE_TABLE.as_bytes(), config).unwrap()
    }

    pub(crate) fn fully_tiered_table(config: &GeneratorConfig) -> PriceTable {
        PriceTable::from_reader(FULLY_TIERED_TABLE.as_bytes(), config).unwrap()
    }

    #[test]
    fn test_load_sample_table() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);

        assert_eq!(table.len(), 4);
        table.ensure_tokens(&config.tokens).unwrap();

        let btc = table.profile("btc").unwrap();
        assert_eq!(btc.price, 2_700_000_000_000);
        assert_eq!(btc.precision(), 8);

        let shib = table.profile("shib").unwrap();
        assert_eq!(shib.price, 845_000_000);
        assert_eq!(shib.precision(), 2);

        let vl = table.schedule("btc", CollateralClass::Vl).unwrap();
        assert_eq!(vl.tiers().len(), 3);
        assert_eq!(vl.top_boundary(), Some(5_000_000 * TOKEN_VALUE_MULTIPLIER));

        assert!(table.schedule("bnb", CollateralClass::Vl).unwrap().is_empty());
        assert!(table.schedule("shib", CollateralClass::Pm).unwrap().is_empty());
    }

    #[test]
    fn test_short_row_fails() {
        let config = GeneratorConfig::default();
        let text = "symbol,price,vl,m,pm\nbtc,27000,[0-1:100],[0-1:100]\n";
        let err = PriceTable::from_reader(text.as_bytes(), &config).unwrap_err();
        assert!(matches!(
            err,
            FixtureError::ShortRow { row: 2, expected: 5, actual: 4 }
        ));
    }

    #[test]
    fn test_zero_price_fails() {
        let config = GeneratorConfig::default();
        let text = "symbol,price,vl,m,pm\nbtc,0,,,\n";
        let err = PriceTable::from_reader(text.as_bytes(), &config).unwrap_err();
        assert!(matches!(err, FixtureError::ZeroPrice(ref t) if t == "btc"));
    }

    #[test]
    fn test_bad_price_fails() {
        let config = GeneratorConfig::default();
        let text = "symbol,price,vl,m,pm\nbtc,lots,,,\n";
        let err = PriceTable::from_reader(text.as_bytes(), &config).unwrap_err();
        assert!(matches!(err, FixtureError::InvalidAmount { row: 2, .. }));
    }

    #[test]
    fn test_duplicate_token_fails() {
        let config = GeneratorConfig::default();
        let text = "symbol,price,vl,m,pm\nbtc,1,,,\nBTC,2,,,\n";
        let err = PriceTable::from_reader(text.as_bytes(), &config).unwrap_err();
        assert!(matches!(err, FixtureError::DuplicateToken(ref t) if t == "btc"));
    }

    #[test]
    fn test_malformed_tier_reports_row() {
        let config = GeneratorConfig::default();
        let text = "symbol,price,vl,m,pm\nbtc,1,,,\neth,2,[0-100],,\n";
        let err = PriceTable::from_reader(text.as_bytes(), &config).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedTier { row: 3, .. }));
    }

    #[test]
    fn test_unknown_token() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);
        assert!(matches!(
            table.profile("doge"),
            Err(FixtureError::UnknownToken(_))
        ));
        let tokens = vec!["btc".to_string(), "doge".to_string()];
        assert!(table.ensure_tokens(&tokens).is_err());
    }
}
