//! Fixture auditor.
//!
//! Re-reads a shard file and classifies each account with the solvency rules
//! the platform applies when it ingests user data:
//! 1. per token, posted collateral must not exceed equity;
//! 2. across tokens, debt at face value must not exceed the tier-weighted
//!    collateral value.
//! Tokens with zero equity and zero debt are skipped.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::amount::parse_units;
use crate::config::GeneratorConfig;
use crate::error::{FixtureError, Result};
use crate::generator::{AccountMode, AccountRecord, TokenPosition, TokenRow};
use crate::output::TOTAL_NET_BALANCE_COLUMN;
use crate::price_table::PriceTable;
use crate::tiers::CollateralClass;
use crate::valuation::{CollateralSplit, Valuer};

const LEADING_COLUMNS: usize = 2; // rn, id
const COLUMNS_PER_TOKEN: usize = 6;
const ACCOUNT_ID_HEX_DIGITS: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    EquityInsufficient { token: String },
    DebtExceedsCollateral { debt: u128, collateral: u128 },
}

impl Verdict {
    pub fn mode(&self) -> AccountMode {
        match self {
            Self::Valid => AccountMode::Valid,
            Self::EquityInsufficient { .. } => AccountMode::EquityInsufficient,
            Self::DebtExceedsCollateral { .. } => AccountMode::DebtExceedsCollateral,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowVerdict {
    pub rn: u64,
    pub id: String,
    pub verdict: Verdict,
}

#[derive(Clone, Debug, Default)]
pub struct AuditReport {
    pub tokens: Vec<String>,
    pub rows: Vec<RowVerdict>,
}

impl AuditReport {
    pub fn count(&self, mode: AccountMode) -> usize {
        self.rows.iter().filter(|r| r.verdict.mode() == mode).count()
    }

    pub fn invalid(&self) -> usize {
        self.rows.len() - self.count(AccountMode::Valid)
    }

    pub fn print(&self) {
        println!("  Tokens:                  {}", self.tokens.join(", "));
        println!("  Accounts:                {}", self.rows.len());
        for mode in AccountMode::all() {
            println!("  {:<25}{}", format!("{}:", mode.name()), self.count(mode));
        }
        println!("  Invalid total:           {}", self.invalid());
    }
}

pub struct Auditor<'a> {
    table: &'a PriceTable,
    valuer: Valuer<'a>,
}

impl<'a> Auditor<'a> {
    pub fn new(table: &'a PriceTable, config: &GeneratorConfig) -> Self {
        Self {
            table,
            valuer: Valuer::new(table, config),
        }
    }

    pub fn audit_file(&self, path: &Path) -> Result<AuditReport> {
        let file = File::open(path)?;
        let report = self.audit_reader(BufReader::new(file))?;
        debug!(path = %path.display(), rows = report.rows.len(), "audited fixture file");
        Ok(report)
    }

    pub fn audit_reader<R: Read>(&self, reader: R) -> Result<AuditReport> {
        let mut reader = csv::Reader::from_reader(reader);
        let header = reader.headers()?.clone();
        let tokens = self.header_tokens(&header)?;

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 2;

            let rn = record[0]
                .trim()
                .parse::<u64>()
                .map_err(|_| FixtureError::InvalidAmount {
                    row,
                    token: "rn".to_string(),
                    text: record[0].to_string(),
                })?;
            let id = record[1].trim().to_string();
            if id.len() != ACCOUNT_ID_HEX_DIGITS || !id.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(FixtureError::InvalidAccountId { row, id });
            }

            let positions = tokens
                .iter()
                .enumerate()
                .map(|(j, token)| self.parse_position(&record, row, j, token))
                .collect::<Result<Vec<_>>>()?;

            rows.push(RowVerdict {
                rn,
                id,
                verdict: self.classify(&positions)?,
            });
        }

        Ok(AuditReport { tokens, rows })
    }

    /// Classifies an in-memory account with the same rules as a file row.
    pub fn audit_record(&self, record: &AccountRecord) -> Result<Verdict> {
        self.classify(&record.tokens)
    }

    pub fn classify(&self, tokens: &[TokenRow]) -> Result<Verdict> {
        let mut debt = 0u128;
        let mut collateral = 0u128;
        for token in tokens {
            let p = &token.position;
            if p.equity == 0 && p.debt == 0 {
                continue;
            }
            if p.collateral.total() > p.equity as u128 {
                return Ok(Verdict::EquityInsufficient {
                    token: token.symbol.clone(),
                });
            }
            debt += self.table.profile(&token.symbol)?.value_of(p.debt);
            collateral += self.valuer.debt_value(&token.symbol, &p.collateral)?;
        }

        if debt > collateral {
            Ok(Verdict::DebtExceedsCollateral { debt, collateral })
        } else {
            Ok(Verdict::Valid)
        }
    }

    fn header_tokens(&self, header: &csv::StringRecord) -> Result<Vec<String>> {
        let columns = header.len();
        if columns < LEADING_COLUMNS + 1 || (columns - LEADING_COLUMNS - 1) % COLUMNS_PER_TOKEN != 0 {
            return Err(FixtureError::MalformedHeader(format!(
                "{columns} columns do not form rn, id, token groups and a total"
            )));
        }
        if &header[columns - 1] != TOTAL_NET_BALANCE_COLUMN {
            return Err(FixtureError::MalformedHeader(format!(
                "last column is {:?}, expected {TOTAL_NET_BALANCE_COLUMN}",
                &header[columns - 1]
            )));
        }

        let groups = (columns - LEADING_COLUMNS - 1) / COLUMNS_PER_TOKEN;
        (0..groups)
            .map(|j| {
                let symbol = header[LEADING_COLUMNS + j * COLUMNS_PER_TOKEN + 2]
                    .trim()
                    .to_lowercase();
                self.table.entry(&symbol)?;
                Ok(symbol)
            })
            .collect()
    }

    fn parse_position(
        &self,
        record: &csv::StringRecord,
        row: usize,
        group: usize,
        token: &str,
    ) -> Result<TokenRow> {
        let precision = self.table.profile(token)?.precision();
        let base = LEADING_COLUMNS + group * COLUMNS_PER_TOKEN;
        let amount = |offset: usize| {
            let text = &record[base + offset];
            parse_units(text, precision).ok_or_else(|| FixtureError::InvalidAmount {
                row,
                token: token.to_string(),
                text: text.to_string(),
            })
        };

        // offset 2 is the net balance, which the platform ignores
        let collateral = CollateralSplit {
            vl: amount(3 + CollateralClass::Vl.index())?,
            margin: amount(3 + CollateralClass::Margin.index())?,
            pm: amount(3 + CollateralClass::Pm.index())?,
        };
        Ok(TokenRow {
            symbol: token.to_string(),
            precision,
            position: TokenPosition {
                equity: amount(0)?,
                debt: amount(1)?,
                collateral,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate_shard, ShardSpec};
    use crate::output::write_records;
    use crate::price_table::tests::{fully_tiered_table, sample_table};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn position(equity: u64, debt: u64, vl: u64, margin: u64, pm: u64) -> TokenPosition {
        TokenPosition {
            equity,
            debt,
            collateral: CollateralSplit { vl, margin, pm },
        }
    }

    fn token_row(symbol: &str, precision: u32, position: TokenPosition) -> TokenRow {
        TokenRow {
            symbol: symbol.to_string(),
            precision,
            position,
        }
    }

    #[test]
    fn test_classify_rules() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);
        let auditor = Auditor::new(&table, &config);
        let one_btc = 100_000_000;

        let solvent = [token_row("btc", 8, position(one_btc, one_btc / 4, one_btc / 2, 0, 0))];
        assert_eq!(auditor.classify(&solvent).unwrap(), Verdict::Valid);

        let overcommitted = [token_row("btc", 8, position(one_btc, 0, one_btc, 1, 0))];
        assert_eq!(
            auditor.classify(&overcommitted).unwrap(),
            Verdict::EquityInsufficient { token: "btc".to_string() }
        );

        let overdrawn = [token_row("btc", 8, position(one_btc, one_btc, one_btc / 2, 0, 0))];
        assert!(matches!(
            auditor.classify(&overdrawn).unwrap(),
            Verdict::DebtExceedsCollateral { debt, collateral } if debt > collateral
        ));

        // empty positions are skipped even if their split is inconsistent
        let empty = [token_row("eth", 8, position(0, 0, 5, 5, 5))];
        assert_eq!(auditor.classify(&empty).unwrap(), Verdict::Valid);
    }

    #[test]
    fn test_audit_generated_shard_matches_modes() {
        let config = GeneratorConfig::default();
        let table = fully_tiered_table(&config);
        let spec = ShardSpec::new(2, 40, 16).unwrap();
        let records = generate_shard(&spec, &table, &config, &mut ChaCha8Rng::seed_from_u64(21)).unwrap();

        let mut bytes = Vec::new();
        write_records(&mut bytes, &config.tokens, &records).unwrap();

        let auditor = Auditor::new(&table, &config);
        let report = auditor.audit_reader(bytes.as_slice()).unwrap();

        assert_eq!(report.tokens, config.tokens);
        assert_eq!(report.rows.len(), 40);
        assert_eq!(report.count(AccountMode::Valid), 24);
        assert_eq!(report.count(AccountMode::EquityInsufficient), 8);
        assert_eq!(report.count(AccountMode::DebtExceedsCollateral), 8);
        assert_eq!(report.invalid(), 16);

        for (record, row) in records.iter().zip(&report.rows) {
            assert_eq!(row.rn, record.index);
            assert_eq!(row.id, record.id_hex());
            assert_eq!(row.verdict.mode(), record.mode);
            assert_eq!(auditor.audit_record(record).unwrap(), row.verdict);
        }
    }

    #[test]
    fn test_audit_rejects_bad_header() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);
        let auditor = Auditor::new(&table, &config);

        let text = "rn,id,e_btc,d_btc,btc\n";
        assert!(matches!(
            auditor.audit_reader(text.as_bytes()),
            Err(FixtureError::MalformedHeader(_))
        ));

        let text = "rn,id,e_doge,d_doge,doge,vl_doge,m_doge,pm_doge,total_net_balance_usdt\n";
        assert!(matches!(
            auditor.audit_reader(text.as_bytes()),
            Err(FixtureError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_audit_rejects_bad_rows() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);
        let auditor = Auditor::new(&table, &config);
        let header = "rn,id,e_btc,d_btc,btc,vl_btc,m_btc,pm_btc,total_net_balance_usdt\n";

        let text = format!("{header}0,abc,1.0,0.0,1.0,0.5,0.25,0.125,0.0\n");
        assert!(matches!(
            auditor.audit_reader(text.as_bytes()),
            Err(FixtureError::InvalidAccountId { row: 2, .. })
        ));

        let id = "0".repeat(64);
        let text = format!("{header}0,{id},1.0,x,1.0,0.5,0.25,0.125,0.0\n");
        assert!(matches!(
            auditor.audit_reader(text.as_bytes()),
            Err(FixtureError::InvalidAmount { row: 2, .. })
        ));

        let text = format!("{header}0,{id},1.0,0.0,1.0,0.5,0.25,0.125,0.0\n");
        let report = auditor.audit_reader(text.as_bytes()).unwrap();
        assert_eq!(report.rows[0].verdict, Verdict::Valid);
    }
}
