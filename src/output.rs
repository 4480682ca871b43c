//! Fixture file writer.
//!
//! Layout: `rn, id`, six columns per token, then a portfolio net balance
//! placeholder that is always `0.0`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::amount::format_units;
use crate::error::Result;
use crate::generator::AccountRecord;
use crate::tiers::CollateralClass;

pub const TOTAL_NET_BALANCE_COLUMN: &str = "total_net_balance_usdt";
pub const TOTAL_NET_BALANCE_PLACEHOLDER: &str = "0.0";

pub fn shard_file_name(shard_id: u64) -> String {
    format!("sample_users{shard_id}.csv")
}

pub fn header(tokens: &[String]) -> Vec<String> {
    let mut columns = vec!["rn".to_string(), "id".to_string()];
    for token in tokens {
        columns.push(format!("e_{token}"));
        columns.push(format!("d_{token}"));
        columns.push(token.clone());
        for class in CollateralClass::all() {
            columns.push(format!("{}_{token}", class.column_prefix()));
        }
    }
    columns.push(TOTAL_NET_BALANCE_COLUMN.to_string());
    columns
}

pub fn row(record: &AccountRecord) -> Vec<String> {
    let mut fields = vec![record.index.to_string(), record.id_hex()];
    for token in &record.tokens {
        let p = &token.position;
        let fmt = |units: u64| format_units(units as i128, token.precision);
        fields.push(fmt(p.equity));
        fields.push(fmt(p.debt));
        fields.push(format_units(p.net_balance(), token.precision));
        for class in CollateralClass::all() {
            fields.push(fmt(p.collateral.amount(class)));
        }
    }
    fields.push(TOTAL_NET_BALANCE_PLACEHOLDER.to_string());
    fields
}

pub fn write_records<W: Write>(writer: W, tokens: &[String], records: &[AccountRecord]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(header(tokens))?;
    for record in records {
        out.write_record(row(record))?;
    }
    out.flush()?;
    Ok(())
}

/// Writes a shard into `dir`, creating the directory if needed.
pub fn write_shard_file(
    dir: &Path,
    shard_id: u64,
    tokens: &[String],
    records: &[AccountRecord],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(shard_file_name(shard_id));
    let file = File::create(&path)?;
    write_records(BufWriter::new(file), tokens, records)?;
    info!(path = %path.display(), rows = records.len(), "finished shard file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::generator::{generate_shard, AccountMode, ShardSpec, TokenPosition, TokenRow};
    use crate::price_table::tests::sample_table;
    use crate::valuation::CollateralSplit;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_header_layout() {
        let config = GeneratorConfig::default();
        let columns = header(&config.tokens);
        assert_eq!(columns.len(), 2 + 6 * 4 + 1);
        assert_eq!(
            &columns[..8],
            &["rn", "id", "e_btc", "d_btc", "btc", "vl_btc", "m_btc", "pm_btc"]
        );
        assert_eq!(&columns[20..26], &["e_shib", "d_shib", "shib", "vl_shib", "m_shib", "pm_shib"]);
        assert_eq!(columns.last().unwrap(), TOTAL_NET_BALANCE_COLUMN);
    }

    #[test]
    fn test_row_formatting() {
        let record = AccountRecord {
            index: 1,
            mode: AccountMode::DebtExceedsCollateral,
            tokens: vec![TokenRow {
                symbol: "shib".to_string(),
                precision: 2,
                position: TokenPosition {
                    equity: 1000,
                    debt: 1250,
                    collateral: CollateralSplit { vl: 500, margin: 250, pm: 125 },
                },
            }],
        };
        assert_eq!(
            row(&record),
            vec![
                "1".to_string(),
                format!("{}1", "0".repeat(63)),
                "10.0".to_string(),
                "12.5".to_string(),
                "-2.5".to_string(),
                "5.0".to_string(),
                "2.5".to_string(),
                "1.25".to_string(),
                "0.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_net_balance_round_trips_exactly() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);
        let spec = ShardSpec::new(0, 20, 10).unwrap();
        let records = generate_shard(&spec, &table, &config, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();

        for record in &records {
            let fields = row(record);
            for group in fields[2..fields.len() - 1].chunks(6) {
                let equity = Decimal::from_str(&group[0]).unwrap();
                let debt = Decimal::from_str(&group[1]).unwrap();
                let net = Decimal::from_str(&group[2]).unwrap();
                assert_eq!(equity - debt, net, "{group:?}");
            }
        }
    }

    #[test]
    fn test_end_to_end_shard_file() {
        let config = GeneratorConfig::default();
        let table = sample_table(&config);
        let spec = ShardSpec::new(0, 4, 2).unwrap();
        let records = generate_shard(&spec, &table, &config, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_shard_file(dir.path(), spec.id, &config.tokens, &records).unwrap();
        assert_eq!(path.file_name().unwrap(), "sample_users0.csv");

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("rn,id,e_btc,d_btc,btc,"));

        for (i, line) in lines[1..].iter().enumerate() {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 27);
            assert_eq!(fields[0], i.to_string());
            assert_eq!(fields[1], format!("{:064x}", i));
            assert_eq!(fields[26], "0.0");
        }

        let modes: Vec<AccountMode> = records.iter().map(|r| r.mode).collect();
        assert_eq!(
            modes,
            vec![
                AccountMode::EquityInsufficient,
                AccountMode::DebtExceedsCollateral,
                AccountMode::Valid,
                AccountMode::Valid,
            ]
        );
    }
}
