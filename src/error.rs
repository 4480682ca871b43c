//! Error type shared by every fixture component.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: expected at least {expected} fields, got {actual}")]
    ShortRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row {row}: malformed tier bracket {segment:?}: {reason}")]
    MalformedTier {
        row: usize,
        segment: String,
        reason: &'static str,
    },

    #[error("row {row}: invalid amount {text:?} for {token}")]
    InvalidAmount {
        row: usize,
        token: String,
        text: String,
    },

    #[error("token {0} has a zero price")]
    ZeroPrice(String),

    #[error("token {0} appears more than once in the asset table")]
    DuplicateToken(String),

    #[error("token {0} is not in the asset table")]
    UnknownToken(String),

    #[error("row {row}: account id {id:?} is not 64 hex digits")]
    InvalidAccountId { row: usize, id: String },

    #[error("malformed fixture header: {0}")]
    MalformedHeader(String),

    #[error("invalid account count {invalid} exceeds total {total}")]
    InvalidCounts { total: u64, invalid: u64 },

    #[error("arithmetic overflow while {0}")]
    Overflow(&'static str),
}

/// Result type for fixture operations
pub type Result<T> = std::result::Result<T, FixtureError>;
