use thiserror::Error;
use time::Date;

use crate::SecurityId;

/// Field-level validation errors raised by domain constructors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("security id cannot be empty")]
    EmptySecurityId,
    #[error("security id length {len} exceeds max {max}")]
    SecurityIdTooLong { len: usize, max: usize },
    #[error("security id contains invalid character '{ch}' at index {index}")]
    SecurityIdInvalidChar { ch: char, index: usize },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
}

/// Rejected configuration, reported before any security is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{option}' must be a positive window length, got {value}")]
    NonPositiveWindow { option: &'static str, value: i64 },

    #[error("'funda_lag_days' must be >= 0, got {value}")]
    NegativeLag { value: i64 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Reasons a security's input series is rejected as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedInput {
    #[error("price dates must be strictly increasing: {previous} followed by {current} at index {index}")]
    PriceDateOrder {
        index: usize,
        previous: Date,
        current: Date,
    },

    #[error("trading dates must be strictly increasing: {previous} followed by {current} at index {index}")]
    TradingDateOrder {
        index: usize,
        previous: Date,
        current: Date,
    },

    #[error("fundamental record for period {period_end} has invalid ratio: {source}")]
    InvalidFundamental {
        period_end: Date,
        #[source]
        source: ValidationError,
    },

    #[error("{kind} on {date} belongs to '{found}'")]
    ForeignRecord {
        kind: &'static str,
        date: Date,
        found: SecurityId,
    },

    #[error("duplicate fundamental record for period ending {period_end}")]
    DuplicateFundamentalPeriod { period_end: Date },

    #[error("announce date {announce_date} precedes period end {period_end}")]
    AnnounceBeforePeriodEnd {
        period_end: Date,
        announce_date: Date,
    },
}

/// Failure of one security's feature run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("malformed input for {sid}: {reason}")]
    MalformedInput {
        sid: SecurityId,
        #[source]
        reason: MalformedInput,
    },
}

impl FeatureError {
    pub fn malformed(sid: &SecurityId, reason: MalformedInput) -> Self {
        Self::MalformedInput {
            sid: sid.clone(),
            reason,
        }
    }
}
