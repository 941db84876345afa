use serde::{Deserialize, Serialize};
use time::Date;

use crate::{SecurityId, ValidationError};

/// Daily OHLCV bar with adjusted close for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub sid: SecurityId,
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl PriceBar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sid: SecurityId,
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        adj_close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        let bar = Self {
            sid,
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Re-check the value invariants; fields are public so loaders may build bars directly.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_negative("open", self.open)?;
        validate_non_negative("high", self.high)?;
        validate_non_negative("low", self.low)?;
        validate_non_negative("close", self.close)?;
        validate_non_negative("adj_close", self.adj_close)?;

        if self.high < self.low {
            return Err(ValidationError::InvalidBarRange);
        }
        Ok(())
    }
}

/// Fundamental ratios carried by a disclosure. Every field is nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRatios {
    // profitability
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub npm: Option<f64>,
    // leverage
    pub der: Option<f64>,
    pub dar: Option<f64>,
    // valuation
    pub per: Option<f64>,
    pub pbv: Option<f64>,
    pub eps: Option<f64>,
    // growth
    pub sales_growth: Option<f64>,
    pub profit_growth: Option<f64>,
}

impl FundamentalRatios {
    /// Column names in storage order.
    pub const FIELDS: [&'static str; 10] = [
        "roe",
        "roa",
        "npm",
        "der",
        "dar",
        "per",
        "pbv",
        "eps",
        "sales_growth",
        "profit_growth",
    ];

    /// Values in the same order as [`Self::FIELDS`].
    pub fn values(&self) -> [Option<f64>; 10] {
        [
            self.roe,
            self.roa,
            self.npm,
            self.der,
            self.dar,
            self.per,
            self.pbv,
            self.eps,
            self.sales_growth,
            self.profit_growth,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in Self::FIELDS.into_iter().zip(self.values()) {
            validate_optional_finite(field, value)?;
        }
        Ok(())
    }
}

/// One fundamental disclosure: the period it covers and the date it became public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    pub sid: SecurityId,
    pub period_end: Date,
    pub announce_date: Date,
    #[serde(flatten)]
    pub ratios: FundamentalRatios,
}

impl FundamentalRecord {
    pub fn new(
        sid: SecurityId,
        period_end: Date,
        announce_date: Date,
        ratios: FundamentalRatios,
    ) -> Result<Self, ValidationError> {
        ratios.validate()?;
        Ok(Self {
            sid,
            period_end,
            announce_date,
            ratios,
        })
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}
