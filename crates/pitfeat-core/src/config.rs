//! Feature-window and reporting-lag configuration.
//!
//! [`FeatureParams`] mirrors the `features:` section of `params.yaml` and may hold
//! any integers. [`FeatureParams::validate`] turns it into a [`FeatureConfig`], the
//! only form the pipeline accepts, so a bad window is rejected before any security
//! is touched.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Raw parameters as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    pub rsi_period: i64,
    pub atr_period: i64,
    pub macd_fast: i64,
    pub macd_slow: i64,
    pub macd_signal: i64,
    pub stoch_k: i64,
    pub stoch_d: i64,
    pub vol_z_window: i64,
    pub funda_lag_days: i64,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_k: 14,
            stoch_d: 3,
            vol_z_window: 60,
            funda_lag_days: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ParamsFile {
    #[serde(default)]
    features: FeatureParams,
}

impl FeatureParams {
    /// Parse the `features:` section of a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ParamsFile = serde_yaml::from_str(input)?;
        Ok(file.features)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<FeatureConfig, ConfigError> {
        if self.funda_lag_days < 0 {
            return Err(ConfigError::NegativeLag {
                value: self.funda_lag_days,
            });
        }
        let funda_lag_days =
            u32::try_from(self.funda_lag_days).map_err(|_| ConfigError::NegativeLag {
                value: self.funda_lag_days,
            })?;

        Ok(FeatureConfig {
            rsi_period: window("rsi_period", self.rsi_period)?,
            atr_period: window("atr_period", self.atr_period)?,
            macd_fast: window("macd_fast", self.macd_fast)?,
            macd_slow: window("macd_slow", self.macd_slow)?,
            macd_signal: window("macd_signal", self.macd_signal)?,
            stoch_k: window("stoch_k", self.stoch_k)?,
            stoch_d: window("stoch_d", self.stoch_d)?,
            vol_z_window: window("vol_z_window", self.vol_z_window)?,
            funda_lag_days,
        })
    }
}

fn window(option: &'static str, value: i64) -> Result<usize, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositiveWindow { option, value });
    }
    usize::try_from(value).map_err(|_| ConfigError::NonPositiveWindow { option, value })
}

/// Validated, immutable configuration passed into every pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureConfig {
    rsi_period: usize,
    atr_period: usize,
    macd_fast: usize,
    macd_slow: usize,
    macd_signal: usize,
    stoch_k: usize,
    stoch_d: usize,
    vol_z_window: usize,
    funda_lag_days: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_k: 14,
            stoch_d: 3,
            vol_z_window: 60,
            funda_lag_days: 0,
        }
    }
}

impl FeatureConfig {
    pub fn rsi_period(&self) -> usize {
        self.rsi_period
    }

    pub fn atr_period(&self) -> usize {
        self.atr_period
    }

    pub fn macd_fast(&self) -> usize {
        self.macd_fast
    }

    pub fn macd_slow(&self) -> usize {
        self.macd_slow
    }

    pub fn macd_signal(&self) -> usize {
        self.macd_signal
    }

    pub fn stoch_k(&self) -> usize {
        self.stoch_k
    }

    pub fn stoch_d(&self) -> usize {
        self.stoch_d
    }

    pub fn vol_z_window(&self) -> usize {
        self.vol_z_window
    }

    pub fn funda_lag_days(&self) -> u32 {
        self.funda_lag_days
    }

    /// Same windows, different reporting lag.
    pub fn with_funda_lag_days(self, funda_lag_days: u32) -> Self {
        Self {
            funda_lag_days,
            ..self
        }
    }
}
