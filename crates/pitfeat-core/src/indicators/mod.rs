//! # Technical Indicator Engine
//!
//! Computes one [`TechnicalFeatures`] row per price bar. Returns use adjusted close;
//! RSI, ATR, MACD and the stochastic oscillator use the raw high/low/close.
//!
//! All windows count observations, not calendar days: a gap in the trading
//! calendar is not filled, the window just reaches further back.
//!
//! | Submodule | Indicators |
//! |-----------|------------|
//! | [`returns`] | `logret_1d`, `logret_5d`, `logret_20d`, `rv20d` |
//! | [`momentum`] | `rsi14`, `stoch_k`, `stoch_d` |
//! | [`trend`] | `macd`, `macd_signal`, `macd_hist` |
//! | [`volatility`] | `atr14`, `vol_z60` |

pub mod momentum;
pub mod returns;
pub mod rolling;
pub mod trend;
pub mod volatility;

use crate::{day_of_week, is_end_of_month, FeatureConfig, PriceBar, TechnicalFeatures};

/// Realized-volatility window, fixed by the `rv20d` column name.
pub const REALIZED_VOL_WINDOW: usize = 20;

/// Compute every technical indicator for an ordered price series.
///
/// The series is expected to be validated (strictly increasing dates). An empty
/// series yields no rows.
pub fn compute_technical(bars: &[PriceBar], config: &FeatureConfig) -> Vec<TechnicalFeatures> {
    if bars.is_empty() {
        return Vec::new();
    }

    let adj_close: Vec<f64> = bars.iter().map(|bar| bar.adj_close).collect();
    let close: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let high: Vec<f64> = bars.iter().map(|bar| bar.high).collect();
    let low: Vec<f64> = bars.iter().map(|bar| bar.low).collect();
    let volume: Vec<f64> = bars.iter().map(|bar| bar.volume as f64).collect();

    let logret_1d = returns::log_return_1d(&adj_close);
    let logret_5d = returns::log_return(&adj_close, 5);
    let logret_20d = returns::log_return(&adj_close, 20);
    let rv20d = returns::realized_volatility(&adj_close, REALIZED_VOL_WINDOW);
    let rsi = momentum::rsi(&close, config.rsi_period());
    let atr = volatility::average_true_range(&high, &low, &close, config.atr_period());
    let macd = trend::macd(
        &close,
        config.macd_fast(),
        config.macd_slow(),
        config.macd_signal(),
    );
    let (stoch_k, stoch_d) =
        momentum::stochastic(&high, &low, &close, config.stoch_k(), config.stoch_d());
    let vol_z = volatility::volume_zscore(&volume, config.vol_z_window());

    bars.iter()
        .enumerate()
        .map(|(i, bar)| TechnicalFeatures {
            date: bar.date,
            logret_1d: logret_1d[i],
            logret_5d: logret_5d[i],
            logret_20d: logret_20d[i],
            rv20d: rv20d[i],
            rsi14: rsi[i],
            atr14: atr[i],
            macd: macd.line[i],
            macd_signal: macd.signal[i],
            macd_hist: macd.hist[i],
            stoch_k: stoch_k[i],
            stoch_d: stoch_d[i],
            vol_z60: vol_z[i],
            dow: day_of_week(bar.date),
            eom: is_end_of_month(bar.date),
        })
        .collect()
}
