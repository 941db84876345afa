use serde::{Deserialize, Serialize};
use time::Date;

use crate::{FundamentalRatios, SecurityId};

/// Price-derived indicators for one trading date. `None` marks warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalFeatures {
    pub date: Date,
    pub logret_1d: Option<f64>,
    pub logret_5d: Option<f64>,
    pub logret_20d: Option<f64>,
    pub rv20d: Option<f64>,
    pub rsi14: Option<f64>,
    pub atr14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub vol_z60: Option<f64>,
    pub dow: u8,
    pub eom: bool,
}

/// One output row of the feature table, keyed by `(sid, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub sid: SecurityId,
    #[serde(flatten)]
    pub technical: TechnicalFeatures,
    #[serde(flatten)]
    pub fundamentals: FundamentalRatios,
}

impl FeatureRow {
    pub fn date(&self) -> Date {
        self.technical.date
    }

    pub fn key(&self) -> (&SecurityId, Date) {
        (&self.sid, self.technical.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn serializes_as_flat_row() {
        let row = FeatureRow {
            sid: SecurityId::parse("bbri.jk").expect("sid"),
            technical: TechnicalFeatures {
                date: date!(2024 - 05 - 31),
                logret_1d: Some(0.01),
                logret_5d: None,
                logret_20d: None,
                rv20d: None,
                rsi14: Some(55.5),
                atr14: None,
                macd: None,
                macd_signal: None,
                macd_hist: None,
                stoch_k: None,
                stoch_d: None,
                vol_z60: None,
                dow: 4,
                eom: true,
            },
            fundamentals: FundamentalRatios {
                roe: Some(0.2),
                ..FundamentalRatios::default()
            },
        };

        let value = serde_json::to_value(&row).expect("serializes");
        assert_eq!(value["sid"], "BBRI.JK");
        assert_eq!(value["date"], "2024-05-31");
        assert_eq!(value["rsi14"], 55.5);
        assert_eq!(value["roe"], 0.2);
        assert!(value["eps"].is_null());
        assert_eq!(value["eom"], true);
    }
}
