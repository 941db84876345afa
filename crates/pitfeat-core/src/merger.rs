//! # Feature Frame Merger
//!
//! Left join of indicator rows with aligner selections on trading date. The
//! indicator rows drive the output: each produces exactly one [`FeatureRow`], with
//! fundamental fields left null when no selection matches its date.

use crate::{AsOfSelection, FeatureRow, SecurityId, TechnicalFeatures};

/// Join `technical` (ascending by date) with `selections` (ascending by date).
pub fn merge_features(
    sid: &SecurityId,
    technical: Vec<TechnicalFeatures>,
    selections: &[AsOfSelection<'_>],
) -> Vec<FeatureRow> {
    let mut cursor = 0usize;
    technical
        .into_iter()
        .map(|technical| {
            while cursor < selections.len() && selections[cursor].date < technical.date {
                cursor += 1;
            }
            let fundamentals = selections
                .get(cursor)
                .filter(|selection| selection.date == technical.date)
                .and_then(|selection| selection.record)
                .map(|record| record.ratios)
                .unwrap_or_default();

            FeatureRow {
                sid: sid.clone(),
                technical,
                fundamentals,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FundamentalRatios, FundamentalRecord};
    use time::macros::date;
    use time::Date;

    fn technical(date: Date) -> TechnicalFeatures {
        TechnicalFeatures {
            date,
            logret_1d: Some(0.0),
            logret_5d: None,
            logret_20d: None,
            rv20d: None,
            rsi14: None,
            atr14: None,
            macd: None,
            macd_signal: None,
            macd_hist: None,
            stoch_k: None,
            stoch_d: None,
            vol_z60: None,
            dow: crate::day_of_week(date),
            eom: crate::is_end_of_month(date),
        }
    }

    fn sid() -> SecurityId {
        SecurityId::parse("ICBP").expect("sid")
    }

    #[test]
    fn keeps_every_indicator_row_without_fundamentals() {
        let dates = [date!(2024 - 01 - 02), date!(2024 - 01 - 03), date!(2024 - 01 - 04)];
        let rows = merge_features(&sid(), dates.iter().copied().map(technical).collect(), &[]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.fundamentals.is_empty()));
        assert_eq!(rows[2].date(), date!(2024 - 01 - 04));
    }

    #[test]
    fn attaches_selected_ratios_on_matching_date() {
        let record = FundamentalRecord {
            sid: sid(),
            period_end: date!(2023 - 12 - 31),
            announce_date: date!(2024 - 01 - 03),
            ratios: FundamentalRatios {
                pbv: Some(3.4),
                ..FundamentalRatios::default()
            },
        };
        let selections = [
            AsOfSelection {
                date: date!(2024 - 01 - 02),
                record: None,
            },
            AsOfSelection {
                date: date!(2024 - 01 - 03),
                record: Some(&record),
            },
        ];
        let dates = [date!(2024 - 01 - 02), date!(2024 - 01 - 03)];
        let rows = merge_features(&sid(), dates.iter().copied().map(technical).collect(), &selections);

        assert_eq!(rows[0].fundamentals.pbv, None);
        assert_eq!(rows[1].fundamentals.pbv, Some(3.4));
        assert_eq!(rows[1].key(), (&sid(), date!(2024 - 01 - 03)));
    }

    #[test]
    fn unmatched_selection_dates_neither_add_nor_drop_rows() {
        let record = FundamentalRecord {
            sid: sid(),
            period_end: date!(2023 - 12 - 31),
            announce_date: date!(2024 - 01 - 01),
            ratios: FundamentalRatios {
                eps: Some(120.0),
                ..FundamentalRatios::default()
            },
        };
        let selections = [
            AsOfSelection {
                date: date!(2024 - 01 - 01),
                record: Some(&record),
            },
            AsOfSelection {
                date: date!(2024 - 01 - 05),
                record: Some(&record),
            },
        ];
        let dates = [date!(2024 - 01 - 02), date!(2024 - 01 - 05), date!(2024 - 01 - 08)];
        let rows = merge_features(&sid(), dates.iter().copied().map(technical).collect(), &selections);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].fundamentals.eps, None);
        assert_eq!(rows[1].fundamentals.eps, Some(120.0));
        assert_eq!(rows[2].fundamentals.eps, None);
    }
}
