//! # Point-in-Time Fundamental Aligner
//!
//! For each trading date `d` the eligibility cutoff is `d - lag_days`. A record is
//! eligible when its announce date is on or before the cutoff, and the selected
//! record is the last eligible one after a stable sort by
//! `(announce_date, period_end)`. Equal announce dates therefore resolve to the
//! later period end.
//!
//! Both sequences are ascending, so the lookup is a single forward scan: the record
//! pointer only ever moves forward as the cutoff grows.

use time::Date;

use crate::validate::validate_trading_dates;
use crate::{eligibility_cutoff, FundamentalRecord, MalformedInput};

/// The record selected for one trading date, if any was eligible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsOfSelection<'a> {
    pub date: Date,
    pub record: Option<&'a FundamentalRecord>,
}

/// Select the eligible record for every trading date.
///
/// Returns one selection per entry of `trading_dates`, in the same order. Trading
/// dates must be strictly increasing.
pub fn align_as_of<'a>(
    records: &'a [FundamentalRecord],
    trading_dates: &[Date],
    lag_days: u32,
) -> Result<Vec<AsOfSelection<'a>>, MalformedInput> {
    validate_trading_dates(trading_dates)?;

    let mut sorted: Vec<&FundamentalRecord> = records.iter().collect();
    sorted.sort_by_key(|record| (record.announce_date, record.period_end));

    let mut next = 0usize;
    let mut selections = Vec::with_capacity(trading_dates.len());
    for &date in trading_dates {
        let cutoff = eligibility_cutoff(date, lag_days);
        while next < sorted.len() && sorted[next].announce_date <= cutoff {
            next += 1;
        }
        selections.push(AsOfSelection {
            date,
            record: next.checked_sub(1).map(|index| sorted[index]),
        });
    }
    Ok(selections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FundamentalRatios, SecurityId};
    use time::macros::date;
    use time::Duration;

    fn record(period_end: Date, announce_date: Date, roe: f64) -> FundamentalRecord {
        FundamentalRecord {
            sid: SecurityId::parse("UNVR").expect("sid"),
            period_end,
            announce_date,
            ratios: FundamentalRatios {
                roe: Some(roe),
                ..FundamentalRatios::default()
            },
        }
    }

    fn selected_roe(selection: &AsOfSelection<'_>) -> Option<f64> {
        selection.record.and_then(|record| record.ratios.roe)
    }

    #[test]
    fn no_records_selects_nothing() {
        let dates = [date!(2024 - 01 - 02), date!(2024 - 01 - 03)];
        let out = align_as_of(&[], &dates, 0).expect("aligns");
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|selection| selection.record.is_none()));
    }

    #[test]
    fn same_day_announcement_is_eligible_without_lag() {
        let records = [record(date!(2023 - 12 - 31), date!(2024 - 01 - 03), 0.2)];
        let dates = [date!(2024 - 01 - 02), date!(2024 - 01 - 03)];
        let out = align_as_of(&records, &dates, 0).expect("aligns");
        assert_eq!(selected_roe(&out[0]), None);
        assert_eq!(selected_roe(&out[1]), Some(0.2));
    }

    #[test]
    fn lag_pushes_eligibility_back_by_calendar_days() {
        let start = date!(2024 - 01 - 01);
        let dates: Vec<Date> = (0..25).map(|i| start + Duration::days(i)).collect();
        let records = [
            record(date!(2023 - 12 - 31), dates[2], 1.0),
            record(date!(2024 - 01 - 15), dates[19], 2.0),
        ];

        let out = align_as_of(&records, &dates, 2).expect("aligns");
        assert_eq!(selected_roe(&out[3]), None);
        assert_eq!(selected_roe(&out[4]), Some(1.0));
        assert_eq!(selected_roe(&out[20]), Some(1.0));
        assert_eq!(selected_roe(&out[21]), Some(2.0));
    }

    #[test]
    fn equal_announce_dates_pick_later_period_end() {
        let announce = date!(2024 - 03 - 28);
        let records = [
            record(date!(2023 - 12 - 31), announce, 2.0),
            record(date!(2023 - 09 - 30), announce, 1.0),
        ];
        let out = align_as_of(&records, &[date!(2024 - 04 - 01)], 0).expect("aligns");
        assert_eq!(selected_roe(&out[0]), Some(2.0));
    }

    #[test]
    fn unsorted_records_are_sorted_by_announce_date() {
        let records = [
            record(date!(2023 - 12 - 31), date!(2024 - 03 - 01), 2.0),
            record(date!(2023 - 09 - 30), date!(2023 - 11 - 01), 1.0),
        ];
        let dates = [date!(2024 - 01 - 02), date!(2024 - 03 - 04)];
        let out = align_as_of(&records, &dates, 0).expect("aligns");
        assert_eq!(selected_roe(&out[0]), Some(1.0));
        assert_eq!(selected_roe(&out[1]), Some(2.0));
    }

    #[test]
    fn late_restatement_of_old_period_wins_once_announced() {
        let records = [
            record(date!(2023 - 12 - 31), date!(2024 - 02 - 01), 2.0),
            record(date!(2023 - 06 - 30), date!(2024 - 02 - 10), 9.0),
        ];
        let out = align_as_of(&records, &[date!(2024 - 02 - 12)], 0).expect("aligns");
        assert_eq!(selected_roe(&out[0]), Some(9.0));
    }

    #[test]
    fn rejects_unsorted_trading_dates() {
        let dates = [date!(2024 - 01 - 03), date!(2024 - 01 - 02)];
        let err = align_as_of(&[], &dates, 0).expect_err("must fail");
        assert!(matches!(err, MalformedInput::TradingDateOrder { .. }));
    }

    #[test]
    fn huge_lag_saturates_instead_of_overflowing() {
        let records = [record(date!(2023 - 12 - 31), date!(2024 - 01 - 05), 1.0)];
        let out = align_as_of(&records, &[date!(2024 - 01 - 10)], u32::MAX).expect("aligns");
        assert_eq!(out[0].record, None);
    }
}
