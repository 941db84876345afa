//! Series-level checks run before a security enters the pipeline.
//!
//! Value invariants of a single bar or record live on the domain types. The checks
//! here cover what only the whole series can show: ordering, duplicates and records
//! that belong to another security. Nothing is ever reordered to make a series pass.

use std::collections::HashSet;

use time::Date;

use crate::{FundamentalRecord, MalformedInput, PriceBar, SecurityId};

/// Prices must belong to `sid` and have strictly increasing dates.
///
/// Bar values are not checked here. A bar with `high < low` still gets a row; the
/// ingest path is where value invariants are enforced.
pub fn validate_prices(sid: &SecurityId, bars: &[PriceBar]) -> Result<(), MalformedInput> {
    for bar in bars {
        if &bar.sid != sid {
            return Err(MalformedInput::ForeignRecord {
                kind: "price bar",
                date: bar.date,
                found: bar.sid.clone(),
            });
        }
    }

    for (index, pair) in bars.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(MalformedInput::PriceDateOrder {
                index: index + 1,
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
    }
    Ok(())
}

/// Fundamentals must belong to `sid`, be announced no earlier than their period end
/// and cover each period at most once.
///
/// Announce-date order is not required: the aligner sorts by announce date, so a
/// late restatement is simply another entry.
pub fn validate_fundamentals(
    sid: &SecurityId,
    records: &[FundamentalRecord],
) -> Result<(), MalformedInput> {
    let mut periods = HashSet::with_capacity(records.len());
    for record in records {
        if &record.sid != sid {
            return Err(MalformedInput::ForeignRecord {
                kind: "fundamental record",
                date: record.period_end,
                found: record.sid.clone(),
            });
        }
        record
            .ratios
            .validate()
            .map_err(|source| MalformedInput::InvalidFundamental {
                period_end: record.period_end,
                source,
            })?;
        if record.announce_date < record.period_end {
            return Err(MalformedInput::AnnounceBeforePeriodEnd {
                period_end: record.period_end,
                announce_date: record.announce_date,
            });
        }
        if !periods.insert(record.period_end) {
            return Err(MalformedInput::DuplicateFundamentalPeriod {
                period_end: record.period_end,
            });
        }
    }
    Ok(())
}

/// Target dates for the aligner must be strictly increasing.
pub fn validate_trading_dates(dates: &[Date]) -> Result<(), MalformedInput> {
    for (index, pair) in dates.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(MalformedInput::TradingDateOrder {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FundamentalRatios;
    use time::macros::date;

    fn sid(raw: &str) -> SecurityId {
        SecurityId::parse(raw).expect("sid")
    }

    fn bar(raw: &str, day: Date) -> PriceBar {
        PriceBar {
            sid: sid(raw),
            date: day,
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            adj_close: 10.5,
            volume: 1_000,
        }
    }

    fn record(raw: &str, period_end: Date, announce_date: Date) -> FundamentalRecord {
        FundamentalRecord {
            sid: sid(raw),
            period_end,
            announce_date,
            ratios: FundamentalRatios::default(),
        }
    }

    #[test]
    fn accepts_strictly_increasing_prices() {
        let bars = vec![bar("TLKM", date!(2024 - 01 - 02)), bar("TLKM", date!(2024 - 01 - 03))];
        assert!(validate_prices(&sid("TLKM"), &bars).is_ok());
        assert!(validate_prices(&sid("TLKM"), &[]).is_ok());
    }

    #[test]
    fn rejects_duplicate_price_date() {
        let bars = vec![bar("TLKM", date!(2024 - 01 - 02)), bar("TLKM", date!(2024 - 01 - 02))];
        let err = validate_prices(&sid("TLKM"), &bars).expect_err("must fail");
        assert_eq!(
            err,
            MalformedInput::PriceDateOrder {
                index: 1,
                previous: date!(2024 - 01 - 02),
                current: date!(2024 - 01 - 02),
            }
        );
    }

    #[test]
    fn rejects_descending_price_dates() {
        let bars = vec![
            bar("TLKM", date!(2024 - 01 - 02)),
            bar("TLKM", date!(2024 - 01 - 04)),
            bar("TLKM", date!(2024 - 01 - 03)),
        ];
        let err = validate_prices(&sid("TLKM"), &bars).expect_err("must fail");
        assert!(matches!(err, MalformedInput::PriceDateOrder { index: 2, .. }));
    }

    #[test]
    fn rejects_bar_of_other_security() {
        let bars = vec![bar("TLKM", date!(2024 - 01 - 02)), bar("BBRI", date!(2024 - 01 - 03))];
        let err = validate_prices(&sid("TLKM"), &bars).expect_err("must fail");
        assert!(matches!(err, MalformedInput::ForeignRecord { kind: "price bar", .. }));
    }

    #[test]
    fn leaves_bar_values_to_ingest() {
        let mut inverted = bar("TLKM", date!(2024 - 01 - 02));
        inverted.low = inverted.high + 1.0;
        let mut negative = bar("TLKM", date!(2024 - 01 - 03));
        negative.open = -1.0;
        assert!(validate_prices(&sid("TLKM"), &[inverted, negative]).is_ok());
    }

    #[test]
    fn accepts_out_of_order_announcements() {
        let records = vec![
            record("TLKM", date!(2023 - 12 - 31), date!(2024 - 03 - 20)),
            record("TLKM", date!(2023 - 09 - 30), date!(2023 - 10 - 30)),
        ];
        assert!(validate_fundamentals(&sid("TLKM"), &records).is_ok());
    }

    #[test]
    fn rejects_duplicate_period_end() {
        let records = vec![
            record("TLKM", date!(2023 - 12 - 31), date!(2024 - 03 - 20)),
            record("TLKM", date!(2023 - 12 - 31), date!(2024 - 04 - 01)),
        ];
        let err = validate_fundamentals(&sid("TLKM"), &records).expect_err("must fail");
        assert_eq!(
            err,
            MalformedInput::DuplicateFundamentalPeriod {
                period_end: date!(2023 - 12 - 31)
            }
        );
    }

    #[test]
    fn rejects_announcement_before_period_end() {
        let records = vec![record("TLKM", date!(2023 - 12 - 31), date!(2023 - 12 - 30))];
        let err = validate_fundamentals(&sid("TLKM"), &records).expect_err("must fail");
        assert!(matches!(err, MalformedInput::AnnounceBeforePeriodEnd { .. }));
    }

    #[test]
    fn rejects_non_finite_ratio() {
        let mut broken = record("TLKM", date!(2023 - 12 - 31), date!(2024 - 02 - 01));
        broken.ratios.roe = Some(f64::NAN);
        let err = validate_fundamentals(&sid("TLKM"), &[broken]).expect_err("must fail");
        assert!(matches!(err, MalformedInput::InvalidFundamental { .. }));
    }

    #[test]
    fn rejects_unordered_trading_dates() {
        let dates = [date!(2024 - 01 - 03), date!(2024 - 01 - 02)];
        let err = validate_trading_dates(&dates).expect_err("must fail");
        assert!(matches!(err, MalformedInput::TradingDateOrder { index: 1, .. }));
    }
}
