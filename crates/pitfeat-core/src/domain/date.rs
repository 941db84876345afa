//! ISO calendar-date helpers shared by loaders and the feature store.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration};

use crate::ValidationError;

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), ISO_DATE).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    // Every `Date` in 0000..=9999 formats with this description; outside it we
    // fall back to the `Display` form rather than failing a write.
    date.format(ISO_DATE).unwrap_or_else(|_| date.to_string())
}

/// Eligibility cutoff for a trading date: `date - lag_days`, saturating at `Date::MIN`.
pub fn eligibility_cutoff(date: Date, lag_days: u32) -> Date {
    date.saturating_sub(Duration::days(i64::from(lag_days)))
}

/// Day of week with Monday = 0 through Sunday = 6.
pub fn day_of_week(date: Date) -> u8 {
    date.weekday().number_days_from_monday()
}

/// True when the next calendar day starts a new month.
///
/// Calendar-day rule only: a Friday on the 30th of a month with a 31st is not
/// end-of-month even though no trading day follows it within the month.
pub fn is_end_of_month(date: Date) -> bool {
    date.next_day().map_or(true, |next| next.month() != date.month())
}
