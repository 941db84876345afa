//! Trading calendar derived from stored price dates.

use serde::Serialize;
use tracing::info;

use crate::{in_transaction, AccessMode, Warehouse, WarehouseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarReport {
    /// Distinct dates found in `prices`.
    pub distinct_dates: usize,
    /// Dates that were not already in `calendar`.
    pub inserted: usize,
}

impl Warehouse {
    /// Insert every distinct price date as an open trading day. Existing rows are kept.
    pub fn build_calendar(&self) -> Result<CalendarReport, WarehouseError> {
        let connection = self.acquire(AccessMode::ReadWrite)?;
        let report = in_transaction(&connection, |connection| {
            let distinct_dates: i64 =
                connection.query_row("SELECT COUNT(DISTINCT date) FROM prices", [], |row| {
                    row.get(0)
                })?;
            let inserted = connection.execute(
                "INSERT OR IGNORE INTO calendar (trading_date, is_open) \
                 SELECT DISTINCT date, TRUE FROM prices",
                [],
            )?;
            Ok(CalendarReport {
                distinct_dates: usize::try_from(distinct_dates).unwrap_or_default(),
                inserted,
            })
        })?;
        info!(
            distinct_dates = report.distinct_dates,
            inserted = report.inserted,
            "calendar built"
        );
        Ok(report)
    }

    /// Stored trading dates, ascending.
    pub fn trading_dates(&self) -> Result<Vec<time::Date>, WarehouseError> {
        let connection = self.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection
            .prepare("SELECT CAST(trading_date AS VARCHAR) FROM calendar ORDER BY trading_date")?;
        let raw = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter()
            .map(|day| {
                pitfeat_core::parse_date(day).map_err(|source| WarehouseError::InvalidRow {
                    dataset: "calendar",
                    source,
                })
            })
            .collect()
    }
}
