//! Price Series Loader and price import.

use std::path::Path;

use ::duckdb::{Connection, ToSql};
use pitfeat_core::{format_date, parse_date, PriceBar, SecurityId, ValidationError};
use tracing::{debug, warn};

use crate::csv::{column_ref, csv_columns, csv_source, require_columns, ImportReport};
use crate::{in_transaction, log_ingest, AccessMode, Warehouse, WarehouseError};

const PRICES_DATASET: &str = "prices";
const REQUIRED_PRICE_COLUMNS: [&str; 7] = ["sid", "date", "open", "high", "low", "close", "volume"];

impl Warehouse {
    /// Upsert price bars keyed by `(sid, date)`. Bars are validated first; one bad bar
    /// rejects the whole call.
    pub fn ingest_prices(
        &self,
        source: &str,
        request_id: &str,
        bars: &[PriceBar],
    ) -> Result<usize, WarehouseError> {
        if bars.is_empty() {
            return Ok(0);
        }
        for bar in bars {
            bar.validate().map_err(|source| WarehouseError::InvalidRow {
                dataset: PRICES_DATASET,
                source,
            })?;
        }

        let connection = self.acquire(AccessMode::ReadWrite)?;
        in_transaction(&connection, |connection| {
            write_prices(connection, source, bars)?;
            log_ingest(connection, request_id, None, source, PRICES_DATASET, bars.len())?;
            Ok(bars.len())
        })
    }

    /// Import a CSV with columns `sid,date,open,high,low,close,volume` and an optional
    /// `adj_close`, which falls back to `close`. Invalid rows are skipped and counted.
    pub fn import_prices_csv(
        &self,
        path: &Path,
        source: &str,
        request_id: &str,
    ) -> Result<ImportReport, WarehouseError> {
        let connection = self.acquire(AccessMode::ReadWrite)?;
        let columns = csv_columns(&connection, path)?;
        require_columns(path, &columns, &REQUIRED_PRICE_COLUMNS)?;

        let adj_close = if columns.iter().any(|column| column == "adj_close") {
            format!("COALESCE({}, {})", as_double("adj_close"), as_double("close"))
        } else {
            as_double("close")
        };
        let sql = format!(
            "SELECT {sid}, CAST(TRY_CAST({date} AS DATE) AS VARCHAR), {open}, {high}, {low}, \
             {close}, {adj_close}, {volume} FROM {source}",
            sid = column_ref("sid"),
            date = column_ref("date"),
            open = as_double("open"),
            high = as_double("high"),
            low = as_double("low"),
            close = as_double("close"),
            volume = as_double("volume"),
            source = csv_source(path),
        );

        let mut statement = connection.prepare(&sql)?;
        let raw_rows = statement
            .query_map([], |row| {
                Ok(RawPriceRow {
                    sid: row.get(0)?,
                    date: row.get(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    adj_close: row.get(6)?,
                    volume: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let rows_read = raw_rows.len();
        let mut bars = Vec::with_capacity(rows_read);
        for (line, raw) in raw_rows.into_iter().enumerate() {
            match raw.into_bar() {
                Ok(bar) => bars.push(bar),
                Err(err) => {
                    debug!(path = %path.display(), line = line + 2, error = %err, "skipping price row");
                }
            }
        }
        let rows_rejected = rows_read - bars.len();
        if rows_rejected > 0 {
            warn!(path = %path.display(), rows_rejected, "price rows failed validation");
        }

        in_transaction(&connection, |connection| {
            write_prices(connection, source, &bars)?;
            log_ingest(connection, request_id, None, source, PRICES_DATASET, bars.len())?;
            Ok(())
        })?;

        Ok(ImportReport {
            path: path.to_path_buf(),
            rows_read,
            rows_written: bars.len(),
            rows_rejected,
        })
    }

    /// Every security with at least one stored price, sorted.
    pub fn list_securities(&self) -> Result<Vec<SecurityId>, WarehouseError> {
        let connection = self.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare("SELECT DISTINCT sid FROM prices ORDER BY sid")?;
        let raw = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter()
            .map(|sid| {
                SecurityId::parse(sid).map_err(|source| WarehouseError::InvalidRow {
                    dataset: PRICES_DATASET,
                    source,
                })
            })
            .collect()
    }

    /// Stored bars for `sid`, ascending by date.
    pub fn load_prices(&self, sid: &SecurityId) -> Result<Vec<PriceBar>, WarehouseError> {
        let connection = self.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT CAST(date AS VARCHAR), open, high, low, close, adj_close, volume \
             FROM prices WHERE sid = ? ORDER BY date",
        )?;
        let raw = statement
            .query_map([sid.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    [
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                    ],
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(date, [open, high, low, close, adj_close], volume)| {
                let invalid = |source: ValidationError| WarehouseError::InvalidRow {
                    dataset: PRICES_DATASET,
                    source,
                };
                let volume = u64::try_from(volume)
                    .map_err(|_| invalid(ValidationError::NegativeValue { field: "volume" }))?;
                Ok(PriceBar {
                    sid: sid.clone(),
                    date: parse_date(&date).map_err(invalid)?,
                    open,
                    high,
                    low,
                    close,
                    adj_close,
                    volume,
                })
            })
            .collect()
    }
}

fn as_double(column: &str) -> String {
    format!("TRY_CAST({} AS DOUBLE)", column_ref(column))
}

fn write_prices(
    connection: &Connection,
    source: &str,
    bars: &[PriceBar],
) -> Result<(), WarehouseError> {
    let mut statement = connection.prepare(
        "INSERT OR REPLACE INTO prices \
         (sid, date, open, high, low, close, adj_close, volume, source, updated_at) \
         VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
    )?;
    for bar in bars {
        let date = format_date(bar.date);
        let volume = i64::try_from(bar.volume).unwrap_or(i64::MAX);
        let params: [&dyn ToSql; 9] = [
            &bar.sid.as_str(),
            &date,
            &bar.open,
            &bar.high,
            &bar.low,
            &bar.close,
            &bar.adj_close,
            &volume,
            &source,
        ];
        statement.execute(params.as_slice())?;
    }
    Ok(())
}

/// One CSV row after SQL-side casting; `None` marks an unparseable cell.
struct RawPriceRow {
    sid: Option<String>,
    date: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<f64>,
}

impl RawPriceRow {
    fn into_bar(self) -> Result<PriceBar, ValidationError> {
        let sid = SecurityId::parse(self.sid.as_deref().unwrap_or_default())?;
        let date = parse_date(self.date.as_deref().unwrap_or_default())?;
        let field = |name: &'static str, value: Option<f64>| {
            value.ok_or(ValidationError::NonFiniteValue { field: name })
        };
        let volume = field("volume", self.volume)?;
        if volume < 0.0 || volume.fract() != 0.0 {
            return Err(ValidationError::NegativeValue { field: "volume" });
        }

        PriceBar::new(
            sid,
            date,
            field("open", self.open)?,
            field("high", self.high)?,
            field("low", self.low)?,
            field("close", self.close)?,
            field("adj_close", self.adj_close)?,
            volume as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bars, count, open_temp, sid};
    use time::macros::date;

    #[test]
    fn ingest_then_load_round_trips_in_date_order() {
        let (_temp, warehouse) = open_temp();
        let mut input = bars("BBCA.JK", date!(2024 - 01 - 01), 5);
        input.reverse();
        warehouse.ingest_prices("test", "req-1", &input).expect("ingest");

        let loaded = warehouse.load_prices(&sid("BBCA.JK")).expect("load");
        input.reverse();
        assert_eq!(loaded, input);
        assert_eq!(warehouse.list_securities().expect("list"), vec![sid("BBCA.JK")]);
    }

    #[test]
    fn reingesting_same_bars_keeps_one_row_per_date() {
        let (_temp, warehouse) = open_temp();
        let input = bars("TLKM.JK", date!(2024 - 01 - 01), 3);
        warehouse.ingest_prices("test", "req-1", &input).expect("first");
        warehouse.ingest_prices("test", "req-2", &input).expect("second");
        assert_eq!(count(&warehouse, "SELECT COUNT(*) FROM prices"), 3);
        assert_eq!(
            count(&warehouse, "SELECT COUNT(*) FROM ingest_log WHERE dataset = 'prices'"),
            2
        );
    }

    #[test]
    fn invalid_bar_rejects_whole_ingest() {
        let (_temp, warehouse) = open_temp();
        let mut input = bars("TLKM.JK", date!(2024 - 01 - 01), 3);
        input[2].low = input[2].high + 1.0;
        let err = warehouse.ingest_prices("test", "req-1", &input).expect_err("must fail");
        assert!(matches!(err, WarehouseError::InvalidRow { dataset: "prices", .. }));
        assert_eq!(count(&warehouse, "SELECT COUNT(*) FROM prices"), 0);
    }

    #[test]
    fn csv_import_falls_back_to_close_and_skips_bad_rows() {
        let (temp, warehouse) = open_temp();
        let path = temp.path().join("prices.csv");
        std::fs::write(
            &path,
            "sid,date,open,high,low,close,volume\n\
             bbri.jk,2024-01-02,5000,5100,4950,5050,120000\n\
             BBRI.JK,2024-01-03,5050,5150,5000,5100,98000\n\
             BBRI.JK,not-a-date,5050,5150,5000,5100,98000\n",
        )
        .expect("write csv");

        let report = warehouse.import_prices_csv(&path, "csv", "req-1").expect("import");
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.rows_rejected, 1);

        let loaded = warehouse.load_prices(&sid("BBRI.JK")).expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].adj_close, 5100.0);
        assert_eq!(loaded[0].volume, 120_000);
    }

    #[test]
    fn csv_without_required_columns_is_rejected() {
        let (temp, warehouse) = open_temp();
        let path = temp.path().join("prices.csv");
        std::fs::write(&path, "sid,date,close\nBBRI.JK,2024-01-02,5050\n").expect("write csv");

        let err = warehouse.import_prices_csv(&path, "csv", "req-1").expect_err("must fail");
        match err {
            WarehouseError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["open", "high", "low", "volume"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
