//! Feature Store Writer.

use ::duckdb::{Connection, ToSql};
use pitfeat_core::{format_date, FeatureRow, SecurityId};
use tracing::debug;

use crate::precision::{DecimalSpec, EPS, GENERAL, RSI};
use crate::{in_transaction, log_ingest, AccessMode, Warehouse, WarehouseError};

const FEATURES_DATASET: &str = "features_daily";

const UPSERT_FEATURES_SQL: &str = "INSERT OR REPLACE INTO features_daily \
     (sid, date, logret_1d, logret_5d, logret_20d, rv20d, rsi14, atr14, macd, macd_signal, \
      macd_hist, stoch_k, stoch_d, vol_z60, dow, eom, roe, roa, npm, der, dar, per, pbv, eps, \
      sales_growth, profit_growth) \
     VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
      ?, ?, ?)";

impl Warehouse {
    /// Upsert the feature rows of one security in a single transaction.
    ///
    /// Values are rounded to their column's `DECIMAL` scale; a value that overflows
    /// its column rolls back every row of the call.
    pub fn upsert_features(
        &self,
        sid: &SecurityId,
        rows: &[FeatureRow],
        request_id: &str,
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.acquire(AccessMode::ReadWrite)?;
        let written = in_transaction(&connection, |connection| {
            write_features(connection, rows)?;
            log_ingest(
                connection,
                request_id,
                Some(sid),
                "pipeline",
                FEATURES_DATASET,
                rows.len(),
            )?;
            Ok(rows.len())
        })?;
        debug!(%sid, rows = written, "upserted features");
        Ok(written)
    }
}

fn write_features(connection: &Connection, rows: &[FeatureRow]) -> Result<(), WarehouseError> {
    let mut statement = connection.prepare(UPSERT_FEATURES_SQL)?;
    for row in rows {
        let t = &row.technical;
        let f = &row.fundamentals;
        let sid = row.sid.as_str();
        let date = format_date(t.date);
        let dow = i16::from(t.dow);

        let technical = [
            ("logret_1d", t.logret_1d, GENERAL),
            ("logret_5d", t.logret_5d, GENERAL),
            ("logret_20d", t.logret_20d, GENERAL),
            ("rv20d", t.rv20d, GENERAL),
            ("rsi14", t.rsi14, RSI),
            ("atr14", t.atr14, GENERAL),
            ("macd", t.macd, GENERAL),
            ("macd_signal", t.macd_signal, GENERAL),
            ("macd_hist", t.macd_hist, GENERAL),
            ("stoch_k", t.stoch_k, GENERAL),
            ("stoch_d", t.stoch_d, GENERAL),
            ("vol_z60", t.vol_z60, GENERAL),
        ];
        let fundamentals = [
            ("roe", f.roe, GENERAL),
            ("roa", f.roa, GENERAL),
            ("npm", f.npm, GENERAL),
            ("der", f.der, GENERAL),
            ("dar", f.dar, GENERAL),
            ("per", f.per, GENERAL),
            ("pbv", f.pbv, GENERAL),
            ("eps", f.eps, EPS),
            ("sales_growth", f.sales_growth, GENERAL),
            ("profit_growth", f.profit_growth, GENERAL),
        ];
        let technical = rounded(technical)?;
        let fundamentals = rounded(fundamentals)?;

        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(26);
        params.push(&sid);
        params.push(&date);
        params.extend(technical.iter().map(|value| value as &dyn ToSql));
        params.push(&dow);
        params.push(&t.eom);
        params.extend(fundamentals.iter().map(|value| value as &dyn ToSql));
        statement.execute(params.as_slice())?;
    }
    Ok(())
}

fn rounded<const N: usize>(
    columns: [(&'static str, Option<f64>, DecimalSpec); N],
) -> Result<[Option<f64>; N], WarehouseError> {
    let mut out = [None; N];
    for (slot, (column, value, spec)) in out.iter_mut().zip(columns) {
        *slot = spec.round(column, value)?;
    }
    Ok(out)
}
