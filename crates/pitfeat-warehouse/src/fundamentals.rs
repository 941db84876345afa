//! Fundamentals Loader and fundamentals import.

use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use pitfeat_core::{
    format_date, parse_date, FundamentalRatios, FundamentalRecord, SecurityId, SecurityInput,
    ValidationError,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::csv::{column_ref, csv_columns, csv_source, missing_columns, ImportReport, SkippedFile};
use crate::{in_transaction, log_ingest, AccessMode, Warehouse, WarehouseError};

const FUNDAMENTALS_DATASET: &str = "fundamentals";
const KEY_COLUMNS: [&str; 3] = ["sid", "period_end", "announce_date"];

/// Outcome of importing a file or a directory of fundamentals CSVs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FundamentalsImportReport {
    pub files: Vec<ImportReport>,
    pub skipped: Vec<SkippedFile>,
}

impl FundamentalsImportReport {
    pub fn rows_written(&self) -> usize {
        self.files.iter().map(|file| file.rows_written).sum()
    }
}

impl Warehouse {
    /// Upsert disclosures keyed by `(sid, period_end)`.
    pub fn ingest_fundamentals(
        &self,
        source: &str,
        request_id: &str,
        records: &[FundamentalRecord],
    ) -> Result<usize, WarehouseError> {
        if records.is_empty() {
            return Ok(0);
        }
        for record in records {
            record
                .ratios
                .validate()
                .map_err(|source| WarehouseError::InvalidRow {
                    dataset: FUNDAMENTALS_DATASET,
                    source,
                })?;
        }

        let connection = self.acquire(AccessMode::ReadWrite)?;
        in_transaction(&connection, |connection| {
            write_fundamentals(connection, source, records)?;
            log_ingest(
                connection,
                request_id,
                None,
                source,
                FUNDAMENTALS_DATASET,
                records.len(),
            )?;
            Ok(records.len())
        })
    }

    /// Import one CSV file, or every `*.csv` in a directory (sorted by name).
    ///
    /// Each file needs `sid,period_end,announce_date` plus every ratio column. A file
    /// missing any of them is skipped with a warning. Ratio cells that are not
    /// numbers become NULL; rows with a bad id or date, or announced before their
    /// period end, are left out.
    pub fn import_fundamentals(
        &self,
        path: &Path,
        request_id: &str,
    ) -> Result<FundamentalsImportReport, WarehouseError> {
        let files = if path.is_dir() {
            csv_files_in(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let connection = self.acquire(AccessMode::ReadWrite)?;
        let mut report = FundamentalsImportReport::default();
        for file in files {
            let columns = csv_columns(&connection, &file)?;
            let required: Vec<&str> = KEY_COLUMNS
                .into_iter()
                .chain(FundamentalRatios::FIELDS)
                .collect();
            let missing = missing_columns(&columns, &required);
            if !missing.is_empty() {
                warn!(path = %file.display(), ?missing, "skipping fundamentals file");
                report.skipped.push(SkippedFile {
                    path: file,
                    missing,
                });
                continue;
            }

            let imported = import_file(&connection, &file, request_id)?;
            info!(
                path = %file.display(),
                rows = imported.rows_written,
                rejected = imported.rows_rejected,
                "imported fundamentals"
            );
            report.files.push(imported);
        }
        Ok(report)
    }

    /// Stored disclosures for `sid`, ascending by announce date then period end.
    pub fn load_fundamentals(
        &self,
        sid: &SecurityId,
    ) -> Result<Vec<FundamentalRecord>, WarehouseError> {
        let connection = self.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT CAST(period_end AS VARCHAR), CAST(announce_date AS VARCHAR), \
             roe, roa, npm, der, dar, per, pbv, eps, sales_growth, profit_growth \
             FROM fundamentals WHERE sid = ? ORDER BY announce_date, period_end",
        )?;
        let raw = statement
            .query_map([sid.as_str()], |row| {
                let mut ratios = [None; 10];
                for (offset, slot) in ratios.iter_mut().enumerate() {
                    *slot = row.get::<_, Option<f64>>(offset + 2)?;
                }
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, ratios))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(period_end, announce_date, ratios)| {
                let invalid = |source: ValidationError| WarehouseError::InvalidRow {
                    dataset: FUNDAMENTALS_DATASET,
                    source,
                };
                Ok(FundamentalRecord {
                    sid: sid.clone(),
                    period_end: parse_date(&period_end).map_err(invalid)?,
                    announce_date: parse_date(&announce_date).map_err(invalid)?,
                    ratios: ratios_from(ratios),
                })
            })
            .collect()
    }

    /// Prices and fundamentals of one security, ready for the pipeline.
    pub fn load_security_input(&self, sid: &SecurityId) -> Result<SecurityInput, WarehouseError> {
        Ok(SecurityInput::new(
            sid.clone(),
            self.load_prices(sid)?,
            self.load_fundamentals(sid)?,
        ))
    }
}

fn import_file(
    connection: &Connection,
    path: &Path,
    request_id: &str,
) -> Result<ImportReport, WarehouseError> {
    let ratio_columns = FundamentalRatios::FIELDS
        .iter()
        .map(|field| format!("TRY_CAST({} AS DOUBLE)", column_ref(field)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {sid}, CAST(TRY_CAST({period_end} AS DATE) AS VARCHAR), \
         CAST(TRY_CAST({announce_date} AS DATE) AS VARCHAR), {ratio_columns} FROM {source}",
        sid = column_ref("sid"),
        period_end = column_ref("period_end"),
        announce_date = column_ref("announce_date"),
        source = csv_source(path),
    );

    let mut statement = connection.prepare(&sql)?;
    let raw_rows = statement
        .query_map([], |row| {
            let mut ratios = [None; 10];
            for (offset, slot) in ratios.iter_mut().enumerate() {
                *slot = row.get::<_, Option<f64>>(offset + 3)?;
            }
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                ratios,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let rows_read = raw_rows.len();
    let mut records = Vec::with_capacity(rows_read);
    for (line, (sid, period_end, announce_date, ratios)) in raw_rows.into_iter().enumerate() {
        match record_from_cells(sid, period_end, announce_date, ratios) {
            Ok(record) => records.push(record),
            Err(reason) => {
                debug!(path = %path.display(), line = line + 2, %reason, "skipping fundamentals row");
            }
        }
    }

    in_transaction(connection, |connection| {
        write_fundamentals(connection, "csv", &records)?;
        log_ingest(
            connection,
            request_id,
            None,
            "csv",
            FUNDAMENTALS_DATASET,
            records.len(),
        )?;
        Ok(())
    })?;

    Ok(ImportReport {
        path: path.to_path_buf(),
        rows_read,
        rows_written: records.len(),
        rows_rejected: rows_read - records.len(),
    })
}

fn record_from_cells(
    sid: Option<String>,
    period_end: Option<String>,
    announce_date: Option<String>,
    ratios: [Option<f64>; 10],
) -> Result<FundamentalRecord, String> {
    let sid = SecurityId::parse(sid.as_deref().unwrap_or_default()).map_err(|err| err.to_string())?;
    let period_end =
        parse_date(period_end.as_deref().unwrap_or_default()).map_err(|err| err.to_string())?;
    let announce_date =
        parse_date(announce_date.as_deref().unwrap_or_default()).map_err(|err| err.to_string())?;
    if announce_date < period_end {
        return Err(format!(
            "announce date {announce_date} precedes period end {period_end}"
        ));
    }
    // Infinite cells ("inf") count as non-numeric.
    let ratios = ratios.map(|value| value.filter(|value| value.is_finite()));
    FundamentalRecord::new(sid, period_end, announce_date, ratios_from(ratios))
        .map_err(|err| err.to_string())
}

fn ratios_from(values: [Option<f64>; 10]) -> FundamentalRatios {
    let [roe, roa, npm, der, dar, per, pbv, eps, sales_growth, profit_growth] = values;
    FundamentalRatios {
        roe,
        roa,
        npm,
        der,
        dar,
        per,
        pbv,
        eps,
        sales_growth,
        profit_growth,
    }
}

fn write_fundamentals(
    connection: &Connection,
    source: &str,
    records: &[FundamentalRecord],
) -> Result<(), WarehouseError> {
    let mut statement = connection.prepare(
        "INSERT OR REPLACE INTO fundamentals \
         (sid, period_end, announce_date, roe, roa, npm, der, dar, per, pbv, eps, \
          sales_growth, profit_growth, source, updated_at) \
         VALUES (?, CAST(? AS DATE), CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
          CURRENT_TIMESTAMP)",
    )?;
    for record in records {
        let sid = record.sid.as_str();
        let period_end = format_date(record.period_end);
        let announce_date = format_date(record.announce_date);
        let [roe, roa, npm, der, dar, per, pbv, eps, sales_growth, profit_growth] =
            record.ratios.values();
        let params: [&dyn ToSql; 14] = [
            &sid,
            &period_end,
            &announce_date,
            &roe,
            &roa,
            &npm,
            &der,
            &dar,
            &per,
            &pbv,
            &eps,
            &sales_growth,
            &profit_growth,
            &source,
        ];
        statement.execute(params.as_slice())?;
    }
    Ok(())
}

fn csv_files_in(dir: &Path) -> Result<Vec<PathBuf>, WarehouseError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{bars, count, disclosure, open_temp, sid};
    use time::macros::date;

    const HEADER: &str =
        "sid,period_end,announce_date,roe,roa,npm,der,dar,per,pbv,eps,sales_growth,profit_growth\n";

    #[test]
    fn load_orders_by_announce_date_then_period_end() {
        let (_temp, warehouse) = open_temp();
        let records = vec![
            disclosure("UNVR.JK", date!(2023 - 12 - 31), date!(2024 - 03 - 01)),
            disclosure("UNVR.JK", date!(2023 - 06 - 30), date!(2023 - 08 - 01)),
            disclosure("UNVR.JK", date!(2023 - 09 - 30), date!(2024 - 03 - 01)),
        ];
        warehouse.ingest_fundamentals("test", "req-1", &records).expect("ingest");

        let loaded = warehouse.load_fundamentals(&sid("UNVR.JK")).expect("load");
        let periods: Vec<_> = loaded.iter().map(|record| record.period_end).collect();
        assert_eq!(
            periods,
            vec![date!(2023 - 06 - 30), date!(2023 - 09 - 30), date!(2023 - 12 - 31)]
        );
        assert_eq!(loaded[0].ratios, records[1].ratios);
    }

    #[test]
    fn same_period_is_replaced_not_duplicated() {
        let (_temp, warehouse) = open_temp();
        let mut record = disclosure("UNVR.JK", date!(2023 - 12 - 31), date!(2024 - 03 - 01));
        warehouse.ingest_fundamentals("test", "req-1", &[record.clone()]).expect("first");
        record.announce_date = date!(2024 - 03 - 05);
        record.ratios.roe = Some(0.3);
        warehouse.ingest_fundamentals("test", "req-2", &[record]).expect("second");

        let loaded = warehouse.load_fundamentals(&sid("UNVR.JK")).expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].announce_date, date!(2024 - 03 - 05));
        assert_eq!(loaded[0].ratios.roe, Some(0.3));
    }

    #[test]
    fn directory_import_skips_files_missing_columns() {
        let (temp, warehouse) = open_temp();
        let dir = temp.path().join("fundamental");
        std::fs::create_dir_all(&dir).expect("dir");
        std::fs::write(
            dir.join("a_good.csv"),
            format!(
                "{HEADER}\
                 ICBP.JK,2023-12-31,2024-03-20,0.19,0.1,0.12,0.9,0.4,15.2,3.1,950,0.05,n/a\n\
                 ICBP.JK,2023-12-31x,2024-03-20,0.19,0.1,0.12,0.9,0.4,15.2,3.1,950,0.05,0.02\n\
                 ICBP.JK,2024-03-31,2024-03-01,0.19,0.1,0.12,0.9,0.4,15.2,3.1,950,0.05,0.02\n"
            ),
        )
        .expect("write good");
        std::fs::write(dir.join("b_partial.csv"), "sid,period_end,roe\nICBP.JK,2023-12-31,0.2\n")
            .expect("write partial");
        std::fs::write(dir.join("notes.txt"), "ignored").expect("write txt");

        let report = warehouse.import_fundamentals(&dir, "req-1").expect("import");
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].rows_read, 3);
        assert_eq!(report.rows_written(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].missing.contains(&String::from("announce_date")));

        let loaded = warehouse.load_fundamentals(&sid("ICBP.JK")).expect("load");
        assert_eq!(loaded[0].ratios.profit_growth, None);
        assert_eq!(loaded[0].ratios.eps, Some(950.0));
    }

    #[test]
    fn security_input_bundles_both_series() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .ingest_prices("test", "req-1", &bars("ICBP.JK", date!(2024 - 01 - 01), 4))
            .expect("prices");
        warehouse
            .ingest_fundamentals(
                "test",
                "req-2",
                &[disclosure("ICBP.JK", date!(2023 - 12 - 31), date!(2024 - 01 - 02))],
            )
            .expect("fundamentals");

        let input = warehouse.load_security_input(&sid("ICBP.JK")).expect("input");
        assert_eq!(input.prices.len(), 4);
        assert_eq!(input.fundamentals.len(), 1);
        assert_eq!(count(&warehouse, "SELECT COUNT(*) FROM ingest_log"), 2);
    }
}
