//! # Pitfeat Warehouse
//!
//! DuckDB-backed collaborators around the feature pipeline.
//!
//! ## Overview
//!
//! - **Price Series Loader**: [`Warehouse::load_prices`], ordered by date
//! - **Fundamentals Loader**: [`Warehouse::load_fundamentals`], ordered by announce date
//! - **Feature Store Writer**: [`Warehouse::upsert_features`], idempotent on `(sid, date)`
//! - **Bulk import** of prices and fundamentals from CSV
//! - **Trading calendar** populated from stored price dates
//! - **Guarded SQL** for ad-hoc inspection
//!
//! All user-supplied values reach DuckDB as statement parameters. The only
//! interpolated strings are file paths handed to `read_csv_auto`, which are escaped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pitfeat_warehouse::{QueryGuardrails, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     for sid in warehouse.list_securities()? {
//!         let prices = warehouse.load_prices(&sid)?;
//!         println!("{sid}: {} bars", prices.len());
//!     }
//!
//!     let coverage = warehouse.execute_query(
//!         "SELECT * FROM vw_feature_coverage",
//!         QueryGuardrails::default(),
//!         false,
//!     )?;
//!     println!("{} securities with features", coverage.row_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `prices` | Daily OHLCV with adjusted close, keyed by `(sid, date)` |
//! | `fundamentals` | Ratio disclosures, keyed by `(sid, period_end)` |
//! | `calendar` | Trading dates |
//! | `features_daily` | Feature rows, keyed by `(sid, date)` |
//! | `ingest_log` | One audit row per write |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_returns_daily` | Simple daily return of adjusted close |
//! | `vw_feature_coverage` | Feature rows, date span and fundamental coverage per security |

pub mod duckdb;
pub mod migrations;
pub mod precision;
pub mod views;

mod calendar;
mod csv;
mod features;
mod fundamentals;
mod prices;
mod query;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use pitfeat_core::{SecurityId, ValidationError};
use thiserror::Error;

pub use calendar::CalendarReport;
pub use csv::{ImportReport, SkippedFile};
pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};
pub use fundamentals::FundamentalsImportReport;
pub use query::{QueryGuardrails, QueryResult, SqlColumn};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// A stored or imported row does not satisfy the domain invariants.
    #[error("invalid {dataset} row: {source}")]
    InvalidRow {
        dataset: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("{column} value {value} does not fit DECIMAL({precision},{scale})")]
    PrecisionOverflow {
        column: &'static str,
        value: f64,
        precision: u32,
        scale: u32,
    },

    #[error("{} is missing required columns: {}", path.display(), missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },
}

/// Location and pool size of the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for pitfeat data.
    pub pitfeat_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let pitfeat_home = resolve_pitfeat_home();
        let db_path = pitfeat_home.join("warehouse.duckdb");
        Self {
            pitfeat_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Default settings with an explicit database file.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// Handle to the warehouse database.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the database file and bring the schema up to date.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending migrations and refresh views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, WarehouseError> {
        Ok(self.manager.acquire(mode)?)
    }
}

/// Run `body` inside a transaction, committing on success and rolling back on failure.
fn in_transaction<T>(
    connection: &Connection,
    body: impl FnOnce(&Connection) -> Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    connection.execute_batch("BEGIN TRANSACTION")?;
    match body(connection) {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Append one audit row to `ingest_log`.
fn log_ingest(
    connection: &Connection,
    request_id: &str,
    sid: Option<&SecurityId>,
    source: &str,
    dataset: &str,
    row_count: usize,
) -> Result<(), WarehouseError> {
    let sid = sid.map(SecurityId::as_str);
    let row_count = i64::try_from(row_count).unwrap_or(i64::MAX);
    let params: [&dyn ToSql; 5] = [&request_id, &sid, &source, &dataset, &row_count];
    connection.execute(
        "INSERT INTO ingest_log \
         (request_id, sid, source, dataset, status, row_count, timestamp) \
         VALUES (?, ?, ?, ?, 'ok', ?, CURRENT_TIMESTAMP)",
        params.as_slice(),
    )?;
    Ok(())
}

fn resolve_pitfeat_home() -> PathBuf {
    if let Some(path) = env::var_os("PITFEAT_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pitfeat");
    }

    PathBuf::from(".pitfeat")
}

/// Escape a string literal for the few places a path must be interpolated.
fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn initializes_tables_and_views() {
        let (_temp, warehouse) = open_temp();
        for table in ["prices", "fundamentals", "calendar", "features_daily", "ingest_log"] {
            let sql = format!(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = '{table}'"
            );
            assert_eq!(count(&warehouse, &sql), 1, "table {table}");
        }
        assert_eq!(
            count(
                &warehouse,
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'vw_feature_coverage'"
            ),
            1
        );
    }

    #[test]
    fn reopening_keeps_schema_version() {
        let temp = tempfile::tempdir().expect("tempdir");
        let db_path = temp.path().join("nested").join("warehouse.duckdb");
        {
            Warehouse::open(WarehouseConfig::with_db_path(&db_path)).expect("first open");
        }
        let warehouse = Warehouse::open(WarehouseConfig::with_db_path(&db_path)).expect("reopen");
        assert_eq!(
            count(&warehouse, "SELECT COUNT(*) FROM schema_migrations"),
            migrations::known_versions().count() as i64
        );
        assert_eq!(warehouse.db_path(), db_path.as_path());
    }
}
