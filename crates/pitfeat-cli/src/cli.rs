//! CLI argument definitions for pitfeat.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `features build` | Build point-in-time feature rows and upsert them |
//! | `prices import` | Upsert daily bars from a CSV file |
//! | `fundamentals import` | Upsert ratio disclosures from a CSV file or directory |
//! | `calendar build` | Populate the trading calendar from stored prices |
//! | `sql` | Query the local DuckDB warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--db` | `$PITFEAT_HOME/warehouse.duckdb` | Warehouse database file |
//!
//! # Examples
//!
//! ```bash
//! pitfeat prices import data/prices.csv --source idx
//! pitfeat fundamentals import data/fundamental/
//! pitfeat calendar build
//! pitfeat features build --tickers conf/tickers.txt --pretty
//! pitfeat sql "SELECT * FROM vw_feature_coverage"
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Point-in-time equity feature pipeline.
#[derive(Debug, Parser)]
#[command(
    name = "pitfeat",
    author,
    version,
    about = "Point-in-time equity feature pipeline",
    long_about = "Builds daily feature rows per security from stored prices and fundamentals. \
Fundamental ratios are attached only from the date they became public, so no row sees \
information from its future.\n\
\n\
Every command prints one JSON document with `meta` and `data` to stdout. Logs go to \
stderr and honour RUST_LOG."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Warehouse database file. Defaults to `warehouse.duckdb` under PITFEAT_HOME.
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Feature table commands.
    Features(FeaturesArgs),

    /// Price import commands.
    Prices(PricesArgs),

    /// Fundamentals import commands.
    Fundamentals(FundamentalsArgs),

    /// Trading calendar commands.
    Calendar(CalendarArgs),

    /// Run SQL against the DuckDB warehouse.
    ///
    /// Read-only unless `--write` is given. Results are capped by `--max-rows` and
    /// `--query-timeout-ms`.
    ///
    /// # Examples
    ///
    ///   pitfeat sql "SELECT sid, COUNT(*) FROM features_daily GROUP BY sid"
    ///   pitfeat sql "DELETE FROM features_daily WHERE sid = 'XXXX.JK'" --write
    Sql(SqlArgs),
}

#[derive(Debug, Args)]
pub struct FeaturesArgs {
    #[command(subcommand)]
    pub command: FeaturesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FeaturesCommand {
    /// Build feature rows and upsert them into `features_daily`.
    ///
    /// Without `--sid` or `--tickers` every security with stored prices is built.
    /// A security with malformed input is reported and skipped; the exit code is 3
    /// when any security failed.
    Build(BuildArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Security id to build; repeatable.
    #[arg(long = "sid", value_name = "SID")]
    pub sids: Vec<String>,

    /// File with one security id per line (`#` comments allowed).
    #[arg(long, value_name = "FILE")]
    pub tickers: Option<PathBuf>,

    /// YAML parameter file. When omitted, `conf/params.yaml` is used if it exists.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compute and report without writing.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct PricesArgs {
    #[command(subcommand)]
    pub command: PricesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PricesCommand {
    /// Upsert daily bars from a CSV file.
    ///
    /// Required columns: sid,date,open,high,low,close,volume. `adj_close` is
    /// optional and falls back to `close`.
    Import(PricesImportArgs),
}

#[derive(Debug, Args)]
pub struct PricesImportArgs {
    /// CSV file to import.
    pub path: PathBuf,

    /// Source label recorded with each row.
    #[arg(long, default_value = "csv")]
    pub source: String,
}

#[derive(Debug, Args)]
pub struct FundamentalsArgs {
    #[command(subcommand)]
    pub command: FundamentalsCommand,
}

#[derive(Debug, Subcommand)]
pub enum FundamentalsCommand {
    /// Upsert disclosures from a CSV file or every `*.csv` in a directory.
    ///
    /// Files missing a required column are skipped with a warning.
    Import(FundamentalsImportArgs),
}

#[derive(Debug, Args)]
pub struct FundamentalsImportArgs {
    /// CSV file or directory of CSV files.
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct CalendarArgs {
    #[command(subcommand)]
    pub command: CalendarCommand,
}

#[derive(Debug, Subcommand)]
pub enum CalendarCommand {
    /// Insert every distinct stored price date as a trading day.
    Build,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write statements (INSERT, UPDATE, DELETE, CREATE, ...).
    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}
