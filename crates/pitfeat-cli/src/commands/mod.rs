mod calendar;
mod features;
mod fundamentals;
mod prices;
mod sql;

use std::time::Instant;

use pitfeat_warehouse::{Warehouse, WarehouseConfig};
use serde_json::Value;

use crate::cli::{
    CalendarCommand, Cli, Command, FeaturesCommand, FundamentalsCommand, PricesCommand,
};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata, RequestId};

/// What a command hands back to the envelope.
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    /// Securities that were reported as failed; any makes the exit code 3.
    pub failed_securities: usize,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            failed_securities: 0,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_failed_securities(mut self, failed: usize) -> Self {
        self.failed_securities = failed;
        self
    }
}

pub struct Outcome {
    pub envelope: Envelope,
    pub failed_securities: usize,
}

pub fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let started = Instant::now();
    let request_id = RequestId::new_v4();
    let warehouse = open_warehouse(cli)?;
    let request = request_id.to_string();

    let (command, result) = match &cli.command {
        Command::Features(args) => match &args.command {
            FeaturesCommand::Build(build) => {
                ("features build", features::build(build, &warehouse, &request)?)
            }
        },
        Command::Prices(args) => match &args.command {
            PricesCommand::Import(import) => {
                ("prices import", prices::import(import, &warehouse, &request)?)
            }
        },
        Command::Fundamentals(args) => match &args.command {
            FundamentalsCommand::Import(import) => (
                "fundamentals import",
                fundamentals::import(import, &warehouse, &request)?,
            ),
        },
        Command::Calendar(args) => match args.command {
            CalendarCommand::Build => ("calendar build", calendar::build(&warehouse)?),
        },
        Command::Sql(args) => ("sql", sql::run(args, &warehouse)?),
    };

    let CommandResult {
        data,
        warnings,
        failed_securities,
    } = result;

    let mut meta = Metadata::new(
        request_id,
        command,
        warehouse.db_path().display().to_string(),
    );
    for warning in warnings {
        meta.push_warning(warning);
    }
    meta.latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    Ok(Outcome {
        envelope: Envelope { meta, data },
        failed_securities,
    })
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let config = match &cli.db {
        Some(path) => WarehouseConfig::with_db_path(path),
        None => WarehouseConfig::default(),
    };
    Ok(Warehouse::open(config)?)
}
