use pitfeat_warehouse::Warehouse;

use crate::error::CliError;

use super::CommandResult;

pub fn build(warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let report = warehouse.build_calendar()?;
    Ok(CommandResult::ok(serde_json::to_value(report)?))
}
