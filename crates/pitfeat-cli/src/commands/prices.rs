use pitfeat_warehouse::Warehouse;

use crate::cli::PricesImportArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn import(
    args: &PricesImportArgs,
    warehouse: &Warehouse,
    request_id: &str,
) -> Result<CommandResult, CliError> {
    let report = warehouse.import_prices_csv(&args.path, &args.source, request_id)?;
    let mut warnings = Vec::new();
    if report.rows_rejected > 0 {
        warnings.push(format!(
            "{} row(s) in {} failed validation and were skipped",
            report.rows_rejected,
            report.path.display()
        ));
    }
    Ok(CommandResult::ok(serde_json::to_value(report)?).with_warnings(warnings))
}
