use pitfeat_warehouse::Warehouse;

use crate::cli::FundamentalsImportArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn import(
    args: &FundamentalsImportArgs,
    warehouse: &Warehouse,
    request_id: &str,
) -> Result<CommandResult, CliError> {
    let report = warehouse.import_fundamentals(&args.path, request_id)?;

    let mut warnings: Vec<String> = report
        .skipped
        .iter()
        .map(|skipped| {
            format!(
                "skipped {}: missing columns {}",
                skipped.path.display(),
                skipped.missing.join(", ")
            )
        })
        .collect();
    warnings.extend(
        report
            .files
            .iter()
            .filter(|file| file.rows_rejected > 0)
            .map(|file| {
                format!(
                    "{} row(s) in {} were rejected",
                    file.rows_rejected,
                    file.path.display()
                )
            }),
    );
    if report.files.is_empty() && report.skipped.is_empty() {
        warnings.push(format!("no CSV files found at {}", args.path.display()));
    }

    Ok(CommandResult::ok(serde_json::to_value(report)?).with_warnings(warnings))
}
