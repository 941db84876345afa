use pitfeat_warehouse::{QueryGuardrails, Warehouse};

use crate::cli::SqlArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &SqlArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let guardrails = QueryGuardrails {
        max_rows: args.max_rows,
        query_timeout_ms: args.query_timeout_ms,
    };
    let result = warehouse.execute_query(&args.query, guardrails, args.write)?;

    let mut warnings = Vec::new();
    if result.truncated {
        warnings.push(format!(
            "result truncated to {} rows; raise --max-rows to see more",
            args.max_rows
        ));
    }
    Ok(CommandResult::ok(serde_json::to_value(result)?).with_warnings(warnings))
}
