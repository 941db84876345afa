//! `features build`: load, compute in parallel, upsert per security.

use std::path::{Path, PathBuf};

use pitfeat_core::{build_batch, BatchSummary, FeatureConfig, FeatureParams, SecurityId};
use pitfeat_warehouse::Warehouse;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::BuildArgs;
use crate::error::CliError;
use crate::tickers::load_tickers;

use super::CommandResult;

const DEFAULT_CONFIG_PATH: &str = "conf/params.yaml";

#[derive(Debug, Serialize)]
struct BuildResponseData {
    dry_run: bool,
    params: FeatureParams,
    summary: BatchSummary,
    securities: Vec<SecurityReport>,
}

#[derive(Debug, Serialize)]
struct SecurityReport {
    sid: SecurityId,
    status: SecurityStatus,
    rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SecurityStatus {
    Written,
    Computed,
    Failed,
}

pub fn build(
    args: &BuildArgs,
    warehouse: &Warehouse,
    request_id: &str,
) -> Result<CommandResult, CliError> {
    let mut warnings = Vec::new();
    let (params, config) = load_config(args.config.as_deref(), &mut warnings)?;
    let sids = resolve_securities(args, warehouse)?;
    if sids.is_empty() {
        warnings.push(String::from("no securities selected; nothing to build"));
    }

    let mut reports = Vec::with_capacity(sids.len());
    let mut inputs = Vec::with_capacity(sids.len());
    for sid in sids {
        match warehouse.load_security_input(&sid) {
            Ok(input) => inputs.push(input),
            Err(error) => {
                warn!(%sid, %error, "failed to load security");
                reports.push(SecurityReport::failed(sid, error.to_string()));
            }
        }
    }
    let load_failures = reports.len();

    let batch = build_batch(&inputs, &config);
    let mut summary = batch.summary();
    for outcome in batch.outcomes {
        let report = match outcome.result {
            Err(error) => SecurityReport::failed(outcome.sid, error.to_string()),
            Ok(rows) if args.dry_run => SecurityReport {
                sid: outcome.sid,
                status: SecurityStatus::Computed,
                rows: rows.len(),
                error: None,
            },
            Ok(rows) => match warehouse.upsert_features(&outcome.sid, &rows, request_id) {
                Ok(written) => SecurityReport {
                    sid: outcome.sid,
                    status: SecurityStatus::Written,
                    rows: written,
                    error: None,
                },
                Err(error) => {
                    warn!(sid = %outcome.sid, %error, "failed to write features");
                    summary.succeeded -= 1;
                    summary.failed += 1;
                    summary.rows -= rows.len();
                    SecurityReport::failed(outcome.sid, error.to_string())
                }
            },
        };
        reports.push(report);
    }
    summary.securities += load_failures;
    summary.failed += load_failures;

    info!(
        securities = summary.securities,
        failed = summary.failed,
        rows = summary.rows,
        dry_run = args.dry_run,
        "features build finished"
    );

    let data = serde_json::to_value(BuildResponseData {
        dry_run: args.dry_run,
        params,
        summary,
        securities: reports,
    })?;
    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_failed_securities(summary.failed))
}

impl SecurityReport {
    fn failed(sid: SecurityId, error: String) -> Self {
        Self {
            sid,
            status: SecurityStatus::Failed,
            rows: 0,
            error: Some(error),
        }
    }
}

/// An explicit `--config` must exist. Without one, `conf/params.yaml` is used when
/// present and the built-in defaults otherwise.
fn load_config(
    path: Option<&Path>,
    warnings: &mut Vec<String>,
) -> Result<(FeatureParams, FeatureConfig), CliError> {
    let params = match path {
        Some(path) => FeatureParams::from_path(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.is_file() {
                FeatureParams::from_path(&default_path)?
            } else {
                warnings.push(format!(
                    "{DEFAULT_CONFIG_PATH} not found; using default feature parameters"
                ));
                FeatureParams::default()
            }
        }
    };
    let config = params.validate()?;
    Ok((params, config))
}

/// `--sid` values and the tickers file, in that order; every stored security when
/// neither is given.
fn resolve_securities(
    args: &BuildArgs,
    warehouse: &Warehouse,
) -> Result<Vec<SecurityId>, CliError> {
    let mut sids = args
        .sids
        .iter()
        .map(|raw| SecurityId::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(path) = &args.tickers {
        for sid in load_tickers(path)? {
            if !sids.contains(&sid) {
                sids.push(sid);
            }
        }
    }
    if sids.is_empty() && args.tickers.is_none() {
        sids = warehouse.list_securities()?;
    }
    Ok(sids)
}
