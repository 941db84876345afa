//! Per-security feature assembly and the parallel batch fan-out.
//!
//! [`build_features`] is a pure function of `(prices, fundamentals, config)`, so a
//! security can be retried at any time and yields identical rows. [`build_batch`]
//! runs many securities on the rayon pool; a rejected security is reported in its
//! own [`SecurityOutcome`] and never affects the others.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::validate::{validate_fundamentals, validate_prices};
use crate::{
    align_as_of, compute_technical, merge_features, FeatureConfig, FeatureError, FeatureRow,
    FundamentalRecord, PriceBar, SecurityId,
};

/// Everything the pipeline needs for one security.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityInput {
    pub sid: SecurityId,
    pub prices: Vec<PriceBar>,
    pub fundamentals: Vec<FundamentalRecord>,
}

impl SecurityInput {
    pub fn new(
        sid: SecurityId,
        prices: Vec<PriceBar>,
        fundamentals: Vec<FundamentalRecord>,
    ) -> Self {
        Self {
            sid,
            prices,
            fundamentals,
        }
    }
}

/// Validate, compute indicators, align fundamentals and merge for one security.
///
/// An empty price series yields no rows. Any malformed input rejects the whole
/// security; no partial rows are returned.
pub fn build_features(
    input: &SecurityInput,
    config: &FeatureConfig,
) -> Result<Vec<FeatureRow>, FeatureError> {
    let sid = &input.sid;
    validate_prices(sid, &input.prices).map_err(|reason| FeatureError::malformed(sid, reason))?;
    validate_fundamentals(sid, &input.fundamentals)
        .map_err(|reason| FeatureError::malformed(sid, reason))?;

    if input.prices.is_empty() {
        debug!(%sid, "no prices, nothing to build");
        return Ok(Vec::new());
    }

    let technical = compute_technical(&input.prices, config);
    let trading_dates: Vec<_> = technical.iter().map(|row| row.date).collect();
    let selections = align_as_of(&input.fundamentals, &trading_dates, config.funda_lag_days())
        .map_err(|reason| FeatureError::malformed(sid, reason))?;
    let rows = merge_features(sid, technical, &selections);

    debug!(
        %sid,
        rows = rows.len(),
        fundamentals = input.fundamentals.len(),
        "built feature rows"
    );
    Ok(rows)
}

/// Result of one security within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityOutcome {
    pub sid: SecurityId,
    pub result: Result<Vec<FeatureRow>, FeatureError>,
}

impl SecurityOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn row_count(&self) -> usize {
        self.result.as_ref().map_or(0, Vec::len)
    }
}

/// Outcomes of a batch, in the order the inputs were given.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<SecurityOutcome>,
}

/// Counts over a [`BatchReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub securities: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows: usize,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        BatchSummary {
            securities: self.outcomes.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            rows: self.outcomes.iter().map(SecurityOutcome::row_count).sum(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&SecurityId, &FeatureError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (&outcome.sid, err)))
    }
}

/// Build every security in parallel. Securities share no state.
pub fn build_batch(inputs: &[SecurityInput], config: &FeatureConfig) -> BatchReport {
    let outcomes: Vec<SecurityOutcome> = inputs
        .par_iter()
        .map(|input| {
            let result = build_features(input, config);
            if let Err(err) = &result {
                warn!(sid = %input.sid, error = %err, "security rejected");
            }
            SecurityOutcome {
                sid: input.sid.clone(),
                result,
            }
        })
        .collect();

    let report = BatchReport { outcomes };
    let summary = report.summary();
    info!(
        securities = summary.securities,
        succeeded = summary.succeeded,
        failed = summary.failed,
        rows = summary.rows,
        "feature batch complete"
    );
    report
}
