//! # Pitfeat Core
//!
//! Point-in-time feature assembly for daily equity data.
//!
//! ## Overview
//!
//! This crate is the pure part of pitfeat. It performs no I/O:
//!
//! - **Domain models** for price bars, fundamental disclosures and feature rows
//! - **Configuration** of indicator windows and the fundamental reporting lag
//! - **Technical Indicator Engine** computing causal rolling statistics
//! - **Point-in-Time Aligner** selecting the latest disclosure knowable on each trading date
//! - **Feature Frame Merger** left-joining both into one row per `(sid, date)`
//! - **Pipeline** running one security end to end, or a batch in parallel
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aligner`] | Backward-nearest eligibility lookup with a reporting lag |
//! | [`config`] | Raw YAML parameters and the validated [`FeatureConfig`] |
//! | [`domain`] | Domain models (`SecurityId`, `PriceBar`, `FundamentalRecord`, `FeatureRow`) |
//! | [`error`] | Core error types |
//! | [`indicators`] | Returns, volatility, momentum and trend indicators |
//! | [`merger`] | Left join of indicator rows and aligned fundamentals |
//! | [`pipeline`] | Per-security run and parallel batch fan-out |
//! | [`validate`] | Series-level input checks |
//!
//! ## Quick Start
//!
//! ```rust
//! use pitfeat_core::{build_features, FeatureConfig, SecurityInput, SecurityId};
//!
//! let sid = SecurityId::parse("BBCA.JK").unwrap();
//! let input = SecurityInput::new(sid, Vec::new(), Vec::new());
//! let rows = build_features(&input, &FeatureConfig::default()).unwrap();
//! assert!(rows.is_empty());
//! ```
//!
//! ## Error Handling
//!
//! Configuration problems surface as [`ConfigError`] before any security runs.
//! Bad input for one security surfaces as [`FeatureError`] and never affects
//! another security of the same batch. Indicator warm-up is not an error; it is
//! represented as `None`.

pub mod aligner;
pub mod config;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod merger;
pub mod pipeline;
pub mod validate;

pub use aligner::{align_as_of, AsOfSelection};
pub use config::{FeatureConfig, FeatureParams};
pub use domain::{
    day_of_week, eligibility_cutoff, format_date, is_end_of_month, parse_date, FeatureRow,
    FundamentalRatios, FundamentalRecord, PriceBar, SecurityId, TechnicalFeatures,
};
pub use error::{ConfigError, FeatureError, MalformedInput, ValidationError};
pub use indicators::compute_technical;
pub use merger::merge_features;
pub use pipeline::{
    build_batch, build_features, BatchReport, BatchSummary, SecurityInput, SecurityOutcome,
};
