//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SecurityId`] | Validated, upper-cased ticker |
//! | [`PriceBar`] | Daily OHLCV bar with adjusted close |
//! | [`FundamentalRecord`] | Ratio disclosure stamped with period end and announce date |
//! | [`FundamentalRatios`] | Nullable profitability/leverage/valuation/growth ratios |
//! | [`TechnicalFeatures`] | Indicator values for one trading date |
//! | [`FeatureRow`] | Merged output row keyed by `(sid, date)` |
//!
//! Constructors validate value invariants; ordering invariants across a series are
//! checked by [`crate::validate`] before a security is processed.

mod date;
mod feature;
mod models;
mod security;

pub use date::{day_of_week, eligibility_cutoff, format_date, is_end_of_month, parse_date};
pub use feature::{FeatureRow, TechnicalFeatures};
pub use models::{FundamentalRatios, FundamentalRecord, PriceBar};
pub use security::SecurityId;
