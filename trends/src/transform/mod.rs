//! Transformation module.
//!
//! This module turns wide regional CSV tables into trend series:
//! - Region: scope filter and region keys
//! - Reshape: wide to long
//! - Trend: per-region resampling and seasonal decomposition
//! - Reduce: stacking or joining a batch of tables
//! - Auxiliary: single-series files joined on date
//! - Pipeline: the `Preprocessor` that drives a batch

pub mod auxiliary;
pub mod decompose;
pub mod pipeline;
pub mod reduce;
pub mod region;
pub mod reshape;
pub mod trend;

pub use auxiliary::load_auxiliary;
pub use decompose::{seasonal_decompose, Decomposition};
pub use pipeline::*;
pub use reduce::{append_columns, append_rows, reduce};
pub use region::{filter_region, region_key, rewrite_region_keys, REQUIRED_COLUMNS};
pub use reshape::wide_to_long;
pub use trend::{trend_by_region, Cadence};

// =============================================================================
// Column Names
// =============================================================================

pub const REGION_NAME: &str = "RegionName";
pub const REGION_TYPE: &str = "RegionType";
pub const STATE_NAME: &str = "StateName";
pub const OBS_DATE: &str = "Obs_Date";
pub const VALUE: &str = "value";
pub const TREND: &str = "trend";
/// Source-set tag added to every row of a regional input.
pub const SET: &str = "set";

/// Date-labelled wide columns contain this character.
pub const DATE_SEPARATOR: char = '-';
