//! # Housing Trends - regional housing-market trend preprocessor
//!
//! Housing Trends turns wide housing-market CSV exports (one column per
//! observation date, one row per region) into long per-region trend series,
//! merges several metrics and writes a JSON artifact for the front end.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Wide CSV   │────▶│   Region    │────▶│  Reshape    │────▶│   Trend     │────▶│   Reduce    │──▶ JSON
//! │  (auto-enc) │     │ scope + key │     │ wide → long │     │ (decompose) │     │ stack/join  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use housing_trends::{export_json, InputSpec, PipelineConfig, Preprocessor, ReduceMode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::new("2019-01-01", "2022-01-01", "MT").unwrap();
//!     let inputs = vec![InputSpec::new("zhvi.csv", "zhvi")];
//!     let df = Preprocessor::new(config)
//!         .transform_list(&inputs, ReduceMode::Stack)
//!         .await
//!         .unwrap();
//!     export_json(&df, "input_data.json").unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Pipeline configuration and run plans
//! - [`table`] - Typed access to polars data frames
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Region scope, reshape, trend, reduce and pipeline
//! - [`export`] - JSON envelope export
//! - [`logs`] - Progress logs

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod table;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Export
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CellError,
    ConfigError,
    CsvError,
    DecomposeError,
    ExportError,
    PipelineError,
    TableError,
    TransformError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    DateWindow,
    InputSpec,
    InsufficientDataPolicy,
    Job,
    JobKind,
    PipelineConfig,
    ReduceMode,
    RunPlan,
    StateScope,
};

// =============================================================================
// Re-exports - Table
// =============================================================================

pub use table::DataType;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    format_delimiter,
    parse_bytes_auto,
    parse_csv_file_auto,
    parse_table,
    ParseResult,
};

// =============================================================================
// Re-exports - Transform stages
// =============================================================================

pub use transform::{
    append_columns,
    append_rows,
    filter_region,
    load_auxiliary,
    reduce,
    region_key,
    rewrite_region_keys,
    seasonal_decompose,
    trend_by_region,
    wide_to_long,
    Cadence,
    Decomposition,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{run_plan, JobSummary, Preprocessor};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export_json, to_json_string, to_records};
