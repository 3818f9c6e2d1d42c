//! Error types for the housing trends pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - reading and decoding CSV files
//! - [`CellError`] - a single malformed cell (bad date label, non-numeric value)
//! - [`TableError`] - column lookups and schema compatibility on typed tables
//! - [`DecomposeError`] - seasonal decomposition preconditions
//! - [`TransformError`] - one stage of the per-file transform
//! - [`ConfigError`] - configuration and run plans
//! - [`ExportError`] - writing the JSON envelope
//! - [`PipelineError`] - top-level orchestration errors, tagged with the input file
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use polars::prelude::PolarsError;
use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading a CSV file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the file content.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    FormatError(#[from] csv::Error),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Header row cannot name a table (e.g. a repeated column name).
    #[error("Invalid header row: {0}")]
    InvalidHeader(String),

    /// The CSV reader rejected the content.
    #[error("Failed to read CSV: {0}")]
    Polars(#[from] PolarsError),
}

// =============================================================================
// Cell Errors
// =============================================================================

/// A malformed cell, with as much location context as is known.
#[derive(Debug, Clone, PartialEq)]
pub struct CellError {
    pub row: Option<usize>,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(row) = self.row {
            write!(f, "Row {}, ", row)?;
        }
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "column '{}' (value '{}'): {}", col, val, self.message)
            }
            (Some(col), None) => write!(f, "column '{}': {}", col, self.message),
            (None, Some(val)) => write!(f, "value '{}': {}", val, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CellError {}

impl CellError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            row: None,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

// =============================================================================
// Table Errors
// =============================================================================

/// Errors from frame operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    /// Column not present in the table.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Two columns with the same name.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// A column appears with two different types.
    #[error("Column '{column}' has type {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Column length differs from the table's row count.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Any other polars failure.
    #[error("{0}")]
    Polars(String),
}

impl From<PolarsError> for TableError {
    fn from(err: PolarsError) -> Self {
        TableError::Polars(err.to_string())
    }
}

// =============================================================================
// Decomposition Errors
// =============================================================================

/// Errors from the seasonal decomposition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecomposeError {
    /// Fewer than two complete seasonal cycles.
    #[error("need {required} observations (two full cycles), got {actual}")]
    TooShort { required: usize, actual: usize },

    /// The series contains a missing value.
    #[error("series has a missing value at position {0}")]
    MissingValue(usize),

    /// Period below 2.
    #[error("invalid seasonal period {0}")]
    InvalidPeriod(usize),
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors from one transform stage (filter, reshape, trend, reduce).
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Required column missing or incompatible schemas.
    #[error("{0}")]
    Schema(String),

    /// Malformed date or value cell.
    #[error("{0}")]
    Parse(#[from] CellError),

    /// A region's series is too short for decomposition.
    #[error("region '{region}': {source}")]
    InsufficientData {
        region: String,
        #[source]
        source: DecomposeError,
    },
}

impl From<TableError> for TransformError {
    fn from(err: TableError) -> Self {
        TransformError::Schema(err.to_string())
    }
}

impl From<PolarsError> for TransformError {
    fn from(err: PolarsError) -> Self {
        TableError::from(err).into()
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while building a configuration or reading a run plan.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A date option is not `YYYY-MM-DD`.
    #[error("Invalid {field} '{value}': expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    /// `min_date` is not before `max_date`.
    #[error("Empty date window: min_date {min} is not before max_date {max}")]
    EmptyWindow { min: String, max: String },

    /// Empty state filter.
    #[error("State filter must not be empty")]
    EmptyStateFilter,

    /// Required environment variable not set.
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),

    /// An `--input FILE=SET` argument without a label.
    #[error("Invalid input spec '{0}': expected FILE=SET")]
    InvalidInputSpec(String),

    /// Run plan could not be read.
    #[error("Run plan IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Run plan is not valid JSON.
    #[error("Run plan JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the JSON envelope.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Export IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Export JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A column could not be read.
    #[error("Export error: {0}")]
    Table(#[from] TableError),
}

impl From<PolarsError> for ExportError {
    fn from(err: PolarsError) -> Self {
        ExportError::Table(err.into())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by
/// [`crate::transform::pipeline::Preprocessor::transform_list`]. Every
/// per-file failure carries the offending input path.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV could not be read.
    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: CsvError,
    },

    /// Required columns missing or schemas incompatible.
    #[error("Schema error in {path}: {message}")]
    Schema { path: String, message: String },

    /// A region's series too short for decomposition.
    #[error("Insufficient data in {path}: region '{region}': {source}")]
    InsufficientData {
        path: String,
        region: String,
        #[source]
        source: DecomposeError,
    },

    /// Malformed date or value.
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: CellError,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// A blocking transform task panicked or was cancelled.
    #[error("Transform task failed: {0}")]
    Task(String),

    /// No inputs given.
    #[error("No input files to transform")]
    EmptyInput,
}

impl PipelineError {
    /// Attach the input path to a stage error.
    pub fn at(path: impl Into<String>, err: TransformError) -> Self {
        let path = path.into();
        match err {
            TransformError::Schema(message) => PipelineError::Schema { path, message },
            TransformError::Parse(source) => PipelineError::Parse { path, source },
            TransformError::InsufficientData { region, source } => {
                PipelineError::InsufficientData { path, region, source }
            }
        }
    }

    /// Attach the input path to a CSV error.
    pub fn csv(path: impl Into<String>, source: CsvError) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for transform stages.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for JSON export.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
