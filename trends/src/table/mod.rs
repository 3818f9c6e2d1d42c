//! Typed access to polars `DataFrame`s.
//!
//! Every stage passes `DataFrame`s around. This module names the four
//! semantic column types the pipeline cares about ([`DataType`]) and reads
//! columns as typed Rust vectors or builds them back, with schema errors
//! reported as [`TableError`]s.
//!
//! ```text
//! DataFrame
//! ├── "RegionName" : string   ["Missoula, MT", "Helena, MT", ...]
//! ├── "Obs_Date"   : date     [2019-01-05, 2019-01-12, ...]
//! └── "value"      : float    [412.0, null, ...]
//! ```

pub mod combine;

use chrono::{Datelike, NaiveDate};
use polars::prelude::{
    BooleanChunked, DataFrame, DataType as PolarsType, NamedFrom, Series, SortMultipleOptions,
};
use serde::Serialize;
use std::fmt;

use crate::error::{TableError, TableResult};

/// Date format used for every date rendered as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `1970-01-01` counted from `0001-01-01`; polars dates are days since the epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

// =============================================================================
// Data Types
// =============================================================================

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Str,
    Date,
    Int,
    Float,
}

impl DataType {
    /// Semantic type of a polars column type, if it has one.
    pub fn of(dtype: &PolarsType) -> Option<Self> {
        match dtype {
            PolarsType::String => Some(DataType::Str),
            PolarsType::Date => Some(DataType::Date),
            d if d.is_integer() => Some(DataType::Int),
            d if d.is_float() => Some(DataType::Float),
            _ => None,
        }
    }

    /// Storage type used for columns built by the pipeline.
    pub fn to_polars(self) -> PolarsType {
        match self {
            DataType::Str => PolarsType::String,
            DataType::Date => PolarsType::Date,
            DataType::Int => PolarsType::Int64,
            DataType::Float => PolarsType::Float64,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Str => "string",
            DataType::Date => "date",
            DataType::Int => "integer",
            DataType::Float => "float",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Schema
// =============================================================================

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|n| n.to_string()).collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Column by name, as a series.
pub fn column<'a>(df: &'a DataFrame, name: &str) -> TableResult<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| TableError::MissingColumn(name.to_string()))
}

/// Semantic type of a column; `None` for types outside [`DataType`].
pub fn dtype(df: &DataFrame, name: &str) -> TableResult<Option<DataType>> {
    Ok(DataType::of(column(df, name)?.dtype()))
}

/// True if the series holds no value.
pub fn is_all_null(series: &Series) -> bool {
    series.null_count() == series.len()
}

// =============================================================================
// Typed Reads
// =============================================================================

/// Any column rendered as text (numbers and dates included).
pub fn strings(df: &DataFrame, name: &str) -> TableResult<Vec<Option<String>>> {
    let text = column(df, name)?.cast(&PolarsType::String)?;
    Ok(text.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Numeric column as floats, widening integers.
pub fn floats(df: &DataFrame, name: &str) -> TableResult<Vec<Option<f64>>> {
    series_floats(column(df, name)?)
}

/// Numeric series as floats; an all-null series of any type reads as nulls.
pub fn series_floats(series: &Series) -> TableResult<Vec<Option<f64>>> {
    if is_all_null(series) {
        return Ok(vec![None; series.len()]);
    }
    match DataType::of(series.dtype()) {
        Some(dtype) if dtype.is_numeric() => {
            let widened = series.cast(&PolarsType::Float64)?;
            Ok(widened.f64()?.into_iter().collect())
        }
        _ => Err(mismatch(series, DataType::Float)),
    }
}

/// Date column as calendar dates.
pub fn dates(df: &DataFrame, name: &str) -> TableResult<Vec<Option<NaiveDate>>> {
    series_dates(column(df, name)?)
}

pub fn series_dates(series: &Series) -> TableResult<Vec<Option<NaiveDate>>> {
    if series.dtype() != &PolarsType::Date {
        return Err(mismatch(series, DataType::Date));
    }
    let days = series.cast(&PolarsType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + EPOCH_DAYS_FROM_CE)))
        .collect())
}

fn mismatch(series: &Series, expected: DataType) -> TableError {
    TableError::TypeMismatch {
        column: series.name().to_string(),
        expected: expected.to_string(),
        found: series.dtype().to_string(),
    }
}

// =============================================================================
// Column Builders
// =============================================================================

pub fn str_series(name: &str, values: Vec<Option<String>>) -> Series {
    Series::new(name.into(), values)
}

pub fn float_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

pub fn date_series(name: &str, values: &[Option<NaiveDate>]) -> TableResult<Series> {
    let days: Vec<Option<i32>> = values
        .iter()
        .map(|d| d.map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
        .collect();
    Ok(Series::new(name.into(), days).cast(&PolarsType::Date)?)
}

/// A column of `len` nulls.
pub fn null_series(name: &str, dtype: DataType, len: usize) -> Series {
    Series::full_null(name.into(), len, &dtype.to_polars())
}

/// Build a frame, checking names are unique and lengths agree.
pub fn from_series(columns: Vec<Series>) -> TableResult<DataFrame> {
    let mut df = DataFrame::empty();
    for series in columns {
        add_column(&mut df, series)?;
    }
    Ok(df)
}

// =============================================================================
// Frame Edits
// =============================================================================

/// Append a column at the end.
pub fn add_column(df: &mut DataFrame, series: Series) -> TableResult<()> {
    let name = series.name().to_string();
    if has_column(df, &name) {
        return Err(TableError::DuplicateColumn(name));
    }
    let actual = series.len();
    if df.width() > 0 && actual != df.height() {
        return Err(TableError::LengthMismatch {
            column: name,
            expected: df.height(),
            actual,
        });
    }
    df.with_column(series)?;
    Ok(())
}

/// Replace an existing column in place, keeping its position.
pub fn replace_column(df: &mut DataFrame, series: Series) -> TableResult<()> {
    let name = series.name().to_string();
    if !has_column(df, &name) {
        return Err(TableError::MissingColumn(name));
    }
    let actual = series.len();
    if actual != df.height() {
        return Err(TableError::LengthMismatch {
            column: name,
            expected: df.height(),
            actual,
        });
    }
    df.with_column(series)?;
    Ok(())
}

pub fn rename(df: &mut DataFrame, from: &str, to: &str) -> TableResult<()> {
    column(df, from)?;
    if from == to {
        return Ok(());
    }
    if has_column(df, to) {
        return Err(TableError::DuplicateColumn(to.to_string()));
    }
    df.rename(from, to.into())?;
    Ok(())
}

/// Remove columns; every name must exist.
pub fn drop_columns(df: &DataFrame, names: &[&str]) -> TableResult<DataFrame> {
    let mut out = df.clone();
    for name in names {
        column(&out, name)?;
        out = out.drop(name)?;
    }
    Ok(out)
}

/// Keep the rows whose mask entry is true.
pub fn filter_rows(df: &DataFrame, mask: Vec<bool>) -> TableResult<DataFrame> {
    Ok(df.filter(&BooleanChunked::new("mask".into(), mask))?)
}

/// Stable ascending sort by the given key columns, nulls first.
pub fn sort_by(df: &DataFrame, keys: &[&str]) -> TableResult<DataFrame> {
    for key in keys {
        column(df, key)?;
    }
    let options = SortMultipleOptions::default().with_maintain_order(true);
    Ok(df.sort(keys.to_vec(), options)?)
}

/// One frame per distinct value of `key`, in ascending key order.
pub fn partition(df: &DataFrame, key: &str) -> TableResult<Vec<DataFrame>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    let sorted = sort_by(df, &[key])?;
    Ok(sorted.partition_by_stable([key], true)?)
}
