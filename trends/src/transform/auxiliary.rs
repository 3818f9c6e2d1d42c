//! Auxiliary single-series files (FRED exports).
//!
//! Each file holds a date column and one percentage column. The value column
//! is renamed to the input's label and scaled to a fraction, then every series
//! is outer-joined on the date.

use chrono::NaiveDate;
use polars::prelude::{DataFrame, Series};

use crate::config::InputSpec;
use crate::error::{CellError, PipelineError, PipelineResult, TransformError, TransformResult};
use crate::logs::{log_info, log_success_indent};
use crate::parser::parse_csv_file_auto;
use crate::table::combine::outer_join;
use crate::table::{
    column_names, date_series, float_series, from_series, series_dates, series_floats, sort_by,
    DataType, DATE_FORMAT,
};

/// Missing-value marker used by FRED exports.
pub const MISSING_MARKER: &str = ".";

fn text_cells(series: &Series) -> TransformResult<Vec<Option<String>>> {
    let text = series.cast(&DataType::Str.to_polars())?;
    Ok(text.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn parse_dates(series: &Series) -> TransformResult<Vec<Option<NaiveDate>>> {
    if let Ok(dates) = series_dates(series) {
        return Ok(dates);
    }
    let column = series.name().to_string();
    text_cells(series)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            let error = || CellError::new("invalid date").with_row(row).with_column(column.as_str());
            match cell {
                Some(s) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map(Some)
                    .map_err(|_| error().with_value(s).into()),
                None => Err(error().into()),
            }
        })
        .collect()
}

fn parse_percents(series: &Series) -> TransformResult<Vec<Option<f64>>> {
    let values = match series_floats(series) {
        Ok(values) => values,
        Err(_) => {
            let column = series.name().to_string();
            text_cells(series)?
                .into_iter()
                .enumerate()
                .map(|(row, cell)| match cell {
                    None => Ok(None),
                    Some(s) if s == MISSING_MARKER || s.is_empty() => Ok(None),
                    Some(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
                        TransformError::from(
                            CellError::new("value is not numeric")
                                .with_row(row)
                                .with_column(column.as_str())
                                .with_value(s),
                        )
                    }),
                })
                .collect::<TransformResult<Vec<_>>>()?
        }
    };
    Ok(values.into_iter().map(|v| v.map(|v| v / 100.0)).collect())
}

/// Turn one loaded file into `(date, <label>)` with the value as a fraction.
pub fn prepare_series(df: &DataFrame, label: &str) -> TransformResult<DataFrame> {
    let [date, value] = df.get_columns() else {
        return Err(TransformError::Schema(format!(
            "expected a date column and one value column, found {} columns",
            df.width()
        )));
    };
    let (date, value) = (date.as_materialized_series(), value.as_materialized_series());

    let dates = parse_dates(date)?;
    let values = parse_percents(value)?;
    Ok(from_series(vec![
        date_series(date.name(), &dates)?,
        float_series(label, values),
    ])?)
}

/// Outer-join prepared series on their shared date column, sorted by date.
pub fn join_series(series: &[DataFrame]) -> TransformResult<DataFrame> {
    let Some((first, rest)) = series.split_first() else {
        return Ok(DataFrame::empty());
    };
    let date_column = column_names(first).into_iter().next().unwrap_or_default();

    let mut merged = sort_by(first, &[date_column.as_str()])?;
    for df in rest {
        let name = column_names(df).into_iter().next().unwrap_or_default();
        if name != date_column {
            return Err(TransformError::Schema(format!(
                "date column '{}' does not match '{}'",
                name, date_column
            )));
        }
        merged = outer_join(&merged, df, &[date_column.as_str()])?;
    }
    Ok(merged)
}

/// Load, scale and join auxiliary files in the given order.
pub fn load_auxiliary(inputs: &[InputSpec]) -> PipelineResult<DataFrame> {
    if inputs.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut series = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = input.input_file.display().to_string();
        log_info(format!("Loading auxiliary series {} as '{}'", path, input.set));

        let parsed = parse_csv_file_auto(&input.input_file, &[]).map_err(|e| PipelineError::csv(&path, e))?;
        let prepared = prepare_series(&parsed.table, &input.set).map_err(|e| PipelineError::at(&path, e))?;
        log_success_indent(format!("{} observations", prepared.height()), 1);
        series.push(prepared);
    }

    join_series(&series).map_err(|e| {
        let last = inputs.last().map(|i| i.input_file.display().to_string()).unwrap_or_default();
        PipelineError::at(last, e)
    })
}
