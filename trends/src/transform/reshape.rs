//! Wide-to-long reshaping.
//!
//! ```text
//! RegionName    StateName  2019-01-05  2019-01-12        RegionName    StateName  Obs_Date    value
//! Missoula, MT  MT         412         418          →    Missoula, MT  MT         2019-01-05  412
//!                                                        Missoula, MT  MT         2019-01-12  418
//! ```

use chrono::NaiveDate;
use polars::prelude::{DataFrame, Series, UnpivotDF};
use std::collections::HashMap;

use super::region::require_columns;
use super::{DATE_SEPARATOR, OBS_DATE, REGION_NAME, SET, STATE_NAME, VALUE};
use crate::config::DateWindow;
use crate::error::{CellError, TableResult, TransformResult};
use crate::table::{
    add_column, column, column_names, date_series, filter_rows, float_series, floats,
    from_series, has_column, series_floats, str_series, strings, DATE_FORMAT,
};

/// Column holding the source column label after unpivoting.
const UNPIVOT_LABEL: &str = "variable";

/// Date-labelled columns inside the window, and the identifier columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DateColumns {
    /// Column label and its parsed date, in frame order.
    pub dates: Vec<(String, NaiveDate)>,
    /// Every label without the date separator.
    pub ids: Vec<String>,
}

/// Split column labels into date columns within `window` and identifier columns.
///
/// A label containing `-` is a date and must parse as `YYYY-MM-DD`.
pub fn date_columns(df: &DataFrame, window: &DateWindow) -> TransformResult<DateColumns> {
    let mut dates = Vec::new();
    let mut ids = Vec::new();

    for name in column_names(df) {
        if !name.contains(DATE_SEPARATOR) {
            ids.push(name);
            continue;
        }
        let date = NaiveDate::parse_from_str(&name, DATE_FORMAT).map_err(|_| {
            CellError::new("date column label is not YYYY-MM-DD").with_column(name.as_str())
        })?;
        if window.contains(date) {
            dates.push((name, date));
        }
    }

    Ok(DateColumns { dates, ids })
}

/// Values of one date column as floats; text cells are parse errors.
fn observed_values(df: &DataFrame, label: &str) -> TransformResult<Vec<Option<f64>>> {
    if let Ok(values) = series_floats(column(df, label)?) {
        return Ok(values);
    }
    let (row, value) = strings(df, label)?
        .into_iter()
        .enumerate()
        .find_map(|(row, v)| v.map(|v| (row, v)))
        .unwrap_or_default();
    Err(CellError::new("value is not numeric")
        .with_row(row)
        .with_column(label)
        .with_value(value)
        .into())
}

/// Long frame from identifier columns plus `Obs_Date` and `value`.
fn long_frame(
    ids: &[Series],
    dates: &[Option<NaiveDate>],
    values: Vec<Option<f64>>,
) -> TransformResult<DataFrame> {
    let mut columns = ids.to_vec();
    columns.insert(2, date_series(OBS_DATE, dates)?);
    columns.insert(3, float_series(VALUE, values));
    Ok(from_series(columns)?)
}

/// Unpivot the date columns into `Obs_Date`/`value` rows.
///
/// Keeps `RegionName`, `StateName`, `Obs_Date`, `value` and `set` (when the
/// wide frame carries one). Rows come date by date, in column order. Null and
/// NaN values are dropped; integers are widened to floats; any other value
/// is a parse error.
pub fn wide_to_long(df: &DataFrame, window: &DateWindow) -> TransformResult<DataFrame> {
    require_columns(df, &[REGION_NAME, STATE_NAME])?;
    let layout = date_columns(df, window)?;

    let mut ids = vec![
        str_series(REGION_NAME, strings(df, REGION_NAME)?),
        str_series(STATE_NAME, strings(df, STATE_NAME)?),
    ];
    if has_column(df, SET) {
        ids.push(column(df, SET)?.clone());
    }

    if layout.dates.is_empty() {
        let empty: Vec<Series> = ids.iter().map(Series::clear).collect();
        return long_frame(&empty, &[], Vec::new());
    }

    let index: Vec<String> = ids.iter().map(|s| s.name().to_string()).collect();
    let mut wide = from_series(ids)?;
    for (label, _) in &layout.dates {
        add_column(&mut wide, float_series(label, observed_values(df, label)?))?;
    }
    let labels: Vec<&str> = layout.dates.iter().map(|(label, _)| label.as_str()).collect();
    let unpivoted = wide.unpivot(labels, index.iter().map(String::as_str).collect::<Vec<_>>())?;

    let by_label: HashMap<&str, NaiveDate> = layout
        .dates
        .iter()
        .map(|(label, date)| (label.as_str(), *date))
        .collect();
    let obs: Vec<Option<NaiveDate>> = strings(&unpivoted, UNPIVOT_LABEL)?
        .into_iter()
        .map(|label| label.and_then(|l| by_label.get(l.as_str()).copied()))
        .collect();
    let kept = index
        .iter()
        .map(|name| column(&unpivoted, name).cloned())
        .collect::<TableResult<Vec<_>>>()?;

    let values = floats(&unpivoted, VALUE)?;
    let mask = values.iter().map(|v| v.is_some_and(|v| !v.is_nan())).collect();
    let long = long_frame(&kept, &obs, values)?;
    Ok(filter_rows(&long, mask)?)
}
