//! Per-region trend extraction.
//!
//! Each region's series is resampled onto a regular calendar (weekly or
//! monthly, inferred from the first two observations), decomposed, and the
//! trend component is attached as a `trend` column.

use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::{DataFrame, IdxCa, IdxSize, NamedFrom};

use super::decompose::seasonal_decompose;
use super::{OBS_DATE, REGION_NAME, TREND, VALUE};
use crate::config::InsufficientDataPolicy;
use crate::error::{CellError, DecomposeError, TransformError, TransformResult};
use crate::logs::log_warning;
use crate::table::combine::concat;
use crate::table::{
    add_column, date_series, dates, float_series, floats, null_series, partition, replace_column,
    sort_by, strings, DataType,
};

/// Observation cadence of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Weekly,
    Monthly,
}

impl Cadence {
    /// A 7-day gap between the first two observations means weekly data.
    pub fn infer(first: NaiveDate, second: NaiveDate) -> Self {
        if second - first == Duration::days(7) {
            Cadence::Weekly
        } else {
            Cadence::Monthly
        }
    }

    /// Seasonal period in observations (one year).
    pub fn period(self) -> usize {
        match self {
            Cadence::Weekly => 52,
            Cadence::Monthly => 12,
        }
    }

    /// Regular calendar covering `first..=last`.
    ///
    /// Weekly dates are anchored at `first`; monthly dates are month ends.
    pub fn calendar(self, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        match self {
            Cadence::Weekly => {
                let mut date = first;
                while date <= last {
                    dates.push(date);
                    date += Duration::days(7);
                }
            }
            Cadence::Monthly => {
                let (mut year, mut month) = (first.year(), first.month());
                while let Some(end) = month_end(year, month) {
                    if end > last {
                        break;
                    }
                    dates.push(end);
                    (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                }
            }
        }
        dates
    }

    /// Source row for each calendar date, given ascending observation dates.
    ///
    /// Weekly calendars back-fill (first observation at or after the date),
    /// monthly calendars forward-fill (last observation at or before it).
    fn fill_rows(self, observed: &[NaiveDate], calendar: &[NaiveDate]) -> Vec<Option<usize>> {
        calendar
            .iter()
            .map(|date| match self {
                Cadence::Weekly => {
                    let idx = observed.partition_point(|d| d < date);
                    (idx < observed.len()).then_some(idx)
                }
                Cadence::Monthly => observed.partition_point(|d| d <= date).checked_sub(1),
            })
            .collect()
    }
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

fn observation_dates(series: &DataFrame) -> TransformResult<Vec<NaiveDate>> {
    dates(series, OBS_DATE)?
        .into_iter()
        .enumerate()
        .map(|(row, date)| {
            date.ok_or_else(|| {
                TransformError::from(
                    CellError::new("observation date is missing")
                        .with_row(row)
                        .with_column(OBS_DATE),
                )
            })
        })
        .collect()
}

/// Resample one region's series (sorted by `Obs_Date`) onto its cadence calendar.
///
/// Every column is carried by the fill rule; `Obs_Date` then holds the
/// calendar date.
pub fn resample(series: &DataFrame, cadence: Cadence) -> TransformResult<DataFrame> {
    let observed = observation_dates(series)?;
    let (Some(&first), Some(&last)) = (observed.first(), observed.last()) else {
        return Ok(series.clone());
    };

    let calendar = cadence.calendar(first, last);
    let sources: Vec<Option<IdxSize>> = cadence
        .fill_rows(&observed, &calendar)
        .into_iter()
        .map(|row| row.map(|r| r as IdxSize))
        .collect();

    let mut resampled = series.take(&IdxCa::new("rows".into(), sources))?;
    let calendar: Vec<Option<NaiveDate>> = calendar.into_iter().map(Some).collect();
    replace_column(&mut resampled, date_series(OBS_DATE, &calendar)?)?;
    Ok(resampled)
}

/// Trend for a single region's series.
pub fn trend_series(series: &DataFrame, region: &str) -> TransformResult<DataFrame> {
    let insufficient = |source: DecomposeError| TransformError::InsufficientData {
        region: region.to_string(),
        source,
    };

    let series = sort_by(series, &[OBS_DATE])?;
    let observed = observation_dates(&series)?;
    if observed.len() < 2 {
        return Err(insufficient(DecomposeError::TooShort {
            required: 2,
            actual: observed.len(),
        }));
    }

    let cadence = Cadence::infer(observed[0], observed[1]);
    let mut resampled = resample(&series, cadence)?;

    let values = floats(&resampled, VALUE)?;
    let decomposition = seasonal_decompose(&values, cadence.period()).map_err(insufficient)?;

    let trend = values
        .iter()
        .zip(decomposition.trend)
        .map(|(value, trend)| value.and(trend))
        .collect();
    add_column(&mut resampled, float_series(TREND, trend))?;
    Ok(resampled)
}

fn with_empty_trend(long: &DataFrame) -> TransformResult<DataFrame> {
    let mut empty = long.clear();
    add_column(&mut empty, null_series(TREND, DataType::Float, 0))?;
    Ok(empty)
}

/// Attach a `trend` column to every region of a long frame.
///
/// Rows are partitioned by `RegionName` and each region is trended on its
/// own; the result is ordered by region, then date.
pub fn trend_by_region(long: &DataFrame, policy: InsufficientDataPolicy) -> TransformResult<DataFrame> {
    let mut trended = Vec::new();
    for series in partition(long, REGION_NAME)? {
        let region = strings(&series, REGION_NAME)?
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_default();
        match trend_series(&series, &region) {
            Ok(df) => trended.push(df),
            Err(TransformError::InsufficientData { region, source })
                if policy == InsufficientDataPolicy::Skip =>
            {
                log_warning(format!("Skipping region '{}': {}", region, source));
            }
            Err(e) => return Err(e),
        }
    }

    if trended.is_empty() {
        return with_empty_trend(long);
    }
    Ok(concat(&trended)?)
}
