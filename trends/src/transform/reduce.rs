//! Reducing a batch of trended frames into one.

use polars::prelude::DataFrame;

use super::{OBS_DATE, REGION_NAME, SET, STATE_NAME, TREND, VALUE};
use crate::config::ReduceMode;
use crate::error::TransformResult;
use crate::table::combine::{concat, outer_join};
use crate::table::{drop_columns, has_column, rename, sort_by};

/// Keys of the column join.
pub const JOIN_KEYS: [&str; 2] = [REGION_NAME, OBS_DATE];

/// Stack frames row-wise; each row keeps its `set` tag.
pub fn append_rows(frames: &[DataFrame]) -> TransformResult<DataFrame> {
    Ok(concat(frames)?)
}

/// Rename `value`/`trend` to `value_<set>`/`trend_<set>` and drop the
/// columns that would clash across sets.
pub fn label_columns(df: &DataFrame, set: &str) -> TransformResult<DataFrame> {
    let mut df = df.clone();
    rename(&mut df, TREND, &format!("{}_{}", TREND, set))?;
    rename(&mut df, VALUE, &format!("{}_{}", VALUE, set))?;
    let clashing: Vec<&str> = [SET, STATE_NAME]
        .into_iter()
        .filter(|name| has_column(&df, name))
        .collect();
    Ok(drop_columns(&df, &clashing)?)
}

/// Full outer join of labelled frames on `(RegionName, Obs_Date)`, in order.
///
/// Unmatched rows get nulls for the other sets' columns; the result is
/// sorted by the join keys.
pub fn append_columns(frames: &[(String, DataFrame)]) -> TransformResult<DataFrame> {
    let mut labelled = frames.iter().map(|(set, df)| label_columns(df, set));

    let Some(first) = labelled.next() else {
        return Ok(DataFrame::empty());
    };
    let mut merged = sort_by(&first?, &JOIN_KEYS)?;
    for df in labelled {
        merged = outer_join(&merged, &df?, &JOIN_KEYS)?;
    }
    Ok(merged)
}

/// Reduce `(set, frame)` pairs in the given order.
pub fn reduce(frames: Vec<(String, DataFrame)>, mode: ReduceMode) -> TransformResult<DataFrame> {
    match mode {
        ReduceMode::Stack => {
            let frames: Vec<DataFrame> = frames.into_iter().map(|(_, df)| df).collect();
            append_rows(&frames)
        }
        ReduceMode::Join => append_columns(&frames),
    }
}
