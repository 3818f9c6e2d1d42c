//! Combining frames: diagonal concatenation and key-based full outer joins.

use polars::functions::concat_df_diagonal;
use polars::prelude::*;

use super::{column, has_column, is_all_null};
use crate::error::{TableError, TableResult};

/// Concatenate frames row-wise.
///
/// The result has the union of all columns in first-seen order; cells of a
/// column missing from one input are null. A column present with two types
/// is an error unless one side holds only nulls.
pub fn concat(frames: &[DataFrame]) -> TableResult<DataFrame> {
    if frames.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut schema: Vec<(PlSmallStr, DataType)> = Vec::new();
    for df in frames {
        for series in df.get_columns().iter().map(|c| c.as_materialized_series()) {
            let Some(idx) = schema.iter().position(|(name, _)| name == series.name()) else {
                schema.push((series.name().clone(), series.dtype().clone()));
                continue;
            };
            let (name, dtype) = &schema[idx];
            if dtype == series.dtype() || is_all_null(series) {
                continue;
            }
            let earlier_all_null = frames
                .iter()
                .filter_map(|f| column(f, name).ok())
                .filter(|s| s.dtype() == dtype)
                .all(is_all_null);
            if !earlier_all_null {
                return Err(TableError::TypeMismatch {
                    column: name.to_string(),
                    expected: dtype.to_string(),
                    found: series.dtype().to_string(),
                });
            }
            schema[idx].1 = series.dtype().clone();
        }
    }

    let aligned = frames
        .iter()
        .map(|df| {
            let mut df = df.clone();
            for (name, dtype) in &schema {
                if let Ok(series) = column(&df, name) {
                    if series.dtype() != dtype {
                        let cast = series.cast(dtype)?;
                        df.with_column(cast)?;
                    }
                }
            }
            Ok(df)
        })
        .collect::<TableResult<Vec<_>>>()?;

    Ok(concat_df_diagonal(&aligned)?)
}

/// Full outer join of `left` and `right` on the `on` key columns.
///
/// Output columns are `left`'s columns followed by `right`'s non-key
/// columns, keys coalesced. Rows are ordered by key; keys present on one
/// side only get nulls for the other side's columns. Non-key column names
/// must not collide.
pub fn outer_join(left: &DataFrame, right: &DataFrame, on: &[&str]) -> TableResult<DataFrame> {
    let mut left = left.clone();
    let mut right = right.clone();

    for key in on {
        let (l, r) = (column(&left, key)?, column(&right, key)?);
        if l.dtype() == r.dtype() {
            continue;
        }
        if is_all_null(l) {
            let cast = l.cast(r.dtype())?;
            left.with_column(cast)?;
        } else if is_all_null(r) {
            let cast = r.cast(l.dtype())?;
            right.with_column(cast)?;
        } else {
            return Err(TableError::TypeMismatch {
                column: key.to_string(),
                expected: l.dtype().to_string(),
                found: r.dtype().to_string(),
            });
        }
    }

    let clash = right
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .filter(|n| !on.contains(n))
        .find(|n| has_column(&left, n))
        .map(str::to_string);
    if let Some(name) = clash {
        return Err(TableError::DuplicateColumn(name));
    }

    let keys: Vec<Expr> = on.iter().map(|k| col(*k)).collect();
    let args = JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns);
    let joined = left
        .lazy()
        .join(right.lazy(), keys.clone(), keys, args)
        .sort(on.to_vec(), SortMultipleOptions::default().with_maintain_order(true))
        .collect()?;
    Ok(joined)
}
