//! JSON export.
//!
//! Frames are written as a `{"data": [...]}` envelope holding one object per
//! row, keys in column order. Nulls, NaN and infinities are all `null`.

use polars::prelude::{DataFrame, DataType as PolarsType, Series};
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;

use crate::error::ExportResult;
use crate::table::{series_dates, series_floats, DataType, DATE_FORMAT};

/// JSON values of one column, by its semantic type.
fn column_values(series: &Series) -> ExportResult<Vec<Value>> {
    let values = match DataType::of(series.dtype()) {
        Some(DataType::Float) => series_floats(series)?
            .into_iter()
            .map(|v| v.and_then(Number::from_f64).map_or(Value::Null, Value::Number))
            .collect(),
        Some(DataType::Int) => series
            .cast(&PolarsType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect(),
        Some(DataType::Date) => series_dates(series)?
            .into_iter()
            .map(|d| d.map_or(Value::Null, |d| Value::String(d.format(DATE_FORMAT).to_string())))
            .collect(),
        Some(DataType::Str) | None => series
            .cast(&PolarsType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect(),
    };
    Ok(values)
}

/// Row objects, keys in column order.
pub fn to_records(df: &DataFrame) -> ExportResult<Vec<Value>> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| {
            let series = c.as_materialized_series();
            Ok((series.name().to_string(), column_values(series)?))
        })
        .collect::<ExportResult<Vec<_>>>()?;

    let records = (0..df.height())
        .map(|row| {
            let record: Map<String, Value> = columns
                .iter()
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect();
            Value::Object(record)
        })
        .collect();
    Ok(records)
}

/// Render the envelope as written to disk: `{"data":\n[...]\n}`.
pub fn to_json_string(df: &DataFrame) -> ExportResult<String> {
    let records = serde_json::to_string(&to_records(df)?)?;
    Ok(format!("{{\"data\":\n{}\n}}", records))
}

/// Write the envelope to `path`, overwriting any existing file.
pub fn export_json(df: &DataFrame, path: impl AsRef<Path>) -> ExportResult<()> {
    fs::write(path, to_json_string(df)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{date_series, float_series, from_series, str_series};
    use chrono::NaiveDate;
    use polars::prelude::NamedFrom;
    use serde_json::json;
    use tempfile::TempDir;

    fn frame() -> DataFrame {
        let day = NaiveDate::from_ymd_opt(2019, 1, 5);
        from_series(vec![
            str_series(
                "RegionName",
                vec![Some("Missoula, MT".into()), Some("United States".into())],
            ),
            date_series("Obs_Date", &[day, day]).unwrap(),
            float_series("value", vec![Some(412.0), Some(f64::NAN)]),
            float_series("trend", vec![None, Some(1.5)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_records_keep_column_order() {
        let records = to_records(&frame()).unwrap();
        assert_eq!(records.len(), 2);
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["RegionName", "Obs_Date", "value", "trend"]);
        assert_eq!(
            records[0],
            json!({"RegionName": "Missoula, MT", "Obs_Date": "2019-01-05", "value": 412.0, "trend": null})
        );
    }

    #[test]
    fn test_nan_exported_as_null() {
        let text = to_json_string(&frame()).unwrap();
        assert!(!text.contains("NaN"));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["data"][1]["value"], Value::Null);
        assert_eq!(parsed["data"][1]["trend"], json!(1.5));
    }

    #[test]
    fn test_integers_and_infinity() {
        let df = from_series(vec![
            Series::new("SizeRank".into(), vec![Some(3i64), None]),
            float_series("value", vec![Some(f64::INFINITY), Some(-0.5)]),
        ])
        .unwrap();
        let records = to_records(&df).unwrap();
        assert_eq!(records[0], json!({"SizeRank": 3, "value": null}));
        assert_eq!(records[1], json!({"SizeRank": null, "value": -0.5}));
    }

    #[test]
    fn test_envelope_layout() {
        let text = to_json_string(&DataFrame::empty()).unwrap();
        assert_eq!(text, "{\"data\":\n[]\n}");
    }

    #[test]
    fn test_export_overwrites_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_data.json");
        std::fs::write(&path, "stale").unwrap();

        export_json(&frame(), &path).unwrap();
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["data"].as_array().unwrap().len(), 2);
    }
}
