//! Region scope filter and region key builder.
//!
//! Sub-metro region names repeat across states ("Helena" exists in more than
//! one state), so every region below the metro tier is keyed as
//! `"<RegionName>, <StateName>"`.

use polars::prelude::{DataFrame, DataType as PolarsType};

use super::{REGION_NAME, REGION_TYPE, STATE_NAME};
use crate::config::StateScope;
use crate::error::{TransformError, TransformResult};
use crate::table::{column, filter_rows, has_column, replace_column, str_series, strings};

/// Region type of the coarsest (metro) tier; its names are never suffixed.
pub const COARSEST_REGION_TYPE: &str = "msa";

/// Identifier columns every wide table must have. They are always read as
/// text: zip-code region names carry leading zeros.
pub const REQUIRED_COLUMNS: [&str; 3] = [REGION_NAME, REGION_TYPE, STATE_NAME];

/// Fail with a schema error naming the first missing column.
pub fn require_columns(df: &DataFrame, names: &[&str]) -> TransformResult<()> {
    match names.iter().find(|name| !has_column(df, name)) {
        Some(missing) => Err(TransformError::Schema(format!(
            "missing required column '{}'",
            missing
        ))),
        None => Ok(()),
    }
}

/// Region key for one row.
///
/// Idempotent: a name already ending in `", <StateName>"` is left alone.
pub fn region_key(name: &str, region_type: Option<&str>, state: Option<&str>) -> String {
    let coarsest = region_type.is_some_and(|t| t.eq_ignore_ascii_case(COARSEST_REGION_TYPE));
    match state {
        Some(state) if !coarsest && !state.is_empty() => {
            let suffix = format!(", {}", state);
            if name.ends_with(&suffix) {
                name.to_string()
            } else {
                format!("{}{}", name, suffix)
            }
        }
        _ => name.to_string(),
    }
}

/// Store the identifier columns as strings.
///
/// Frames read without text overrides may carry numeric identifiers.
fn with_text_identifiers(df: &DataFrame) -> TransformResult<DataFrame> {
    require_columns(df, &REQUIRED_COLUMNS)?;
    let mut df = df.clone();
    for name in REQUIRED_COLUMNS {
        let series = column(&df, name)?;
        if series.dtype() != &PolarsType::String {
            let text = series.cast(&PolarsType::String)?;
            replace_column(&mut df, text)?;
        }
    }
    Ok(df)
}

/// Keep the rows in scope: the configured state plus the national row.
pub fn filter_region(df: &DataFrame, scope: &StateScope) -> TransformResult<DataFrame> {
    let df = with_text_identifiers(df)?;
    let states = strings(&df, STATE_NAME)?;
    let regions = strings(&df, REGION_NAME)?;
    let mask = states
        .iter()
        .zip(&regions)
        .map(|(state, region)| scope.retains(state.as_deref(), region.as_deref()))
        .collect();
    Ok(filter_rows(&df, mask)?)
}

/// Rewrite `RegionName` into the region key for every row.
pub fn rewrite_region_keys(df: &DataFrame) -> TransformResult<DataFrame> {
    let mut df = with_text_identifiers(df)?;
    let names = strings(&df, REGION_NAME)?;
    let types = strings(&df, REGION_TYPE)?;
    let states = strings(&df, STATE_NAME)?;

    let keys = names
        .iter()
        .zip(types.iter().zip(&states))
        .map(|(name, (kind, state))| {
            name.as_deref()
                .map(|name| region_key(name, kind.as_deref(), state.as_deref()))
        })
        .collect();

    replace_column(&mut df, str_series(REGION_NAME, keys))?;
    Ok(df)
}

/// Filter to the scope, then key the regions.
pub fn scope_regions(df: &DataFrame, scope: &StateScope) -> TransformResult<DataFrame> {
    rewrite_region_keys(&filter_region(df, scope)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_table;
    use crate::table;

    fn wide() -> DataFrame {
        parse_table(
            "RegionID,SizeRank,RegionName,RegionType,StateName,2019-01-31\n\
             102001,0,United States,country,,100\n\
             394862,120,\"Missoula, MT\",msa,MT,200\n\
             394700,300,Helena,city,MT,300\n\
             394400,200,Casper,city,WY,400\n\
             395000,400,Bozeman,msa,MT,500\n",
            ',',
            &REQUIRED_COLUMNS,
        )
        .unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        strings(df, REGION_NAME).unwrap().into_iter().flatten().collect()
    }

    #[test]
    fn test_filter_keeps_state_and_national_rows() {
        let scope: StateScope = "MT".parse().unwrap();
        let filtered = filter_region(&wide(), &scope).unwrap();

        assert_eq!(filtered.height(), 4);
        let states = strings(&filtered, STATE_NAME).unwrap();
        let regions = strings(&filtered, REGION_NAME).unwrap();
        for (state, region) in states.iter().zip(&regions) {
            assert!(state.as_deref() == Some("MT") || region.as_deref() == Some("United States"));
        }
    }

    #[test]
    fn test_national_scope_keeps_everything() {
        let filtered = filter_region(&wide(), &StateScope::National).unwrap();
        assert_eq!(filtered.height(), 5);
    }

    #[test]
    fn test_region_keys() {
        let keyed = scope_regions(&wide(), &"MT".parse().unwrap()).unwrap();
        assert_eq!(
            names(&keyed),
            vec!["United States", "Missoula, MT", "Helena, MT", "Bozeman"]
        );
    }

    #[test]
    fn test_region_key_rewrite_is_idempotent() {
        let once = rewrite_region_keys(&wide()).unwrap();
        let twice = rewrite_region_keys(&once).unwrap();
        assert_eq!(names(&once), names(&twice));

        assert_eq!(region_key("Helena", Some("city"), Some("MT")), "Helena, MT");
        assert_eq!(region_key("Helena, MT", Some("city"), Some("MT")), "Helena, MT");
        assert_eq!(region_key("Missoula, MT", Some("Msa"), Some("MT")), "Missoula, MT");
        assert_eq!(region_key("United States", Some("country"), None), "United States");
    }

    #[test]
    fn test_zip_codes_keep_leading_zeros() {
        let df = parse_table(
            "RegionName,RegionType,StateName,2019-01-31\n01001,zip,MA,1\n",
            ',',
            &REQUIRED_COLUMNS,
        )
        .unwrap();
        let keyed = scope_regions(&df, &"MA".parse().unwrap()).unwrap();
        assert_eq!(names(&keyed), vec!["01001, MA"]);
    }

    #[test]
    fn test_numeric_identifiers_become_text() {
        let df = parse_table(
            "RegionName,RegionType,StateName,2019-01-31\n59801,zip,MT,1\n",
            ',',
            &[],
        )
        .unwrap();
        let keyed = scope_regions(&df, &"MT".parse().unwrap()).unwrap();
        assert_eq!(names(&keyed), vec!["59801, MT"]);
        assert_eq!(
            table::dtype(&keyed, REGION_NAME).unwrap(),
            Some(table::DataType::Str)
        );
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let df = parse_table("RegionName,StateName\nHelena,MT\n", ',', &REQUIRED_COLUMNS).unwrap();
        let err = filter_region(&df, &"MT".parse().unwrap()).unwrap_err();
        assert!(matches!(err, TransformError::Schema(ref m) if m.contains("RegionType")));
    }
}
