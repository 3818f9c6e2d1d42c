//! High-level pipeline API: wide CSV files to one reduced trend table.
//!
//! This module combines every step for a batch of inputs:
//! parsing, region scoping, reshaping, trend extraction and reduction.
//!
//! # Example
//!
//! ```rust,ignore
//! use housing_trends::{InputSpec, PipelineConfig, Preprocessor, ReduceMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::new("2019-01-01", "2022-01-01", "MT")?;
//!     let inputs = vec![
//!         InputSpec::new("data/inventory.csv", "inventory"),
//!         InputSpec::new("data/zhvi.csv", "zhvi"),
//!     ];
//!     let table = Preprocessor::new(config)
//!         .transform_list(&inputs, ReduceMode::Stack)
//!         .await?;
//!     housing_trends::export_json(&table, "input_data.json")?;
//!     Ok(())
//! }
//! ```

use futures::future::try_join_all;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;

use super::auxiliary::load_auxiliary;
use super::reduce::reduce;
use super::region::{scope_regions, REQUIRED_COLUMNS};
use super::reshape::wide_to_long;
use super::trend::trend_by_region;
use super::SET;
use crate::config::{InputSpec, Job, JobKind, PipelineConfig, ReduceMode, RunPlan};
use crate::error::{PipelineError, PipelineResult, TransformResult};
use crate::export::export_json;
use crate::logs::{log_info, log_info_indent, log_success, log_success_indent};
use crate::parser::{format_delimiter, parse_csv_file_auto};
use crate::table::{add_column, column_names, has_column, replace_column, str_series};

/// Outcome of one exported job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub output: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Runs the per-file transform and batch reduction under one configuration.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PipelineConfig,
}

impl Preprocessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a wide CSV, tag every row with the input's set label and keep
    /// the regions in scope, keyed.
    pub fn load_data(&self, input: &InputSpec) -> PipelineResult<DataFrame> {
        let path = input.input_file.display().to_string();
        log_info(format!("Reading {} as '{}'", path, input.set));

        let parsed = parse_csv_file_auto(&input.input_file, &REQUIRED_COLUMNS)
            .map_err(|e| PipelineError::csv(&path, e))?;
        log_info_indent(
            format!(
                "encoding {}, delimiter '{}', {} rows",
                parsed.encoding,
                format_delimiter(parsed.delimiter),
                parsed.table.height()
            ),
            1,
        );

        tag_set(parsed.table, &input.set)
            .and_then(|wide| scope_regions(&wide, self.config.state_filter()))
            .map_err(|e| PipelineError::at(&path, e))
    }

    /// Load one input and turn it into a trended long table.
    pub fn transform_file(&self, input: &InputSpec) -> PipelineResult<DataFrame> {
        let path = input.input_file.display().to_string();
        let wide = self.load_data(input)?;
        log_info_indent(
            format!("{} regions in scope '{}'", wide.height(), self.config.state_filter()),
            1,
        );

        let trended = wide_to_long(&wide, self.config.window())
            .and_then(|long| trend_by_region(&long, self.config.insufficient_data()))
            .map_err(|e| PipelineError::at(&path, e))?;
        log_success_indent(format!("{}: {} trend rows", input.set, trended.height()), 1);
        Ok(trended)
    }

    /// Transform every input on the blocking pool and reduce the results in
    /// input order. The first failure aborts the batch.
    pub async fn transform_list(
        &self,
        inputs: &[InputSpec],
        mode: ReduceMode,
    ) -> PipelineResult<DataFrame> {
        if inputs.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let tasks = inputs.iter().cloned().map(|input| {
            let preprocessor = self.clone();
            async move {
                let set = input.set.clone();
                let table = tokio::task::spawn_blocking(move || preprocessor.transform_file(&input))
                    .await
                    .map_err(|e| PipelineError::Task(e.to_string()))??;
                Ok::<_, PipelineError>((set, table))
            }
        });
        let tables = try_join_all(tasks).await?;

        log_info(format!("Reducing {} tables ({:?})", tables.len(), mode));
        let reduced = reduce(tables, mode).map_err(|e| PipelineError::at(batch_label(inputs), e))?;
        log_success(format!(
            "{} rows, {} columns",
            reduced.height(),
            reduced.width()
        ));
        Ok(reduced)
    }

    /// Build one job's table and write its JSON export.
    pub async fn run_job(&self, job: &Job) -> PipelineResult<JobSummary> {
        log_info(format!("Job '{}' → {}", job.name, job.output.display()));

        let df = match job.kind {
            JobKind::Regional => self.transform_list(&job.inputs, job.mode).await?,
            JobKind::Auxiliary => load_auxiliary(&job.inputs)?,
        };
        export_json(&df, &job.output)?;
        log_success(format!("Wrote {}", job.output.display()));

        Ok(JobSummary {
            name: job.name.clone(),
            output: job.output.clone(),
            rows: df.height(),
            columns: column_names(&df),
        })
    }
}

/// Run every job of a plan in order.
pub async fn run_plan(plan: &RunPlan) -> PipelineResult<Vec<JobSummary>> {
    let preprocessor = Preprocessor::new(plan.config.clone());
    let mut summaries = Vec::with_capacity(plan.jobs.len());
    for job in &plan.jobs {
        summaries.push(preprocessor.run_job(job).await?);
    }
    Ok(summaries)
}

/// Add (or overwrite) the `set` column.
fn tag_set(mut df: DataFrame, set: &str) -> TransformResult<DataFrame> {
    let column = str_series(SET, vec![Some(set.to_string()); df.height()]);
    if has_column(&df, SET) {
        replace_column(&mut df, column)?;
    } else {
        add_column(&mut df, column)?;
    }
    Ok(df)
}

fn batch_label(inputs: &[InputSpec]) -> String {
    inputs
        .iter()
        .map(|i| i.input_file.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{dates, floats, strings};
    use crate::transform::{OBS_DATE, REGION_NAME, STATE_NAME, TREND, VALUE};
    use chrono::{Duration, NaiveDate};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const MONTHS: [&str; 24] = [
        "2019-01-31", "2019-02-28", "2019-03-31", "2019-04-30", "2019-05-31", "2019-06-30",
        "2019-07-31", "2019-08-31", "2019-09-30", "2019-10-31", "2019-11-30", "2019-12-31",
        "2020-01-31", "2020-02-29", "2020-03-31", "2020-04-30", "2020-05-31", "2020-06-30",
        "2020-07-31", "2020-08-31", "2020-09-30", "2020-10-31", "2020-11-30", "2020-12-31",
    ];

    fn config() -> PipelineConfig {
        PipelineConfig::new("2019-01-01", "2022-01-01", "MT").unwrap()
    }

    const FIRST_WEEK: &str = "2019-01-05";
    const WEEKS: usize = 110;
    const SKIPPED_WEEK: usize = 60;

    fn week(i: usize) -> NaiveDate {
        NaiveDate::parse_from_str(FIRST_WEEK, "%Y-%m-%d").unwrap() + Duration::days(7 * i as i64)
    }

    /// Wide file over `dates`: Helena (city, MT), Missoula metro, Casper (WY),
    /// national. Cell `m` of row `i` holds `base + 10 * i + m`.
    fn write_dates(dir: &Path, name: &str, base: f64, dates: &[(usize, String)]) -> PathBuf {
        let labels: Vec<&str> = dates.iter().map(|(_, d)| d.as_str()).collect();
        let mut csv = format!("RegionID,SizeRank,RegionName,RegionType,StateName,{}\n", labels.join(","));
        let rows = [
            ("1", "0", "United States", "country", ""),
            ("2", "120", "\"Missoula, MT\"", "msa", "MT"),
            ("3", "300", "Helena", "city", "MT"),
            ("4", "200", "Casper", "city", "WY"),
        ];
        for (i, (id, rank, region, kind, state)) in rows.iter().enumerate() {
            let values: Vec<String> = dates
                .iter()
                .map(|(m, _)| format!("{}", base + (i * 10 + m) as f64))
                .collect();
            csv.push_str(&format!("{},{},{},{},{},{}\n", id, rank, region, kind, state, values.join(",")));
        }
        let path = dir.join(name);
        fs::write(&path, csv).unwrap();
        path
    }

    /// Monthly wide file over `MONTHS`.
    fn write_wide(dir: &Path, name: &str, base: f64) -> PathBuf {
        let months: Vec<(usize, String)> =
            MONTHS.iter().enumerate().map(|(m, d)| (m, d.to_string())).collect();
        write_dates(dir, name, base, &months)
    }

    /// Weekly wide file with one week left out.
    fn write_weekly(dir: &Path, name: &str, base: f64) -> PathBuf {
        let weeks: Vec<(usize, String)> = (0..WEEKS)
            .filter(|w| *w != SKIPPED_WEEK)
            .map(|w| (w, week(w).format("%Y-%m-%d").to_string()))
            .collect();
        write_dates(dir, name, base, &weeks)
    }

    fn regions(df: &DataFrame) -> Vec<String> {
        let mut names: Vec<String> = strings(df, REGION_NAME).unwrap().into_iter().flatten().collect();
        names.dedup();
        names
    }

    #[test]
    fn test_transform_file_scopes_and_trends() {
        let dir = TempDir::new().unwrap();
        let path = write_wide(dir.path(), "zhvi.csv", 100.0);
        let table = Preprocessor::new(config())
            .transform_file(&InputSpec::new(&path, "zhvi"))
            .unwrap();

        assert_eq!(
            column_names(&table),
            vec![REGION_NAME, STATE_NAME, OBS_DATE, VALUE, SET, TREND]
        );
        // three regions in scope, 24 months each
        assert_eq!(table.height(), 72);
        assert_eq!(regions(&table), vec!["Helena, MT", "Missoula, MT", "United States"]);
    }

    #[tokio::test]
    async fn test_transform_list_stack() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            InputSpec::new(write_wide(dir.path(), "inventory.csv", 10.0), "inventory"),
            InputSpec::new(write_wide(dir.path(), "zhvi.csv", 100.0), "zhvi"),
        ];
        let table = Preprocessor::new(config())
            .transform_list(&inputs, ReduceMode::Stack)
            .await
            .unwrap();

        assert_eq!(table.height(), 144);
        let sets = strings(&table, SET).unwrap();
        assert_eq!(sets[0].as_deref(), Some("inventory"));
        assert_eq!(sets[143].as_deref(), Some("zhvi"));
    }

    #[tokio::test]
    async fn test_transform_list_stacks_weekly_and_monthly() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            InputSpec::new(write_weekly(dir.path(), "inventory.csv", 10.0), "inventory"),
            InputSpec::new(write_wide(dir.path(), "zhvi.csv", 100.0), "zhvi"),
        ];
        let table = Preprocessor::new(config())
            .transform_list(&inputs, ReduceMode::Stack)
            .await
            .unwrap();

        // the skipped week is back-filled, so every weekly region spans all weeks
        let weekly_rows = 3 * WEEKS;
        assert_eq!(table.height(), weekly_rows + 72);

        let sets = strings(&table, SET).unwrap();
        let trend = floats(&table, TREND).unwrap();
        let null_trend = |set: &str| {
            sets.iter()
                .zip(&trend)
                .filter(|(s, t)| s.as_deref() == Some(set) && t.is_none())
                .count()
        };
        // half a period missing at each end: 26 + 26 weeks, 6 + 6 months
        assert_eq!(null_trend("inventory"), 3 * 52);
        assert_eq!(null_trend("zhvi"), 3 * 12);

        // Helena leads the weekly block
        let names = strings(&table, REGION_NAME).unwrap();
        assert_eq!(names[0].as_deref(), Some("Helena, MT"));
        assert_eq!(names[WEEKS].as_deref(), Some("Missoula, MT"));

        let obs = dates(&table, OBS_DATE).unwrap();
        let values = floats(&table, VALUE).unwrap();
        assert_eq!(obs[SKIPPED_WEEK], Some(week(SKIPPED_WEEK)));
        assert_eq!(values[SKIPPED_WEEK], Some(10.0 + 20.0 + (SKIPPED_WEEK + 1) as f64));

        assert!(trend[..26].iter().all(Option::is_none));
        assert!(trend[26].is_some());
        assert!(trend[WEEKS - 26..WEEKS].iter().all(Option::is_none));
        assert!(trend[WEEKS - 27].is_some());

        assert_eq!(sets[weekly_rows].as_deref(), Some("zhvi"));
        assert_eq!(
            obs[weekly_rows],
            NaiveDate::from_ymd_opt(2019, 1, 31)
        );
    }

    #[tokio::test]
    async fn test_transform_list_join() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            InputSpec::new(write_wide(dir.path(), "listprice.csv", 10.0), "listprice"),
            InputSpec::new(write_wide(dir.path(), "saleprice.csv", 100.0), "saleprice"),
        ];
        let table = Preprocessor::new(config())
            .transform_list(&inputs, ReduceMode::Join)
            .await
            .unwrap();

        assert_eq!(
            column_names(&table),
            vec![
                REGION_NAME,
                OBS_DATE,
                "value_listprice",
                "trend_listprice",
                "value_saleprice",
                "trend_saleprice"
            ]
        );
        assert_eq!(table.height(), 72);
        assert_eq!(floats(&table, "value_saleprice").unwrap()[0], Some(120.0));
    }

    #[tokio::test]
    async fn test_missing_column_reports_path() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("broken.csv");
        fs::write(&bad, "RegionName,StateName,2019-01-31\nHelena,MT,1\n").unwrap();
        let inputs = vec![
            InputSpec::new(write_wide(dir.path(), "zhvi.csv", 100.0), "zhvi"),
            InputSpec::new(&bad, "broken"),
        ];

        let err = Preprocessor::new(config())
            .transform_list(&inputs, ReduceMode::Stack)
            .await
            .unwrap_err();
        match err {
            PipelineError::Schema { path, message } => {
                assert!(path.ends_with("broken.csv"));
                assert!(message.contains("RegionType"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let result = Preprocessor::new(config())
            .transform_list(&[], ReduceMode::Stack)
            .await;
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_run_plan_writes_every_job() {
        let dir = TempDir::new().unwrap();
        let zhvi = write_wide(dir.path(), "zhvi.csv", 100.0);
        let fred = dir.path().join("MDSP.csv");
        fs::write(&fred, "DATE,MDSP\n2019-01-01,9.9\n2019-04-01,9.8\n").unwrap();
        let regional_out = dir.path().join("input_data.json");
        let fred_out = dir.path().join("FRED_input_data.json");

        let plan = RunPlan::from_json(
            &serde_json::json!({
                "config": {"min_date": "2019-01-01", "max_date": "2022-01-01", "state_filter": "MT"},
                "jobs": [
                    {
                        "name": "stack",
                        "kind": "regional",
                        "inputs": [{"input_file": zhvi, "set": "zhvi"}],
                        "output": regional_out
                    },
                    {
                        "name": "fred",
                        "kind": "auxiliary",
                        "inputs": [{"input_file": fred, "set": "debt2income"}],
                        "output": fred_out
                    }
                ]
            })
            .to_string(),
        )
        .unwrap();

        let summaries = run_plan(&plan).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].rows, 72);
        assert_eq!(summaries[1].columns, vec!["DATE", "debt2income"]);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&fred_out).unwrap()).unwrap();
        assert_eq!(written["data"][0]["DATE"], "2019-01-01");
        assert!(regional_out.exists());
    }
}
