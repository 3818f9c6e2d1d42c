//! Pipeline configuration.
//!
//! [`PipelineConfig`] is built once, validated, and passed by reference to
//! every stage; nothing is changed after construction. A [`RunPlan`] bundles
//! a configuration with the list of export jobs to run, loaded from JSON:
//!
//! ```json
//! {
//!   "config": { "min_date": "2019-01-01", "max_date": "2022-01-01", "state_filter": "MT" },
//!   "jobs": [
//!     {
//!       "name": "market",
//!       "kind": "regional",
//!       "mode": "stack",
//!       "inputs": [{ "input_file": "input_data/Metro_invt_fs_uc_sfrcondo_week.csv", "set": "inventory" }],
//!       "output": "output_data/input_data.json"
//!     },
//!     {
//!       "name": "fred",
//!       "kind": "auxiliary",
//!       "inputs": [{ "input_file": "input_data/MDSP.csv", "set": "debt2income" }],
//!       "output": "output_data/FRED_input_data.json"
//!     }
//!   ]
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::table::DATE_FORMAT;

/// Region name of the national aggregate row, kept under every state scope.
pub const NATIONAL_REGION: &str = "United States";

/// Environment variable holding the inclusive lower date bound.
pub const ENV_MIN_DATE: &str = "TRENDS_MIN_DATE";
/// Environment variable holding the exclusive upper date bound.
pub const ENV_MAX_DATE: &str = "TRENDS_MAX_DATE";
/// Environment variable holding the state filter.
pub const ENV_STATE: &str = "TRENDS_STATE";

// =============================================================================
// State Scope
// =============================================================================

/// Which rows of a wide table are processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateScope {
    /// Rows of one state (by two-letter code) plus the national row.
    State(String),
    /// Every row.
    National,
}

impl StateScope {
    /// True if a row with this state and region name is in scope.
    pub fn retains(&self, state: Option<&str>, region: Option<&str>) -> bool {
        match self {
            StateScope::National => true,
            StateScope::State(code) => state == Some(code.as_str()) || region == Some(NATIONAL_REGION),
        }
    }
}

impl FromStr for StateScope {
    type Err = ConfigError;

    /// `US` and `national` (any case) select the national scope.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::EmptyStateFilter);
        }
        if s.eq_ignore_ascii_case("us") || s.eq_ignore_ascii_case("national") {
            Ok(StateScope::National)
        } else {
            Ok(StateScope::State(s.to_string()))
        }
    }
}

impl fmt::Display for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateScope::State(code) => f.write_str(code),
            StateScope::National => f.write_str("national"),
        }
    }
}

// =============================================================================
// Date Window
// =============================================================================

/// Half-open observation window `[min, max)`.
///
/// Bounds are parsed dates; comparing parsed dates gives the same order as
/// comparing zero-padded ISO labels lexically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    min: NaiveDate,
    max: NaiveDate,
}

impl DateWindow {
    pub fn new(min_date: &str, max_date: &str) -> ConfigResult<Self> {
        let min = parse_date("min_date", min_date)?;
        let max = parse_date("max_date", max_date)?;
        if min >= max {
            return Err(ConfigError::EmptyWindow {
                min: min_date.to_string(),
                max: max_date.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> NaiveDate {
        self.min
    }

    pub fn max(&self) -> NaiveDate {
        self.max
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min <= date && date < self.max
    }
}

fn parse_date(field: &'static str, value: &str) -> ConfigResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ConfigError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

// =============================================================================
// Policies and Modes
// =============================================================================

/// What to do with a region whose series is too short to decompose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientDataPolicy {
    /// Abort the run.
    #[default]
    Fail,
    /// Drop the region and log a warning.
    Skip,
}

/// How the per-file tables of a batch are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceMode {
    /// Concatenate rows, each tagged by its `set` column.
    #[default]
    Stack,
    /// Outer-join `value_<set>`/`trend_<set>` columns on region and date.
    Join,
}

impl ReduceMode {
    /// `true` selects row stacking, `false` column joining.
    pub fn from_append_rows(append_rows: bool) -> Self {
        if append_rows {
            ReduceMode::Stack
        } else {
            ReduceMode::Join
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Immutable configuration shared by every stage of a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct PipelineConfig {
    window: DateWindow,
    state_filter: StateScope,
    insufficient_data: InsufficientDataPolicy,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    min_date: String,
    max_date: String,
    state_filter: String,
    #[serde(default)]
    insufficient_data: InsufficientDataPolicy,
}

impl TryFrom<RawConfig> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Ok(PipelineConfig::new(&raw.min_date, &raw.max_date, &raw.state_filter)?
            .with_insufficient_data(raw.insufficient_data))
    }
}

impl PipelineConfig {
    /// Validate and build a configuration.
    ///
    /// # Example
    /// ```ignore
    /// let config = PipelineConfig::new("2019-01-01", "2022-01-01", "MT")?;
    /// ```
    pub fn new(min_date: &str, max_date: &str, state_filter: &str) -> ConfigResult<Self> {
        Ok(Self {
            window: DateWindow::new(min_date, max_date)?,
            state_filter: state_filter.parse()?,
            insufficient_data: InsufficientDataPolicy::default(),
        })
    }

    /// Build from `TRENDS_MIN_DATE`, `TRENDS_MAX_DATE` and `TRENDS_STATE`.
    pub fn from_env() -> ConfigResult<Self> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let min = env::var(ENV_MIN_DATE).map_err(|_| ConfigError::MissingVar(ENV_MIN_DATE))?;
        let max = env::var(ENV_MAX_DATE).map_err(|_| ConfigError::MissingVar(ENV_MAX_DATE))?;
        let state = env::var(ENV_STATE).map_err(|_| ConfigError::MissingVar(ENV_STATE))?;
        Self::new(&min, &max, &state)
    }

    /// Set the insufficient-data policy
    pub fn with_insufficient_data(mut self, policy: InsufficientDataPolicy) -> Self {
        self.insufficient_data = policy;
        self
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn state_filter(&self) -> &StateScope {
        &self.state_filter
    }

    pub fn insufficient_data(&self) -> InsufficientDataPolicy {
        self.insufficient_data
    }
}

// =============================================================================
// Inputs and Run Plans
// =============================================================================

/// One input file and the set label its rows or columns are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub input_file: PathBuf,
    pub set: String,
}

impl InputSpec {
    pub fn new(input_file: impl Into<PathBuf>, set: impl Into<String>) -> Self {
        Self {
            input_file: input_file.into(),
            set: set.into(),
        }
    }
}

impl FromStr for InputSpec {
    type Err = ConfigError;

    /// Parse `FILE=SET`; the last `=` separates the label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('=') {
            Some((file, set)) if !file.is_empty() && !set.is_empty() => {
                Ok(InputSpec::new(file, set))
            }
            _ => Err(ConfigError::InvalidInputSpec(s.to_string())),
        }
    }
}

/// Kind of export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Wide regional tables: filter, reshape, trend, reduce.
    Regional,
    /// Single-series auxiliary files, percent-scaled and joined on date.
    Auxiliary,
}

/// One export: a batch of inputs reduced into one JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    pub name: String,
    pub kind: JobKind,
    #[serde(default)]
    pub mode: ReduceMode,
    pub inputs: Vec<InputSpec>,
    pub output: PathBuf,
}

/// A configuration plus the jobs to run with it, in order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunPlan {
    pub config: PipelineConfig,
    pub jobs: Vec<Job>,
}

impl RunPlan {
    /// Parse a run plan from JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a run plan from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
