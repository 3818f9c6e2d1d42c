//! Housing Trends CLI - housing-market CSV exports to trend JSON
//!
//! # Main Commands
//!
//! ```bash
//! housing-trends run plan.json                     # Run every job of a plan
//! housing-trends transform -i zhvi.csv=zhvi -o input_data.json
//! housing-trends auxiliary -i MDSP.csv=debt2income -o FRED_input_data.json
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! housing-trends parse input.csv                   # Load a CSV and print it as JSON
//! ```

use clap::{Parser, Subcommand};
use housing_trends::config::{ENV_MAX_DATE, ENV_MIN_DATE, ENV_STATE};
use housing_trends::logs::log_error;
use housing_trends::transform::REQUIRED_COLUMNS;
use housing_trends::{
    export_json, format_delimiter, load_auxiliary, parse_csv_file_auto, run_plan, to_json_string,
    InputSpec, InsufficientDataPolicy, PipelineConfig, Preprocessor, ReduceMode, RunPlan,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "housing-trends")]
#[command(about = "Reshape housing-market CSV exports into per-region trend JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every job of a JSON run plan
    Run {
        /// Run plan file
        plan: PathBuf,
    },

    /// Transform a batch of wide regional CSVs into one trend table
    Transform {
        /// First observation date kept (inclusive)
        #[arg(long, env = ENV_MIN_DATE)]
        min_date: String,

        /// Last observation date bound (exclusive)
        #[arg(long, env = ENV_MAX_DATE)]
        max_date: String,

        /// State to keep, or US for every region
        #[arg(long, env = ENV_STATE)]
        state: String,

        /// Input as FILE=SET (repeatable, reduced in order)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<InputSpec>,

        /// Join value/trend columns per set instead of stacking rows
        #[arg(long)]
        join: bool,

        /// Drop regions with too little data instead of failing
        #[arg(long)]
        skip_insufficient: bool,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load single-series files, scale percentages and join them on date
    Auxiliary {
        /// Input as FILE=LABEL (repeatable)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<InputSpec>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { plan } => cmd_run(&plan).await,

        Commands::Transform {
            min_date,
            max_date,
            state,
            inputs,
            join,
            skip_insufficient,
            output,
        } => {
            cmd_transform(
                &min_date,
                &max_date,
                &state,
                &inputs,
                ReduceMode::from_append_rows(!join),
                skip_insufficient,
                &output,
            )
            .await
        }

        Commands::Auxiliary { inputs, output } => cmd_auxiliary(&inputs, &output),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

async fn cmd_run(plan_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Run plan: {}", plan_path.display());

    let plan = RunPlan::from_file(plan_path)?;
    let summaries = run_plan(&plan).await?;

    for summary in &summaries {
        eprintln!(
            "   {} → {} ({} rows)",
            summary.name,
            summary.output.display(),
            summary.rows
        );
    }
    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_transform(
    min_date: &str,
    max_date: &str,
    state: &str,
    inputs: &[InputSpec],
    mode: ReduceMode,
    skip_insufficient: bool,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = if skip_insufficient {
        InsufficientDataPolicy::Skip
    } else {
        InsufficientDataPolicy::Fail
    };
    let config = PipelineConfig::new(min_date, max_date, state)?.with_insufficient_data(policy);

    let df = Preprocessor::new(config).transform_list(inputs, mode).await?;
    export_json(&df, output)?;

    eprintln!("💾 Output written to: {}", output.display());
    Ok(())
}

fn cmd_auxiliary(inputs: &[InputSpec], output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let df = load_auxiliary(inputs)?;
    export_json(&df, output)?;

    eprintln!("💾 Output written to: {}", output.display());
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input, &REQUIRED_COLUMNS)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.table.height());

    let json = to_json_string(&result.table)?;
    write_output(&json, output)?;

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
