//! MedSynapse CLI - Command-line interface for MedSynapse Insight
//!
//! Commands:
//! - lab: Analyze lab records and print the report with its insights
//! - wearable: Aggregate wearable records per day
//! - insights: Generate insights for a saved report
//! - config: Print the effective configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use medsynapse_insight::schema::TableAdapter;
use medsynapse_insight::{
    AnalysisError, AnalysisReport, AnalyzerConfig, HealthAnalyzer, Insight, Record, PRODUCER_NAME,
    VERSION,
};

/// MedSynapse - statistics, anomaly rates and insights for health records
#[derive(Parser)]
#[command(name = "medsynapse")]
#[command(version = VERSION)]
#[command(about = "Analyze lab results and wearable data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Args)]
struct SharedArgs {
    /// Analyzer configuration file (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log level when RUST_LOG is unset (logs go to stderr)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze lab records and print the report with its insights
    Lab {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,
    },

    /// Aggregate wearable records per day
    Wearable {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,
    },

    /// Generate insights for a report produced by `lab`
    Insights {
        /// Report file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.shared.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), MedCliError> {
    let config = load_config(cli.shared.config.as_deref())?;
    let analyzer = HealthAnalyzer::with_config(config);
    let pretty = cli.shared.pretty;

    debug!(producer = PRODUCER_NAME, version = VERSION, "starting");

    match cli.command {
        Commands::Lab { input, input_format } => {
            let records = read_records(&input, &input_format)?;
            let report = analyzer.analyze_lab_results(&records);
            check_report(&report)?;
            let insights = analyzer.generate_insights(&report);
            print_json(&LabOutput { report: &report, insights }, pretty)
        }
        Commands::Wearable { input, input_format } => {
            let records = read_records(&input, &input_format)?;
            let report = analyzer.analyze_wearable_data(&records);
            check_report(&report)?;
            print_json(&report, pretty)
        }
        Commands::Insights { input } => {
            let report_json = read_input(&input)?;
            let report: AnalysisReport = serde_json::from_str(&report_json)?;
            print_json(&analyzer.generate_insights(&report), pretty)
        }
        Commands::Config => print_json(analyzer.config(), true),
    }
}

#[derive(Serialize)]
struct LabOutput<'a> {
    report: &'a AnalysisReport,
    insights: Vec<Insight>,
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig, MedCliError> {
    match path {
        Some(path) => Ok(AnalyzerConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, MedCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(MedCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, format: &InputFormat) -> Result<Vec<Record>, MedCliError> {
    let data = read_input(input)?;
    let records = match format {
        InputFormat::Json => TableAdapter::parse_array(&data)?,
        InputFormat::Ndjson => TableAdapter::parse_ndjson(&data)?,
    };
    debug!(records = records.len(), "input parsed");
    Ok(records)
}

fn check_report(report: &AnalysisReport) -> Result<(), MedCliError> {
    match report.error_message() {
        Some(message) => Err(MedCliError::Analysis(message.to_string())),
        None => Ok(()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<(), MedCliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

// Error types

#[derive(Debug)]
enum MedCliError {
    Io(io::Error),
    Input(AnalysisError),
    Json(serde_json::Error),
    Analysis(String),
    NoInput,
}

impl From<io::Error> for MedCliError {
    fn from(e: io::Error) -> Self {
        MedCliError::Io(e)
    }
}

impl From<AnalysisError> for MedCliError {
    fn from(e: AnalysisError) -> Self {
        MedCliError::Input(e)
    }
}

impl From<serde_json::Error> for MedCliError {
    fn from(e: serde_json::Error) -> Self {
        MedCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MedCliError> for CliError {
    fn from(e: MedCliError) -> Self {
        match e {
            MedCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MedCliError::Input(AnalysisError::Config(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'medsynapse config' to see valid defaults".to_string()),
            },
            MedCliError::Input(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Input must be flat JSON objects with scalar values".to_string()),
            },
            MedCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MedCliError::Analysis(msg) => CliError {
                code: "ANALYSIS_ERROR".to_string(),
                message: msg,
                hint: None,
            },
            MedCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No input provided".to_string(),
                hint: Some("Pass --input <path> or pipe records on stdin".to_string()),
            },
        }
    }
}
