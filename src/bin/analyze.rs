//! Garmin Analyze CLI
//!
//! Loads a JSON snapshot of a monitoring store, runs the requested analysis
//! and writes the updated snapshot back.
//!
//! Actions:
//! - --sleep: store the nightly sleep period
//! - --dates: dataset overview with day gap reporting
//! - --summary: sleep classification and rollups for every year (default)

use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use garmin_analyze::{
    dataset_overview, set_sleep_period, AnalyzeError, Analyzer, MemoryStore, PeriodAlignment,
    SleepPeriod, ANALYZE_VERSION,
};

/// Garmin Analyze - sleep states and period summaries from monitoring data
#[derive(Parser)]
#[command(name = "garmin-analyze")]
#[command(version = ANALYZE_VERSION)]
#[command(about = "Classify sleep and roll up monitoring statistics", long_about = None)]
struct Cli {
    /// Monitoring store snapshot (JSON)
    #[arg(long)]
    db: PathBuf,

    /// Set the nightly sleep period, e.g. "22:00,07:00"
    #[arg(short, long, value_name = "START,STOP")]
    sleep: Option<String>,

    /// Report the years, months and days with data
    #[arg(short, long)]
    dates: bool,

    /// Classify sleep and roll up every period
    #[arg(short = 'S', long)]
    summary: bool,

    /// Give each period the intensity of its own sample instead of the next one
    #[arg(long)]
    aligned_intensity: bool,

    /// Write the updated snapshot here instead of back to --db
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn alignment(&self) -> PeriodAlignment {
        if self.aligned_intensity {
            PeriodAlignment::Aligned
        } else {
            PeriodAlignment::Lagged
        }
    }

    /// The sweep runs when asked for, or when no other action was given
    fn wants_summary(&self) -> bool {
        self.summary || (self.sleep.is_none() && !self.dates)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

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

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), AnalyzeCliError> {
    let mut store = load_store(&cli.db)?;

    if let Some(value) = cli.sleep.as_deref() {
        set_sleep_period(&mut store, SleepPeriod::parse(value)?)?;
    }

    if cli.dates {
        let overview = dataset_overview(&mut store)?;
        print_json(&overview, cli.pretty)?;
    }

    if cli.wants_summary() {
        let report = Analyzer::new(&mut store, cli.alignment())?.summary()?;
        if !report.is_clean() {
            info!(failures = report.failures.len(), "some periods failed");
        }
        print_json(&report, cli.pretty)?;
    }

    let output = cli.output.as_deref().unwrap_or(cli.db.as_path());
    save_store(&store, output, cli.pretty)
}

fn load_store(path: &Path) -> Result<MemoryStore, AnalyzeCliError> {
    let json = fs::read_to_string(path)?;
    Ok(MemoryStore::from_json(&json)?)
}

fn save_store(store: &MemoryStore, path: &Path, pretty: bool) -> Result<(), AnalyzeCliError> {
    let json = if pretty {
        store.to_json_pretty()?
    } else {
        store.to_json()?
    };
    fs::write(path, json)?;
    info!(path = %path.display(), "store saved");
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), AnalyzeCliError> {
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
enum AnalyzeCliError {
    Io(io::Error),
    Analyze(AnalyzeError),
    Json(serde_json::Error),
}

impl From<io::Error> for AnalyzeCliError {
    fn from(e: io::Error) -> Self {
        AnalyzeCliError::Io(e)
    }
}

impl From<AnalyzeError> for AnalyzeCliError {
    fn from(e: AnalyzeError) -> Self {
        AnalyzeCliError::Analyze(e)
    }
}

impl From<serde_json::Error> for AnalyzeCliError {
    fn from(e: serde_json::Error) -> Self {
        AnalyzeCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AnalyzeCliError> for CliError {
    fn from(e: AnalyzeCliError) -> Self {
        match e {
            AnalyzeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the --db and --output paths".to_string()),
            },
            AnalyzeCliError::Analyze(AnalyzeError::MissingAttribute(name)) => CliError {
                code: "MISSING_CONFIG".to_string(),
                message: format!("Missing required attribute: {name}"),
                hint: Some("Set the sleep period first with --sleep START,STOP".to_string()),
            },
            AnalyzeCliError::Analyze(e @ AnalyzeError::InvalidTime(_)) => CliError {
                code: "INVALID_TIME".to_string(),
                message: e.to_string(),
                hint: Some("Times are HH:MM, e.g. --sleep 22:00,07:00".to_string()),
            },
            AnalyzeCliError::Analyze(AnalyzeError::Json(e)) | AnalyzeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the snapshot JSON syntax".to_string()),
            },
            AnalyzeCliError::Analyze(e) => CliError {
                code: "ANALYZE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
        }
    }
}
