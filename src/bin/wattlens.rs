//! Wattlens CLI - Command-line interface for Wattlens
//!
//! Commands:
//! - export: Extract the feature series of a recording and write it out
//! - summary: Print a short report about a recording
//! - lph: Compute the local pattern histogram of one power series

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

use wattlens::dataset::{DatasetConfig, Split};
use wattlens::loader::load_features;
use wattlens::lph::{GridMode, PatternEncoder, DEFAULT_GRID_WIDTH};
use wattlens::power::tick_datetime;
use wattlens::types::FeatureSeries;

/// Wattlens - Feature extraction engine for household power-meter recordings
#[derive(Parser)]
#[command(name = "wattlens")]
#[command(author = "Wattlens Contributors")]
#[command(version)]
#[command(about = "Extract power features from meter recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the feature series of a recording and write it out
    Export {
        /// Recording container path (overrides --config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Dataset table JSON (used with --house, --split, --index)
        #[arg(long)]
        config: Option<PathBuf>,

        /// House identifier in the dataset table
        #[arg(long)]
        house: Option<String>,

        /// File table of the house to read from
        #[arg(long, default_value = "training")]
        split: SplitArg,

        /// Index into the split's file list
        #[arg(long, default_value = "0")]
        index: usize,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Window start in tick units (requires --stop)
        #[arg(long)]
        start: Option<f64>,

        /// Window stop in tick units (requires --start)
        #[arg(long)]
        stop: Option<f64>,

        /// Window on the span of the tagging records
        #[arg(long, conflicts_with_all = ["start", "stop"])]
        tag_span: bool,
    },

    /// Print a short report about a recording
    Summary {
        /// Recording container path (overrides --config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Dataset table JSON (used with --house, --split, --index)
        #[arg(long)]
        config: Option<PathBuf>,

        /// House identifier in the dataset table
        #[arg(long)]
        house: Option<String>,

        /// File table of the house to read from
        #[arg(long, default_value = "training")]
        split: SplitArg,

        /// Index into the split's file list
        #[arg(long, default_value = "0")]
        index: usize,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the local pattern histogram of one power series
    Lph {
        /// Recording container path (overrides --config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Dataset table JSON (used with --house, --split, --index)
        #[arg(long)]
        config: Option<PathBuf>,

        /// House identifier in the dataset table
        #[arg(long)]
        house: Option<String>,

        /// File table of the house to read from
        #[arg(long, default_value = "training")]
        split: SplitArg,

        /// Index into the split's file list
        #[arg(long, default_value = "0")]
        index: usize,

        /// Power series to encode
        #[arg(long, default_value = "real")]
        series: SeriesField,

        /// Grid width (defaults to 100)
        #[arg(long, conflicts_with = "square")]
        width: Option<usize>,

        /// Fold into the largest square grid instead of fixed-width rows
        #[arg(long)]
        square: bool,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    /// Tagged recordings
    Training,
    /// Untagged recordings
    Testing,
}

impl From<SplitArg> for Split {
    fn from(split: SplitArg) -> Self {
        match split {
            SplitArg::Training => Split::Training,
            SplitArg::Testing => Split::Testing,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one power sample per line, HF and tags omitted)
    Ndjson,
    /// The whole feature series as one JSON object
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeriesField {
    /// Real power
    Real,
    /// Reactive power
    Reactive,
    /// Apparent power
    Apparent,
    /// Power factor
    PowerFactor,
}

impl SeriesField {
    fn as_str(&self) -> &'static str {
        match self {
            SeriesField::Real => "real",
            SeriesField::Reactive => "reactive",
            SeriesField::Apparent => "apparent",
            SeriesField::PowerFactor => "power_factor",
        }
    }

    fn values<'a>(&self, series: &'a FeatureSeries) -> &'a [f64] {
        match self {
            SeriesField::Real => &series.real,
            SeriesField::Reactive => &series.reactive,
            SeriesField::Apparent => &series.apparent,
            SeriesField::PowerFactor => &series.power_factor,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), WattlensCliError> {
    match cli.command {
        Commands::Export {
            input,
            config,
            house,
            split,
            index,
            output,
            format,
            start,
            stop,
            tag_span,
        } => {
            let source = RecordingSource {
                input,
                config,
                house,
                split,
                index,
            };
            cmd_export(&source, &output, format, start, stop, tag_span)
        }

        Commands::Summary {
            input,
            config,
            house,
            split,
            index,
            json,
        } => {
            let source = RecordingSource {
                input,
                config,
                house,
                split,
                index,
            };
            cmd_summary(&source, json)
        }

        Commands::Lph {
            input,
            config,
            house,
            split,
            index,
            series,
            width,
            square,
            output,
            pretty,
        } => {
            let source = RecordingSource {
                input,
                config,
                house,
                split,
                index,
            };
            cmd_lph(&source, series, width, square, &output, pretty)
        }
    }
}

fn cmd_export(
    source: &RecordingSource,
    output: &PathBuf,
    format: OutputFormat,
    start: Option<f64>,
    stop: Option<f64>,
    tag_span: bool,
) -> Result<(), WattlensCliError> {
    let path = source.resolve()?;
    let series = load_features(&path)?;

    let series = if tag_span {
        let (span_start, span_stop) = series.tag_span().ok_or(WattlensCliError::NoTagSpan)?;
        series.clipped(span_start, span_stop)
    } else {
        match (start, stop) {
            (Some(start), Some(stop)) => series.clipped(start, stop),
            (None, None) => series,
            _ => return Err(WattlensCliError::WindowIncomplete),
        }
    };

    let output_data = format_series(&series, format)?;
    write_output(output, &output_data)
}

fn cmd_summary(source: &RecordingSource, json: bool) -> Result<(), WattlensCliError> {
    let path = source.resolve()?;
    let series = load_features(&path)?;

    let report = SummaryReport {
        recording: path.display().to_string(),
        power_samples: series.real.len(),
        first_sample: series.datetimes.first().map(format_datetime),
        last_sample: series.datetimes.last().map(format_datetime),
        hf_samples: series.hf.len(),
        hf_bins: series.hf.first().map_or(0, Vec::len),
        tags: series
            .tags
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|tag| TagLine {
                device_id: tag.device_id,
                device_name: tag.device_name.clone(),
                on: format_datetime(&tick_datetime(tag.on_time)),
                off: format_datetime(&tick_datetime(tag.off_time)),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Recording Summary");
        println!("=================");
        println!("Recording:     {}", report.recording);
        match (&report.first_sample, &report.last_sample) {
            (Some(first), Some(last)) => {
                println!("Power samples: {} ({} .. {})", report.power_samples, first, last);
            }
            _ => println!("Power samples: {}", report.power_samples),
        }
        println!("HF samples:    {} x {} bins", report.hf_samples, report.hf_bins);
        println!("Tags:          {}", report.tags.len());

        for tag in &report.tags {
            println!(
                "  [{}] {}: {} .. {}",
                tag.device_id, tag.device_name, tag.on, tag.off
            );
        }
    }

    Ok(())
}

fn cmd_lph(
    source: &RecordingSource,
    series_field: SeriesField,
    width: Option<usize>,
    square: bool,
    output: &PathBuf,
    pretty: bool,
) -> Result<(), WattlensCliError> {
    let path = source.resolve()?;
    let series = load_features(&path)?;
    let samples = series_field.values(&series);

    let mode = if square {
        GridMode::Square
    } else {
        GridMode::Rectangular {
            width: width.unwrap_or(DEFAULT_GRID_WIDTH),
        }
    };
    let histogram = PatternEncoder::encode(samples, mode)?;

    let report = LphReport {
        series: series_field.as_str().to_string(),
        mode,
        samples: samples.len(),
        bins: histogram.bins,
    };

    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    write_output(output, &output_data)
}

// Helper functions

/// Where a subcommand gets its recording from: an explicit path, or one
/// entry of a dataset table
struct RecordingSource {
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    house: Option<String>,
    split: SplitArg,
    index: usize,
}

impl RecordingSource {
    fn resolve(&self) -> Result<PathBuf, WattlensCliError> {
        if let Some(input) = &self.input {
            return Ok(input.clone());
        }
        let config_path = self.config.as_ref().ok_or(WattlensCliError::InputMissing)?;
        let house = self.house.as_ref().ok_or(WattlensCliError::ConfigIncomplete)?;
        let config = DatasetConfig::from_json_file(config_path)?;
        Ok(config.recording_path(house, self.split.into(), self.index)?)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

fn format_series(series: &FeatureSeries, format: OutputFormat) -> Result<String, WattlensCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for t in 0..series.real.len() {
                let row = SampleRow {
                    time_tick: series.time_ticks[t],
                    datetime: series.datetimes[t],
                    real: series.real[t],
                    reactive: series.reactive[t],
                    apparent: series.apparent[t],
                    power_factor: series.power_factor[t],
                };
                lines.push(serde_json::to_string(&row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(series)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(series)?),
    }
}

fn write_output(output: &PathBuf, output_data: &str) -> Result<(), WattlensCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }
    Ok(())
}

fn format_datetime(datetime: &DateTime<Local>) -> String {
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

// Error types

#[derive(Debug)]
enum WattlensCliError {
    Io(io::Error),
    Meter(wattlens::MeterError),
    Json(serde_json::Error),
    InputMissing,
    ConfigIncomplete,
    WindowIncomplete,
    NoTagSpan,
}

impl From<io::Error> for WattlensCliError {
    fn from(e: io::Error) -> Self {
        WattlensCliError::Io(e)
    }
}

impl From<wattlens::MeterError> for WattlensCliError {
    fn from(e: wattlens::MeterError) -> Self {
        WattlensCliError::Meter(e)
    }
}

impl From<serde_json::Error> for WattlensCliError {
    fn from(e: serde_json::Error) -> Self {
        WattlensCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WattlensCliError> for CliError {
    fn from(e: WattlensCliError) -> Self {
        match e {
            WattlensCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WattlensCliError::Meter(e) => CliError {
                code: "METER_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the recording container holds the expected arrays".to_string()),
            },
            WattlensCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            WattlensCliError::InputMissing => CliError {
                code: "INPUT_MISSING".to_string(),
                message: "No recording given".to_string(),
                hint: Some("Pass --input PATH, or --config TABLE with --house".to_string()),
            },
            WattlensCliError::ConfigIncomplete => CliError {
                code: "CONFIG_INCOMPLETE".to_string(),
                message: "--config needs --house to pick a recording".to_string(),
                hint: Some("Add --house ID (and optionally --split/--index)".to_string()),
            },
            WattlensCliError::WindowIncomplete => CliError {
                code: "WINDOW_INCOMPLETE".to_string(),
                message: "Windowing needs both ends".to_string(),
                hint: Some("Pass both --start and --stop, or --tag-span".to_string()),
            },
            WattlensCliError::NoTagSpan => CliError {
                code: "NO_TAG_SPAN".to_string(),
                message: "Recording has no tagging records to window on".to_string(),
                hint: Some("Use --start/--stop instead".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct SampleRow {
    time_tick: f64,
    datetime: DateTime<Local>,
    real: f64,
    reactive: f64,
    apparent: f64,
    power_factor: f64,
}

#[derive(serde::Serialize)]
struct SummaryReport {
    recording: String,
    power_samples: usize,
    first_sample: Option<String>,
    last_sample: Option<String>,
    hf_samples: usize,
    hf_bins: usize,
    tags: Vec<TagLine>,
}

#[derive(serde::Serialize)]
struct TagLine {
    device_id: i64,
    device_name: String,
    on: String,
    off: String,
}

#[derive(serde::Serialize)]
struct LphReport {
    series: String,
    mode: GridMode,
    samples: usize,
    bins: Vec<f64>,
}
