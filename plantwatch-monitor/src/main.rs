// Plantwatch Monitor - Command line interface
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # plantwatch
//!
//! ## Usage
//!
//! ```bash
//! # Generate 500 readings per mode with 2% injected anomalies
//! plantwatch simulate --mode ALL --samples 500 --anomalies --anomaly-rate 0.02 -o plant.csv
//!
//! # Clean a raw serial capture
//! plantwatch ingest capture.txt -o clean.csv
//!
//! # Run detectors on a CSV
//! plantwatch detect plant.csv --methods zscore,iqr,lof -o results.csv
//!
//! # Per-sensor statistics, overall and by mode
//! plantwatch analyze plant.csv -o stats.json
//!
//! # Serve a live stream and watch it
//! plantwatch publish --bind 127.0.0.1:7878 --interval-ms 500
//! plantwatch monitor --connect 127.0.0.1:7878 --http-port 9100
//! ```

use clap::{Args, Parser, Subcommand};
use plantwatch::{Feature, IngestConfig, IngestError, Ingestor, Reading, ReadingWriter};
use plantwatch_anomaly::{
    summarize, AnomalyEngine, BatchStatistics, ConfigurationError, DetectionMethod, DetectorParams, MethodReport,
};
use plantwatch_monitor::{
    server, shutdown_channel, wait_for_shutdown, LiveScoringConfig, MonitorConfig, MonitorError,
    MonitorSession, Publisher, PublisherConfig, ShutdownHandle, StreamConsumer, TcpTransport,
};
use plantwatch_testdata::{
    generate_dataset, DatasetError, GeneratorConfig, GeneratorError, ModeSelector, ScenarioGenerator,
    ScenarioProfile,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Plantwatch industrial telemetry pipeline
#[derive(Parser, Debug)]
#[command(name = "plantwatch", author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate synthetic readings as CSV
    Simulate(SimulateArgs),
    /// Validate raw line records into a clean CSV
    Ingest(IngestArgs),
    /// Run anomaly detectors over a CSV
    Detect(DetectArgs),
    /// Report per-sensor statistics of a CSV as JSON
    Analyze(AnalyzeArgs),
    /// Serve a live JSON reading stream over TCP
    Publish(PublishArgs),
    /// Consume a live stream with alerting and an HTTP feed
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// NORMAL, ALERT, FAILURE or ALL
    #[arg(short, long, default_value = "ALL")]
    mode: ModeSelector,

    /// Samples per mode
    #[arg(short = 'n', long, default_value_t = 1000)]
    samples: usize,

    /// Seconds between samples
    #[arg(short, long, default_value_t = 1)]
    interval: u64,

    /// Inject unlabeled anomalies
    #[arg(long)]
    anomalies: bool,

    /// Injection probability per sample
    #[arg(long, default_value_t = 0.05)]
    anomaly_rate: f64,

    #[arg(long)]
    seed: Option<u64>,

    /// First timestamp; the current time when absent
    #[arg(long)]
    start: Option<u64>,

    /// Scenario profile JSON
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Output CSV; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Raw line file; stdin when absent
    input: Option<PathBuf>,

    /// Output CSV; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    #[arg(long, default_value = "NULL")]
    null_token: String,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Reading CSV
    input: PathBuf,

    /// Comma-separated methods
    #[arg(short, long, value_delimiter = ',', default_value = "zscore")]
    methods: Vec<DetectionMethod>,

    /// Run every method
    #[arg(long)]
    all: bool,

    /// Comma-separated feature columns; every populated column when absent
    #[arg(long, value_delimiter = ',')]
    features: Vec<Feature>,

    #[arg(long)]
    threshold: Option<f64>,

    #[arg(long)]
    contamination: Option<f64>,

    #[arg(long)]
    n_neighbors: Option<usize>,

    #[arg(long)]
    eps: Option<f64>,

    #[arg(long)]
    min_samples: Option<usize>,

    /// Results CSV; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Reading CSV
    input: PathBuf,

    /// Comma-separated feature columns; the four sensors when absent
    #[arg(long, value_delimiter = ',')]
    features: Vec<Feature>,

    /// Report JSON; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PublishArgs {
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    bind: String,

    /// Replay a reading CSV instead of generating
    #[arg(long)]
    csv: Option<PathBuf>,

    #[arg(short, long, default_value = "ALL")]
    mode: ModeSelector,

    /// Samples per mode when generating
    #[arg(short = 'n', long, default_value_t = 1000)]
    samples: usize,

    #[arg(long)]
    anomaly_rate: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    profile: Option<PathBuf>,

    /// Milliseconds between messages
    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,

    /// Probability of flagging a message as a network failure
    #[arg(long, default_value_t = 0.0)]
    network_failure_rate: f64,

    /// Hold the stream until a subscriber connects
    #[arg(long)]
    wait: bool,
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Publisher address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    connect: String,

    /// Monitor configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve the HTTP feed on this port
    #[arg(long)]
    http_port: Option<u16>,

    /// Window capacity override
    #[arg(long)]
    window: Option<usize>,

    /// Live scoring method override
    #[arg(long)]
    method: Option<DetectionMethod>,

    /// Reconnect delay override
    #[arg(long)]
    backoff_secs: Option<u64>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Detection(#[from] ConfigurationError),

    #[error("results CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("statistics JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match cli.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::default().add_directive(level.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Simulate(args) => simulate(args),
        Command::Ingest(args) => ingest(args),
        Command::Detect(args) => detect(args),
        Command::Analyze(args) => analyze(args),
        Command::Publish(args) => publish(args).await,
        Command::Monitor(args) => monitor(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn load_profile(path: Option<&Path>) -> Result<ScenarioProfile, CliError> {
    Ok(match path {
        Some(path) => ScenarioProfile::from_json_file(path)?,
        None => ScenarioProfile::default(),
    })
}

fn generator_config(samples: usize, interval: u64, seed: Option<u64>, start: Option<u64>) -> GeneratorConfig {
    let config = GeneratorConfig::new().with_count(samples).with_interval_secs(interval);
    let config = match start {
        Some(ts) => config.with_start_time(ts),
        None => config.with_start_now(),
    };
    match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    }
}

// ============================================================================
// simulate
// ============================================================================

fn simulate(args: SimulateArgs) -> Result<(), CliError> {
    let profile = load_profile(args.profile.as_deref())?;
    let mut config = generator_config(args.samples, args.interval, args.seed, args.start);
    if args.anomalies {
        config = config.with_anomaly_rate(args.anomaly_rate);
    }

    let dataset = generate_dataset(args.mode, &config, &profile)?;
    dataset.write_csv(output_writer(args.output.as_deref())?)?;
    info!("{}", dataset.summary());
    Ok(())
}

// ============================================================================
// ingest
// ============================================================================

fn ingest(args: IngestArgs) -> Result<(), CliError> {
    let config = IngestConfig::new()
        .with_delimiter(args.delimiter)
        .with_null_token(&args.null_token);
    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut ingestor = Ingestor::from_reader(reader, config)?;
    let mut writer = ReadingWriter::new(output_writer(args.output.as_deref())?)?;
    for reading in ingestor.by_ref() {
        writer.write(&reading)?;
    }
    writer.into_inner()?;

    let stats = ingestor.stats();
    info!(
        "{} lines: {} accepted, {} discarded, {} skipped ({:.1}% accepted)",
        stats.seen,
        stats.accepted,
        stats.discarded,
        stats.skipped,
        stats.acceptance_rate() * 100.0
    );
    Ok(())
}

// ============================================================================
// detect
// ============================================================================

fn read_batch(path: &Path) -> Result<Vec<Reading>, CliError> {
    let mut ingestor = Ingestor::from_reader(BufReader::new(File::open(path)?), IngestConfig::default())?;
    let batch: Vec<Reading> = ingestor.by_ref().collect();
    let stats = ingestor.stats();
    if stats.discarded > 0 {
        warn!("{} of {} lines discarded while reading {}", stats.discarded, stats.seen, path.display());
    }
    Ok(batch)
}

fn detect(args: DetectArgs) -> Result<(), CliError> {
    let mut params = DetectorParams::new();
    if let Some(v) = args.threshold {
        params = params.with_threshold(v);
    }
    if let Some(v) = args.contamination {
        params = params.with_contamination(v);
    }
    if let Some(v) = args.n_neighbors {
        params = params.with_n_neighbors(v);
    }
    if let Some(v) = args.eps {
        params = params.with_eps(v);
    }
    if let Some(v) = args.min_samples {
        params = params.with_min_samples(v);
    }

    let mut engine = AnomalyEngine::new(params)?;
    if !args.features.is_empty() {
        engine = engine.with_features(&args.features)?;
    }
    let methods: Vec<DetectionMethod> = if args.all {
        DetectionMethod::ALL.to_vec()
    } else {
        args.methods
    };

    let batch = read_batch(&args.input)?;
    info!("{} readings loaded from {}", batch.len(), args.input.display());

    let reports = engine.detect_many(&batch, &methods)?;
    write_results(&reports, output_writer(args.output.as_deref())?)?;

    for summary in summarize(&reports) {
        info!("{}", summary);
    }
    Ok(())
}

/// Results CSV, one `row_index,method,is_anomaly,score` row per result.
fn write_results<W: Write>(reports: &[MethodReport], out: W) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_writer(out);
    for report in reports {
        for result in &report.results {
            writer.serialize(result)?;
        }
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// analyze
// ============================================================================

fn analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let batch = read_batch(&args.input)?;
    let report = BatchStatistics::from_readings(&batch, &args.features);

    let mut out = output_writer(args.output.as_deref())?;
    writeln!(out, "{}", report.to_json()?)?;
    out.flush()?;

    for line in report.to_string().lines() {
        info!("{}", line);
    }
    Ok(())
}

// ============================================================================
// publish / monitor
// ============================================================================

/// Trigger shutdown on Ctrl-C.
fn shutdown_on_ctrl_c(handle: ShutdownHandle) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => warn!(error = %e, "Ctrl+C handler unavailable, shutting down"),
        }
        handle.shutdown();
    });
}

async fn publish(args: PublishArgs) -> Result<(), CliError> {
    let readings: Box<dyn Iterator<Item = Reading> + Send> = match &args.csv {
        Some(path) => {
            let ingestor = Ingestor::from_reader(BufReader::new(File::open(path)?), IngestConfig::default())?;
            Box::new(ingestor)
        }
        None => {
            let profile = load_profile(args.profile.as_deref())?;
            let interval_secs = (args.interval_ms / 1000).max(1);
            let mut config = generator_config(args.samples, interval_secs, args.seed, None);
            if let Some(rate) = args.anomaly_rate {
                config = config.with_anomaly_rate(rate);
            }
            Box::new(ScenarioGenerator::new(args.mode, config, profile)?)
        }
    };

    let mut config = PublisherConfig::new()
        .with_interval(Duration::from_millis(args.interval_ms))
        .with_network_failure_rate(args.network_failure_rate)
        .with_wait_for_subscriber(args.wait);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let publisher = Publisher::bind(&args.bind, config).await?;
    let (handle, signal) = shutdown_channel();
    shutdown_on_ctrl_c(handle);

    let stats = publisher.run(readings, signal).await?;
    if stats.unheard > 0 {
        info!("{} messages published with no subscriber connected", stats.unheard);
    }
    Ok(())
}

async fn monitor(args: MonitorArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_json_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(window) = args.window {
        config = config.with_window_capacity(window);
    }
    if let Some(secs) = args.backoff_secs {
        config = config.with_reconnect_backoff_secs(secs);
    }
    if let Some(method) = args.method {
        let params = config
            .live_scoring
            .as_ref()
            .map(|s| s.params.clone())
            .unwrap_or_default();
        config = config.with_live_scoring(LiveScoringConfig::new(method).with_params(params));
    }

    let session = MonitorSession::new(config)?.shared();
    let (handle, signal) = shutdown_channel();
    shutdown_on_ctrl_c(handle);

    let feed = match args.http_port {
        Some(port) => {
            let listener = TcpListener::bind(("0.0.0.0", port)).await?;
            let mut stop = signal.clone();
            Some(tokio::spawn(server::serve(listener, session.clone(), async move {
                wait_for_shutdown(&mut stop).await;
            })))
        }
        None => None,
    };

    let consumer = StreamConsumer::new(TcpTransport::new(args.connect), session.clone(), signal).await;
    consumer.run().await;

    if let Some(feed) = feed {
        match feed.await {
            Ok(result) => result?,
            Err(e) => warn!(error = %e, "HTTP feed task failed"),
        }
    }

    let session = session.read().await;
    let stats = session.stats();
    info!(
        "session ended: {} readings, {} discarded, {} connections, {} alerts",
        stats.received,
        stats.discarded,
        stats.connections,
        session.alerts().total_raised()
    );
    Ok(())
}
