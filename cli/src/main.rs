//! Lumen CLI
//!
//! Command-line interface for the Lumen telemetry pipeline.
//!
//! # Usage
//!
//! ```bash
//! lumen --help
//! lumen export --file snapshot.json
//! lumen temporality --preference delta
//! lumen resolve --rules loggers.json svc.orders.db
//! lumen filter --rules loggers.json --records records.json
//! ```

#![deny(unsafe_code)]

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use exporter::{create_metric_exporter, ExporterConfig};
use shared::config::{LoggerConfigurator, LoggerPattern, ResolvedLoggerConfig, TemporalityPreference};
use shared::logs::{FilteringLogRecordProcessor, InMemoryLogRecordProcessor, LogRecordProcessor};
use shared::models::{InstrumentKind, LogRecord, ResourceMetrics};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lumen CLI - OTLP metric export and logger configuration tooling
#[derive(Parser)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a metric snapshot (JSON) to the configured OTLP collector
    Export {
        /// Snapshot file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: PathBuf,

        /// Collector URL, overriding the OTEL_EXPORTER_OTLP_* variables
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Temporality preference (cumulative, delta, lowmemory)
        #[arg(short, long)]
        preference: Option<TemporalityPreference>,
    },

    /// Print the temporality chosen for every instrument kind
    Temporality {
        /// Temporality preference; falls back to the environment
        #[arg(short, long)]
        preference: Option<TemporalityPreference>,
    },

    /// Resolve the logger config for one or more logger names
    Resolve {
        /// JSON file with an ordered list of `{pattern, config}` rules
        #[arg(short, long)]
        rules: PathBuf,

        /// Logger names to resolve
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Filter log records (JSON array) through the logger rules
    Filter {
        /// JSON file with an ordered list of `{pattern, config}` rules
        #[arg(short, long)]
        rules: PathBuf,

        /// Records file, or `-` for stdin
        #[arg(long, default_value = "-")]
        records: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Export {
            file,
            endpoint,
            preference,
        }) => export(&file, endpoint, preference).await?,
        Some(Commands::Temporality { preference }) => {
            let preference = TemporalityPreference::resolve(preference);
            println!("preference: {preference}");
            for (kind, temporality) in temporality_table(preference) {
                println!("{:<28} {temporality}", kind.as_str());
            }
        }
        Some(Commands::Resolve { rules, names }) => {
            let configurator = load_configurator(&rules)?;
            let resolved = resolve_names(&configurator, &names);
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Some(Commands::Filter { rules, records }) => {
            let configurator = load_configurator(&rules)?;
            let records: Vec<LogRecord> = serde_json::from_str(&read_input(&records)?)
                .context("Failed to parse log records")?;
            let total = records.len();
            let kept = filter_records(Arc::new(configurator), records)?;
            tracing::info!(total, kept = kept.len(), "Filtered log records");
            println!("{}", serde_json::to_string_pretty(&kept)?);
        }
        None => {
            println!("Lumen CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

async fn export(
    file: &Path,
    endpoint: Option<String>,
    preference: Option<TemporalityPreference>,
) -> Result<()> {
    let mut config = ExporterConfig::from_env()?;
    if let Some(endpoint) = endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(preference) = preference {
        config = config.with_temporality_preference(preference);
    }

    let snapshot: ResourceMetrics = serde_json::from_str(&read_input(file)?)
        .context("Failed to parse metric snapshot")?;
    tracing::info!(
        endpoint = %config.endpoint,
        metrics = snapshot.metric_count(),
        data_points = snapshot.data_point_count(),
        "Exporting snapshot"
    );

    let exporter = create_metric_exporter(&config)?;
    let result = exporter.export(snapshot).await;
    exporter.shutdown().await?;
    result.context("Export failed")?;

    println!("Export succeeded");
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        Ok(input)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn load_configurator(path: &Path) -> Result<LoggerConfigurator> {
    let rules: Vec<LoggerPattern> = serde_json::from_str(&read_input(path)?)
        .with_context(|| format!("Failed to parse logger rules in {}", path.display()))?;
    Ok(LoggerConfigurator::new(rules))
}

fn temporality_table(
    preference: TemporalityPreference,
) -> Vec<(InstrumentKind, shared::models::Temporality)> {
    InstrumentKind::ALL
        .iter()
        .map(|&kind| (kind, preference.temporality(kind)))
        .collect()
}

fn resolve_names(
    configurator: &LoggerConfigurator,
    names: &[String],
) -> serde_json::Map<String, serde_json::Value> {
    names
        .iter()
        .map(|name| {
            let resolved: ResolvedLoggerConfig = configurator.resolve_name(name);
            (
                name.clone(),
                serde_json::to_value(resolved).unwrap_or_default(),
            )
        })
        .collect()
}

fn filter_records(
    configurator: Arc<LoggerConfigurator>,
    records: Vec<LogRecord>,
) -> Result<Vec<LogRecord>> {
    let sink = InMemoryLogRecordProcessor::new_shared();
    let filter = FilteringLogRecordProcessor::with_configurator(Arc::clone(&sink), configurator);

    for mut record in records {
        filter.on_emit(&mut record, None);
    }
    filter.shutdown()?;

    Ok(sink.records()?)
}
