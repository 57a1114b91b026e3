//! Lumen Exporter
//!
//! This crate ships metric snapshots to an OpenTelemetry collector over
//! OTLP/HTTP. It is the outbound half of the Lumen telemetry pipeline: an
//! aggregation engine asks the [`MetricExporter`] which temporality and
//! aggregation to use per instrument kind, then hands it finished snapshots.
//!
//! # Architecture
//!
//! An export flows through three layers:
//! - [`MetricExporter`]: policy lookups and callback-style completion
//! - [`OtlpExportDelegate`]: serialization, bounded concurrency, response
//!   handling
//! - [`HttpExporterTransport`]: lazily connected HTTP client with timeouts
//!
//! # Example
//!
//! ```no_run
//! use exporter::{create_metric_exporter, ExporterConfig};
//! use shared::models::ResourceMetrics;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let exporter = create_metric_exporter(&ExporterConfig::from_env()?)?;
//!     exporter.export(ResourceMetrics::default()).await?;
//!     exporter.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod delegate;
pub mod error;
pub mod metrics;
pub mod transport;

pub use config::{ConfigError, ExporterConfig, Protocol};
pub use delegate::{ExportDelegate, OtlpExportDelegate};
pub use error::{ExportError, ExportResult, TransportError};
pub use metrics::{MetricExporter, MetricExporterOptions};
pub use transport::{ExportResponse, ExporterTransport, HttpExporterTransport};

use shared::otlp::{JsonMetricsSerializer, ProtobufMetricsSerializer, Serializer};
use transport::HttpRequestParameters;
use validator::Validate;

/// Creates a metric exporter that posts to the configured collector.
///
/// No connection is made here; the HTTP client is built on the first export.
///
/// # Errors
///
/// Returns an error if the configuration fails validation.
pub fn create_metric_exporter(config: &ExporterConfig) -> Result<MetricExporter, ConfigError> {
    config.validate()?;

    let mut options = MetricExporterOptions::default();
    if let Some(preference) = config.temporality_preference {
        options = options.with_temporality_preference(preference);
    }

    tracing::info!(
        endpoint = %config.endpoint,
        protocol = %config.protocol,
        timeout_ms = config.timeout_ms,
        concurrency_limit = config.concurrency_limit,
        "Creating OTLP metric exporter"
    );

    let exporter = match config.protocol {
        Protocol::HttpProtobuf => {
            MetricExporter::new(build_delegate(config, ProtobufMetricsSerializer), options)
        }
        Protocol::HttpJson => {
            MetricExporter::new(build_delegate(config, JsonMetricsSerializer), options)
        }
    };
    Ok(exporter)
}

fn build_delegate<S>(config: &ExporterConfig, serializer: S) -> OtlpExportDelegate<S, HttpExporterTransport>
where
    S: Serializer,
    S::Response: shared::otlp::PartialSuccess,
{
    let params = config.headers.iter().fold(
        HttpRequestParameters::new(config.endpoint.clone(), serializer.content_type()),
        |params, (name, value)| params.with_header(name.clone(), value.clone()),
    );

    OtlpExportDelegate::with_limits(
        serializer,
        HttpExporterTransport::new(params),
        config.timeout(),
        config.concurrency_limit,
    )
}
