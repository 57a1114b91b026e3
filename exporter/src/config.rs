//! Exporter configuration module.
//!
//! Handles loading configuration from the standard OTLP environment
//! variables with sensible defaults.

use crate::delegate::{DEFAULT_CONCURRENCY_LIMIT, DEFAULT_TIMEOUT};
use shared::config::{TemporalityPreference, TEMPORALITY_PREFERENCE_ENV};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Default collector URL for metrics.
pub const DEFAULT_METRICS_ENDPOINT: &str = "http://localhost:4318/v1/metrics";

const METRICS_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_METRICS_ENDPOINT";
const ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const METRICS_HEADERS_ENV: &str = "OTEL_EXPORTER_OTLP_METRICS_HEADERS";
const HEADERS_ENV: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const METRICS_TIMEOUT_ENV: &str = "OTEL_EXPORTER_OTLP_METRICS_TIMEOUT";
const TIMEOUT_ENV: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
const METRICS_PROTOCOL_ENV: &str = "OTEL_EXPORTER_OTLP_METRICS_PROTOCOL";
const PROTOCOL_ENV: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";

/// Errors raised while loading exporter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed.
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The assembled configuration is invalid.
    #[error("Invalid exporter configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// OTLP wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// `http/protobuf`.
    #[default]
    HttpProtobuf,
    /// `http/json`.
    HttpJson,
}

impl Protocol {
    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpProtobuf => "http/protobuf",
            Self::HttpJson => "http/json",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "http/protobuf" => Ok(Self::HttpProtobuf),
            "http/json" => Ok(Self::HttpJson),
            other => Err(format!(
                "unsupported protocol '{other}', expected 'http/protobuf' or 'http/json'"
            )),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric exporter configuration.
///
/// Configuration values can be set via environment variables, where the
/// metrics-specific variable wins over the generic one:
/// - `OTEL_EXPORTER_OTLP_METRICS_ENDPOINT`: full metrics URL, used as is
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: base URL, `/v1/metrics` is appended
///   (default: `http://localhost:4318/v1/metrics`)
/// - `OTEL_EXPORTER_OTLP_[METRICS_]HEADERS`: `key=value` pairs separated by commas
/// - `OTEL_EXPORTER_OTLP_[METRICS_]TIMEOUT`: milliseconds (default: 10000)
/// - `OTEL_EXPORTER_OTLP_[METRICS_]PROTOCOL`: `http/protobuf` or `http/json`
/// - `OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE`: `cumulative`,
///   `delta` or `lowmemory`
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ExporterConfig {
    /// Collector URL for metrics.
    #[validate(url)]
    pub endpoint: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Send timeout in milliseconds.
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
    /// Maximum number of in-flight exports.
    #[validate(range(min = 1, max = 10_000))]
    pub concurrency_limit: usize,
    /// Wire encoding.
    pub protocol: Protocol,
    /// Temporality preference; `None` leaves the choice to the exporter.
    pub temporality_preference: Option<TemporalityPreference>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METRICS_ENDPOINT.to_string(),
            headers: BTreeMap::new(),
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            protocol: Protocol::default(),
            temporality_preference: None,
        }
    }
}

impl ExporterConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result fails
    /// validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result fails
    /// validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(endpoint) = get(METRICS_ENDPOINT_ENV) {
            config.endpoint = endpoint.trim().to_string();
        } else if let Some(base) = get(ENDPOINT_ENV) {
            config.endpoint = format!("{}/v1/metrics", base.trim().trim_end_matches('/'));
        }

        if let Some(headers) = get(HEADERS_ENV) {
            config.headers = parse_headers(HEADERS_ENV, &headers)?;
        }
        if let Some(headers) = get(METRICS_HEADERS_ENV) {
            config.headers.extend(parse_headers(METRICS_HEADERS_ENV, &headers)?);
        }

        if let Some((name, value)) = get(METRICS_TIMEOUT_ENV)
            .map(|v| (METRICS_TIMEOUT_ENV, v))
            .or_else(|| get(TIMEOUT_ENV).map(|v| (TIMEOUT_ENV, v)))
        {
            config.timeout_ms = value.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue {
                    name,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some((name, value)) = get(METRICS_PROTOCOL_ENV)
            .map(|v| (METRICS_PROTOCOL_ENV, v))
            .or_else(|| get(PROTOCOL_ENV).map(|v| (PROTOCOL_ENV, v)))
        {
            config.protocol = value.parse::<Protocol>().map_err(|reason| ConfigError::InvalidValue {
                name,
                value: value.clone(),
                reason,
            })?;
        }

        let preference = lookup(TEMPORALITY_PREFERENCE_ENV);
        config.temporality_preference = Some(TemporalityPreference::from_env_value(
            preference.as_deref(),
        ));

        config.validate()?;
        Ok(config)
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the send timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the temporality preference.
    #[must_use]
    pub fn with_temporality_preference(mut self, preference: TemporalityPreference) -> Self {
        self.temporality_preference = Some(preference);
        self
    }

    /// Returns the send timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Parses `key=value,key2=value2`. Whitespace around keys and values is
/// trimmed; empty entries are skipped.
fn parse_headers(name: &'static str, raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                name,
                value: entry.to_string(),
                reason: "expected key=value".to_string(),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    name,
                    value: entry.to_string(),
                    reason: "empty header name".to_string(),
                });
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.endpoint, DEFAULT_METRICS_ENDPOINT);
        assert!(config.headers.is_empty());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.concurrency_limit, 30);
        assert_eq!(config.protocol, Protocol::HttpProtobuf);
        assert_eq!(
            config.temporality_preference,
            Some(TemporalityPreference::Cumulative)
        );
    }

    #[test]
    fn test_generic_endpoint_gets_signal_path() {
        let config =
            ExporterConfig::from_lookup(lookup(&[(ENDPOINT_ENV, "https://otel.example.com:4318/")]))
                .unwrap();

        assert_eq!(config.endpoint, "https://otel.example.com:4318/v1/metrics");
    }

    #[test]
    fn test_metrics_endpoint_is_used_verbatim_and_wins() {
        let config = ExporterConfig::from_lookup(lookup(&[
            (ENDPOINT_ENV, "http://generic:4318"),
            (METRICS_ENDPOINT_ENV, "http://metrics:9000/custom"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://metrics:9000/custom");
    }

    #[test]
    fn test_headers_merge_with_signal_specific_override() {
        let config = ExporterConfig::from_lookup(lookup(&[
            (HEADERS_ENV, "api-key=generic, tenant=acme"),
            (METRICS_HEADERS_ENV, "api-key=metrics"),
        ]))
        .unwrap();

        assert_eq!(config.headers.get("api-key").map(String::as_str), Some("metrics"));
        assert_eq!(config.headers.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_header_value_may_contain_equals() {
        let headers = parse_headers(HEADERS_ENV, "authorization=Basic dXNlcj1wYXNz==").unwrap();

        assert_eq!(headers["authorization"], "Basic dXNlcj1wYXNz==");
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        let result = ExporterConfig::from_lookup(lookup(&[(HEADERS_ENV, "no-separator")]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name, .. }) if name == HEADERS_ENV
        ));
    }

    #[test]
    fn test_timeout_precedence_and_parsing() {
        let config = ExporterConfig::from_lookup(lookup(&[
            (TIMEOUT_ENV, "2500"),
            (METRICS_TIMEOUT_ENV, "750"),
        ]))
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(750));

        let result = ExporterConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "ten")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = ExporterConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "0")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_protocol() {
        let config =
            ExporterConfig::from_lookup(lookup(&[(PROTOCOL_ENV, "http/json")])).unwrap();
        assert_eq!(config.protocol, Protocol::HttpJson);

        let result = ExporterConfig::from_lookup(lookup(&[(METRICS_PROTOCOL_ENV, "grpc")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_temporality_preference_from_environment() {
        let config = ExporterConfig::from_lookup(lookup(&[(TEMPORALITY_PREFERENCE_ENV, "Delta")]))
            .unwrap();
        assert_eq!(config.temporality_preference, Some(TemporalityPreference::Delta));

        let config =
            ExporterConfig::from_lookup(lookup(&[(TEMPORALITY_PREFERENCE_ENV, "bogus")])).unwrap();
        assert_eq!(
            config.temporality_preference,
            Some(TemporalityPreference::Cumulative)
        );
    }

    #[test]
    fn test_invalid_endpoint_fails_validation() {
        let result =
            ExporterConfig::from_lookup(lookup(&[(METRICS_ENDPOINT_ENV, "not a url")]));

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_builders() {
        let config = ExporterConfig::default()
            .with_endpoint("http://collector:4318/v1/metrics")
            .with_timeout(Duration::from_millis(1200))
            .with_temporality_preference(TemporalityPreference::LowMemory);

        assert!(config.validate().is_ok());
        assert_eq!(config.timeout_ms, 1200);
        assert_eq!(
            config.temporality_preference,
            Some(TemporalityPreference::LowMemory)
        );
    }
}
