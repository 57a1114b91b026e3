//! Temporality preference for metric export.
//!
//! A preference maps every instrument kind to the temporality the aggregation
//! engine should report it with. The preference comes from the caller, or
//! from `OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE`, or defaults to
//! cumulative.

use super::ConfigError;
use crate::models::{InstrumentKind, Temporality};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable selecting the temporality preference.
pub const TEMPORALITY_PREFERENCE_ENV: &str = "OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE";

/// The standard temporality policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalityPreference {
    /// Cumulative for every kind.
    #[default]
    Cumulative,
    /// Delta for counters, gauges and histograms; cumulative for up/down counters.
    Delta,
    /// Delta only for synchronous counters and histograms.
    LowMemory,
}

impl TemporalityPreference {
    /// Returns the temporality this policy selects for `kind`.
    #[must_use]
    pub const fn temporality(self, kind: InstrumentKind) -> Temporality {
        match self {
            Self::Cumulative => Temporality::Cumulative,
            Self::Delta => match kind {
                InstrumentKind::Counter
                | InstrumentKind::ObservableCounter
                | InstrumentKind::Gauge
                | InstrumentKind::ObservableGauge
                | InstrumentKind::Histogram => Temporality::Delta,
                InstrumentKind::UpDownCounter | InstrumentKind::ObservableUpDownCounter => {
                    Temporality::Cumulative
                }
            },
            Self::LowMemory => match kind {
                InstrumentKind::Counter | InstrumentKind::Histogram => Temporality::Delta,
                InstrumentKind::Gauge
                | InstrumentKind::UpDownCounter
                | InstrumentKind::ObservableCounter
                | InstrumentKind::ObservableUpDownCounter
                | InstrumentKind::ObservableGauge => Temporality::Cumulative,
            },
        }
    }

    /// Returns the lowercase configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cumulative => "cumulative",
            Self::Delta => "delta",
            Self::LowMemory => "lowmemory",
        }
    }

    /// Interprets a raw environment value.
    ///
    /// Matching is case-insensitive. An absent value selects `Cumulative`;
    /// an unrecognized value logs a warning and also selects `Cumulative`.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Cumulative;
        };

        value.parse().unwrap_or_else(|_| {
            tracing::warn!(
                env = TEMPORALITY_PREFERENCE_ENV,
                value = %value,
                "Unknown temporality preference, only 'cumulative', 'delta' and 'lowmemory' are allowed; using 'cumulative'"
            );
            Self::Cumulative
        })
    }

    /// Reads the preference from `OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(TEMPORALITY_PREFERENCE_ENV).ok().as_deref())
    }

    /// Applies selection precedence: an explicit preference wins, otherwise
    /// the environment decides.
    #[must_use]
    pub fn resolve(explicit: Option<Self>) -> Self {
        explicit.unwrap_or_else(Self::from_env)
    }
}

impl FromStr for TemporalityPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cumulative" => Ok(Self::Cumulative),
            "delta" => Ok(Self::Delta),
            "lowmemory" => Ok(Self::LowMemory),
            _ => Err(ConfigError::UnknownTemporalityPreference(s.to_string())),
        }
    }
}

impl std::fmt::Display for TemporalityPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
