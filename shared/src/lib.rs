//! Lumen Shared Library
//!
//! This crate contains the telemetry data model, export policy selectors,
//! OTLP serializers and the log filtering engine used across Lumen.
//!
//! # Modules
//!
//! - [`models`] - Metric snapshots, log records and span context
//! - [`config`] - Temporality/aggregation selectors and the logger configurator
//! - [`otlp`] - Conversion of snapshots into OTLP payloads and back
//! - [`logs`] - Log record processors, including the filtering processor
//!
//! # Example
//!
//! ```
//! use shared::config::{LoggerConfig, LoggerConfigurator, LoggerPattern};
//! use shared::models::SeverityNumber;
//!
//! let configurator = LoggerConfigurator::new(vec![
//!     LoggerPattern::new("prod-*", LoggerConfig::new().with_minimum_severity(SeverityNumber::Warn)),
//!     LoggerPattern::new("*", LoggerConfig::new().with_minimum_severity(SeverityNumber::Info)),
//! ]);
//!
//! assert_eq!(configurator.resolve_name("prod-api").minimum_severity, SeverityNumber::Warn);
//! assert_eq!(configurator.resolve_name("dev-api").minimum_severity, SeverityNumber::Info);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod logs;
pub mod models;
pub mod otlp;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
