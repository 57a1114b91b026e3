//! Filtering log record processor.
//!
//! Gates each record against its logger config before handing it to the
//! wrapped processor. Gating happens in this order:
//!
//! 1. `disabled` drops every record.
//! 2. A record with a specified severity below `minimum_severity` is dropped.
//!    `UNSPECIFIED` records are never dropped by this check.
//! 3. With `trace_based`, a record whose span context (its own, else the
//!    ambient one) is valid but not sampled is dropped. Missing or invalid
//!    contexts pass.
//!
//! Drops are silent. Lifecycle calls always reach the wrapped processor.

use super::{LogProcessorError, LogRecordProcessor};
use crate::config::{LoggerConfig, LoggerConfigurator, ResolvedLoggerConfig};
use crate::models::{Context, LogRecord, SpanContext};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum ConfigSource {
    Static(ResolvedLoggerConfig),
    Configurator(Arc<LoggerConfigurator>),
}

/// Wraps a processor and forwards only the records its config allows.
///
/// # Example
///
/// ```
/// use shared::config::LoggerConfig;
/// use shared::logs::{FilteringLogRecordProcessor, InMemoryLogRecordProcessor, LogRecordProcessor};
/// use shared::models::{InstrumentationScope, LogRecord, SeverityNumber};
///
/// let sink = InMemoryLogRecordProcessor::new_shared();
/// let filter = FilteringLogRecordProcessor::with_config(
///     sink.clone(),
///     LoggerConfig::new().with_minimum_severity(SeverityNumber::Warn),
/// );
///
/// let scope = InstrumentationScope::new("app");
/// filter.on_emit(&mut LogRecord::new(scope.clone(), SeverityNumber::Debug), None);
/// filter.on_emit(&mut LogRecord::new(scope, SeverityNumber::Error), None);
///
/// assert_eq!(sink.len().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct FilteringLogRecordProcessor<P> {
    delegate: P,
    source: ConfigSource,
}

impl<P: LogRecordProcessor> FilteringLogRecordProcessor<P> {
    /// Applies one fixed config to every record.
    #[must_use]
    pub fn with_config(delegate: P, config: LoggerConfig) -> Self {
        Self {
            delegate,
            source: ConfigSource::Static(config.resolve()),
        }
    }

    /// Resolves the config per record from its instrumentation scope.
    #[must_use]
    pub fn with_configurator(delegate: P, configurator: Arc<LoggerConfigurator>) -> Self {
        Self {
            delegate,
            source: ConfigSource::Configurator(configurator),
        }
    }

    /// The wrapped processor.
    pub fn delegate(&self) -> &P {
        &self.delegate
    }

    fn config_for(&self, record: &LogRecord) -> ResolvedLoggerConfig {
        match &self.source {
            ConfigSource::Static(config) => *config,
            ConfigSource::Configurator(configurator) => {
                configurator.resolve(&record.instrumentation_scope)
            }
        }
    }
}

/// Returns `true` if `record` passes `config`.
fn should_emit(config: &ResolvedLoggerConfig, record: &LogRecord, context: Option<&Context>) -> bool {
    if config.disabled {
        return false;
    }

    let severity = record.severity_number;
    if !severity.is_unspecified() && severity < config.minimum_severity {
        return false;
    }

    if config.trace_based {
        let span_context: Option<&SpanContext> = record
            .span_context
            .as_ref()
            .or_else(|| context.and_then(Context::span_context));
        if let Some(span_context) = span_context {
            if span_context.is_valid() && !span_context.is_sampled() {
                return false;
            }
        }
    }

    true
}

impl<P: LogRecordProcessor> LogRecordProcessor for FilteringLogRecordProcessor<P> {
    fn on_emit(&self, record: &mut LogRecord, context: Option<&Context>) {
        let config = self.config_for(record);
        if should_emit(&config, record, context) {
            self.delegate.on_emit(record, context);
        }
    }

    fn force_flush(&self) -> Result<(), LogProcessorError> {
        self.delegate.force_flush()
    }

    fn shutdown(&self) -> Result<(), LogProcessorError> {
        self.delegate.shutdown()
    }
}
