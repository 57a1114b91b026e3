//! Log record processing.
//!
//! A [`LogRecordProcessor`] receives every record a logger emits. The
//! [`FilteringLogRecordProcessor`] decides per record whether it reaches the
//! processor it wraps.

pub mod filter;
pub mod memory;

pub use filter::FilteringLogRecordProcessor;
pub use memory::InMemoryLogRecordProcessor;

use crate::models::{Context, LogRecord};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during log processor operations.
#[derive(Debug, Error)]
pub enum LogProcessorError {
    /// Failed to acquire a lock on processor state.
    #[error("Failed to acquire lock on log processor")]
    LockError,

    /// The processor could not complete the operation.
    #[error("Log processor error: {0}")]
    ProcessorError(String),
}

/// Trait for components that consume emitted log records.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait LogRecordProcessor: Send + Sync {
    /// Handles one emitted record.
    ///
    /// `context` is the ambient execution context the record was emitted in,
    /// when the caller has one.
    fn on_emit(&self, record: &mut LogRecord, context: Option<&Context>);

    /// Flushes any buffered records.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn force_flush(&self) -> Result<(), LogProcessorError>;

    /// Shuts the processor down.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    fn shutdown(&self) -> Result<(), LogProcessorError>;
}

impl<P: LogRecordProcessor + ?Sized> LogRecordProcessor for Arc<P> {
    fn on_emit(&self, record: &mut LogRecord, context: Option<&Context>) {
        (**self).on_emit(record, context);
    }

    fn force_flush(&self) -> Result<(), LogProcessorError> {
        (**self).force_flush()
    }

    fn shutdown(&self) -> Result<(), LogProcessorError> {
        (**self).shutdown()
    }
}
