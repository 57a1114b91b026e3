//! Export error types.
//!
//! Nothing in the export pipeline panics or returns early through a side
//! channel: every failure ends up as an [`ExportError`] inside an
//! [`ExportResult`].

use shared::otlp::SerializerError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a transport while sending one payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No response arrived within the send timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The collector answered with a non-retryable HTTP status.
    #[error("Collector responded with HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The HTTP client failed before a response was received.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The transport was used after `shutdown`.
    #[error("Transport has been shut down")]
    Shutdown,
}

/// Errors reported for a failed export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The snapshot could not be serialized.
    #[error("Failed to serialize export request: {0}")]
    Serialize(#[source] SerializerError),

    /// The collector's response could not be decoded.
    #[error("Failed to decode collector response: {0}")]
    Decode(#[source] SerializerError),

    /// Sending failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The collector is temporarily unavailable; the caller may retry.
    #[error("Collector asked the client to retry (retry after: {retry_after:?})")]
    Retryable {
        /// How long the collector asked the client to wait.
        retry_after: Option<Duration>,
    },

    /// Too many exports are already in flight.
    #[error("Concurrent export limit of {0} reached")]
    ConcurrencyLimitReached(usize),

    /// A flush is waiting for in-flight exports; new exports are refused
    /// until it finishes.
    #[error("Export refused while a flush is in progress")]
    FlushInProgress,

    /// The export delegate panicked.
    #[error("Export delegate panicked: {0}")]
    DelegatePanicked(String),

    /// `export_with_callback` was called outside a Tokio runtime.
    #[error("No Tokio runtime available to run the export")]
    NoRuntime,

    /// The export task was dropped before it finished, for example because
    /// the runtime shut down.
    #[error("Export was cancelled before it completed")]
    Cancelled,
}

/// Outcome of one export: `Ok(())` on success, the cause on failure.
pub type ExportResult = Result<(), ExportError>;
