//! Export delegates carry out the serialize-and-send step of an export.

use crate::error::{ExportError, ExportResult};
use crate::transport::{ExportResponse, ExporterTransport};
use async_trait::async_trait;
use shared::otlp::{PartialSuccess, Serializer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default bound on in-flight exports.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 30;

/// Largest accepted concurrency limit. `force_flush` takes every permit in
/// one `acquire_many(u32)` call, so the limit must fit both that and the
/// semaphore.
pub const MAX_CONCURRENCY_LIMIT: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Default send timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs exports of `T` on behalf of an exporter.
#[async_trait]
pub trait ExportDelegate<T: Send + 'static>: Send + Sync {
    /// Exports one batch of items.
    async fn export(&self, items: T) -> ExportResult;

    /// Waits until every in-flight export has completed.
    async fn force_flush(&self) -> ExportResult;

    /// Flushes, then releases the transport.
    async fn shutdown(&self) -> ExportResult;
}

/// Serializes with `S` and sends with `T`.
///
/// At most `concurrency_limit` exports run at once; an export beyond the
/// limit fails immediately with [`ExportError::ConcurrencyLimitReached`]
/// instead of waiting.
///
/// While `force_flush` (or `shutdown`) waits for in-flight exports, new
/// exports are rejected with [`ExportError::FlushInProgress`] regardless of
/// how many permits are free.
#[derive(Debug)]
pub struct OtlpExportDelegate<S, T> {
    serializer: S,
    transport: T,
    timeout: Duration,
    concurrency_limit: usize,
    in_flight: Semaphore,
    flushing: AtomicUsize,
}

/// Marks a flush as running for as long as it lives.
struct FlushGuard<'a>(&'a AtomicUsize);

impl<'a> FlushGuard<'a> {
    fn enter(flushing: &'a AtomicUsize) -> Self {
        flushing.fetch_add(1, Ordering::SeqCst);
        Self(flushing)
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S, T> OtlpExportDelegate<S, T>
where
    S: Serializer,
    S::Response: PartialSuccess,
    T: ExporterTransport,
{
    /// Creates a delegate with the default timeout and concurrency limit.
    pub fn new(serializer: S, transport: T) -> Self {
        Self::with_limits(serializer, transport, DEFAULT_TIMEOUT, DEFAULT_CONCURRENCY_LIMIT)
    }

    /// Creates a delegate with an explicit timeout and concurrency limit.
    ///
    /// The limit is clamped to `1..=MAX_CONCURRENCY_LIMIT`.
    pub fn with_limits(
        serializer: S,
        transport: T,
        timeout: Duration,
        concurrency_limit: usize,
    ) -> Self {
        let clamped = concurrency_limit.clamp(1, MAX_CONCURRENCY_LIMIT);
        if clamped != concurrency_limit {
            tracing::warn!(
                requested = concurrency_limit,
                limit = clamped,
                "Concurrency limit out of range, clamping"
            );
        }

        Self {
            serializer,
            transport,
            timeout,
            concurrency_limit: clamped,
            in_flight: Semaphore::new(clamped),
            flushing: AtomicUsize::new(0),
        }
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The effective concurrency limit.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    fn handle_response(&self, response: ExportResponse) -> ExportResult {
        match response {
            ExportResponse::Success { data: None } => Ok(()),
            ExportResponse::Success { data: Some(bytes) } => {
                let response = self
                    .serializer
                    .deserialize_response(&bytes)
                    .map_err(ExportError::Decode)?;
                if response.is_partial_success() {
                    tracing::warn!(
                        rejected = response.rejected(),
                        message = response.partial_error_message().unwrap_or_default(),
                        "Collector partially rejected the export"
                    );
                }
                Ok(())
            }
            ExportResponse::Retryable { retry_after } => {
                Err(ExportError::Retryable { retry_after })
            }
            ExportResponse::Failure(e) => Err(ExportError::Transport(e)),
        }
    }
}

#[async_trait]
impl<S, T> ExportDelegate<S::Request> for OtlpExportDelegate<S, T>
where
    S: Serializer,
    S::Request: Send + Sync + 'static,
    S::Response: PartialSuccess,
    T: ExporterTransport,
{
    async fn export(&self, items: S::Request) -> ExportResult {
        let Ok(_permit) = self.in_flight.try_acquire() else {
            if self.flushing.load(Ordering::SeqCst) > 0 {
                tracing::warn!("Dropping export, a flush is waiting for in-flight exports");
                return Err(ExportError::FlushInProgress);
            }
            tracing::warn!(
                limit = self.concurrency_limit,
                "Dropping export, too many exports in flight"
            );
            return Err(ExportError::ConcurrencyLimitReached(self.concurrency_limit));
        };

        let body = self
            .serializer
            .serialize_request(&items)
            .map_err(ExportError::Serialize)?;
        let response = self.transport.send(body, self.timeout).await;
        self.handle_response(response)
    }

    async fn force_flush(&self) -> ExportResult {
        let permits = u32::try_from(self.concurrency_limit).unwrap_or(u32::MAX);
        let _flushing = FlushGuard::enter(&self.flushing);
        // Holding every permit means nothing else is in flight.
        if let Ok(all) = self.in_flight.acquire_many(permits).await {
            drop(all);
        }
        Ok(())
    }

    async fn shutdown(&self) -> ExportResult {
        self.force_flush().await?;
        self.transport.shutdown();
        Ok(())
    }
}
