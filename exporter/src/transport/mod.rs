//! Transports carry serialized export payloads to a collector.
//!
//! A transport performs exactly one send per call and never retries; what
//! to do with a [`ExportResponse::Retryable`] is up to the caller.

pub mod http;

pub use http::{
    Connector, HttpClient, HttpExporterTransport, HttpRequestParameters, HttpResponse,
    ReqwestClient, ReqwestConnector,
};

use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// The result of one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResponse {
    /// The collector accepted the payload.
    Success {
        /// Response body, `None` when the collector sent none.
        data: Option<Vec<u8>>,
    },
    /// The send failed.
    Failure(TransportError),
    /// The collector is temporarily unavailable.
    Retryable {
        /// How long the collector asked the client to wait.
        retry_after: Option<Duration>,
    },
}

/// Trait for sending serialized payloads.
///
/// Implementations must tolerate overlapping `send` calls.
#[async_trait]
pub trait ExporterTransport: Send + Sync {
    /// Sends one payload, waiting at most `timeout` for the response.
    async fn send(&self, data: Vec<u8>, timeout: Duration) -> ExportResponse;

    /// Releases held resources. Idempotent; later sends fail with
    /// [`TransportError::Shutdown`].
    fn shutdown(&self);
}

#[async_trait]
impl<T: ExporterTransport + ?Sized> ExporterTransport for Arc<T> {
    async fn send(&self, data: Vec<u8>, timeout: Duration) -> ExportResponse {
        (**self).send(data, timeout).await
    }

    fn shutdown(&self) {
        (**self).shutdown();
    }
}
