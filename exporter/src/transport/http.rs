//! OTLP/HTTP transport.
//!
//! The HTTP client is not created when the transport is constructed. It is
//! built by the [`Connector`] on the first `send` and reused afterwards, so
//! instrumentation that hooks the client stack can be installed after the
//! exporter exists. Concurrent first sends wait on the same initialization
//! and share the resulting client.

use super::{ExportResponse, ExporterTransport};
use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Where and how to POST payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestParameters {
    /// Full collector URL, including the signal path.
    pub url: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// `Content-Type` of the payload.
    pub content_type: String,
}

impl HttpRequestParameters {
    /// Creates parameters without extra headers.
    #[must_use]
    pub fn new(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            content_type: content_type.into(),
        }
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// The parts of an HTTP response the transport looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw `Retry-After` header value.
    pub retry_after: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

/// A connected HTTP client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POSTs `body` according to `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained.
    async fn post(
        &self,
        params: &HttpRequestParameters,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError>;

    /// Releases connections held by the client.
    fn shutdown(&self) {}
}

/// Builds the HTTP client on first use.
pub trait Connector: Send + Sync {
    /// The client this connector produces.
    type Client: HttpClient;

    /// Creates the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    fn connect(&self, params: &HttpRequestParameters) -> Result<Self::Client, TransportError>;
}

/// Connects with `reqwest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestConnector;

impl Connector for ReqwestConnector {
    type Client = ReqwestClient;

    fn connect(&self, params: &HttpRequestParameters) -> Result<ReqwestClient, TransportError> {
        tracing::debug!(url = %params.url, "Creating HTTP client for OTLP export");
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(ReqwestClient {
            client: RwLock::new(Some(client)),
        })
    }
}

/// [`HttpClient`] backed by `reqwest`.
///
/// `shutdown` drops the inner client and its connection pool; later posts
/// fail with [`TransportError::Shutdown`].
#[derive(Debug)]
pub struct ReqwestClient {
    client: RwLock<Option<reqwest::Client>>,
}

impl ReqwestClient {
    /// Returns `true` until `shutdown` has released the inner client.
    pub fn is_open(&self) -> bool {
        self.client.read().is_ok_and(|client| client.is_some())
    }

    fn current(&self) -> Result<reqwest::Client, TransportError> {
        self.client
            .read()
            .map_err(|_| TransportError::Client("HTTP client lock is poisoned".to_string()))?
            .clone()
            .ok_or(TransportError::Shutdown)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post(
        &self,
        params: &HttpRequestParameters,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .current()?
            .post(params.url.as_str())
            .header(reqwest::header::CONTENT_TYPE, params.content_type.as_str());
        for (name, value) in &params.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Client(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Client(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }

    fn shutdown(&self) {
        let released = match self.client.write() {
            Ok(mut client) => client.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if released.is_some() {
            tracing::debug!("Released HTTP client for OTLP export");
        }
    }
}

/// Parses a `Retry-After` value: delay in seconds, or an HTTP date.
///
/// Dates in the past yield a zero delay.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        date.with_timezone(&Utc)
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

/// Maps an HTTP response to an export response.
fn classify_response(response: HttpResponse) -> ExportResponse {
    match response.status {
        200..=299 => ExportResponse::Success {
            data: (!response.body.is_empty()).then_some(response.body),
        },
        429 | 502 | 503 | 504 => ExportResponse::Retryable {
            retry_after: response
                .retry_after
                .as_deref()
                .and_then(|value| parse_retry_after(value, Utc::now())),
        },
        status => ExportResponse::Failure(TransportError::Http {
            status,
            message: String::from_utf8_lossy(&response.body).trim().to_string(),
        }),
    }
}

/// Sends payloads over HTTP POST.
///
/// # Example
///
/// ```
/// use exporter::transport::{ExporterTransport, HttpExporterTransport, HttpRequestParameters};
///
/// let transport = HttpExporterTransport::new(HttpRequestParameters::new(
///     "http://localhost:4318/v1/metrics",
///     "application/x-protobuf",
/// ));
///
/// // Nothing has been connected yet, so shutting down is a no-op.
/// assert!(!transport.is_connected());
/// transport.shutdown();
/// ```
pub struct HttpExporterTransport<C: Connector = ReqwestConnector> {
    params: HttpRequestParameters,
    connector: C,
    client: OnceCell<C::Client>,
    shutdown: AtomicBool,
}

impl<C: Connector> std::fmt::Debug for HttpExporterTransport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExporterTransport")
            .field("params", &self.params)
            .field("connected", &self.is_connected())
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl HttpExporterTransport {
    /// Creates a transport that connects with `reqwest`.
    #[must_use]
    pub fn new(params: HttpRequestParameters) -> Self {
        Self::with_connector(params, ReqwestConnector)
    }
}

impl<C: Connector> HttpExporterTransport<C> {
    /// Creates a transport that connects with `connector`.
    pub fn with_connector(params: HttpRequestParameters, connector: C) -> Self {
        Self {
            params,
            connector,
            client: OnceCell::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// The request parameters.
    pub fn params(&self) -> &HttpRequestParameters {
        &self.params
    }

    /// Returns `true` once the client has been created.
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&C::Client, TransportError> {
        self.client
            .get_or_try_init(|| async { self.connector.connect(&self.params) })
            .await
    }
}

#[async_trait]
impl<C: Connector> ExporterTransport for HttpExporterTransport<C> {
    async fn send(&self, data: Vec<u8>, timeout: Duration) -> ExportResponse {
        if self.shutdown.load(Ordering::SeqCst) {
            return ExportResponse::Failure(TransportError::Shutdown);
        }

        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => return ExportResponse::Failure(e),
        };

        match tokio::time::timeout(timeout, client.post(&self.params, data)).await {
            Ok(Ok(response)) => classify_response(response),
            Ok(Err(e)) => ExportResponse::Failure(e),
            Err(_) => ExportResponse::Failure(TransportError::Timeout(timeout)),
        }
    }

    fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(client) = self.client.get() {
            client.shutdown();
        }
    }
}
