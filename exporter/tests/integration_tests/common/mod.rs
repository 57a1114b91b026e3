//! Common test utilities for integration tests.
//!
//! Provides a mock collector that records every request it receives and
//! answers with a configurable reply.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use shared::models::{
    DataPoint, InstrumentKind, InstrumentationScope, MetricData, MetricDescriptor, Number,
    Resource, ResourceMetrics, ScopeMetrics, Temporality,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Path the mock collector serves metrics on.
pub const METRICS_PATH: &str = "/v1/metrics";

/// One request as seen by the collector.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// Raw request body.
    pub body: Vec<u8>,
    /// All request headers.
    pub headers: HeaderMap,
}

impl ReceivedRequest {
    /// Returns the `Content-Type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// What the collector answers with.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub retry_after: Option<String>,
    pub delay: Duration,
}

impl Default for MockReply {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            body: Vec::new(),
            retry_after: None,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Clone, Default)]
struct CollectorState {
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    reply: Arc<Mutex<MockReply>>,
}

/// A running mock collector.
pub struct MockCollector {
    base_url: String,
    state: CollectorState,
}

impl MockCollector {
    /// Starts a collector on an ephemeral local port.
    pub async fn start() -> Self {
        let state = CollectorState::default();
        let app = Router::new()
            .route(METRICS_PATH, post(receive))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Base URL without a signal path.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full metrics URL.
    pub fn metrics_url(&self) -> String {
        format!("{}{METRICS_PATH}", self.base_url)
    }

    /// Replaces the reply for subsequent requests.
    pub fn reply_with(&self, reply: MockReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// Replies with `status` and an optional `Retry-After` header.
    pub fn reply_status(&self, status: StatusCode, body: &str, retry_after: Option<&str>) {
        self.reply_with(MockReply {
            status,
            body: body.as_bytes().to_vec(),
            retry_after: retry_after.map(str::to_string),
            ..MockReply::default()
        });
    }

    /// Requests received so far.
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state.received.lock().unwrap().clone()
    }
}

async fn receive(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.received.lock().unwrap().push(ReceivedRequest {
        body: body.to_vec(),
        headers,
    });

    let reply = state.reply.lock().unwrap().clone();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut response_headers = HeaderMap::new();
    if let Some(retry_after) = reply.retry_after {
        response_headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from_str(&retry_after).unwrap(),
        );
    }
    (reply.status, response_headers, reply.body).into_response()
}

/// A snapshot with a single cumulative counter.
pub fn counter_snapshot(name: &str, value: i64) -> ResourceMetrics {
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let end = start + ChronoDuration::seconds(60);
    ResourceMetrics::new(Resource::new().with_attribute("service.name", "integration-test"))
        .with_scope_metrics(ScopeMetrics::new(
            InstrumentationScope::new("lumen.tests").with_version("0.1.0"),
            vec![MetricData::sum(
                MetricDescriptor::new(name, InstrumentKind::Counter).with_unit("1"),
                Temporality::Cumulative,
                true,
                vec![DataPoint::new(start, end, Number::Int(value)).with_attribute("route", "/")],
            )],
        ))
}
