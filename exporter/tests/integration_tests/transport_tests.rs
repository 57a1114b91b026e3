//! Integration tests for the HTTP transport against a live socket.

use super::common::{MockCollector, MockReply};
use axum::http::StatusCode;
use exporter::transport::{ExportResponse, ExporterTransport, HttpExporterTransport, HttpRequestParameters};
use exporter::TransportError;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn transport(url: String) -> HttpExporterTransport {
    HttpExporterTransport::new(
        HttpRequestParameters::new(url, "application/x-protobuf")
            .with_header("x-api-key", "secret")
            .with_header("x-tenant", "acme"),
    )
}

#[tokio::test]
async fn test_first_send_connects_and_posts_body() {
    let collector = MockCollector::start().await;
    let transport = transport(collector.metrics_url());
    assert!(!transport.is_connected());

    let response = transport.send(vec![1, 2, 3], TIMEOUT).await;

    assert!(matches!(response, ExportResponse::Success { data: None }));
    assert!(transport.is_connected());

    let received = collector.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].body, vec![1, 2, 3]);
    assert_eq!(received[0].content_type(), Some("application/x-protobuf"));
    assert_eq!(received[0].headers["x-api-key"], "secret");
    assert_eq!(received[0].headers["x-tenant"], "acme");
}

#[tokio::test]
async fn test_response_body_is_returned() {
    let collector = MockCollector::start().await;
    collector.reply_with(MockReply {
        body: vec![0x0A, 0x00],
        ..MockReply::default()
    });
    let transport = transport(collector.metrics_url());

    let response = transport.send(vec![], TIMEOUT).await;

    assert_eq!(
        response,
        ExportResponse::Success {
            data: Some(vec![0x0A, 0x00])
        }
    );
}

#[tokio::test]
async fn test_concurrent_sends_share_one_client() {
    let collector = MockCollector::start().await;
    let transport = transport(collector.metrics_url());

    let (a, b, c) = tokio::join!(
        transport.send(vec![1], TIMEOUT),
        transport.send(vec![2], TIMEOUT),
        transport.send(vec![3], TIMEOUT),
    );

    for response in [a, b, c] {
        assert!(matches!(response, ExportResponse::Success { .. }));
    }
    assert_eq!(collector.received().len(), 3);
}

#[tokio::test]
async fn test_service_unavailable_is_retryable() {
    let collector = MockCollector::start().await;
    collector.reply_status(StatusCode::SERVICE_UNAVAILABLE, "", Some("7"));
    let transport = transport(collector.metrics_url());

    let response = transport.send(vec![1], TIMEOUT).await;

    assert_eq!(
        response,
        ExportResponse::Retryable {
            retry_after: Some(Duration::from_secs(7))
        }
    );
}

#[tokio::test]
async fn test_too_many_requests_without_hint() {
    let collector = MockCollector::start().await;
    collector.reply_status(StatusCode::TOO_MANY_REQUESTS, "slow down", None);
    let transport = transport(collector.metrics_url());

    let response = transport.send(vec![1], TIMEOUT).await;

    assert_eq!(response, ExportResponse::Retryable { retry_after: None });
}

#[tokio::test]
async fn test_bad_request_is_failure_with_message() {
    let collector = MockCollector::start().await;
    collector.reply_status(StatusCode::BAD_REQUEST, "invalid payload\n", None);
    let transport = transport(collector.metrics_url());

    let response = transport.send(vec![1], TIMEOUT).await;

    assert_eq!(
        response,
        ExportResponse::Failure(TransportError::Http {
            status: 400,
            message: "invalid payload".to_string(),
        })
    );
}

#[tokio::test]
async fn test_slow_collector_times_out() {
    let collector = MockCollector::start().await;
    collector.reply_with(MockReply {
        delay: Duration::from_millis(500),
        ..MockReply::default()
    });
    let transport = transport(collector.metrics_url());
    let timeout = Duration::from_millis(50);

    let response = transport.send(vec![1], timeout).await;

    assert_eq!(
        response,
        ExportResponse::Failure(TransportError::Timeout(timeout))
    );
}

#[tokio::test]
async fn test_unreachable_collector_is_client_error() {
    // Bind and release a port so nothing is listening on it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let transport = transport(format!("http://{addr}/v1/metrics"));

    let response = transport.send(vec![1], TIMEOUT).await;

    assert!(matches!(
        response,
        ExportResponse::Failure(TransportError::Client(_))
    ));
}

#[tokio::test]
async fn test_send_after_shutdown_is_rejected() {
    let collector = MockCollector::start().await;
    let transport = transport(collector.metrics_url());

    assert!(matches!(
        transport.send(vec![1], TIMEOUT).await,
        ExportResponse::Success { .. }
    ));
    transport.shutdown();
    transport.shutdown();

    let response = transport.send(vec![2], TIMEOUT).await;

    assert_eq!(response, ExportResponse::Failure(TransportError::Shutdown));
    assert_eq!(collector.received().len(), 1);
}
