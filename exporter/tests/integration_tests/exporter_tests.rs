//! End-to-end tests from `MetricExporter` to the mock collector.

use super::common::{counter_snapshot, MockCollector, MockReply};
use axum::http::StatusCode;
use exporter::{
    create_metric_exporter, ExportError, ExporterConfig, MetricExporter, Protocol,
    TransportError,
};
use prost::Message;
use shared::config::TemporalityPreference;
use shared::models::{InstrumentKind, Temporality};
use shared::otlp::proto::collector::metrics::v1::{
    ExportMetricsPartialSuccess, ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use shared::otlp::proto::metrics::v1::{metric, number_data_point};
use shared::otlp::SerializerError;
use std::collections::BTreeMap;
use std::time::Duration;

fn config(collector: &MockCollector) -> ExporterConfig {
    ExporterConfig::default()
        .with_endpoint(collector.metrics_url())
        .with_timeout(Duration::from_secs(5))
        .with_temporality_preference(TemporalityPreference::Cumulative)
}

fn exporter(collector: &MockCollector) -> MetricExporter {
    create_metric_exporter(&config(collector)).unwrap()
}

#[tokio::test]
async fn test_export_delivers_protobuf_request() {
    let collector = MockCollector::start().await;
    let exporter = exporter(&collector);

    exporter
        .export(counter_snapshot("http_requests", 42))
        .await
        .unwrap();

    let received = collector.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].content_type(), Some("application/x-protobuf"));

    let request = ExportMetricsServiceRequest::decode(received[0].body.as_slice()).unwrap();
    assert_eq!(request.resource_metrics.len(), 1);
    let scope_metrics = &request.resource_metrics[0].scope_metrics[0];
    assert_eq!(scope_metrics.scope.as_ref().unwrap().name, "lumen.tests");

    let metric = &scope_metrics.metrics[0];
    assert_eq!(metric.name, "http_requests");
    let Some(metric::Data::Sum(sum)) = &metric.data else {
        panic!("expected a sum, got {:?}", metric.data);
    };
    assert!(sum.is_monotonic);
    assert_eq!(
        sum.data_points[0].value,
        Some(number_data_point::Value::AsInt(42))
    );
}

#[tokio::test]
async fn test_export_sends_configured_headers() {
    let collector = MockCollector::start().await;
    let config = ExporterConfig {
        headers: BTreeMap::from([("authorization".to_string(), "Bearer token".to_string())]),
        ..config(&collector)
    };
    let exporter = create_metric_exporter(&config).unwrap();

    exporter.export(counter_snapshot("jobs", 1)).await.unwrap();

    assert_eq!(
        collector.received()[0].headers["authorization"],
        "Bearer token"
    );
}

#[tokio::test]
async fn test_json_protocol() {
    let collector = MockCollector::start().await;
    collector.reply_with(MockReply {
        body: b"{}".to_vec(),
        ..MockReply::default()
    });
    let config = ExporterConfig {
        protocol: Protocol::HttpJson,
        ..config(&collector)
    };
    let exporter = create_metric_exporter(&config).unwrap();

    exporter.export(counter_snapshot("jobs", 3)).await.unwrap();

    let received = collector.received();
    assert_eq!(received[0].content_type(), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        body["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]["name"],
        "jobs"
    );
}

#[tokio::test]
async fn test_endpoint_from_environment_lookup() {
    let collector = MockCollector::start().await;
    let base = collector.base_url().to_string();
    let config = ExporterConfig::from_lookup(|name| {
        (name == "OTEL_EXPORTER_OTLP_ENDPOINT").then(|| base.clone())
    })
    .unwrap();
    let exporter = create_metric_exporter(&config).unwrap();

    exporter.export(counter_snapshot("jobs", 1)).await.unwrap();

    assert_eq!(collector.received().len(), 1);
}

#[tokio::test]
async fn test_partial_success_counts_as_success() {
    let collector = MockCollector::start().await;
    collector.reply_with(MockReply {
        body: ExportMetricsServiceResponse {
            partial_success: Some(ExportMetricsPartialSuccess {
                rejected_data_points: 1,
                error_message: "point out of range".to_string(),
            }),
        }
        .encode_to_vec(),
        ..MockReply::default()
    });
    let exporter = exporter(&collector);

    tokio_test::assert_ok!(exporter.export(counter_snapshot("jobs", 1)).await);
}

#[tokio::test]
async fn test_garbage_response_is_decode_error() {
    let collector = MockCollector::start().await;
    collector.reply_with(MockReply {
        body: vec![0x0A, 0x05, 0x01],
        ..MockReply::default()
    });
    let exporter = exporter(&collector);

    let result = exporter.export(counter_snapshot("jobs", 1)).await;

    assert!(matches!(result, Err(ExportError::Decode(_))));
}

#[tokio::test]
async fn test_garbage_json_response_is_decode_error() {
    let collector = MockCollector::start().await;
    collector.reply_with(MockReply {
        body: b"<html>not otlp</html>".to_vec(),
        ..MockReply::default()
    });
    let config = ExporterConfig {
        protocol: Protocol::HttpJson,
        ..config(&collector)
    };
    let exporter = create_metric_exporter(&config).unwrap();

    let result = exporter.export(counter_snapshot("jobs", 1)).await;

    assert!(matches!(
        result,
        Err(ExportError::Decode(SerializerError::DecodeJson(_)))
    ));
}

#[tokio::test]
async fn test_unavailable_collector_is_retryable() {
    let collector = MockCollector::start().await;
    collector.reply_status(StatusCode::SERVICE_UNAVAILABLE, "", Some("2"));
    let exporter = exporter(&collector);

    let result = exporter.export(counter_snapshot("jobs", 1)).await;

    assert!(matches!(
        result,
        Err(ExportError::Retryable { retry_after: Some(d) }) if d == Duration::from_secs(2)
    ));
}

#[tokio::test]
async fn test_rejected_request_is_transport_error() {
    let collector = MockCollector::start().await;
    collector.reply_status(StatusCode::BAD_REQUEST, "unknown metric type", None);
    let exporter = exporter(&collector);

    let result = exporter.export(counter_snapshot("jobs", 1)).await;

    assert!(matches!(
        result,
        Err(ExportError::Transport(TransportError::Http { status: 400, .. }))
    ));
}

#[tokio::test]
async fn test_export_after_shutdown_fails() {
    let collector = MockCollector::start().await;
    let exporter = exporter(&collector);

    exporter.export(counter_snapshot("jobs", 1)).await.unwrap();
    exporter.shutdown().await.unwrap();

    let result = exporter.export(counter_snapshot("jobs", 2)).await;

    assert!(matches!(
        result,
        Err(ExportError::Transport(TransportError::Shutdown))
    ));
    assert_eq!(collector.received().len(), 1);
}

#[tokio::test]
async fn test_callback_reports_outcome_once() {
    let collector = MockCollector::start().await;
    let exporter = exporter(&collector);
    let (tx, rx) = tokio::sync::oneshot::channel();

    exporter.export_with_callback(counter_snapshot("jobs", 5), move |result| {
        let _ = tx.send(result);
    });

    let result = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(collector.received().len(), 1);
}

#[tokio::test]
async fn test_policies_follow_preference() {
    let collector = MockCollector::start().await;
    let config = config(&collector).with_temporality_preference(TemporalityPreference::LowMemory);
    let exporter = create_metric_exporter(&config).unwrap();

    assert_eq!(
        exporter.select_temporality(InstrumentKind::Counter),
        Temporality::Delta
    );
    assert_eq!(
        exporter.select_temporality(InstrumentKind::ObservableCounter),
        Temporality::Cumulative
    );
    assert!(exporter.select_aggregation(InstrumentKind::Histogram).is_default());
}
