//! Conversions from Lumen metric snapshots into OTLP protobuf types.
//!
//! Every metric is validated before it is converted, so a malformed snapshot
//! fails as a whole instead of producing a partially encoded request.

use crate::models::{
    Attributes, DataPoint, ExponentialBuckets, ExponentialHistogramValue, HistogramValue,
    InstrumentationScope, MetricData, MetricPoints, MetricValidationError, Number, Resource,
    ResourceMetrics, ScopeMetrics, Temporality,
};
use crate::otlp::proto;
use chrono::{DateTime, Utc};

use proto::collector::metrics::v1::ExportMetricsServiceRequest;
use proto::common::v1::{any_value, AnyValue, ArrayValue, KeyValue, KeyValueList};
use proto::metrics::v1::{self as metrics, metric::Data, AggregationTemporality};

/// Converts a `DateTime<Utc>` to OTLP nanoseconds since the epoch.
fn datetime_to_timestamp(time: DateTime<Utc>, metric: &str) -> Result<u64, MetricValidationError> {
    time.timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .ok_or_else(|| MetricValidationError::TimestampOutOfRange(metric.to_string()))
}

/// Converts a `serde_json::Value` to OTLP `AnyValue`.
///
/// Objects and arrays are converted recursively. Numbers that fit in an
/// `i64` stay integers; `null` becomes an empty value.
pub fn json_to_any_value(value: &serde_json::Value) -> AnyValue {
    use any_value::Value;

    let value = match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::BoolValue(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::IntValue)
            .or_else(|| n.as_f64().map(Value::DoubleValue)),
        serde_json::Value::String(s) => Some(Value::StringValue(s.clone())),
        serde_json::Value::Array(items) => Some(Value::ArrayValue(ArrayValue {
            values: items.iter().map(json_to_any_value).collect(),
        })),
        serde_json::Value::Object(map) => Some(Value::KvlistValue(KeyValueList {
            values: attributes_to_key_values(map),
        })),
    };

    AnyValue { value }
}

/// Converts an attribute map to OTLP key-value pairs, in key order.
pub fn attributes_to_key_values(attributes: &Attributes) -> Vec<KeyValue> {
    attributes
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: Some(json_to_any_value(value)),
            ..Default::default()
        })
        .collect()
}

fn temporality_to_otlp(temporality: Temporality) -> i32 {
    match temporality {
        Temporality::Cumulative => AggregationTemporality::Cumulative as i32,
        Temporality::Delta => AggregationTemporality::Delta as i32,
    }
}

fn resource_to_otlp(resource: &Resource) -> proto::resource::v1::Resource {
    proto::resource::v1::Resource {
        attributes: attributes_to_key_values(&resource.attributes),
        ..Default::default()
    }
}

fn scope_to_otlp(scope: &InstrumentationScope) -> proto::common::v1::InstrumentationScope {
    proto::common::v1::InstrumentationScope {
        name: scope.name.clone(),
        version: scope.version.clone().unwrap_or_default(),
        attributes: attributes_to_key_values(&scope.attributes),
        ..Default::default()
    }
}

fn number_point_to_otlp(
    point: &DataPoint<Number>,
    metric: &str,
) -> Result<metrics::NumberDataPoint, MetricValidationError> {
    use metrics::number_data_point::Value;

    let value = match point.value {
        Number::Int(i) => Value::AsInt(i),
        Number::Double(d) => Value::AsDouble(d),
    };

    Ok(metrics::NumberDataPoint {
        attributes: attributes_to_key_values(&point.attributes),
        start_time_unix_nano: datetime_to_timestamp(point.start_time, metric)?,
        time_unix_nano: datetime_to_timestamp(point.end_time, metric)?,
        value: Some(value),
        ..Default::default()
    })
}

fn histogram_point_to_otlp(
    point: &DataPoint<HistogramValue>,
    metric: &str,
) -> Result<metrics::HistogramDataPoint, MetricValidationError> {
    let hist = &point.value;
    Ok(metrics::HistogramDataPoint {
        attributes: attributes_to_key_values(&point.attributes),
        start_time_unix_nano: datetime_to_timestamp(point.start_time, metric)?,
        time_unix_nano: datetime_to_timestamp(point.end_time, metric)?,
        count: hist.count,
        sum: hist.sum,
        bucket_counts: hist.bucket_counts.clone(),
        explicit_bounds: hist.bounds.clone(),
        min: hist.min,
        max: hist.max,
        ..Default::default()
    })
}

fn exponential_buckets_to_otlp(
    buckets: &ExponentialBuckets,
) -> metrics::exponential_histogram_data_point::Buckets {
    metrics::exponential_histogram_data_point::Buckets {
        offset: buckets.offset,
        bucket_counts: buckets.bucket_counts.clone(),
    }
}

fn exponential_point_to_otlp(
    point: &DataPoint<ExponentialHistogramValue>,
    metric: &str,
) -> Result<metrics::ExponentialHistogramDataPoint, MetricValidationError> {
    let hist = &point.value;
    Ok(metrics::ExponentialHistogramDataPoint {
        attributes: attributes_to_key_values(&point.attributes),
        start_time_unix_nano: datetime_to_timestamp(point.start_time, metric)?,
        time_unix_nano: datetime_to_timestamp(point.end_time, metric)?,
        count: hist.count,
        sum: hist.sum,
        scale: hist.scale,
        zero_count: hist.zero_count,
        positive: Some(exponential_buckets_to_otlp(&hist.positive)),
        negative: Some(exponential_buckets_to_otlp(&hist.negative)),
        min: hist.min,
        max: hist.max,
        ..Default::default()
    })
}

/// Converts a metric to an OTLP `Metric`.
///
/// # Errors
///
/// Returns an error if the metric fails validation.
pub fn metric_to_otlp(metric: &MetricData) -> Result<metrics::Metric, MetricValidationError> {
    metric.validate_metric()?;

    let name = metric.descriptor.name.as_str();
    let temporality = temporality_to_otlp(metric.temporality);

    let data = match &metric.data {
        MetricPoints::Sum {
            is_monotonic,
            points,
        } => Data::Sum(metrics::Sum {
            data_points: points
                .iter()
                .map(|p| number_point_to_otlp(p, name))
                .collect::<Result<_, _>>()?,
            aggregation_temporality: temporality,
            is_monotonic: *is_monotonic,
        }),
        MetricPoints::Gauge { points } => Data::Gauge(metrics::Gauge {
            data_points: points
                .iter()
                .map(|p| number_point_to_otlp(p, name))
                .collect::<Result<_, _>>()?,
        }),
        MetricPoints::Histogram { points } => Data::Histogram(metrics::Histogram {
            data_points: points
                .iter()
                .map(|p| histogram_point_to_otlp(p, name))
                .collect::<Result<_, _>>()?,
            aggregation_temporality: temporality,
        }),
        MetricPoints::ExponentialHistogram { points } => {
            Data::ExponentialHistogram(metrics::ExponentialHistogram {
                data_points: points
                    .iter()
                    .map(|p| exponential_point_to_otlp(p, name))
                    .collect::<Result<_, _>>()?,
                aggregation_temporality: temporality,
            })
        }
    };

    Ok(metrics::Metric {
        name: name.to_string(),
        description: metric.descriptor.description.clone().unwrap_or_default(),
        unit: metric.descriptor.unit.clone().unwrap_or_default(),
        data: Some(data),
        ..Default::default()
    })
}

fn scope_metrics_to_otlp(
    scope_metrics: &ScopeMetrics,
) -> Result<metrics::ScopeMetrics, MetricValidationError> {
    Ok(metrics::ScopeMetrics {
        scope: Some(scope_to_otlp(&scope_metrics.scope)),
        metrics: scope_metrics
            .metrics
            .iter()
            .map(metric_to_otlp)
            .collect::<Result<_, _>>()?,
        schema_url: scope_metrics.scope.schema_url.clone().unwrap_or_default(),
    })
}

/// Converts a metric snapshot to an OTLP export request.
///
/// The request always holds exactly one `ResourceMetrics`, even for a
/// snapshot with no scopes. The snapshot is not modified.
///
/// # Errors
///
/// Returns an error if any metric fails validation.
pub fn resource_metrics_to_request(
    snapshot: &ResourceMetrics,
) -> Result<ExportMetricsServiceRequest, MetricValidationError> {
    let resource_metrics = metrics::ResourceMetrics {
        resource: Some(resource_to_otlp(&snapshot.resource)),
        scope_metrics: snapshot
            .scope_metrics
            .iter()
            .map(scope_metrics_to_otlp)
            .collect::<Result<_, _>>()?,
        schema_url: snapshot.resource.schema_url.clone().unwrap_or_default(),
    };

    Ok(ExportMetricsServiceRequest {
        resource_metrics: vec![resource_metrics],
    })
}

#[cfg(test)]
#[path = "conversions_test.rs"]
mod conversions_test;
