//! Metric data model.
//!
//! Defines the aggregated metric snapshot (`ResourceMetrics`) that the
//! aggregation engine hands to an exporter once per collection cycle.

use super::common::{Attributes, InstrumentationScope, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// The category of a measurement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// A synchronous, monotonically increasing counter.
    Counter,
    /// A synchronous counter that can go up or down.
    UpDownCounter,
    /// A synchronous instrument recording the last value.
    Gauge,
    /// A synchronous instrument recording a distribution.
    Histogram,
    /// An asynchronous, monotonically increasing counter.
    ObservableCounter,
    /// An asynchronous counter that can go up or down.
    ObservableUpDownCounter,
    /// An asynchronous instrument recording the last value.
    ObservableGauge,
}

impl InstrumentKind {
    /// Every instrument kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Counter,
        Self::UpDownCounter,
        Self::Gauge,
        Self::Histogram,
        Self::ObservableCounter,
        Self::ObservableUpDownCounter,
        Self::ObservableGauge,
    ];

    /// Position of this kind inside [`InstrumentKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the snake case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::UpDownCounter => "up_down_counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::ObservableCounter => "observable_counter",
            Self::ObservableUpDownCounter => "observable_up_down_counter",
            Self::ObservableGauge => "observable_gauge",
        }
    }

    /// Returns `true` for the asynchronous (callback driven) variants.
    #[must_use]
    pub const fn is_observable(self) -> bool {
        matches!(
            self,
            Self::ObservableCounter | Self::ObservableUpDownCounter | Self::ObservableGauge
        )
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether reported values are running totals or deltas since the last report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temporality {
    /// Every data point reports the total since a fixed start time.
    #[default]
    Cumulative,
    /// Every data point reports only the change since the previous report.
    Delta,
}

impl std::fmt::Display for Temporality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cumulative => write!(f, "cumulative"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// A scalar measurement, integral or floating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Double(f64),
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Explicit-bucket distribution.
///
/// `bucket_counts` holds one more entry than `bounds`: the last bucket
/// counts observations above the highest bound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistogramValue {
    /// Upper bounds of the buckets, strictly ascending.
    #[serde(default)]
    pub bounds: Vec<f64>,
    /// Per-bucket observation counts (not cumulative).
    #[serde(default)]
    pub bucket_counts: Vec<u64>,
    /// Total number of observations.
    pub count: u64,
    /// Sum of all observations, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    /// Smallest observation, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest observation, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// A contiguous run of base-2 exponential buckets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExponentialBuckets {
    /// Index of the first bucket.
    #[serde(default)]
    pub offset: i32,
    /// Observation counts, starting at `offset`.
    #[serde(default)]
    pub bucket_counts: Vec<u64>,
}

/// Base-2 exponential distribution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExponentialHistogramValue {
    /// Resolution of the buckets.
    pub scale: i32,
    /// Observations that fell into the zero bucket.
    #[serde(default)]
    pub zero_count: u64,
    /// Buckets for positive observations.
    #[serde(default)]
    pub positive: ExponentialBuckets,
    /// Buckets for negative observations.
    #[serde(default)]
    pub negative: ExponentialBuckets,
    /// Total number of observations.
    pub count: u64,
    /// Sum of all observations, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    /// Smallest observation, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest observation, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// A single aggregated data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint<V> {
    /// Attribute set identifying the time series.
    #[serde(default)]
    pub attributes: Attributes,
    /// Start of the aggregation window.
    pub start_time: DateTime<Utc>,
    /// End of the aggregation window (never before `start_time`).
    pub end_time: DateTime<Utc>,
    /// The aggregated value.
    pub value: V,
}

impl<V> DataPoint<V> {
    /// Creates a data point without attributes.
    #[must_use]
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, value: V) -> Self {
        Self {
            attributes: Attributes::new(),
            start_time,
            end_time,
            value,
        }
    }

    /// Adds an attribute to the data point.
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// The data points of a metric, grouped by their OTLP shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricPoints {
    /// Summed values (counters).
    Sum {
        /// Whether the sum can only increase.
        is_monotonic: bool,
        /// The data points.
        points: Vec<DataPoint<Number>>,
    },
    /// Last-value samples.
    Gauge {
        /// The data points.
        points: Vec<DataPoint<Number>>,
    },
    /// Explicit-bucket histograms.
    Histogram {
        /// The data points.
        points: Vec<DataPoint<HistogramValue>>,
    },
    /// Base-2 exponential histograms.
    ExponentialHistogram {
        /// The data points.
        points: Vec<DataPoint<ExponentialHistogramValue>>,
    },
}

impl MetricPoints {
    /// Returns the number of data points.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sum { points, .. } | Self::Gauge { points } => points.len(),
            Self::Histogram { points } => points.len(),
            Self::ExponentialHistogram { points } => points.len(),
        }
    }

    /// Returns `true` if there are no data points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        fn window<V>(p: &DataPoint<V>) -> (DateTime<Utc>, DateTime<Utc>) {
            (p.start_time, p.end_time)
        }
        match self {
            Self::Sum { points, .. } | Self::Gauge { points } => points.iter().map(window).collect(),
            Self::Histogram { points } => points.iter().map(window).collect(),
            Self::ExponentialHistogram { points } => points.iter().map(window).collect(),
        }
    }
}

/// Describes the instrument that produced a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricDescriptor {
    /// The name of the metric (e.g., "`http.server.duration`").
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub name: String,

    /// Optional description of the metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional unit of the metric (e.g., "ms", "By").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// The kind of instrument.
    pub kind: InstrumentKind,
}

impl MetricDescriptor {
    /// Creates a descriptor with no description or unit.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: InstrumentKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            unit: None,
            kind,
        }
    }

    /// Sets the description of the metric.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the unit of the metric.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// One metric with all its data points for a collection cycle.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use shared::models::{DataPoint, InstrumentKind, MetricData, MetricDescriptor, Temporality};
///
/// let end = Utc::now();
/// let metric = MetricData::sum(
///     MetricDescriptor::new("http.requests", InstrumentKind::Counter),
///     Temporality::Delta,
///     true,
///     vec![DataPoint::new(end - Duration::seconds(10), end, 42_i64.into())
///         .with_attribute("method", "GET")],
/// );
///
/// assert!(metric.validate_metric().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    /// The producing instrument.
    pub descriptor: MetricDescriptor,
    /// Temporality the data points were aggregated with.
    #[serde(default)]
    pub temporality: Temporality,
    /// The data points.
    pub data: MetricPoints,
}

/// Errors that can occur during metric validation.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// The metric name is empty.
    #[error("Metric name cannot be empty")]
    EmptyName,

    /// A data point ends before it starts.
    #[error("Data point of '{0}' ends before it starts")]
    InvalidTimeWindow(String),

    /// A timestamp cannot be represented as nanoseconds since the epoch.
    #[error("Timestamp of '{0}' is outside the representable nanosecond range")]
    TimestampOutOfRange(String),

    /// Histogram buckets and bounds disagree.
    #[error("Histogram '{name}' has {counts} bucket counts for {bounds} bounds")]
    BucketCountMismatch {
        /// Metric name.
        name: String,
        /// Number of explicit bounds.
        bounds: usize,
        /// Number of bucket counts.
        counts: usize,
    },

    /// Histogram bounds are not strictly ascending.
    #[error("Histogram '{0}' bounds must be sorted in ascending order")]
    UnsortedBounds(String),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl MetricData {
    /// Creates a metric from its parts.
    #[must_use]
    pub fn new(descriptor: MetricDescriptor, temporality: Temporality, data: MetricPoints) -> Self {
        Self {
            descriptor,
            temporality,
            data,
        }
    }

    /// Creates a sum metric.
    #[must_use]
    pub fn sum(
        descriptor: MetricDescriptor,
        temporality: Temporality,
        is_monotonic: bool,
        points: Vec<DataPoint<Number>>,
    ) -> Self {
        Self::new(
            descriptor,
            temporality,
            MetricPoints::Sum {
                is_monotonic,
                points,
            },
        )
    }

    /// Creates a gauge metric.
    #[must_use]
    pub fn gauge(descriptor: MetricDescriptor, points: Vec<DataPoint<Number>>) -> Self {
        Self::new(descriptor, Temporality::Cumulative, MetricPoints::Gauge { points })
    }

    /// Creates an explicit-bucket histogram metric.
    #[must_use]
    pub fn histogram(
        descriptor: MetricDescriptor,
        temporality: Temporality,
        points: Vec<DataPoint<HistogramValue>>,
    ) -> Self {
        Self::new(descriptor, temporality, MetricPoints::Histogram { points })
    }

    /// Validates the metric.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty
    /// - A data point ends before it starts or has an unrepresentable timestamp
    /// - Histogram bounds are unsorted or disagree with the bucket counts
    pub fn validate_metric(&self) -> Result<(), MetricValidationError> {
        let name = &self.descriptor.name;
        if name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }

        for (start, end) in self.data.windows() {
            if end < start {
                return Err(MetricValidationError::InvalidTimeWindow(name.clone()));
            }
            if start.timestamp_nanos_opt().is_none() || end.timestamp_nanos_opt().is_none() {
                return Err(MetricValidationError::TimestampOutOfRange(name.clone()));
            }
        }

        if let MetricPoints::Histogram { points } = &self.data {
            for point in points {
                let hist = &point.value;
                if hist.bucket_counts.len() != hist.bounds.len() + 1 {
                    return Err(MetricValidationError::BucketCountMismatch {
                        name: name.clone(),
                        bounds: hist.bounds.len(),
                        counts: hist.bucket_counts.len(),
                    });
                }
                if hist.bounds.windows(2).any(|pair| pair[1] <= pair[0]) {
                    return Err(MetricValidationError::UnsortedBounds(name.clone()));
                }
            }
        }

        self.descriptor.validate()?;
        Ok(())
    }
}

/// The metrics reported by one instrumentation scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeMetrics {
    /// The producing scope.
    pub scope: InstrumentationScope,
    /// The metrics, in reporting order.
    #[serde(default)]
    pub metrics: Vec<MetricData>,
}

impl ScopeMetrics {
    /// Creates a scope group.
    #[must_use]
    pub fn new(scope: InstrumentationScope, metrics: Vec<MetricData>) -> Self {
        Self { scope, metrics }
    }
}

/// A complete metric snapshot for one resource.
///
/// Created once per collection cycle and consumed by exactly one export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceMetrics {
    /// The process/host the metrics describe.
    #[serde(default)]
    pub resource: Resource,
    /// Scope groups, in reporting order.
    #[serde(default)]
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Creates an empty snapshot for the resource.
    #[must_use]
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            scope_metrics: Vec::new(),
        }
    }

    /// Appends a scope group.
    #[must_use]
    pub fn with_scope_metrics(mut self, scope_metrics: ScopeMetrics) -> Self {
        self.scope_metrics.push(scope_metrics);
        self
    }

    /// Total number of metrics across all scopes.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.scope_metrics.iter().map(|s| s.metrics.len()).sum()
    }

    /// Total number of data points across all metrics.
    #[must_use]
    pub fn data_point_count(&self) -> usize {
        self.scope_metrics
            .iter()
            .flat_map(|s| s.metrics.iter())
            .map(|m| m.data.len())
            .sum()
    }
}
