//! Data models for the Lumen telemetry pipeline.
//!
//! This module contains the metric snapshot handed to exporters, the log
//! record handed to log processors, and the trace context that links them.

pub mod common;
pub mod log;
pub mod metric;
pub mod trace;

pub use common::{Attributes, InstrumentationScope, Resource};
pub use log::{LogRecord, SeverityNumber};
pub use metric::{
    DataPoint, ExponentialBuckets, ExponentialHistogramValue, HistogramValue, InstrumentKind,
    MetricData, MetricDescriptor, MetricPoints, MetricValidationError, Number, ResourceMetrics,
    ScopeMetrics, Temporality,
};
pub use trace::{Context, SpanContext, SpanId, TraceFlags, TraceId};
