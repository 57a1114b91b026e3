//! OpenTelemetry Protocol (OTLP) support.
//!
//! This module converts metric snapshots into OTLP export requests and
//! provides the serializers that turn those requests into wire bytes.
//!
//! # Example
//!
//! ```
//! use shared::models::{InstrumentationScope, Resource, ResourceMetrics, ScopeMetrics};
//! use shared::otlp::{ProtobufMetricsSerializer, Serializer};
//!
//! let snapshot = ResourceMetrics::new(Resource::new().with_attribute("service.name", "api"))
//!     .with_scope_metrics(ScopeMetrics::new(InstrumentationScope::new("http"), vec![]));
//!
//! let bytes = ProtobufMetricsSerializer.serialize_request(&snapshot).unwrap();
//! assert!(!bytes.is_empty());
//! ```

pub mod conversions;
pub mod serializer;

/// Generated OTLP protobuf types.
pub use opentelemetry_proto::tonic as proto;

pub use serializer::{
    JsonMetricsSerializer, PartialSuccess, ProtobufMetricsSerializer, Serializer, SerializerError,
};
