//! OTLP payload serializers.
//!
//! A [`Serializer`] turns a metric snapshot into request bytes and a
//! collector's response bytes back into a response object. Serializers are
//! stateless; the same snapshot always encodes to the same bytes.

use super::conversions::resource_metrics_to_request;
use super::proto::collector::metrics::v1::ExportMetricsServiceResponse;
use crate::models::{MetricValidationError, ResourceMetrics};
use prost::Message;
use thiserror::Error;

/// Errors that can occur while encoding requests or decoding responses.
#[derive(Debug, Error)]
pub enum SerializerError {
    /// The snapshot could not be encoded.
    #[error("Failed to encode request: {0}")]
    Encode(#[from] MetricValidationError),

    /// The response is not valid protobuf.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The response is not valid OTLP/JSON.
    #[error("Failed to decode JSON response: {0}")]
    DecodeJson(#[source] serde_json::Error),

    /// The request could not be written as JSON.
    #[error("Failed to encode JSON request: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encodes requests and decodes responses for one wire format.
pub trait Serializer: Send + Sync {
    /// The in-memory request.
    type Request;
    /// The decoded collector response.
    type Response;

    /// HTTP `Content-Type` of the encoded request.
    fn content_type(&self) -> &'static str;

    /// Encodes a request. The request is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Encode`] if the request is malformed.
    fn serialize_request(&self, request: &Self::Request) -> Result<Vec<u8>, SerializerError>;

    /// Decodes a response.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Decode`] or [`SerializerError::DecodeJson`]
    /// on malformed input.
    fn deserialize_response(&self, bytes: &[u8]) -> Result<Self::Response, SerializerError>;
}

/// Responses that can report partially rejected data.
pub trait PartialSuccess {
    /// Number of rejected items. Zero means full success.
    fn rejected(&self) -> i64;

    /// The collector's explanation, if it sent one.
    fn partial_error_message(&self) -> Option<&str>;

    /// Returns `true` if the collector reported a partial success.
    fn is_partial_success(&self) -> bool {
        self.rejected() > 0 || self.partial_error_message().is_some()
    }
}

impl PartialSuccess for ExportMetricsServiceResponse {
    fn rejected(&self) -> i64 {
        self.partial_success
            .as_ref()
            .map_or(0, |partial| partial.rejected_data_points)
    }

    fn partial_error_message(&self) -> Option<&str> {
        self.partial_success
            .as_ref()
            .map(|partial| partial.error_message.as_str())
            .filter(|message| !message.is_empty())
    }
}

/// Binary protobuf encoding (`application/x-protobuf`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufMetricsSerializer;

impl Serializer for ProtobufMetricsSerializer {
    type Request = ResourceMetrics;
    type Response = ExportMetricsServiceResponse;

    fn content_type(&self) -> &'static str {
        "application/x-protobuf"
    }

    fn serialize_request(&self, request: &ResourceMetrics) -> Result<Vec<u8>, SerializerError> {
        Ok(resource_metrics_to_request(request)?.encode_to_vec())
    }

    fn deserialize_response(
        &self,
        bytes: &[u8],
    ) -> Result<ExportMetricsServiceResponse, SerializerError> {
        Ok(ExportMetricsServiceResponse::decode(bytes)?)
    }
}

/// OTLP/JSON encoding (`application/json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetricsSerializer;

impl Serializer for JsonMetricsSerializer {
    type Request = ResourceMetrics;
    type Response = ExportMetricsServiceResponse;

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn serialize_request(&self, request: &ResourceMetrics) -> Result<Vec<u8>, SerializerError> {
        Ok(serde_json::to_vec(&resource_metrics_to_request(request)?)?)
    }

    fn deserialize_response(
        &self,
        bytes: &[u8],
    ) -> Result<ExportMetricsServiceResponse, SerializerError> {
        serde_json::from_slice(bytes).map_err(SerializerError::DecodeJson)
    }
}
