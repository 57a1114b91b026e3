//! Trace correlation model.
//!
//! Span context is what ties a log record to the trace it was emitted in;
//! the filtering processor inspects its sampled flag.

use serde::{Deserialize, Serialize};

/// A 16-byte trace identifier. All zeroes is invalid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TraceId(#[serde(with = "hex::serde")] [u8; 16]);

impl TraceId {
    /// The invalid, all-zero trace id.
    pub const INVALID: Self = Self([0; 16]);

    /// Creates a trace id from its bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl std::fmt::Debug for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TraceId({self})")
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// An 8-byte span identifier. All zeroes is invalid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpanId(#[serde(with = "hex::serde")] [u8; 8]);

impl SpanId {
    /// The invalid, all-zero span id.
    pub const INVALID: Self = Self([0; 8]);

    /// Creates a span id from its bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }
}

impl std::fmt::Debug for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpanId({self})")
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// W3C trace flags. Bit 0 is the sampled flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NOT_SAMPLED: Self = Self(0x00);
    /// The sampled flag.
    pub const SAMPLED: Self = Self(0x01);

    /// Creates flags from their wire byte.
    #[must_use]
    pub const fn new(flags: u8) -> Self {
        Self(flags)
    }

    /// Returns `true` if the sampled bit is set.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & Self::SAMPLED.0 == Self::SAMPLED.0
    }

    /// Returns the wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self.0
    }
}

/// Identifies a span and carries its propagation flags.
///
/// # Example
///
/// ```
/// use shared::models::{SpanContext, SpanId, TraceFlags, TraceId};
///
/// let ctx = SpanContext::new(
///     TraceId::from_bytes([1; 16]),
///     SpanId::from_bytes([2; 8]),
///     TraceFlags::SAMPLED,
/// );
///
/// assert!(ctx.is_valid());
/// assert!(ctx.is_sampled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpanContext {
    /// The trace the span belongs to.
    pub trace_id: TraceId,
    /// The span itself.
    pub span_id: SpanId,
    /// Propagation flags.
    #[serde(default)]
    pub trace_flags: TraceFlags,
    /// Whether the context was received from a remote parent.
    #[serde(default)]
    pub is_remote: bool,
}

impl SpanContext {
    /// Creates a local span context.
    #[must_use]
    pub const fn new(trace_id: TraceId, span_id: SpanId, trace_flags: TraceFlags) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags,
            is_remote: false,
        }
    }

    /// A context is valid when neither id is all zeroes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    /// Returns `true` if the originating trace was selected for recording.
    #[must_use]
    pub const fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }
}

/// The ambient execution context a record is emitted in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    span_context: Option<SpanContext>,
}

impl Context {
    /// Creates an empty context (no active span).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context whose active span is `span_context`.
    #[must_use]
    pub fn with_span_context(span_context: SpanContext) -> Self {
        Self {
            span_context: Some(span_context),
        }
    }

    /// The active span context, if any.
    #[must_use]
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }
}
