//! Log data model.
//!
//! Defines the `LogRecord` that flows through log record processors and the
//! `SeverityNumber` scale used for severity filtering.

use super::common::{Attributes, InstrumentationScope};
use super::trace::SpanContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log severity on the OpenTelemetry 1-24 scale.
///
/// Variants are totally ordered by their number. `Unspecified` (0) means
/// "no classification": severity thresholds never apply to it.
///
/// Serializes as its name (`"WARN2"`); deserializes from either the name,
/// case-insensitively, or the wire number (`14`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "SeverityRepr")]
#[repr(u8)]
pub enum SeverityNumber {
    /// No severity recorded.
    #[default]
    Unspecified = 0,
    /// Fine-grained debugging.
    Trace = 1,
    /// Trace, level 2.
    Trace2 = 2,
    /// Trace, level 3.
    Trace3 = 3,
    /// Trace, level 4.
    Trace4 = 4,
    /// Debugging events.
    Debug = 5,
    /// Debug, level 2.
    Debug2 = 6,
    /// Debug, level 3.
    Debug3 = 7,
    /// Debug, level 4.
    Debug4 = 8,
    /// Informational events.
    Info = 9,
    /// Info, level 2.
    Info2 = 10,
    /// Info, level 3.
    Info3 = 11,
    /// Info, level 4.
    Info4 = 12,
    /// Warning events.
    Warn = 13,
    /// Warn, level 2.
    Warn2 = 14,
    /// Warn, level 3.
    Warn3 = 15,
    /// Warn, level 4.
    Warn4 = 16,
    /// Error events.
    Error = 17,
    /// Error, level 2.
    Error2 = 18,
    /// Error, level 3.
    Error3 = 19,
    /// Error, level 4.
    Error4 = 20,
    /// Fatal errors.
    Fatal = 21,
    /// Fatal, level 2.
    Fatal2 = 22,
    /// Fatal, level 3.
    Fatal3 = 23,
    /// Fatal, level 4.
    Fatal4 = 24,
}

impl SeverityNumber {
    /// Returns the numeric value (0-24).
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a wire severity number back to the enum.
    ///
    /// Out-of-range numbers map to `Unspecified`.
    #[must_use]
    pub const fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::Trace,
            2 => Self::Trace2,
            3 => Self::Trace3,
            4 => Self::Trace4,
            5 => Self::Debug,
            6 => Self::Debug2,
            7 => Self::Debug3,
            8 => Self::Debug4,
            9 => Self::Info,
            10 => Self::Info2,
            11 => Self::Info3,
            12 => Self::Info4,
            13 => Self::Warn,
            14 => Self::Warn2,
            15 => Self::Warn3,
            16 => Self::Warn4,
            17 => Self::Error,
            18 => Self::Error2,
            19 => Self::Error3,
            20 => Self::Error4,
            21 => Self::Fatal,
            22 => Self::Fatal2,
            23 => Self::Fatal3,
            24 => Self::Fatal4,
            _ => Self::Unspecified,
        }
    }

    /// Returns the short severity text of the range this number falls in.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self as u8 {
            0 => "UNSPECIFIED",
            1..=4 => "TRACE",
            5..=8 => "DEBUG",
            9..=12 => "INFO",
            13..=16 => "WARN",
            17..=20 => "ERROR",
            _ => "FATAL",
        }
    }

    /// Returns `true` for `Unspecified`.
    #[must_use]
    pub const fn is_unspecified(self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeverityRepr {
    Number(i64),
    Name(String),
}

impl TryFrom<SeverityRepr> for SeverityNumber {
    type Error = String;

    fn try_from(repr: SeverityRepr) -> Result<Self, <Self as TryFrom<SeverityRepr>>::Error> {
        match repr {
            SeverityRepr::Number(n) => i32::try_from(n)
                .ok()
                .filter(|n| (0..=24).contains(n))
                .map(Self::from_i32)
                .ok_or_else(|| format!("severity number {n} is outside 0-24")),
            SeverityRepr::Name(name) => Self::from_name(&name)
                .ok_or_else(|| format!("unknown severity name '{name}'")),
        }
    }
}

impl SeverityNumber {
    /// Parses a severity name such as `INFO`, `warn3` or `UNSPECIFIED`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_uppercase();
        if name == "UNSPECIFIED" {
            return Some(Self::Unspecified);
        }

        let (base, level) = match name.as_bytes().last() {
            Some(digit @ b'2'..=b'4') => (&name[..name.len() - 1], i32::from(digit - b'1')),
            _ => (name.as_str(), 0),
        };
        let first = match base {
            "TRACE" => 1,
            "DEBUG" => 5,
            "INFO" => 9,
            "WARN" => 13,
            "ERROR" => 17,
            "FATAL" => 21,
            _ => return None,
        };
        Some(Self::from_i32(first + level))
    }
}

impl std::fmt::Display for SeverityNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A log record as emitted by a logger, before export.
///
/// # Example
///
/// ```
/// use shared::models::{InstrumentationScope, LogRecord, SeverityNumber};
///
/// let record = LogRecord::new(InstrumentationScope::new("auth"), SeverityNumber::Info)
///     .with_body("User logged in")
///     .with_attribute("user_id", "12345");
///
/// assert_eq!(record.severity_number, SeverityNumber::Info);
/// assert!(record.span_context.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Time the event occurred, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Severity of the record.
    #[serde(default)]
    pub severity_number: SeverityNumber,

    /// Original severity text, if the source framework had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_text: Option<String>,

    /// The log body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Additional key-value attributes.
    #[serde(default)]
    pub attributes: Attributes,

    /// The logger that emitted the record.
    pub instrumentation_scope: InstrumentationScope,

    /// Trace correlation captured when the record was emitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_context: Option<SpanContext>,
}

impl LogRecord {
    /// Creates a record for the scope with the given severity.
    #[must_use]
    pub fn new(scope: InstrumentationScope, severity_number: SeverityNumber) -> Self {
        Self {
            timestamp: Some(Utc::now()),
            severity_number,
            severity_text: None,
            body: None,
            attributes: Attributes::new(),
            instrumentation_scope: scope,
            span_context: None,
        }
    }

    /// Sets the body of the record.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds an attribute to the record.
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attaches the span context the record was emitted in.
    #[must_use]
    pub fn with_span_context(mut self, span_context: SpanContext) -> Self {
        self.span_context = Some(span_context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SpanId, TraceFlags, TraceId};
    use serde_json::json;

    #[test]
    fn test_severity_ordering() {
        assert!(SeverityNumber::Debug < SeverityNumber::Warn);
        assert!(SeverityNumber::Warn < SeverityNumber::Warn2);
        assert!(SeverityNumber::Fatal4 > SeverityNumber::Error);
        assert!(SeverityNumber::Unspecified < SeverityNumber::Trace);
    }

    #[test]
    fn test_severity_number_round_trip_through_i32() {
        for n in 0..=24 {
            assert_eq!(SeverityNumber::from_i32(n).as_i32(), n);
        }
        assert_eq!(SeverityNumber::from_i32(99), SeverityNumber::Unspecified);
        assert_eq!(SeverityNumber::from_i32(-3), SeverityNumber::Unspecified);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(SeverityNumber::Unspecified.to_string(), "UNSPECIFIED");
        assert_eq!(SeverityNumber::Trace3.to_string(), "TRACE");
        assert_eq!(SeverityNumber::Info.to_string(), "INFO");
        assert_eq!(SeverityNumber::Warn4.to_string(), "WARN");
        assert_eq!(SeverityNumber::Fatal2.to_string(), "FATAL");
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(
            serde_json::to_string(&SeverityNumber::Error2).unwrap(),
            "\"ERROR2\""
        );
        let level: SeverityNumber = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(level, SeverityNumber::Warn);
    }

    #[test]
    fn test_severity_deserializes_from_number() {
        let level: SeverityNumber = serde_json::from_str("9").unwrap();
        assert_eq!(level, SeverityNumber::Info);
        let level: SeverityNumber = serde_json::from_str("0").unwrap();
        assert_eq!(level, SeverityNumber::Unspecified);
        let level: SeverityNumber = serde_json::from_str("\"warn2\"").unwrap();
        assert_eq!(level, SeverityNumber::Warn2);

        assert!(serde_json::from_str::<SeverityNumber>("30").is_err());
        assert!(serde_json::from_str::<SeverityNumber>("-1").is_err());
        assert!(serde_json::from_str::<SeverityNumber>("\"WARN5\"").is_err());
        assert!(serde_json::from_str::<SeverityNumber>("\"LOUD\"").is_err());
    }

    #[test]
    fn test_severity_from_name() {
        assert_eq!(SeverityNumber::from_name("TRACE"), Some(SeverityNumber::Trace));
        assert_eq!(SeverityNumber::from_name("Fatal4"), Some(SeverityNumber::Fatal4));
        assert_eq!(SeverityNumber::from_name("unspecified"), Some(SeverityNumber::Unspecified));
        assert_eq!(SeverityNumber::from_name("INFO1"), None);
        assert_eq!(SeverityNumber::from_name(""), None);
    }

    #[test]
    fn test_log_record_with_numeric_severity() {
        let json = r#"{
            "instrumentation_scope": {"name": "payments"},
            "severity_number": 17
        }"#;

        let record: LogRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.severity_number, SeverityNumber::Error);
        assert_eq!(
            serde_json::to_value(&record).unwrap()["severity_number"],
            json!("ERROR")
        );
    }

    #[test]
    fn test_log_record_builder() {
        let span = SpanContext::new(
            TraceId::from_bytes([1; 16]),
            SpanId::from_bytes([2; 8]),
            TraceFlags::SAMPLED,
        );
        let record = LogRecord::new(InstrumentationScope::new("db"), SeverityNumber::Error)
            .with_body("query failed")
            .with_attribute("attempt", 3)
            .with_span_context(span);

        assert_eq!(record.body, Some(json!("query failed")));
        assert_eq!(record.attributes.get("attempt"), Some(&json!(3)));
        assert_eq!(record.span_context, Some(span));
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn test_log_record_deserialization_defaults() {
        let json = r#"{
            "instrumentation_scope": {"name": "payments"},
            "body": "Simple log"
        }"#;

        let record: LogRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.severity_number, SeverityNumber::Unspecified);
        assert_eq!(record.instrumentation_scope.name, "payments");
        assert!(record.attributes.is_empty());
        assert!(record.span_context.is_none());
        assert!(record.timestamp.is_none());
    }
}
