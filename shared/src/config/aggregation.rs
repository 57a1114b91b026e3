//! Aggregation policy selection.
//!
//! An exporter tells the aggregation engine which aggregation to use for each
//! instrument kind. The default selector defers to every instrument's
//! intrinsic aggregation; a caller-supplied selector replaces it entirely.

use crate::models::InstrumentKind;
use serde::{Deserialize, Serialize};

/// How measurements of an instrument are aggregated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    /// Use the instrument kind's intrinsic aggregation.
    #[default]
    Default,
    /// Discard all measurements.
    Drop,
    /// Sum measurements.
    Sum,
    /// Keep only the last measurement.
    LastValue,
    /// Explicit-bucket histogram.
    ExplicitBucketHistogram {
        /// Upper bucket boundaries, ascending.
        boundaries: Vec<f64>,
        /// Whether to record min and max.
        #[serde(default = "default_record_min_max")]
        record_min_max: bool,
    },
    /// Base-2 exponential histogram.
    Base2ExponentialHistogram {
        /// Maximum number of buckets per sign.
        max_size: u32,
        /// Maximum scale (resolution).
        max_scale: i8,
        /// Whether to record min and max.
        #[serde(default = "default_record_min_max")]
        record_min_max: bool,
    },
}

const fn default_record_min_max() -> bool {
    true
}

impl Aggregation {
    /// Explicit-bucket histogram with min/max recording.
    #[must_use]
    pub fn explicit_bucket_histogram(boundaries: impl Into<Vec<f64>>) -> Self {
        Self::ExplicitBucketHistogram {
            boundaries: boundaries.into(),
            record_min_max: true,
        }
    }

    /// Returns `true` for the "use the intrinsic default" sentinel.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Chooses an aggregation for an instrument kind.
///
/// Any `Fn(InstrumentKind) -> Aggregation` is a selector.
pub trait AggregationSelector: Send + Sync {
    /// Returns the aggregation for `kind`.
    fn aggregation(&self, kind: InstrumentKind) -> Aggregation;
}

/// Selects [`Aggregation::Default`] for every kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAggregationSelector;

impl AggregationSelector for DefaultAggregationSelector {
    fn aggregation(&self, _kind: InstrumentKind) -> Aggregation {
        Aggregation::Default
    }
}

impl<F> AggregationSelector for F
where
    F: Fn(InstrumentKind) -> Aggregation + Send + Sync,
{
    fn aggregation(&self, kind: InstrumentKind) -> Aggregation {
        self(kind)
    }
}
