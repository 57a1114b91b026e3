//! Configuration module for Lumen.
//!
//! This module contains the export-side policy selectors (temporality and
//! aggregation) and the pattern-based logger configurator.

pub mod aggregation;
pub mod logger;
pub mod temporality;

pub use aggregation::{Aggregation, AggregationSelector, DefaultAggregationSelector};
pub use logger::{
    LoggerConfig, LoggerConfigurator, LoggerPattern, NamePattern, ResolvedLoggerConfig,
};
pub use temporality::{TemporalityPreference, TEMPORALITY_PREFERENCE_ENV};

use crate::models::InstrumentKind;
use thiserror::Error;

/// Errors raised while interpreting configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The temporality preference is not one of the recognized names.
    #[error("Unknown temporality preference '{0}', expected 'cumulative', 'delta' or 'lowmemory'")]
    UnknownTemporalityPreference(String),
}

/// A value per instrument kind, computed once.
///
/// Selectors are consulted for every kind when the table is built; lookups
/// afterwards are plain indexing.
///
/// # Examples
///
/// ```
/// use shared::config::{PolicyTable, TemporalityPreference};
/// use shared::models::{InstrumentKind, Temporality};
///
/// let table = PolicyTable::build(|kind| TemporalityPreference::Delta.temporality(kind));
/// assert_eq!(table.get(InstrumentKind::Counter), &Temporality::Delta);
/// assert_eq!(table.get(InstrumentKind::UpDownCounter), &Temporality::Cumulative);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable<T> {
    entries: [T; 7],
}

impl<T> PolicyTable<T> {
    /// Fills the table by calling `select` once per kind.
    pub fn build(mut select: impl FnMut(InstrumentKind) -> T) -> Self {
        Self {
            entries: InstrumentKind::ALL.map(&mut select),
        }
    }

    /// Returns the entry for `kind`.
    #[must_use]
    pub fn get(&self, kind: InstrumentKind) -> &T {
        &self.entries[kind.index()]
    }
}
