//! In-memory log record processor.

use super::{LogProcessorError, LogRecordProcessor};
use crate::models::{Context, LogRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Keeps every record it receives.
///
/// Records are stored in a `Vec` protected by a `RwLock`. Flush and shutdown
/// calls are counted so callers can observe lifecycle pass-through.
///
/// # Example
///
/// ```
/// use shared::logs::{InMemoryLogRecordProcessor, LogRecordProcessor};
/// use shared::models::{InstrumentationScope, LogRecord, SeverityNumber};
///
/// let processor = InMemoryLogRecordProcessor::new();
/// let mut record = LogRecord::new(InstrumentationScope::new("app"), SeverityNumber::Info);
/// processor.on_emit(&mut record, None);
///
/// assert_eq!(processor.len().unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogRecordProcessor {
    records: RwLock<Vec<LogRecord>>,
    flush_count: AtomicUsize,
    shutdown_count: AtomicUsize,
}

impl InMemoryLogRecordProcessor {
    /// Creates an empty processor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty processor wrapped in an Arc.
    ///
    /// Keep one handle to inspect records while another is owned by a
    /// wrapping processor.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns a copy of the received records, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn records(&self) -> Result<Vec<LogRecord>, LogProcessorError> {
        let records = self
            .records
            .read()
            .map_err(|_| LogProcessorError::LockError)?;
        Ok(records.clone())
    }

    /// Returns the number of received records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, LogProcessorError> {
        let records = self
            .records
            .read()
            .map_err(|_| LogProcessorError::LockError)?;
        Ok(records.len())
    }

    /// Returns `true` if no record has been received.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, LogProcessorError> {
        Ok(self.len()? == 0)
    }

    /// Number of `force_flush` calls received.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls received.
    #[must_use]
    pub fn shutdown_count(&self) -> usize {
        self.shutdown_count.load(Ordering::SeqCst)
    }
}

impl LogRecordProcessor for InMemoryLogRecordProcessor {
    fn on_emit(&self, record: &mut LogRecord, _context: Option<&Context>) {
        match self.records.write() {
            Ok(mut records) => records.push(record.clone()),
            Err(_) => tracing::warn!(
                scope = %record.instrumentation_scope,
                "Dropping log record, in-memory processor lock is poisoned"
            ),
        }
    }

    fn force_flush(&self) -> Result<(), LogProcessorError> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) -> Result<(), LogProcessorError> {
        self.shutdown_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
