//! The metric exporter.
//!
//! [`MetricExporter`] is what an aggregation engine talks to: it answers the
//! temporality and aggregation questions the engine asks before it builds a
//! snapshot, and it hands finished snapshots to its delegate.

use crate::delegate::ExportDelegate;
use crate::error::{ExportError, ExportResult};
use futures::FutureExt;
use shared::config::{
    Aggregation, AggregationSelector, DefaultAggregationSelector, PolicyTable,
    TemporalityPreference,
};
use shared::models::{InstrumentKind, ResourceMetrics, Temporality};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Construction options for a [`MetricExporter`].
#[derive(Clone, Default)]
pub struct MetricExporterOptions {
    /// Explicit temporality preference. When `None` the environment decides,
    /// falling back to cumulative.
    pub temporality_preference: Option<TemporalityPreference>,
    /// Replaces the default aggregation selector for every instrument kind.
    pub aggregation_selector: Option<Arc<dyn AggregationSelector>>,
}

impl MetricExporterOptions {
    /// Sets the temporality preference.
    #[must_use]
    pub fn with_temporality_preference(mut self, preference: TemporalityPreference) -> Self {
        self.temporality_preference = Some(preference);
        self
    }

    /// Sets the aggregation selector.
    #[must_use]
    pub fn with_aggregation_selector(mut self, selector: impl AggregationSelector + 'static) -> Self {
        self.aggregation_selector = Some(Arc::new(selector));
        self
    }
}

impl std::fmt::Debug for MetricExporterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricExporterOptions")
            .field("temporality_preference", &self.temporality_preference)
            .field("custom_aggregation", &self.aggregation_selector.is_some())
            .finish()
    }
}

/// Exports metric snapshots through a delegate.
///
/// Policy lookups are resolved once at construction. Cloning is cheap and
/// clones share the delegate.
///
/// # Example
///
/// ```no_run
/// use exporter::{create_metric_exporter, ExporterConfig};
/// use shared::models::ResourceMetrics;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let exporter = create_metric_exporter(&ExporterConfig::from_env()?)?;
///
/// exporter.export_with_callback(ResourceMetrics::default(), |result| {
///     if let Err(e) = result {
///         eprintln!("export failed: {e}");
///     }
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MetricExporter {
    delegate: Arc<dyn ExportDelegate<ResourceMetrics>>,
    temporality_preference: TemporalityPreference,
    temporality: PolicyTable<Temporality>,
    aggregation: Arc<PolicyTable<Aggregation>>,
}

impl MetricExporter {
    /// Creates an exporter and resolves its policies.
    pub fn new(
        delegate: impl ExportDelegate<ResourceMetrics> + 'static,
        options: MetricExporterOptions,
    ) -> Self {
        let temporality_preference = TemporalityPreference::resolve(options.temporality_preference);
        let selector: Arc<dyn AggregationSelector> = options
            .aggregation_selector
            .unwrap_or_else(|| Arc::new(DefaultAggregationSelector));

        Self {
            delegate: Arc::new(delegate),
            temporality_preference,
            temporality: PolicyTable::build(|kind| temporality_preference.temporality(kind)),
            aggregation: Arc::new(PolicyTable::build(|kind| selector.aggregation(kind))),
        }
    }

    /// The resolved temporality preference.
    pub fn temporality_preference(&self) -> TemporalityPreference {
        self.temporality_preference
    }

    /// Temporality the aggregation engine should use for `kind`.
    pub fn select_temporality(&self, kind: InstrumentKind) -> Temporality {
        *self.temporality.get(kind)
    }

    /// Aggregation the aggregation engine should use for `kind`.
    pub fn select_aggregation(&self, kind: InstrumentKind) -> &Aggregation {
        self.aggregation.get(kind)
    }

    /// Exports a snapshot.
    ///
    /// Delegate errors are returned unchanged. A panic inside the delegate is
    /// caught and reported as [`ExportError::DelegatePanicked`].
    ///
    /// # Errors
    ///
    /// Returns the cause of the failed export.
    pub async fn export(&self, snapshot: ResourceMetrics) -> ExportResult {
        tracing::debug!(
            scopes = snapshot.scope_metrics.len(),
            metrics = snapshot.metric_count(),
            data_points = snapshot.data_point_count(),
            "Exporting metrics"
        );

        let delegate = Arc::clone(&self.delegate);
        let result = AssertUnwindSafe(async move { delegate.export(snapshot).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ExportError::DelegatePanicked(panic_message(&*panic))));

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Metric export failed");
        }
        result
    }

    /// Exports a snapshot in the background and reports the outcome once.
    ///
    /// The export is spawned on the current Tokio runtime and this call
    /// returns immediately. Outside a runtime, `on_complete` is called right
    /// away with [`ExportError::NoRuntime`]. If the runtime drops the export
    /// task before it finishes, `on_complete` receives
    /// [`ExportError::Cancelled`].
    pub fn export_with_callback<F>(&self, snapshot: ResourceMetrics, on_complete: F)
    where
        F: FnOnce(ExportResult) + Send + 'static,
    {
        let completion = Completion::new(on_complete);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let exporter = self.clone();
                handle.spawn(async move {
                    let result = exporter.export(snapshot).await;
                    completion.complete(result);
                });
            }
            Err(_) => completion.complete(Err(ExportError::NoRuntime)),
        }
    }

    /// Waits for in-flight exports.
    ///
    /// # Errors
    ///
    /// Returns the delegate's error.
    pub async fn force_flush(&self) -> ExportResult {
        self.delegate.force_flush().await
    }

    /// Flushes and shuts the delegate down.
    ///
    /// # Errors
    ///
    /// Returns the delegate's error.
    pub async fn shutdown(&self) -> ExportResult {
        self.delegate.shutdown().await
    }
}

impl std::fmt::Debug for MetricExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricExporter")
            .field("temporality_preference", &self.temporality_preference)
            .field("temporality", &self.temporality)
            .field("aggregation", &self.aggregation)
            .finish_non_exhaustive()
    }
}

/// Owns a completion callback until it has been called.
///
/// Dropping an uncompleted guard reports [`ExportError::Cancelled`].
struct Completion<F: FnOnce(ExportResult)> {
    on_complete: Option<F>,
}

impl<F: FnOnce(ExportResult)> Completion<F> {
    fn new(on_complete: F) -> Self {
        Self {
            on_complete: Some(on_complete),
        }
    }

    fn complete(mut self, result: ExportResult) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }
}

impl<F: FnOnce(ExportResult)> Drop for Completion<F> {
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            tracing::warn!("Metric export task dropped before completion");
            on_complete(Err(ExportError::Cancelled));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
