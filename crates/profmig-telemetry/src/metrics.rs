//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters a batch run cares about: profile outcomes, pipeline
//!   steps, copied bytes and emitted events.

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across components.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    profiles_total: IntCounterVec,
    pipeline_steps_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    bytes_transferred_total: IntCounter,
    hive_retries_total: IntCounter,
}

/// Snapshot of selected counters for the run summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Bytes copied across all profiles.
    pub bytes_transferred_total: u64,
    /// Hive load/unload attempts that had to be retried.
    pub hive_retries_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let profiles_total = IntCounterVec::new(
            Opts::new("profmig_profiles_total", "Profiles processed by terminal outcome"),
            &["outcome"],
        )?;
        let pipeline_steps_total = IntCounterVec::new(
            Opts::new(
                "profmig_pipeline_steps_total",
                "Per-profile pipeline steps executed by status",
            ),
            &["step", "status"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("profmig_events_emitted_total", "Progress events emitted by type"),
            &["type"],
        )?;
        let bytes_transferred_total = IntCounter::with_opts(Opts::new(
            "profmig_bytes_transferred_total",
            "Bytes copied into profile containers",
        ))?;
        let hive_retries_total = IntCounter::with_opts(Opts::new(
            "profmig_hive_retries_total",
            "Registry hive load or unload attempts that were retried",
        ))?;

        registry.register(Box::new(profiles_total.clone()))?;
        registry.register(Box::new(pipeline_steps_total.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(bytes_transferred_total.clone()))?;
        registry.register(Box::new(hive_retries_total.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                profiles_total,
                pipeline_steps_total,
                events_emitted_total,
                bytes_transferred_total,
                hive_retries_total,
            }),
        })
    }

    /// Increment the profile counter for a terminal outcome.
    pub fn inc_profile(&self, outcome: &str) {
        self.inner
            .profiles_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the pipeline step counter.
    pub fn inc_pipeline_step(&self, step: &str, status: &str) {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Add copied bytes.
    pub fn add_bytes_transferred(&self, bytes: u64) {
        self.inner.bytes_transferred_total.inc_by(bytes);
    }

    /// Count one retried hive attempt.
    pub fn inc_hive_retry(&self) {
        self.inner.hive_retries_total.inc();
    }

    /// Current count for one profile outcome label.
    #[must_use]
    pub fn profile_count(&self, outcome: &str) -> u64 {
        self.inner
            .profiles_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the run counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_transferred_total: self.inner.bytes_transferred_total.get(),
            hive_retries_total: self.inner.hive_retries_total.get(),
        }
    }
}
