//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the shell loop updates.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the shell.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    active_jobs: IntGauge,
    events_processed_total: IntCounterVec,
    events_dropped_total: IntCounterVec,
    jobs_admitted_total: IntCounter,
    disk_guard_pauses_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Jobs currently in the active set.
    pub active_jobs: i64,
    /// Jobs handed to the engine.
    pub jobs_admitted_total: u64,
    /// Pauses issued by the disk-space guard.
    pub disk_guard_pauses_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let active_jobs = IntGauge::with_opts(Opts::new(
            "active_jobs",
            "Jobs present in the active set",
        ))
        .map_err(|source| collector("active_jobs", source))?;
        let events_processed_total = IntCounterVec::new(
            Opts::new("events_processed_total", "Engine events processed by type"),
            &["type"],
        )
        .map_err(|source| collector("events_processed_total", source))?;
        let events_dropped_total = IntCounterVec::new(
            Opts::new(
                "events_dropped_total",
                "Engine events or entries dropped by reason",
            ),
            &["reason"],
        )
        .map_err(|source| collector("events_dropped_total", source))?;
        let jobs_admitted_total = IntCounter::with_opts(Opts::new(
            "jobs_admitted_total",
            "Jobs submitted to the engine",
        ))
        .map_err(|source| collector("jobs_admitted_total", source))?;
        let disk_guard_pauses_total = IntCounter::with_opts(Opts::new(
            "disk_guard_pauses_total",
            "Jobs paused because their volume ran low on space",
        ))
        .map_err(|source| collector("disk_guard_pauses_total", source))?;

        register(&registry, "active_jobs", active_jobs.clone())?;
        register(
            &registry,
            "events_processed_total",
            events_processed_total.clone(),
        )?;
        register(&registry, "events_dropped_total", events_dropped_total.clone())?;
        register(&registry, "jobs_admitted_total", jobs_admitted_total.clone())?;
        register(
            &registry,
            "disk_guard_pauses_total",
            disk_guard_pauses_total.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                active_jobs,
                events_processed_total,
                events_dropped_total,
                jobs_admitted_total,
                disk_guard_pauses_total,
            }),
        })
    }

    /// Set the active job gauge.
    pub fn set_active_jobs(&self, count: usize) {
        self.inner
            .active_jobs
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Increment the processed event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_processed_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Increment the dropped counter for `reason`.
    pub fn inc_dropped(&self, reason: &str) {
        self.inner
            .events_dropped_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the admitted job counter.
    pub fn inc_admitted(&self) {
        self.inner.jobs_admitted_total.inc();
    }

    /// Increment the disk-guard pause counter.
    pub fn inc_disk_guard_pause(&self) {
        self.inner.disk_guard_pauses_total.inc();
    }

    /// Processed count for one event type.
    #[must_use]
    pub fn events_processed(&self, event_type: &str) -> u64 {
        self.inner
            .events_processed_total
            .with_label_values(&[event_type])
            .get()
    }

    /// Dropped count for one reason.
    #[must_use]
    pub fn events_dropped(&self, reason: &str) -> u64 {
        self.inner
            .events_dropped_total
            .with_label_values(&[reason])
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
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_jobs: self.inner.active_jobs.get(),
            jobs_admitted_total: self.inner.jobs_admitted_total.get(),
            disk_guard_pauses_total: self.inner.disk_guard_pauses_total.get(),
        }
    }
}

const fn collector(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsCollector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
