//! Single consumer of engine events.
//!
//! Each event runs to completion before the next one is looked at; the
//! bridge is the only writer of the active set.

use std::sync::Arc;

use seedling_config::ShellSettings;
use seedling_events::{JobId, JobSnapshot, SessionEvent, TransferTotals};
use seedling_telemetry::Metrics;
use seedling_torrent_core::TransferEngine;
use tracing::{debug, warn};

use crate::admission::Admission;
use crate::disk_guard::{DiskGuard, GuardPolicy};
use crate::host::HostHandles;
use crate::list_model::ListModel;
use crate::selection::SelectionTracker;

/// Notification title used when a job completes.
pub const FINISHED_TITLE: &str = "Transfer finished";

/// Event dispatcher owning the list model, selection and disk guard.
pub struct EventBridge {
    list: ListModel,
    selection: SelectionTracker,
    guard: DiskGuard,
    host: HostHandles,
    metrics: Metrics,
}

impl EventBridge {
    /// Build a bridge with an empty active set.
    #[must_use]
    pub fn new(host: HostHandles, engine: Arc<dyn TransferEngine>, metrics: Metrics) -> Self {
        let guard = DiskGuard::new(
            host.volume_probe.clone(),
            engine,
            Arc::clone(&host.notifier),
            metrics.clone(),
        );
        Self {
            list: ListModel::default(),
            selection: SelectionTracker::default(),
            guard,
            host,
            metrics,
        }
    }

    /// The list model.
    #[must_use]
    pub const fn list(&self) -> &ListModel {
        &self.list
    }

    pub(crate) const fn list_mut(&mut self) -> &mut ListModel {
        &mut self.list
    }

    /// The selection tracker.
    #[must_use]
    pub const fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    /// Replace the selection with the jobs at visible `rows`.
    pub fn selection_changed(&mut self, rows: &[usize]) {
        self.selection
            .selection_changed(rows, &self.list, self.host.detail.as_ref());
    }

    /// Select every visible row.
    pub fn select_all(&mut self) {
        self.selection
            .select_all(&self.list, self.host.detail.as_ref());
    }

    /// Apply one engine event.
    pub async fn dispatch(
        &mut self,
        event: SessionEvent,
        settings: &ShellSettings,
        admission: &Admission,
    ) {
        self.metrics.inc_event(event.kind());
        match event {
            SessionEvent::Added {
                id,
                handle,
                snapshot,
            } => {
                if self.list.insert(id, handle, snapshot) {
                    self.job_count_changed();
                } else {
                    warn!(job_id = %id, "duplicate job added event dropped");
                    self.metrics.inc_dropped("duplicate_add");
                }
            }
            SessionEvent::Removed { id } => self.job_removed(&id),
            SessionEvent::BatchStatistics { snapshots } => {
                self.batch_statistics(snapshots, GuardPolicy::from(settings))
                    .await;
            }
            SessionEvent::SessionStatistics { stats } => {
                self.host
                    .status
                    .dht_nodes(settings.enable_dht.then_some(stats.dht_nodes));
            }
            SessionEvent::MetadataFound { id, metadata } => {
                debug!(job_id = %id, surfaces = admission.open_surfaces(), "metadata found");
                admission.broadcast_metadata(id, &metadata);
            }
            SessionEvent::TransferTotals { totals } => self.transfer_totals(&totals),
            SessionEvent::Finished { id } => match self.list.snapshot(&id) {
                Some(job) => self.host.notifier.notify(FINISHED_TITLE, &job.name),
                None => {
                    debug!(job_id = %id, "finished event for unknown job dropped");
                    self.metrics.inc_dropped("unknown_job");
                }
            },
        }
    }

    fn job_removed(&mut self, id: &JobId) {
        if !self.list.remove(id) {
            warn!(job_id = %id, "removed event for unknown job dropped");
            self.metrics.inc_dropped("unknown_job");
            return;
        }
        self.selection.job_removed(id, self.host.detail.as_ref());
        self.guard.job_removed(id);
        self.job_count_changed();
    }

    async fn batch_statistics(&mut self, snapshots: Vec<JobSnapshot>, policy: GuardPolicy) {
        let mut folded = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            if self.list.replace(snapshot.clone()) {
                folded.push(snapshot);
            } else {
                debug!(job_id = %snapshot.id, "statistics for unknown job dropped");
                self.metrics.inc_dropped("unknown_job");
            }
        }
        self.selection
            .batch_folded(&folded, &self.list, self.host.detail.as_ref());
        self.guard.evaluate(&folded, policy).await;
    }

    fn transfer_totals(&self, totals: &TransferTotals) {
        self.host.status.transfer_rates(totals.rates);
        self.host
            .taskbar
            .progress(totals.overall_progress().map(percent));
    }

    fn job_count_changed(&self) {
        self.host.status.job_count(self.list.len());
        self.metrics.set_active_jobs(self.list.len());
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
