//! Pauses jobs whose destination volume runs out of space.
//!
//! # Design
//! - Each job is paused at most once per low-space episode; the guard
//!   re-arms when the volume recovers or the job is removed.
//! - Without a [`VolumeProbe`] the guard does nothing.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use seedling_config::ShellSettings;
use seedling_events::{JobId, JobSnapshot};
use seedling_telemetry::Metrics;
use seedling_torrent_core::TransferEngine;
use tracing::{debug, info, warn};

use crate::host::{Notifier, VolumeProbe};

/// Notification title used for low-space pauses.
pub const LOW_DISK_TITLE: &str = "Paused: low disk space";

/// Settings the guard reads on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Whether the guard runs at all.
    pub enabled: bool,
    /// Free-space percentage below which jobs are paused.
    pub threshold_percent: u8,
}

impl From<&ShellSettings> for GuardPolicy {
    fn from(settings: &ShellSettings) -> Self {
        Self {
            enabled: settings.pause_on_low_disk_space,
            threshold_percent: settings.pause_on_low_disk_space_limit,
        }
    }
}

/// Disk-space guard state.
pub struct DiskGuard {
    probe: Option<Arc<dyn VolumeProbe>>,
    engine: Arc<dyn TransferEngine>,
    notifier: Arc<dyn Notifier>,
    metrics: Metrics,
    paused: HashSet<JobId>,
}

impl DiskGuard {
    /// Build a guard; `probe = None` makes it inert.
    #[must_use]
    pub fn new(
        probe: Option<Arc<dyn VolumeProbe>>,
        engine: Arc<dyn TransferEngine>,
        notifier: Arc<dyn Notifier>,
        metrics: Metrics,
    ) -> Self {
        Self {
            probe,
            engine,
            notifier,
            metrics,
            paused: HashSet::new(),
        }
    }

    /// Pause every job in `batch` whose volume is below the threshold.
    pub async fn evaluate(&mut self, batch: &[JobSnapshot], policy: GuardPolicy) {
        if !policy.enabled {
            return;
        }
        let Some(probe) = self.probe.clone() else {
            return;
        };
        let limit = f64::from(policy.threshold_percent) / 100.0;

        for job in batch {
            let Some(ratio) = probe.free_ratio(&job.save_path) else {
                debug!(job_id = %job.id, "free space unknown for destination");
                continue;
            };
            if ratio >= limit {
                if self.paused.remove(&job.id) {
                    debug!(job_id = %job.id, "disk guard re-armed");
                }
                continue;
            }
            if job.paused || self.paused.contains(&job.id) {
                continue;
            }

            info!(
                job_id = %job.id,
                available = ratio,
                limit,
                "pausing job because disk space is low"
            );
            self.paused.insert(job.id);
            if let Err(err) = self.engine.pause(job.id).await {
                warn!(job_id = %job.id, error = %err, "disk guard pause failed");
            }
            self.metrics.inc_disk_guard_pause();
            self.notifier.notify(LOW_DISK_TITLE, &job.name);
        }
    }

    /// Forget a removed job so a later job with the same identity starts armed.
    pub(crate) fn job_removed(&mut self, id: &JobId) {
        self.paused.remove(id);
    }
}

/// Probe backed by `statvfs(3)`.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

#[cfg(unix)]
impl VolumeProbe for StatvfsProbe {
    #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
    fn free_ratio(&self, path: &Path) -> Option<f64> {
        // Destinations may not exist yet; measure the nearest existing ancestor.
        let stats = path
            .ancestors()
            .find_map(|candidate| nix::sys::statvfs::statvfs(candidate).ok())?;
        let total = stats.blocks() as f64;
        if total <= 0.0 {
            return None;
        }
        Some(stats.blocks_available() as f64 / total)
    }
}

/// Platform probe, if one exists for this target.
#[must_use]
pub fn platform_probe() -> Option<Arc<dyn VolumeProbe>> {
    #[cfg(unix)]
    {
        Some(Arc::new(StatvfsProbe))
    }
    #[cfg(not(unix))]
    {
        None
    }
}
