//! In-memory session that simulates transfers without touching the network.
//!
//! Every poll advances unpaused jobs by a fixed number of bytes. Metadata
//! searches resolve only for identities listed in
//! [`LoopbackConfig::known_metadata`].

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use seedling_events::{
    JobHandle, JobId, JobSnapshot, JobState, SessionEvent, SessionStats, TransferRates,
    TransferTotals,
};
use seedling_torrent_core::{
    AddJob, DuplicatePolicy, JobSource, Metainfo, RemoveJob, TorrentError,
};
use tracing::debug;

use super::Session;

/// Tunables for the loopback session.
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Bytes completed per poll for each downloading job.
    pub step_bytes: u64,
    /// Download rate reported while a job is progressing.
    pub download_bps: u64,
    /// DHT node count reported in session statistics.
    pub dht_nodes: u64,
    /// Metadata the simulated swarm can hand out.
    pub known_metadata: Vec<Metainfo>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            step_bytes: 256 * 1024,
            download_bps: 1024 * 1024,
            dht_nodes: 0,
            known_metadata: Vec::new(),
        }
    }
}

struct LoopbackJob {
    snapshot: JobSnapshot,
    dirty: bool,
}

/// In-memory [`Session`] implementation.
#[derive(Default)]
pub struct LoopbackSession {
    config: LoopbackConfig,
    jobs: Vec<LoopbackJob>,
    next_handle: u64,
    pending: Vec<SessionEvent>,
}

impl LoopbackSession {
    /// Construct a session with custom tunables.
    #[must_use]
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut LoopbackJob> {
        self.jobs
            .iter_mut()
            .find(|job| job.snapshot.id == id)
            .ok_or_else(|| TorrentError::NotFound { job_id: id }.into())
    }

    fn advance(&mut self) -> Vec<JobId> {
        let mut finished = Vec::new();
        for job in &mut self.jobs {
            let snapshot = &mut job.snapshot;
            if snapshot.paused || snapshot.state != JobState::Downloading {
                continue;
            }
            snapshot.total_wanted_done = snapshot
                .total_wanted_done
                .saturating_add(self.config.step_bytes)
                .min(snapshot.total_wanted);
            snapshot.progress = fraction(snapshot.total_wanted_done, snapshot.total_wanted);
            snapshot.rates.download_bps = self.config.download_bps;
            if snapshot.total_wanted_done == snapshot.total_wanted {
                snapshot.state = JobState::Seeding;
                snapshot.rates.download_bps = 0;
                finished.push(snapshot.id);
            }
            job.dirty = true;
        }
        finished
    }

    fn totals(&self) -> TransferTotals {
        self.jobs
            .iter()
            .fold(TransferTotals::default(), |mut totals, job| {
                let snapshot = &job.snapshot;
                totals.rates.download_bps += snapshot.rates.download_bps;
                totals.rates.upload_bps += snapshot.rates.upload_bps;
                totals.total_wanted += snapshot.total_wanted;
                totals.total_wanted_done += snapshot.total_wanted_done;
                totals.downloading_any |= !snapshot.paused && snapshot.state.is_downloading();
                totals
            })
    }
}

#[async_trait]
impl Session for LoopbackSession {
    async fn submit(&mut self, job: &AddJob) -> Result<()> {
        let id = job.id();
        if self.jobs.iter().any(|existing| existing.snapshot.id == id) {
            return match job.options.duplicate_policy {
                DuplicatePolicy::Reject => Err(TorrentError::OperationFailed {
                    operation: "submit",
                    job_id: Some(id),
                    source: "job already present".into(),
                }
                .into()),
                DuplicatePolicy::Merge => {
                    debug!(job_id = %id, "duplicate submission merged");
                    Ok(())
                }
            };
        }

        let (state, total_wanted) = match &job.source {
            JobSource::Metainfo { info } => (JobState::Downloading, info.total_size()),
            JobSource::Magnet { .. } => (JobState::DownloadingMetadata, 0),
        };
        let snapshot = JobSnapshot {
            id,
            name: job
                .candidate_name()
                .map_or_else(|| id.to_hex(), str::to_string),
            save_path: job
                .options
                .save_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            state,
            rates: TransferRates::default(),
            progress: 0.0,
            paused: false,
            total_wanted,
            total_wanted_done: 0,
            label_id: None,
        };
        self.next_handle += 1;
        self.pending.push(SessionEvent::Added {
            id,
            handle: JobHandle(self.next_handle),
            snapshot: snapshot.clone(),
        });
        self.jobs.push(LoopbackJob {
            snapshot,
            dirty: false,
        });
        Ok(())
    }

    async fn remove(&mut self, id: JobId, options: &RemoveJob) -> Result<()> {
        let index = self
            .jobs
            .iter()
            .position(|job| job.snapshot.id == id)
            .ok_or(TorrentError::NotFound { job_id: id })?;
        self.jobs.remove(index);
        if options.with_data {
            debug!(job_id = %id, "loopback session holds no payload to delete");
        }
        self.pending.push(SessionEvent::Removed { id });
        Ok(())
    }

    async fn pause(&mut self, id: JobId) -> Result<()> {
        let job = self.job_mut(id)?;
        if !job.snapshot.paused {
            job.snapshot.paused = true;
            job.snapshot.rates = TransferRates::default();
            job.dirty = true;
        }
        Ok(())
    }

    async fn resume(&mut self, id: JobId) -> Result<()> {
        let job = self.job_mut(id)?;
        if job.snapshot.paused {
            job.snapshot.paused = false;
            job.dirty = true;
        }
        Ok(())
    }

    async fn search_metadata(&mut self, ids: &[JobId]) -> Result<()> {
        for id in ids {
            let Some(info) = self
                .config
                .known_metadata
                .iter()
                .find(|info| info.id == *id)
                .cloned()
            else {
                debug!(job_id = %id, "no peers offered metadata");
                continue;
            };
            if let Some(job) = self.jobs.iter_mut().find(|job| job.snapshot.id == *id)
                && job.snapshot.state == JobState::DownloadingMetadata
            {
                job.snapshot.name.clone_from(&info.name);
                job.snapshot.total_wanted = info.total_size();
                job.snapshot.state = JobState::Downloading;
                job.dirty = true;
            }
            self.pending.push(SessionEvent::MetadataFound {
                id: *id,
                metadata: info.metadata(),
            });
        }
        Ok(())
    }

    async fn poll_events(&mut self) -> Result<Vec<SessionEvent>> {
        let finished = self.advance();
        let mut events = std::mem::take(&mut self.pending);

        let snapshots: Vec<JobSnapshot> = self
            .jobs
            .iter_mut()
            .filter(|job| job.dirty)
            .map(|job| {
                job.dirty = false;
                job.snapshot.clone()
            })
            .collect();
        if !snapshots.is_empty() {
            events.push(SessionEvent::BatchStatistics { snapshots });
        }
        events.extend(finished.into_iter().map(|id| SessionEvent::Finished { id }));
        events.push(SessionEvent::TransferTotals {
            totals: self.totals(),
        });
        events.push(SessionEvent::SessionStatistics {
            stats: SessionStats {
                dht_nodes: self.config.dht_nodes,
            },
        });
        Ok(events)
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64
    }
}
