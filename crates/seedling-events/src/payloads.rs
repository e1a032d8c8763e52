//! Event payload types carried from the engine into the shell.

use std::fmt::{self, Display, Formatter};
use std::num::NonZeroU32;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to each event published by the engine.
pub type EventId = u64;

/// Content-derived identity of a transfer job.
///
/// A job carries a SHA-1 (v1) digest, a SHA-256 (v2) digest, or both. The
/// identity is assigned once and is never reused; equality covers both
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    v1: Option<[u8; 20]>,
    v2: Option<[u8; 32]>,
}

impl JobId {
    /// Build an identity from optional v1/v2 digests.
    ///
    /// All-zero digests are treated as absent; `None` is returned when neither
    /// variant carries a usable digest.
    #[must_use]
    pub fn hybrid(v1: Option<[u8; 20]>, v2: Option<[u8; 32]>) -> Option<Self> {
        let v1 = v1.filter(|digest| digest.iter().any(|byte| *byte != 0));
        let v2 = v2.filter(|digest| digest.iter().any(|byte| *byte != 0));
        if v1.is_none() && v2.is_none() {
            return None;
        }
        Some(Self { v1, v2 })
    }

    /// Build a v1-only identity.
    #[must_use]
    pub fn from_v1(digest: [u8; 20]) -> Option<Self> {
        Self::hybrid(Some(digest), None)
    }

    /// Build a v2-only identity.
    #[must_use]
    pub fn from_v2(digest: [u8; 32]) -> Option<Self> {
        Self::hybrid(None, Some(digest))
    }

    /// SHA-1 digest, when present.
    #[must_use]
    pub const fn v1(&self) -> Option<&[u8; 20]> {
        self.v1.as_ref()
    }

    /// SHA-256 digest, when present.
    #[must_use]
    pub const fn v2(&self) -> Option<&[u8; 32]> {
        self.v2.as_ref()
    }

    /// Hex rendering of the primary digest (v1 preferred).
    #[must_use]
    pub fn to_hex(&self) -> String {
        match (&self.v1, &self.v2) {
            (Some(v1), _) => hex::encode(v1),
            (None, Some(v2)) => hex::encode(v2),
            (None, None) => String::new(),
        }
    }
}

impl Display for JobId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_hex())
    }
}

/// Engine-assigned handle used to address a job once admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub u64);

/// Stable identifier of a user-defined label. Zero is reserved for "no label".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(NonZeroU32);

impl LabelId {
    /// Wrap a raw label id, rejecting the reserved zero value.
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for LabelId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Computed lifecycle status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for an engine slot.
    Queued,
    /// Verifying existing data on disk.
    CheckingFiles,
    /// Fetching metadata from peers for a bare identity.
    DownloadingMetadata,
    /// Actively downloading payload.
    Downloading,
    /// All wanted pieces are present and the job is uploading.
    Seeding,
    /// Payload complete and not seeding.
    Finished,
    /// Stopped by the user or by policy.
    Paused,
    /// Engine reported an unrecoverable job error.
    Failed {
        /// Error detail reported by the engine.
        message: String,
    },
}

impl JobState {
    /// Whether the job is still fetching data it wants.
    #[must_use]
    pub const fn is_downloading(&self) -> bool {
        matches!(self, Self::Downloading | Self::DownloadingMetadata)
    }
}

/// Payload transfer rates in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRates {
    /// Download rate.
    pub download_bps: u64,
    /// Upload rate.
    pub upload_bps: u64,
}

/// Point-in-time read of one job's observable state.
///
/// Snapshots are replaced wholesale; a newer snapshot for the same identity
/// supersedes the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Identity of the job.
    pub id: JobId,
    /// Display name.
    pub name: String,
    /// Destination directory.
    pub save_path: PathBuf,
    /// Computed status.
    pub state: JobState,
    /// Current transfer rates.
    pub rates: TransferRates,
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Whether the engine reports the job as paused.
    pub paused: bool,
    /// Bytes the job wants in total.
    pub total_wanted: u64,
    /// Bytes of the wanted set already on disk.
    pub total_wanted_done: u64,
    /// Label resolved by the shell; engines leave this unset.
    pub label_id: Option<LabelId>,
}

/// Session-wide counters reported periodically by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Nodes currently present in the DHT routing table.
    pub dht_nodes: u64,
}

/// Aggregate transfer totals across every job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTotals {
    /// Summed payload rates.
    pub rates: TransferRates,
    /// Summed wanted bytes.
    pub total_wanted: u64,
    /// Summed wanted bytes already on disk.
    pub total_wanted_done: u64,
    /// Whether any job is still downloading.
    pub downloading_any: bool,
}

impl TransferTotals {
    /// Overall completion fraction, only while something is downloading.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn overall_progress(&self) -> Option<f64> {
        if !self.downloading_any || self.total_wanted == 0 {
            return None;
        }
        Some(self.total_wanted_done as f64 / self.total_wanted as f64)
    }
}

/// File entry exposed once metadata has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    /// Path relative to the job root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// Metadata discovered for a bare identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Declared name.
    pub name: String,
    /// Total payload size in bytes.
    pub total_size: u64,
    /// File listing.
    pub files: Vec<MetadataFile>,
}

/// Typed events emitted by the transfer engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A job entered the engine.
    Added {
        /// Identity of the job.
        id: JobId,
        /// Engine handle for the job.
        handle: JobHandle,
        /// Initial snapshot.
        snapshot: JobSnapshot,
    },
    /// A job left the engine.
    Removed {
        /// Identity of the removed job.
        id: JobId,
    },
    /// Periodic batch of refreshed snapshots.
    BatchStatistics {
        /// Snapshots for jobs whose state changed since the last batch.
        snapshots: Vec<JobSnapshot>,
    },
    /// Session-wide counters.
    SessionStatistics {
        /// Counter values.
        stats: SessionStats,
    },
    /// Metadata resolved for an identity submitted without it.
    MetadataFound {
        /// Identity the metadata belongs to.
        id: JobId,
        /// Resolved metadata.
        metadata: JobMetadata,
    },
    /// Aggregate rates and wanted totals.
    TransferTotals {
        /// Totals across all jobs.
        totals: TransferTotals,
    },
    /// A job completed its wanted payload.
    Finished {
        /// Identity of the finished job.
        id: JobId,
    },
}

impl SessionEvent {
    /// Machine-friendly discriminator used for logging and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "job_added",
            Self::Removed { .. } => "job_removed",
            Self::BatchStatistics { .. } => "batch_statistics",
            Self::SessionStatistics { .. } => "session_statistics",
            Self::MetadataFound { .. } => "metadata_found",
            Self::TransferTotals { .. } => "transfer_totals",
            Self::Finished { .. } => "job_finished",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: SessionEvent,
}
