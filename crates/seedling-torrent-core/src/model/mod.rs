//! Transfer job descriptors shared between the shell and engine adapters.

mod magnet;
mod metainfo;

#[cfg(test)]
pub(crate) use metainfo::fixtures;

pub use magnet::MagnetLink;
pub use metainfo::Metainfo;

use std::path::PathBuf;

use seedling_events::{JobId, LabelId};
use serde::{Deserialize, Serialize};

/// Source describing how a job should be added to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSource {
    /// Fully described by a decoded `.torrent` payload.
    Metainfo {
        /// Decoded metainfo.
        info: Box<Metainfo>,
    },
    /// Bare identity plus discovery hints; metadata must be fetched from peers.
    Magnet {
        /// Parsed magnet link.
        link: MagnetLink,
    },
}

/// How the engine should treat a job whose identity is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Merge trackers into the existing job and report success.
    #[default]
    Merge,
    /// Report the duplicate as an error event.
    Reject,
}

/// Mutable knobs filled in during admission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddJobOptions {
    /// Destination directory.
    pub save_path: Option<PathBuf>,
    /// Duplicate handling.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Label assigned by the matcher or the user.
    pub label_id: Option<LabelId>,
}

/// Request payload for admitting a job into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddJob {
    /// How the job is described.
    pub source: JobSource,
    /// Optional knobs applied alongside admission.
    #[serde(default)]
    pub options: AddJobOptions,
}

impl AddJob {
    /// Descriptor for a decoded `.torrent` payload.
    #[must_use]
    pub fn metainfo(info: Metainfo) -> Self {
        Self {
            source: JobSource::Metainfo {
                info: Box::new(info),
            },
            options: AddJobOptions::default(),
        }
    }

    /// Descriptor for a parsed magnet link.
    #[must_use]
    pub fn magnet(link: MagnetLink) -> Self {
        Self {
            source: JobSource::Magnet { link },
            options: AddJobOptions::default(),
        }
    }

    /// Identity of the job.
    #[must_use]
    pub fn id(&self) -> JobId {
        match &self.source {
            JobSource::Metainfo { info } => info.id,
            JobSource::Magnet { link } => link.id,
        }
    }

    /// Name declared by the full metadata, if present.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        match &self.source {
            JobSource::Metainfo { info } => Some(info.name.as_str()),
            JobSource::Magnet { .. } => None,
        }
    }

    /// Best available name: declared name first, then the supplied display name.
    #[must_use]
    pub fn candidate_name(&self) -> Option<&str> {
        match &self.source {
            JobSource::Metainfo { info } => Some(info.name.as_str()),
            JobSource::Magnet { link } => link.display_name.as_deref(),
        }
        .filter(|name| !name.is_empty())
    }

    /// Whether the job still needs metadata discovered from peers.
    #[must_use]
    pub const fn needs_metadata(&self) -> bool {
        matches!(self.source, JobSource::Magnet { .. })
    }
}

/// Options controlling how the engine removes jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveJob {
    /// Whether to remove on-disk data alongside the job.
    #[serde(default)]
    pub with_data: bool,
}
