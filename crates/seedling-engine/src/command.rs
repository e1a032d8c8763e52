use seedling_events::JobId;
use seedling_torrent_core::{AddJob, RemoveJob};

/// Commands accepted by the engine worker.
#[derive(Debug)]
pub enum EngineCommand {
    /// Admit a job into the session.
    Submit(Box<AddJob>),
    /// Remove a job from the session, optionally deleting its data.
    Remove {
        /// Job identity.
        id: JobId,
        /// Removal behaviour.
        options: RemoveJob,
    },
    /// Pause an active job without removing it.
    Pause {
        /// Job identity.
        id: JobId,
    },
    /// Resume a paused job.
    Resume {
        /// Job identity.
        id: JobId,
    },
    /// Discover metadata for bare identities.
    SearchMetadata {
        /// Identities awaiting metadata.
        ids: Vec<JobId>,
    },
}

impl EngineCommand {
    /// Short name used in logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::Remove { .. } => "remove",
            Self::Pause { .. } => "pause",
            Self::Resume { .. } => "resume",
            Self::SearchMetadata { .. } => "search_metadata",
        }
    }
}
