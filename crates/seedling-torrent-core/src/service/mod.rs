//! Engine trait implemented by transfer adapters.

use crate::model::{AddJob, RemoveJob};
use anyhow::bail;
use async_trait::async_trait;
use seedling_events::JobId;

/// Primary engine trait implemented by adapters.
///
/// Every call only hands work to the engine; completion and failure surface
/// later as session events.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Admit a new job into the underlying engine.
    async fn submit(&self, job: AddJob) -> anyhow::Result<()>;

    /// Remove a job from the engine, optionally deleting data.
    async fn remove(&self, id: JobId, options: RemoveJob) -> anyhow::Result<()>;

    /// Pause a job; default implementation reports lack of support.
    async fn pause(&self, id: JobId) -> anyhow::Result<()> {
        let _ = id;
        bail!("pause operation not supported by this engine");
    }

    /// Resume a job; default implementation reports lack of support.
    async fn resume(&self, id: JobId) -> anyhow::Result<()> {
        let _ = id;
        bail!("resume operation not supported by this engine");
    }

    /// Ask the engine to discover metadata for bare identities.
    async fn request_metadata_search(&self, ids: Vec<JobId>) -> anyhow::Result<()> {
        let _ = ids;
        bail!("metadata search not supported by this engine");
    }
}
