//! Session abstraction driven by the engine worker.

use anyhow::Result;
use async_trait::async_trait;
use seedling_events::{JobId, SessionEvent};
use seedling_torrent_core::{AddJob, RemoveJob};

mod loopback;

pub use loopback::{LoopbackConfig, LoopbackSession};

/// Backend that owns the transfer state; the worker is its only caller.
///
/// Mutating calls only record work; resulting state changes surface from
/// [`Session::poll_events`].
#[async_trait]
pub trait Session: Send {
    /// Admit a job.
    async fn submit(&mut self, job: &AddJob) -> Result<()>;
    /// Remove a job.
    async fn remove(&mut self, id: JobId, options: &RemoveJob) -> Result<()>;
    /// Pause a job.
    async fn pause(&mut self, id: JobId) -> Result<()>;
    /// Resume a job.
    async fn resume(&mut self, id: JobId) -> Result<()>;
    /// Start metadata discovery for bare identities.
    async fn search_metadata(&mut self, ids: &[JobId]) -> Result<()>;
    /// Drain events produced since the previous poll.
    async fn poll_events(&mut self) -> Result<Vec<SessionEvent>>;
}
