#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Engine adapter: a background worker that owns a [`Session`] and publishes
//! its events onto the shell's event channel.

/// Engine command definitions.
pub mod command;
/// Session abstraction and the in-memory loopback implementation.
pub mod session;
mod worker;

pub use session::{LoopbackConfig, LoopbackSession, Session};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use command::EngineCommand;
use seedling_events::{EventPublisher, JobId};
use seedling_torrent_core::{AddJob, RemoveJob, TransferEngine};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 128;

/// Cloneable handle that forwards requests to the engine worker.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Spawn a worker around a default loopback session.
    #[must_use]
    pub fn spawn(publisher: EventPublisher) -> (Self, JoinHandle<()>) {
        Self::spawn_with(publisher, Box::new(LoopbackSession::default()))
    }

    /// Spawn a worker around the supplied session.
    ///
    /// The worker stops once every handle is dropped or the event consumer
    /// goes away.
    #[must_use]
    pub fn spawn_with(
        publisher: EventPublisher,
        session: Box<dyn Session>,
    ) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = worker::spawn(publisher, rx, session);
        (Self { commands }, task)
    }

    async fn send_command(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|err| anyhow!("failed to enqueue engine command: {err}"))
    }
}

#[async_trait]
impl TransferEngine for EngineHandle {
    async fn submit(&self, job: AddJob) -> Result<()> {
        self.send_command(EngineCommand::Submit(Box::new(job))).await
    }

    async fn remove(&self, id: JobId, options: RemoveJob) -> Result<()> {
        self.send_command(EngineCommand::Remove { id, options })
            .await
    }

    async fn pause(&self, id: JobId) -> Result<()> {
        self.send_command(EngineCommand::Pause { id }).await
    }

    async fn resume(&self, id: JobId) -> Result<()> {
        self.send_command(EngineCommand::Resume { id }).await
    }

    async fn request_metadata_search(&self, ids: Vec<JobId>) -> Result<()> {
        self.send_command(EngineCommand::SearchMetadata { ids })
            .await
    }
}
