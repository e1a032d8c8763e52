#![allow(clippy::redundant_pub_crate)]

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Result;
use seedling_events::{EventPublisher, SessionEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::EngineCommand;
use crate::session::Session;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub(crate) fn spawn(
    publisher: EventPublisher,
    mut commands: mpsc::Receiver<EngineCommand>,
    session: Box<dyn Session>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut worker = Worker::new(publisher, session);
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        loop {
            if worker.publisher.is_closed() {
                info!("event receiver dropped; engine worker stopping");
                break;
            }
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            let operation = command.operation();
                            if let Err(err) = worker.handle(command).await {
                                let detail = err.to_string();
                                worker.mark_degraded("session", Some(&detail));
                                warn!(operation, error = %err, "engine command handling failed");
                            }
                        }
                        None => break,
                    }
                }
                _ = poll.tick() => {
                    if let Err(err) = worker.flush_session_events().await {
                        warn!(error = %err, "engine event polling failed");
                    }
                }
            }
        }
        if let Err(err) = worker.flush_session_events().await {
            warn!(error = %err, "engine event polling failed during shutdown");
        }
        debug!("engine worker exited");
    })
}

struct Worker {
    publisher: EventPublisher,
    session: Box<dyn Session>,
    health: BTreeSet<String>,
}

impl Worker {
    fn new(publisher: EventPublisher, session: Box<dyn Session>) -> Self {
        Self {
            publisher,
            session,
            health: BTreeSet::new(),
        }
    }

    async fn handle(&mut self, command: EngineCommand) -> Result<()> {
        match command {
            EngineCommand::Submit(job) => self.session.submit(&job).await?,
            EngineCommand::Remove { id, options } => self.session.remove(id, &options).await?,
            EngineCommand::Pause { id } => self.session.pause(id).await?,
            EngineCommand::Resume { id } => self.session.resume(id).await?,
            EngineCommand::SearchMetadata { ids } => self.session.search_metadata(&ids).await?,
        }

        self.flush_session_events().await
    }

    async fn flush_session_events(&mut self) -> Result<()> {
        match self.session.poll_events().await {
            Ok(events) => {
                for event in events {
                    self.publish(event);
                }
                self.mark_recovered("session");
                Ok(())
            }
            Err(err) => {
                let detail = err.to_string();
                self.mark_degraded("session", Some(&detail));
                Err(err)
            }
        }
    }

    fn publish(&mut self, event: SessionEvent) {
        if let Err(err) = self.publisher.publish(event) {
            // Shutdown path: the receiver is gone and the loop exits on its next turn.
            debug!(error = %err, "engine event not delivered");
        }
    }

    fn mark_degraded(&mut self, component: &str, detail: Option<&str>) {
        let inserted = self.health.insert(component.to_string());
        if inserted {
            if let Some(detail) = detail {
                warn!(component, detail = %detail, "engine component degraded");
            } else {
                warn!(component, "engine component degraded");
            }
        } else if let Some(detail) = detail {
            warn!(component, detail = %detail, "engine component still degraded");
        }
    }

    fn mark_recovered(&mut self, component: &str) {
        if self.health.remove(component) {
            info!(component, "engine component recovered");
        }
    }
}
