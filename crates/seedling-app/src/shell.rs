//! Shell inbox and the loop that serializes engine events and UI commands.
//!
//! # Design
//! - One unbounded inbox carries everything the core reacts to, so engine
//!   events and user actions are handled one at a time in arrival order.
//! - Engine loss is the only fatal condition; it reaches the host through
//!   [`StatusSurface::fatal`](crate::host::StatusSurface::fatal) and ends the
//!   loop with [`AppError::EngineChannelLost`].

use std::ops::ControlFlow;
use std::sync::Arc;

use seedling_config::{SettingsService, SettingsSnapshot, SettingsWatcher};
use seedling_events::{EventEnvelope, EventStream, JobId, LabelId, SessionEvent};
use seedling_telemetry::Metrics;
use seedling_torrent_core::{AddJob, RemoveJob, TransferEngine};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::admission::{Admission, AdmissionPolicy, AdmissionRequest};
use crate::bridge::EventBridge;
use crate::error::{AppError, AppResult};
use crate::host::{HostHandles, SurfaceId};
use crate::list_model::{FilterId, JobFilter, ListModel};
use crate::selection::SelectionTracker;

/// Message shown on the status surface when the engine goes away.
pub const ENGINE_LOST_MESSAGE: &str = "The transfer engine stopped responding.";

/// Sending half of the shell inbox.
pub type ShellSender = mpsc::UnboundedSender<ShellMessage>;

/// Everything the shell loop reacts to.
#[derive(Debug)]
pub enum ShellMessage {
    /// Event published by the engine.
    Engine(Box<EventEnvelope>),
    /// The engine event stream ended.
    EngineLost,
    /// User or host action.
    Command(ShellCommand),
    /// Settings or labels changed.
    SettingsChanged(Box<SettingsSnapshot>),
    /// Stop the loop.
    Shutdown,
}

/// User or host actions.
#[derive(Debug)]
pub enum ShellCommand {
    /// Admit files, magnets or pasted text.
    Admit(AdmissionRequest),
    /// A confirmation surface accepted its (possibly edited) descriptor.
    ConfirmationSubmitted {
        /// Surface that produced the descriptor.
        surface: SurfaceId,
        /// Descriptor to submit.
        job: Box<AddJob>,
    },
    /// A confirmation surface was dismissed.
    ConfirmationCancelled {
        /// Dismissed surface.
        surface: SurfaceId,
    },
    /// The highlighted rows changed.
    SelectionChanged {
        /// Visible row indices now highlighted.
        rows: Vec<usize>,
    },
    /// Highlight every visible row.
    SelectAll,
    /// Remove the selected jobs.
    RemoveSelected {
        /// Also delete downloaded data.
        with_data: bool,
    },
    /// Pause the selected jobs.
    PauseSelected,
    /// Resume the selected jobs.
    ResumeSelected,
    /// Activate a registered filter.
    SetFilter(FilterId),
    /// Drop the active filter.
    ClearFilter,
    /// Show only one label.
    SetLabelFilter(LabelId),
    /// Drop the label filter.
    ClearLabelFilter,
    /// Retag jobs.
    AssignLabel {
        /// Jobs to retag.
        ids: Vec<JobId>,
        /// New label, or `None` to clear.
        label: Option<LabelId>,
    },
}

/// Create the shell inbox.
#[must_use]
pub fn inbox() -> (ShellSender, mpsc::UnboundedReceiver<ShellMessage>) {
    mpsc::unbounded_channel()
}

/// Forward engine envelopes into the inbox, reporting engine loss when the
/// stream ends.
pub fn forward_engine_events(mut stream: EventStream, inbox: ShellSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            if inbox.send(ShellMessage::Engine(Box::new(envelope))).is_err() {
                debug!("shell inbox closed; engine forwarder stopping");
                return;
            }
        }
        let _ = inbox.send(ShellMessage::EngineLost);
    })
}

/// Forward settings snapshots into the inbox until the service goes away.
pub fn forward_settings(mut watcher: SettingsWatcher, inbox: ShellSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match watcher.next().await {
                Ok(snapshot) => {
                    if inbox
                        .send(ShellMessage::SettingsChanged(Box::new(snapshot)))
                        .is_err()
                    {
                        break;
                    }
                }
                Err(err) => {
                    debug!(error = %err, "settings watcher terminated");
                    break;
                }
            }
        }
    })
}

/// The shell core: admission, event bridge, and the command surface.
pub struct Shell {
    engine: Arc<dyn TransferEngine>,
    settings: SettingsService,
    host: HostHandles,
    bridge: EventBridge,
    admission: Admission,
}

impl Shell {
    /// Assemble the core and publish the initial label list to the host.
    #[must_use]
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        settings: SettingsService,
        host: HostHandles,
        metrics: Metrics,
    ) -> Self {
        let bridge = EventBridge::new(host.clone(), Arc::clone(&engine), metrics.clone());
        let admission = Admission::new(
            Arc::clone(&engine),
            Arc::clone(&host.confirmations),
            metrics,
        );
        let mut shell = Self {
            engine,
            settings,
            host,
            bridge,
            admission,
        };
        let snapshot = shell.settings.snapshot();
        shell.settings_changed(&snapshot);
        shell
    }

    /// The list model.
    #[must_use]
    pub const fn list(&self) -> &ListModel {
        self.bridge.list()
    }

    /// The selection tracker.
    #[must_use]
    pub const fn selection(&self) -> &SelectionTracker {
        self.bridge.selection()
    }

    /// Number of open confirmation surfaces.
    #[must_use]
    pub fn open_surfaces(&self) -> usize {
        self.admission.open_surfaces()
    }

    /// Register a named filter.
    pub fn add_filter(&mut self, filter: JobFilter) -> FilterId {
        self.bridge.list_mut().add_filter(filter)
    }

    /// Drain the inbox until shutdown, inbox closure, or engine loss.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineChannelLost`] when the engine event stream ends.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<ShellMessage>) -> AppResult<()> {
        info!("shell loop started");
        while let Some(message) = inbox.recv().await {
            if let ControlFlow::Break(result) = self.handle(message).await {
                self.admission.close_all();
                return result;
            }
        }
        info!("shell inbox closed");
        self.admission.close_all();
        Ok(())
    }

    /// Process one inbox message.
    pub async fn handle(&mut self, message: ShellMessage) -> ControlFlow<AppResult<()>> {
        match message {
            ShellMessage::Engine(envelope) => {
                debug!(event_id = envelope.id, kind = envelope.event.kind(), "engine event");
                self.handle_event(envelope.event).await;
            }
            ShellMessage::EngineLost => {
                error!("engine event channel lost");
                self.host.status.fatal(ENGINE_LOST_MESSAGE);
                return ControlFlow::Break(Err(AppError::EngineChannelLost));
            }
            ShellMessage::Command(command) => self.handle_command(command).await,
            ShellMessage::SettingsChanged(snapshot) => self.settings_changed(&snapshot),
            ShellMessage::Shutdown => {
                info!("shutdown requested");
                return ControlFlow::Break(Ok(()));
            }
        }
        ControlFlow::Continue(())
    }

    /// Apply one engine event.
    pub async fn handle_event(&mut self, event: SessionEvent) {
        let snapshot = self.settings.snapshot();
        self.bridge
            .dispatch(event, &snapshot.settings, &self.admission)
            .await;
    }

    /// Admit already-parsed descriptors using the current settings and labels.
    pub async fn admit(&mut self, descriptors: Vec<AddJob>) {
        let snapshot = self.settings.snapshot();
        let policy = AdmissionPolicy::from(&snapshot.settings);
        self.admission
            .admit(descriptors, &policy, &snapshot.labels, self.bridge.list_mut())
            .await;
    }

    /// Apply one user or host action.
    pub async fn handle_command(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Admit(request) => {
                if request.is_empty() {
                    return;
                }
                let snapshot = self.settings.snapshot();
                let policy = AdmissionPolicy::from(&snapshot.settings);
                self.admission
                    .admit_request(request, &policy, &snapshot.labels, self.bridge.list_mut())
                    .await;
            }
            ShellCommand::ConfirmationSubmitted { surface, job } => {
                self.admission
                    .confirm(surface, *job, self.bridge.list_mut())
                    .await;
            }
            ShellCommand::ConfirmationCancelled { surface } => {
                self.admission.cancel(surface);
            }
            ShellCommand::SelectionChanged { rows } => self.bridge.selection_changed(&rows),
            ShellCommand::SelectAll => self.bridge.select_all(),
            ShellCommand::RemoveSelected { with_data } => self.remove_selected(with_data).await,
            ShellCommand::PauseSelected => self.toggle_selected(false).await,
            ShellCommand::ResumeSelected => self.toggle_selected(true).await,
            ShellCommand::SetFilter(id) => {
                self.bridge.list_mut().select_filter(id);
            }
            ShellCommand::ClearFilter => self.bridge.list_mut().clear_filter(),
            ShellCommand::SetLabelFilter(label) => self.bridge.list_mut().set_label_filter(label),
            ShellCommand::ClearLabelFilter => self.bridge.list_mut().clear_label_filter(),
            ShellCommand::AssignLabel { ids, label } => {
                self.bridge.list_mut().assign_label(&ids, label);
            }
        }
    }

    /// Rebuild the label menu and re-resolve labels in the list.
    pub fn settings_changed(&mut self, snapshot: &SettingsSnapshot) {
        debug!(revision = snapshot.revision, "settings changed");
        self.host.label_menu.rebuild(&snapshot.labels);
        self.bridge.list_mut().set_labels(
            snapshot.labels.clone(),
            snapshot.settings.use_label_as_list_bgcolor,
        );
    }

    async fn remove_selected(&self, with_data: bool) {
        let ids: Vec<JobId> = self.selection().ids().copied().collect();
        for id in ids {
            if let Err(err) = self.engine.remove(id, RemoveJob { with_data }).await {
                warn!(job_id = %id, error = %err, "job removal failed");
            }
        }
    }

    async fn toggle_selected(&self, resume: bool) {
        let ids: Vec<JobId> = self.selection().ids().copied().collect();
        for id in ids {
            let result = if resume {
                self.engine.resume(id).await
            } else {
                self.engine.pause(id).await
            };
            if let Err(err) = result {
                warn!(job_id = %id, resume, error = %err, "job pause toggle failed");
            }
        }
    }
}
