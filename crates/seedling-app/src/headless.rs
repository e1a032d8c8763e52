#![allow(clippy::redundant_pub_crate)]
//! Log-only host used by the binary when no UI is attached.
//!
//! Confirmation surfaces accept their draft immediately by posting it back
//! to the shell inbox.

use std::sync::Arc;

use seedling_config::Label;
use seedling_events::{JobId, JobMetadata, JobSnapshot, TransferRates};
use seedling_torrent_core::AddJob;
use tracing::{debug, error, info};

use crate::disk_guard::platform_probe;
use crate::host::{
    ConfirmationHost, ConfirmationSurface, DetailView, HostHandles, LabelMenu, Notifier,
    StatusSurface, SurfaceId, TaskbarProgress,
};
use crate::shell::{ShellCommand, ShellMessage, ShellSender};

pub(crate) fn handles(inbox: ShellSender) -> HostHandles {
    let host = Arc::new(HeadlessHost);
    HostHandles {
        detail: host.clone(),
        status: host.clone(),
        taskbar: host.clone(),
        notifier: host.clone(),
        confirmations: Arc::new(AutoConfirm { inbox }),
        label_menu: host,
        volume_probe: platform_probe(),
    }
}

struct HeadlessHost;

impl DetailView for HeadlessHost {
    fn refresh(&self, jobs: &[JobSnapshot]) {
        for job in jobs {
            debug!(job_id = %job.id, progress = job.progress, state = ?job.state, "selected job updated");
        }
    }

    fn reset(&self) {
        debug!("detail view cleared");
    }
}

impl StatusSurface for HeadlessHost {
    fn job_count(&self, count: usize) {
        info!(count, "job count changed");
    }

    fn dht_nodes(&self, nodes: Option<u64>) {
        debug!(?nodes, "dht nodes");
    }

    fn transfer_rates(&self, rates: TransferRates) {
        debug!(
            download_bps = rates.download_bps,
            upload_bps = rates.upload_bps,
            "transfer rates"
        );
    }

    fn fatal(&self, message: &str) {
        error!(message, "fatal shell error");
    }
}

impl TaskbarProgress for HeadlessHost {
    fn progress(&self, percent: Option<u8>) {
        debug!(?percent, "overall progress");
    }
}

impl Notifier for HeadlessHost {
    fn notify(&self, title: &str, body: &str) {
        info!(title, body, "notification");
    }
}

impl LabelMenu for HeadlessHost {
    fn rebuild(&self, labels: &[Label]) {
        debug!(labels = labels.len(), "label menu rebuilt");
    }
}

struct AutoConfirm {
    inbox: ShellSender,
}

impl ConfirmationHost for AutoConfirm {
    fn open(&self, id: SurfaceId, draft: &AddJob) -> Box<dyn ConfirmationSurface> {
        let submitted = ShellMessage::Command(ShellCommand::ConfirmationSubmitted {
            surface: id,
            job: Box::new(draft.clone()),
        });
        if self.inbox.send(submitted).is_err() {
            debug!(surface = %id, "shell inbox closed before confirmation");
        }
        Box::new(HeadlessSurface { id })
    }
}

struct HeadlessSurface {
    id: SurfaceId,
}

impl ConfirmationSurface for HeadlessSurface {
    fn metadata_found(&self, id: JobId, metadata: &JobMetadata) {
        debug!(surface = %self.id, job_id = %id, name = %metadata.name, "metadata offered to surface");
    }

    fn close(&self) {
        debug!(surface = %self.id, "surface closed");
    }
}
