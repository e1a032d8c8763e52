//! Interfaces the shell core drives on the embedding host.
//!
//! Every hook is synchronous and must return promptly; the core calls them
//! from its single consumer task. Hosts that need to block should hand the
//! work to their own thread.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::sync::Arc;

use seedling_config::Label;
use seedling_events::{JobId, JobMetadata, JobSnapshot, TransferRates};
use seedling_torrent_core::AddJob;
use uuid::Uuid;

/// Identifier of an open confirmation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for SurfaceId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

/// Panel showing details for the selected jobs.
pub trait DetailView: Send + Sync {
    /// Show `jobs`, which are all currently selected.
    fn refresh(&self, jobs: &[JobSnapshot]);
    /// Clear the panel.
    fn reset(&self);
}

/// Status bar counters.
pub trait StatusSurface: Send + Sync {
    /// Number of jobs in the active set.
    fn job_count(&self, count: usize);
    /// DHT node count, `None` when DHT is disabled.
    fn dht_nodes(&self, nodes: Option<u64>);
    /// Session-wide payload rates.
    fn transfer_rates(&self, rates: TransferRates);
    /// Blocking error that ends normal operation.
    fn fatal(&self, message: &str);
}

/// Overall progress indicator on the platform task bar.
pub trait TaskbarProgress: Send + Sync {
    /// Show `percent` (0 to 100), or clear the indicator with `None`.
    fn progress(&self, percent: Option<u8>);
}

/// One-shot user notifications.
pub trait Notifier: Send + Sync {
    /// Show a notification.
    fn notify(&self, title: &str, body: &str);
}

/// Factory for per-job confirmation surfaces.
pub trait ConfirmationHost: Send + Sync {
    /// Open a surface pre-filled with `draft`.
    ///
    /// The surface reports back through the shell inbox with the same `id`.
    fn open(&self, id: SurfaceId, draft: &AddJob) -> Box<dyn ConfirmationSurface>;
}

/// An open confirmation surface.
pub trait ConfirmationSurface: Send + Sync {
    /// Metadata resolved for `id`; surfaces waiting on other identities ignore it.
    fn metadata_found(&self, id: JobId, metadata: &JobMetadata);
    /// Tear the surface down.
    fn close(&self);
}

/// Label submenu.
pub trait LabelMenu: Send + Sync {
    /// Replace the menu entries with `labels`, in order.
    fn rebuild(&self, labels: &[Label]);
}

/// Free-space query for destination volumes.
pub trait VolumeProbe: Send + Sync {
    /// Free fraction (`0.0..=1.0`) of the volume holding `path`, if known.
    fn free_ratio(&self, path: &Path) -> Option<f64>;
}

/// Host hooks handed to the shell core.
#[derive(Clone)]
pub struct HostHandles {
    /// Detail panel.
    pub detail: Arc<dyn DetailView>,
    /// Status bar.
    pub status: Arc<dyn StatusSurface>,
    /// Task bar progress.
    pub taskbar: Arc<dyn TaskbarProgress>,
    /// Notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Confirmation surfaces.
    pub confirmations: Arc<dyn ConfirmationHost>,
    /// Label menu.
    pub label_menu: Arc<dyn LabelMenu>,
    /// Volume probe; the disk-space guard is inert without one.
    pub volume_probe: Option<Arc<dyn VolumeProbe>>,
}
