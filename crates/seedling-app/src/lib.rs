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

//! Seedling shell core and bootstrap wiring.
//!
//! Layout: `labels.rs` (label matcher, tag side table), `admission.rs`,
//! `bridge.rs` (event dispatch), `list_model.rs`, `selection.rs`,
//! `disk_guard.rs`, `host.rs` (host hooks), `shell.rs` (inbox loop),
//! `bootstrap.rs` (service wiring).

/// Job admission and confirmation surfaces.
pub mod admission;
/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Engine event dispatch.
pub mod bridge;
/// Low disk space policy.
pub mod disk_guard;
pub mod error;
mod headless;
pub mod host;
pub mod labels;
pub mod list_model;
pub mod selection;
pub mod shell;

pub use admission::{Admission, AdmissionPolicy, AdmissionRequest, prepare};
pub use bootstrap::run_app;
pub use bridge::EventBridge;
pub use disk_guard::{DiskGuard, GuardPolicy};
pub use error::{AppError, AppResult};
pub use host::{
    ConfirmationHost, ConfirmationSurface, DetailView, HostHandles, LabelMenu, Notifier,
    StatusSurface, SurfaceId, TaskbarProgress, VolumeProbe,
};
pub use labels::{JobTag, JobTags, LabelMatch, match_label};
pub use list_model::{FilterId, JobFilter, ListModel, RowLabel, VisibleRow};
pub use selection::SelectionTracker;
pub use shell::{Shell, ShellCommand, ShellMessage, ShellSender, inbox};
