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

//! Shell settings and label configuration.
//!
//! Layout: `model.rs` (typed settings and labels), `validate.rs` (validation
//! and parsing helpers), `loader.rs` (environment overrides), `service.rs`
//! (`SettingsService` + `SettingsWatcher`).

mod defaults;
pub mod error;
mod loader;
pub mod model;
pub mod service;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{Label, LabelDraft, SettingsSnapshot, ShellSettings};
pub use service::{SettingsService, SettingsWatcher};
