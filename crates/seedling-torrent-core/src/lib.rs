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

//! Engine-agnostic transfer job descriptors and the engine trait.
//!
//! Layout: `model/` (descriptors, magnet and metainfo parsing), `service/`
//! (`TransferEngine`), `error.rs` (`TorrentError`).

pub mod error;
pub mod model;
pub mod service;

pub use error::{TorrentError, TorrentResult};
pub use model::{
    AddJob, AddJobOptions, DuplicatePolicy, JobSource, MagnetLink, Metainfo, RemoveJob,
};
pub use service::TransferEngine;
