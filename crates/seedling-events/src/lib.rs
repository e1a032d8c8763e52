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

//! Typed engine events and the channel that carries them into the shell.
//!
//! Engine workers publish [`SessionEvent`]s from their own tasks; every
//! envelope gets a sequential identifier and lands on a single unbounded
//! consumer queue so publishers never stall on a slow UI.

pub mod error;
pub mod payloads;
pub mod routing;

pub use error::{EventBusError, EventBusResult};
pub use payloads::{
    EventEnvelope, EventId, JobHandle, JobId, JobMetadata, JobSnapshot, JobState, LabelId,
    MetadataFile, SessionEvent, SessionStats, TransferRates, TransferTotals,
};
pub use routing::{EventPublisher, EventSink, EventStream, channel};
