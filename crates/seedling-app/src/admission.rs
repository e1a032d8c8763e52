//! Admission of new jobs: defaults, label matching, confirmation surfaces.
//!
//! # Design
//! - Every descriptor is handled independently; a bad input or a failed
//!   submission never affects its siblings.
//! - Engine calls only enqueue work; duplicates and failures come back later
//!   as session events.
//! - Metadata discovery for bare identities is requested once per batch, and
//!   only when confirmation surfaces are shown; direct submission leaves
//!   discovery to the engine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use seedling_config::{Label, ShellSettings};
use seedling_events::{JobId, JobMetadata};
use seedling_telemetry::Metrics;
use seedling_torrent_core::{AddJob, DuplicatePolicy, MagnetLink, Metainfo, TransferEngine};
use tracing::{debug, info, warn};

use crate::host::{ConfirmationHost, ConfirmationSurface, SurfaceId};
use crate::labels::{JobTag, match_label};
use crate::list_model::ListModel;

const MAGNET_SCHEME: &str = "magnet:";

/// Settings applied to every admitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Destination before label overrides.
    pub default_save_path: PathBuf,
    /// Submit directly instead of opening confirmation surfaces.
    pub skip_confirmation: bool,
}

impl From<&ShellSettings> for AdmissionPolicy {
    fn from(settings: &ShellSettings) -> Self {
        Self {
            default_save_path: settings.default_save_path.clone(),
            skip_confirmation: settings.skip_add_torrent_dialog,
        }
    }
}

/// Raw admission inputs from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionRequest {
    /// Paths to `.torrent` files.
    pub files: Vec<PathBuf>,
    /// Magnet URIs.
    pub magnets: Vec<String>,
    /// Free text; each non-empty line is a magnet URI or a file path.
    pub paste: Option<String>,
}

impl AdmissionRequest {
    /// Split command-line style arguments into magnets and file paths.
    #[must_use]
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut request = Self::default();
        for arg in args {
            request.push_input(arg.trim());
        }
        request
    }

    /// Number of inputs, counting each non-empty pasted line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len() + self.magnets.len() + self.paste_lines().count()
    }

    /// Whether there is nothing to admit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read and parse every input, dropping the ones that fail.
    pub async fn load(self) -> Vec<AddJob> {
        let pasted: Vec<String> = self.paste_lines().map(str::to_string).collect();
        let mut expanded = Self {
            paste: None,
            ..self
        };
        for line in &pasted {
            expanded.push_input(line);
        }

        let mut jobs = Vec::with_capacity(expanded.files.len() + expanded.magnets.len());
        for path in &expanded.files {
            match tokio::fs::read(path).await {
                Ok(bytes) => match Metainfo::from_bytes(&bytes) {
                    Ok(info) => jobs.push(AddJob::metainfo(info)),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "torrent file dropped");
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "torrent file unreadable");
                }
            }
        }
        for uri in &expanded.magnets {
            match MagnetLink::parse(uri) {
                Ok(link) => jobs.push(AddJob::magnet(link)),
                Err(err) => warn!(uri = %uri, error = %err, "magnet link dropped"),
            }
        }
        jobs
    }

    fn push_input(&mut self, input: &str) {
        if input.is_empty() {
            return;
        }
        if input
            .get(..MAGNET_SCHEME.len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(MAGNET_SCHEME))
        {
            self.magnets.push(input.to_string());
        } else {
            self.files.push(PathBuf::from(input));
        }
    }

    fn paste_lines(&self) -> impl Iterator<Item = &str> {
        self.paste
            .as_deref()
            .into_iter()
            .flat_map(str::lines)
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Apply defaults and label matching to one descriptor.
#[must_use]
pub fn prepare(mut job: AddJob, policy: &AdmissionPolicy, labels: &[Label]) -> AddJob {
    job.options.save_path = Some(policy.default_save_path.clone());
    job.options.duplicate_policy = DuplicatePolicy::Reject;
    job.options.label_id = None;

    let Some(candidate) = job.candidate_name() else {
        debug!(job_id = %job.id(), "no name to match labels against");
        return job;
    };
    if let Some(hit) = match_label(candidate, labels) {
        debug!(job_id = %job.id(), label_id = %hit.label_id, "label matched");
        job.options.label_id = Some(hit.label_id);
        if let Some(path) = hit.save_path {
            job.options.save_path = Some(path);
        }
    }
    job
}

/// Admission pipeline and the set of open confirmation surfaces.
pub struct Admission {
    engine: Arc<dyn TransferEngine>,
    confirmations: Arc<dyn ConfirmationHost>,
    metrics: Metrics,
    surfaces: HashMap<SurfaceId, Box<dyn ConfirmationSurface>>,
}

impl Admission {
    /// Build the pipeline.
    #[must_use]
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        confirmations: Arc<dyn ConfirmationHost>,
        metrics: Metrics,
    ) -> Self {
        Self {
            engine,
            confirmations,
            metrics,
            surfaces: HashMap::new(),
        }
    }

    /// Number of open confirmation surfaces.
    #[must_use]
    pub fn open_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Load `request` and admit whatever parses.
    pub async fn admit_request(
        &mut self,
        request: AdmissionRequest,
        policy: &AdmissionPolicy,
        labels: &[Label],
        list: &mut ListModel,
    ) {
        let inputs = request.len();
        let descriptors = request.load().await;
        for _ in descriptors.len()..inputs {
            self.metrics.inc_dropped("malformed_input");
        }
        self.admit(descriptors, policy, labels, list).await;
    }

    /// Prepare `descriptors` and submit them or open a surface for each.
    pub async fn admit(
        &mut self,
        descriptors: Vec<AddJob>,
        policy: &AdmissionPolicy,
        labels: &[Label],
        list: &mut ListModel,
    ) {
        if descriptors.is_empty() {
            return;
        }
        let prepared: Vec<AddJob> = descriptors
            .into_iter()
            .map(|job| prepare(job, policy, labels))
            .collect();
        let pending: Vec<JobId> = prepared
            .iter()
            .filter(|job| job.needs_metadata())
            .map(AddJob::id)
            .collect();

        if policy.skip_confirmation {
            for job in prepared {
                self.submit(job, list).await;
            }
            return;
        }

        for job in &prepared {
            let id = SurfaceId::new();
            let surface = self.confirmations.open(id, job);
            debug!(surface = %id, job_id = %job.id(), "confirmation surface opened");
            self.surfaces.insert(id, surface);
        }
        if !pending.is_empty()
            && let Err(err) = self.engine.request_metadata_search(pending).await
        {
            warn!(error = %err, "metadata search request failed");
        }
    }

    /// Submit the descriptor confirmed on `surface` and close the surface.
    ///
    /// Returns `false` when `surface` is not open.
    pub async fn confirm(&mut self, surface: SurfaceId, job: AddJob, list: &mut ListModel) -> bool {
        let Some(open) = self.surfaces.remove(&surface) else {
            warn!(surface = %surface, job_id = %job.id(), "submission from unknown surface dropped");
            self.metrics.inc_dropped("unknown_surface");
            return false;
        };
        open.close();
        self.submit(job, list).await;
        true
    }

    /// Close `surface` without submitting anything.
    pub fn cancel(&mut self, surface: SurfaceId) -> bool {
        match self.surfaces.remove(&surface) {
            Some(open) => {
                open.close();
                debug!(surface = %surface, "confirmation surface cancelled");
                true
            }
            None => {
                debug!(surface = %surface, "cancel for unknown surface ignored");
                false
            }
        }
    }

    /// Close every open surface.
    pub fn close_all(&mut self) {
        for (_, surface) in self.surfaces.drain() {
            surface.close();
        }
    }

    /// Hand resolved metadata to every open surface.
    pub fn broadcast_metadata(&self, id: JobId, metadata: &JobMetadata) {
        for surface in self.surfaces.values() {
            surface.metadata_found(id, metadata);
        }
    }

    async fn submit(&self, job: AddJob, list: &mut ListModel) {
        let id = job.id();
        let tag = JobTag {
            label_id: job.options.label_id,
        };
        match self.engine.submit(job).await {
            Ok(()) => {
                list.record_submission(id, tag);
                self.metrics.inc_admitted();
                info!(job_id = %id, "job submitted");
            }
            Err(err) => warn!(job_id = %id, error = %err, "job submission failed"),
        }
    }
}
