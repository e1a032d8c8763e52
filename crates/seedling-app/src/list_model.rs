//! Ordered, filterable view over the active job set.
//!
//! # Design
//! - The model owns the active set; only the event bridge mutates it.
//! - Visible rows are recomputed on every read, so filter and label changes
//!   take effect immediately.
//! - Labels are resolved from the tag side table on read and never stored in
//!   the active set.
//! - Tags for submitted jobs wait in a pending table until the engine reports
//!   the job as added; a submission the engine later rejects never tags
//!   anything.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use seedling_config::Label;
use seedling_events::{JobHandle, JobId, JobSnapshot, JobState, LabelId};
use tracing::{debug, warn};

use crate::labels::{JobTag, JobTags};

/// Entry of the active set.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    /// Engine handle.
    pub handle: JobHandle,
    /// Latest snapshot.
    pub snapshot: JobSnapshot,
}

type Predicate = Arc<dyn Fn(&JobSnapshot) -> bool + Send + Sync>;

/// Named predicate narrowing the visible rows.
#[derive(Clone)]
pub struct JobFilter {
    name: String,
    predicate: Predicate,
}

impl JobFilter {
    /// Build a filter from a predicate.
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&JobSnapshot) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Jobs still fetching data.
    #[must_use]
    pub fn downloading() -> Self {
        Self::new("downloading", |job| !job.paused && job.state.is_downloading())
    }

    /// Jobs uploading a complete payload.
    #[must_use]
    pub fn seeding() -> Self {
        Self::new("seeding", |job| !job.paused && job.state == JobState::Seeding)
    }

    /// Jobs paused by the user or by policy.
    #[must_use]
    pub fn paused() -> Self {
        Self::new("paused", |job| job.paused || job.state == JobState::Paused)
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `snapshot` passes the filter.
    #[must_use]
    pub fn matches(&self, snapshot: &JobSnapshot) -> bool {
        (self.predicate)(snapshot)
    }
}

impl Debug for JobFilter {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("JobFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Handle to a filter registered with [`ListModel::add_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(usize);

/// Label details shown on a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLabel {
    /// Label id.
    pub id: LabelId,
    /// Label name.
    pub name: String,
    /// Row tint, present only when label colors are enabled.
    pub color: Option<String>,
}

/// One visible row.
#[derive(Debug, Clone)]
pub struct VisibleRow<'a> {
    /// Engine handle.
    pub handle: JobHandle,
    /// Latest snapshot.
    pub snapshot: &'a JobSnapshot,
    /// Resolved label, if the job has one.
    pub label: Option<RowLabel>,
}

/// The active set plus the filter state applied to it.
#[derive(Debug, Default)]
pub struct ListModel {
    order: Vec<JobId>,
    jobs: HashMap<JobId, ActiveJob>,
    tags: JobTags,
    pending: JobTags,
    filters: Vec<JobFilter>,
    filter: Option<JobFilter>,
    label_filter: Option<LabelId>,
    labels: Vec<Label>,
    label_colors: bool,
}

impl ListModel {
    /// Number of jobs in the active set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the active set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `id` is in the active set.
    #[must_use]
    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    /// Engine handle for `id`.
    #[must_use]
    pub fn lookup(&self, id: &JobId) -> Option<JobHandle> {
        self.jobs.get(id).map(|job| job.handle)
    }

    /// Latest snapshot for `id` with its label resolved from the tag table.
    #[must_use]
    pub fn snapshot(&self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs.get(id).map(|job| {
            let mut snapshot = job.snapshot.clone();
            snapshot.label_id = self.tags.label_of(id);
            snapshot
        })
    }

    /// Identities in insertion order, ignoring filters.
    pub fn ids(&self) -> impl Iterator<Item = &JobId> {
        self.order.iter()
    }

    /// Tag side table.
    #[must_use]
    pub const fn tags(&self) -> &JobTags {
        &self.tags
    }

    /// Tag recorded at submission for a job the engine has not added yet.
    #[must_use]
    pub fn pending_tag(&self, id: &JobId) -> Option<JobTag> {
        self.pending.get(id)
    }

    /// Identities of the visible rows, in order.
    #[must_use]
    pub fn visible_ids(&self) -> Vec<JobId> {
        self.visible().map(|job| job.snapshot.id).collect()
    }

    /// Visible rows with resolved labels.
    #[must_use]
    pub fn rows(&self) -> Vec<VisibleRow<'_>> {
        self.visible()
            .map(|job| VisibleRow {
                handle: job.handle,
                snapshot: &job.snapshot,
                label: self.row_label(&job.snapshot.id),
            })
            .collect()
    }

    /// Identity displayed at visible `row`.
    #[must_use]
    pub fn row_to_identity(&self, row: usize) -> Option<JobId> {
        self.visible().nth(row).map(|job| job.snapshot.id)
    }

    /// Register a named filter for later selection.
    pub fn add_filter(&mut self, filter: JobFilter) -> FilterId {
        self.filters.push(filter);
        FilterId(self.filters.len() - 1)
    }

    /// Registered filters with their handles.
    pub fn filters(&self) -> impl Iterator<Item = (FilterId, &JobFilter)> {
        self.filters
            .iter()
            .enumerate()
            .map(|(index, filter)| (FilterId(index), filter))
    }

    /// Activate a registered filter; unknown handles are ignored.
    pub fn select_filter(&mut self, id: FilterId) -> bool {
        let Some(filter) = self.filters.get(id.0).cloned() else {
            warn!(filter = id.0, "unknown filter selected");
            return false;
        };
        self.set_filter(filter);
        true
    }

    /// Replace the predicate filter.
    pub fn set_filter(&mut self, filter: JobFilter) {
        debug!(filter = %filter.name, "list filter set");
        self.filter = Some(filter);
    }

    /// Remove the predicate filter.
    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Active predicate filter.
    #[must_use]
    pub const fn filter(&self) -> Option<&JobFilter> {
        self.filter.as_ref()
    }

    /// Show only jobs tagged with `label`.
    pub fn set_label_filter(&mut self, label: LabelId) {
        self.label_filter = Some(label);
    }

    /// Remove the label filter.
    pub fn clear_label_filter(&mut self) {
        self.label_filter = None;
    }

    /// Active label filter.
    #[must_use]
    pub const fn label_filter(&self) -> Option<LabelId> {
        self.label_filter
    }

    /// Tag jobs in the active set with `label`, or clear their label with `None`.
    ///
    /// Returns the number of jobs retagged; an unknown label retags nothing.
    pub fn assign_label(&mut self, ids: &[JobId], label: Option<LabelId>) -> usize {
        if let Some(label) = label
            && !self.labels.iter().any(|known| known.id == label)
        {
            warn!(label_id = %label, "label assignment rejected for unknown label");
            return 0;
        }
        let mut assigned = 0;
        for id in ids {
            if self.jobs.contains_key(id) {
                self.tags.insert(*id, JobTag { label_id: label });
                assigned += 1;
            } else {
                debug!(job_id = %id, "label assignment skipped for inactive job");
            }
        }
        assigned
    }

    /// Adopt a new label list.
    ///
    /// Tags and the label filter referring to labels that no longer exist
    /// are cleared.
    pub fn set_labels(&mut self, labels: Vec<Label>, label_colors: bool) {
        self.tags.retain_labels(&labels);
        self.pending.retain_labels(&labels);
        if let Some(filter) = self.label_filter
            && !labels.iter().any(|label| label.id == filter)
        {
            debug!(label_id = %filter, "label filter cleared after label deletion");
            self.label_filter = None;
        }
        self.labels = labels;
        self.label_colors = label_colors;
    }

    pub(crate) fn insert(&mut self, id: JobId, handle: JobHandle, snapshot: JobSnapshot) -> bool {
        if self.jobs.contains_key(&id) {
            return false;
        }
        if let Some(tag) = self.pending.remove(&id) {
            self.tags.insert(id, tag);
        }
        self.order.push(id);
        self.jobs.insert(id, ActiveJob { handle, snapshot });
        true
    }

    pub(crate) fn remove(&mut self, id: &JobId) -> bool {
        if self.jobs.remove(id).is_none() {
            return false;
        }
        self.order.retain(|entry| entry != id);
        self.tags.remove(id);
        true
    }

    pub(crate) fn replace(&mut self, snapshot: JobSnapshot) -> bool {
        match self.jobs.get_mut(&snapshot.id) {
            Some(job) => {
                job.snapshot = snapshot;
                true
            }
            None => false,
        }
    }

    /// Record the tag for a job handed to the engine.
    ///
    /// The tag takes effect when the job is added. Jobs already active keep
    /// their current tag; the engine will reject the resubmission.
    pub(crate) fn record_submission(&mut self, id: JobId, tag: JobTag) {
        if !self.jobs.contains_key(&id) {
            self.pending.insert(id, tag);
        }
    }

    fn visible(&self) -> impl Iterator<Item = &ActiveJob> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .filter(|job| {
                self.filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(&job.snapshot))
            })
            .filter(|job| {
                self.label_filter
                    .is_none_or(|label| self.tags.label_of(&job.snapshot.id) == Some(label))
            })
    }

    fn row_label(&self, id: &JobId) -> Option<RowLabel> {
        let label_id = self.tags.label_of(id)?;
        let label = self.labels.iter().find(|label| label.id == label_id)?;
        Some(RowLabel {
            id: label.id,
            name: label.name.clone(),
            color: self.label_colors.then(|| label.color.clone()),
        })
    }
}
