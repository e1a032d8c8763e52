//! Selected jobs and detail-view refresh.

use std::collections::HashMap;

use seedling_events::{JobHandle, JobId, JobSnapshot};
use tracing::debug;

use crate::host::DetailView;
use crate::list_model::ListModel;

/// Jobs currently selected in the list, in row order.
///
/// Every entry is a member of the [`ListModel`] active set.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    entries: Vec<(JobId, JobHandle)>,
    index: HashMap<JobId, JobHandle>,
}

impl SelectionTracker {
    /// Selected identities in row order.
    pub fn ids(&self) -> impl Iterator<Item = &JobId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Engine handle of a selected job.
    #[must_use]
    pub fn handle(&self, id: &JobId) -> Option<JobHandle> {
        self.index.get(id).copied()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &JobId) -> bool {
        self.handle(id).is_some()
    }

    /// Number of selected jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the selection with the jobs shown at visible `rows`.
    ///
    /// Rows outside the visible range are dropped.
    pub fn selection_changed(&mut self, rows: &[usize], list: &ListModel, detail: &dyn DetailView) {
        self.entries.clear();
        self.index.clear();
        let visible = list.visible_ids();
        for &row in rows {
            let Some(&id) = visible.get(row) else {
                debug!(row, "selection row out of range");
                continue;
            };
            if self.index.contains_key(&id) {
                continue;
            }
            if let Some(handle) = list.lookup(&id) {
                self.index.insert(id, handle);
                self.entries.push((id, handle));
            }
        }

        if self.entries.is_empty() {
            detail.reset();
            return;
        }
        let snapshots: Vec<JobSnapshot> = self.ids().filter_map(|id| list.snapshot(id)).collect();
        detail.refresh(&snapshots);
    }

    /// Select every visible row.
    pub fn select_all(&mut self, list: &ListModel, detail: &dyn DetailView) {
        let rows: Vec<usize> = (0..list.visible_ids().len()).collect();
        self.selection_changed(&rows, list, detail);
    }

    /// Drop `id` after it left the active set, resetting the detail view if
    /// it was selected.
    pub(crate) fn job_removed(&mut self, id: &JobId, detail: &dyn DetailView) -> bool {
        if self.index.remove(id).is_none() {
            return false;
        }
        self.entries.retain(|(entry, _)| entry != id);
        detail.reset();
        true
    }

    /// Refresh the detail view with the selected part of `batch`.
    pub(crate) fn batch_folded(&self, batch: &[JobSnapshot], list: &ListModel, detail: &dyn DetailView) {
        let selected: Vec<JobSnapshot> = batch
            .iter()
            .filter(|snapshot| self.contains(&snapshot.id))
            .filter_map(|snapshot| list.snapshot(&snapshot.id))
            .collect();
        if !selected.is_empty() {
            detail.refresh(&selected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedling_events::{JobState, TransferRates};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingDetail {
        calls: Mutex<Vec<Option<Vec<JobId>>>>,
    }

    impl RecordingDetail {
        fn calls(&self) -> Vec<Option<Vec<JobId>>> {
            self.calls.lock().expect("lock").clone()
        }
    }

    impl DetailView for RecordingDetail {
        fn refresh(&self, jobs: &[JobSnapshot]) {
            self.calls
                .lock()
                .expect("lock")
                .push(Some(jobs.iter().map(|job| job.id).collect()));
        }

        fn reset(&self) {
            self.calls.lock().expect("lock").push(None);
        }
    }

    fn id(byte: u8) -> JobId {
        JobId::from_v1([byte; 20]).expect("identity")
    }

    fn snapshot(byte: u8) -> JobSnapshot {
        JobSnapshot {
            id: id(byte),
            name: format!("job-{byte}"),
            save_path: PathBuf::from("/data"),
            state: JobState::Downloading,
            rates: TransferRates::default(),
            progress: 0.5,
            paused: false,
            total_wanted: 10,
            total_wanted_done: 5,
            label_id: None,
        }
    }

    fn list(bytes: &[u8]) -> ListModel {
        let mut list = ListModel::default();
        for &byte in bytes {
            list.insert(id(byte), JobHandle(u64::from(byte)), snapshot(byte));
        }
        list
    }

    #[test]
    fn selection_is_replaced_and_out_of_range_rows_dropped() {
        let list = list(&[1, 2, 3]);
        let detail = RecordingDetail::default();
        let mut tracker = SelectionTracker::default();

        tracker.selection_changed(&[0, 2, 7], &list, &detail);
        assert_eq!(tracker.ids().copied().collect::<Vec<_>>(), vec![id(1), id(3)]);

        tracker.selection_changed(&[1, 1], &list, &detail);
        assert_eq!(tracker.ids().copied().collect::<Vec<_>>(), vec![id(2)]);
        assert_eq!(tracker.handle(&id(2)), Some(JobHandle(2)));

        tracker.selection_changed(&[], &list, &detail);
        assert!(tracker.is_empty());
        assert_eq!(
            detail.calls(),
            vec![Some(vec![id(1), id(3)]), Some(vec![id(2)]), None]
        );
    }

    #[test]
    fn select_all_covers_visible_rows() {
        let list = list(&[1, 2]);
        let detail = RecordingDetail::default();
        let mut tracker = SelectionTracker::default();
        tracker.select_all(&list, &detail);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn select_all_scales_to_thousands_of_jobs() {
        let mut list = ListModel::default();
        for raw in 0..5_000_u32 {
            let mut digest = [1_u8; 20];
            digest[..4].copy_from_slice(&raw.to_be_bytes());
            let job_id = JobId::from_v1(digest).expect("identity");
            let mut job = snapshot(1);
            job.id = job_id;
            list.insert(job_id, JobHandle(u64::from(raw)), job);
        }
        list.set_filter(crate::list_model::JobFilter::downloading());
        let detail = RecordingDetail::default();
        let mut tracker = SelectionTracker::default();

        let started = Instant::now();
        tracker.select_all(&list, &detail);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(tracker.len(), 5_000);
        assert_eq!(
            detail.calls().last().and_then(Option::as_ref).map(Vec::len),
            Some(5_000)
        );
        assert_eq!(tracker.ids().next(), list.visible_ids().first());
    }

    #[test]
    fn batches_refresh_only_the_selected_subset() {
        let list = list(&[1, 2, 3]);
        let detail = RecordingDetail::default();
        let mut tracker = SelectionTracker::default();
        tracker.selection_changed(&[1], &list, &detail);

        tracker.batch_folded(&[snapshot(1), snapshot(2)], &list, &detail);
        tracker.batch_folded(&[snapshot(3)], &list, &detail);
        assert_eq!(
            detail.calls(),
            vec![Some(vec![id(2)]), Some(vec![id(2)])]
        );
    }

    #[test]
    fn removing_a_selected_job_resets_the_detail_view() {
        let list = list(&[1, 2]);
        let detail = RecordingDetail::default();
        let mut tracker = SelectionTracker::default();
        tracker.selection_changed(&[0], &list, &detail);

        assert!(!tracker.job_removed(&id(2), &detail));
        assert!(tracker.job_removed(&id(1), &detail));
        assert!(tracker.is_empty());
        assert_eq!(detail.calls(), vec![Some(vec![id(1)]), None]);
    }
}
