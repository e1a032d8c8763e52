//! Label auto-matching and the job tag side table.

use std::collections::HashMap;
use std::path::PathBuf;

use regex::RegexBuilder;
use seedling_config::Label;
use seedling_events::{JobId, LabelId};
use tracing::debug;

const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Outcome of a successful label match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatch {
    /// Matched label.
    pub label_id: LabelId,
    /// Destination override carried by the label, when enabled.
    pub save_path: Option<PathBuf>,
}

/// Find the first label whose enabled pattern occurs in `candidate`.
///
/// Patterns are compiled on every call and searched case-insensitively. A
/// pattern that fails to compile leaves its label out of the running.
#[must_use]
pub fn match_label(candidate: &str, labels: &[Label]) -> Option<LabelMatch> {
    labels.iter().find_map(|label| {
        let pattern = label.active_pattern()?;
        let regex = match RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => regex,
            Err(err) => {
                debug!(label_id = %label.id, error = %err, "label pattern rejected");
                return None;
            }
        };
        regex.is_match(candidate).then(|| LabelMatch {
            label_id: label.id,
            save_path: label.active_save_path().map(PathBuf::from),
        })
    })
}

/// Application-private metadata kept per job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobTag {
    /// Label assigned at admission or later by the user.
    pub label_id: Option<LabelId>,
}

/// Side table from job identity to [`JobTag`].
#[derive(Debug, Default)]
pub struct JobTags {
    tags: HashMap<JobId, JobTag>,
}

impl JobTags {
    /// Tag for `id`, if recorded.
    #[must_use]
    pub fn get(&self, id: &JobId) -> Option<JobTag> {
        self.tags.get(id).copied()
    }

    /// Label for `id`, if any.
    #[must_use]
    pub fn label_of(&self, id: &JobId) -> Option<LabelId> {
        self.get(id).and_then(|tag| tag.label_id)
    }

    pub(crate) fn insert(&mut self, id: JobId, tag: JobTag) {
        self.tags.insert(id, tag);
    }

    pub(crate) fn remove(&mut self, id: &JobId) -> Option<JobTag> {
        self.tags.remove(id)
    }

    /// Clear every reference to labels not in `known`.
    pub(crate) fn retain_labels(&mut self, known: &[Label]) {
        for tag in self.tags.values_mut() {
            if tag
                .label_id
                .is_some_and(|id| !known.iter().any(|label| label.id == id))
            {
                tag.label_id = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: u32, pattern: &str, save_path: Option<&str>, save_path_enabled: bool) -> Label {
        Label {
            id: LabelId::new(id).expect("label id"),
            name: format!("label-{id}"),
            color: "#000000".into(),
            save_path: save_path.map(PathBuf::from),
            save_path_enabled,
            apply_filter: Some(pattern.into()),
            apply_filter_enabled: true,
        }
    }

    #[test]
    fn first_matching_label_wins() {
        let labels = vec![
            label(1, "foo", None, false),
            label(2, "foobar", None, false),
        ];
        let hit = match_label("foobar-1.0", &labels).expect("match");
        assert_eq!(hit.label_id.get(), 1);
    }

    #[test]
    fn matching_is_a_case_insensitive_search() {
        let labels = vec![label(1, r"\.MKV$", None, false)];
        assert!(match_label("Show.S01E01.mkv", &labels).is_some());
        assert!(match_label("show.mkv.part", &labels).is_none());
    }

    #[test]
    fn save_path_only_returned_when_enabled() {
        let disabled = vec![label(1, "movie", Some("/videos"), false)];
        assert_eq!(match_label("movie.mkv", &disabled).expect("match").save_path, None);

        let enabled = vec![label(1, "movie", Some("/videos"), true)];
        assert_eq!(
            match_label("movie.mkv", &enabled).expect("match").save_path,
            Some(PathBuf::from("/videos"))
        );
    }

    #[test]
    fn disabled_empty_and_malformed_patterns_are_skipped() {
        let mut disabled = label(1, "movie", None, false);
        disabled.apply_filter_enabled = false;
        let empty = label(2, "", None, false);
        let malformed = label(3, "(unclosed", None, false);
        let fallback = label(4, "mov", None, false);
        let labels = vec![disabled, empty, malformed, fallback];
        assert_eq!(
            match_label("movie.mkv", &labels).map(|hit| hit.label_id.get()),
            Some(4)
        );
        assert!(match_label("movie.mkv", &[]).is_none());
    }

    #[test]
    fn retain_labels_drops_stale_references() {
        let kept = label(1, "a", None, false);
        let first = JobId::from_v1([1; 20]).expect("identity");
        let second = JobId::from_v1([2; 20]).expect("identity");
        let mut tags = JobTags::default();
        tags.insert(first, JobTag { label_id: Some(kept.id) });
        tags.insert(
            second,
            JobTag {
                label_id: LabelId::new(9),
            },
        );

        tags.retain_labels(&[kept.clone()]);
        assert_eq!(tags.label_of(&first), Some(kept.id));
        assert_eq!(tags.label_of(&second), None);
        assert!(tags.get(&second).is_some());
    }
}
