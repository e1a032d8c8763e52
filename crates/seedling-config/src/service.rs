//! In-memory settings store with change notification.
//!
//! # Design
//! - Label ids are assigned monotonically from 1 and never handed out twice.
//! - Every mutation bumps the revision and publishes a full snapshot through
//!   a `watch` channel; consumers never observe partial updates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seedling_events::LabelId;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Label, LabelDraft, SettingsSnapshot, ShellSettings};
use crate::validate::{validate_label, validate_settings};

/// Shared settings service; clones operate on the same state.
#[derive(Clone)]
pub struct SettingsService {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    publisher: watch::Sender<SettingsSnapshot>,
}

struct State {
    next_label_id: u32,
    snapshot: SettingsSnapshot,
}

impl SettingsService {
    /// Construct a service seeded with `settings` and no labels.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when `settings` fail validation.
    pub fn new(settings: ShellSettings) -> ConfigResult<Self> {
        validate_settings(&settings)?;
        let snapshot = SettingsSnapshot {
            revision: 1,
            settings,
            labels: Vec::new(),
        };
        let (publisher, _) = watch::channel(snapshot.clone());
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    next_label_id: 1,
                    snapshot,
                }),
                publisher,
            }),
        })
    }

    /// Current settings and labels.
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.lock().snapshot.clone()
    }

    /// Subscribe to future snapshots.
    #[must_use]
    pub fn watch(&self) -> SettingsWatcher {
        SettingsWatcher {
            receiver: self.inner.publisher.subscribe(),
        }
    }

    /// Replace the shell settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when `settings` fail validation.
    pub fn update_settings(&self, settings: ShellSettings) -> ConfigResult<()> {
        validate_settings(&settings)?;
        self.mutate(|state| {
            state.snapshot.settings = settings;
            Ok(())
        })
    }

    /// Append a new label.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for an invalid draft or
    /// [`ConfigError::LabelIdsExhausted`] once the id space is used up.
    pub fn create_label(&self, draft: LabelDraft) -> ConfigResult<Label> {
        validate_label(&draft)?;
        let label = self.mutate(|state| {
            let id = LabelId::new(state.next_label_id).ok_or(ConfigError::LabelIdsExhausted)?;
            state.next_label_id = state
                .next_label_id
                .checked_add(1)
                .ok_or(ConfigError::LabelIdsExhausted)?;
            let label = draft.into_label(id);
            state.snapshot.labels.push(label.clone());
            Ok(label)
        })?;
        info!(label_id = %label.id, name = %label.name, "label created");
        Ok(label)
    }

    /// Replace the fields of an existing label, keeping its id and position.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownLabel`] when `id` does not exist.
    pub fn update_label(&self, id: LabelId, draft: LabelDraft) -> ConfigResult<Label> {
        validate_label(&draft)?;
        let label = self.mutate(|state| {
            let slot = state
                .snapshot
                .labels
                .iter_mut()
                .find(|label| label.id == id)
                .ok_or(ConfigError::UnknownLabel { id })?;
            *slot = draft.into_label(id);
            Ok(slot.clone())
        })?;
        debug!(label_id = %id, "label updated");
        Ok(label)
    }

    /// Delete a label. Its id is not reused.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownLabel`] when `id` does not exist.
    pub fn delete_label(&self, id: LabelId) -> ConfigResult<Label> {
        let removed = self.mutate(|state| {
            let index = state
                .snapshot
                .labels
                .iter()
                .position(|label| label.id == id)
                .ok_or(ConfigError::UnknownLabel { id })?;
            Ok(state.snapshot.labels.remove(index))
        })?;
        info!(label_id = %id, name = %removed.name, "label deleted");
        Ok(removed)
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut State) -> ConfigResult<T>) -> ConfigResult<T> {
        let mut state = self.lock();
        let output = apply(&mut state)?;
        state.snapshot.revision = state.snapshot.revision.saturating_add(1);
        let snapshot = state.snapshot.clone();
        drop(state);
        self.inner.publisher.send_replace(snapshot);
        Ok(output)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receives settings snapshots as they change.
pub struct SettingsWatcher {
    receiver: watch::Receiver<SettingsSnapshot>,
}

impl SettingsWatcher {
    /// Await the next snapshot published after the last one observed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WatchClosed`] once the service has been dropped.
    pub async fn next(&mut self) -> ConfigResult<SettingsSnapshot> {
        self.receiver
            .changed()
            .await
            .map_err(|_| ConfigError::WatchClosed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Latest snapshot without waiting.
    #[must_use]
    pub fn current(&self) -> SettingsSnapshot {
        self.receiver.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> LabelDraft {
        LabelDraft {
            name: name.into(),
            color: "#112233".into(),
            ..LabelDraft::default()
        }
    }

    #[test]
    fn label_ids_are_monotonic_and_never_reused() -> anyhow::Result<()> {
        let service = SettingsService::new(ShellSettings::default())?;
        let first = service.create_label(draft("Linux"))?;
        let second = service.create_label(draft("Video"))?;
        assert_eq!(first.id.get(), 1);
        assert_eq!(second.id.get(), 2);

        service.delete_label(second.id)?;
        let third = service.create_label(draft("Music"))?;
        assert_eq!(third.id.get(), 3);

        let names: Vec<_> = service
            .snapshot()
            .labels
            .into_iter()
            .map(|label| label.name)
            .collect();
        assert_eq!(names, vec!["Linux", "Music"]);
        Ok(())
    }

    #[test]
    fn update_keeps_position_and_rejects_unknown_ids() -> anyhow::Result<()> {
        let service = SettingsService::new(ShellSettings::default())?;
        let linux = service.create_label(draft("Linux"))?;
        service.create_label(draft("Video"))?;

        let renamed = service.update_label(linux.id, draft("Distros"))?;
        assert_eq!(renamed.id, linux.id);
        assert_eq!(service.snapshot().labels[0].name, "Distros");

        let missing = LabelId::new(99).expect("label id");
        assert!(matches!(
            service.update_label(missing, draft("x")),
            Err(ConfigError::UnknownLabel { .. })
        ));
        assert!(matches!(
            service.delete_label(missing),
            Err(ConfigError::UnknownLabel { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn watchers_observe_each_change() -> anyhow::Result<()> {
        let service = SettingsService::new(ShellSettings::default())?;
        let mut watcher = service.watch();
        let initial = watcher.current().revision;

        service.create_label(draft("Linux"))?;
        let snapshot = watcher.next().await?;
        assert_eq!(snapshot.revision, initial + 1);
        assert_eq!(snapshot.labels.len(), 1);

        let mut settings = snapshot.settings.clone();
        settings.skip_add_torrent_dialog = true;
        service.update_settings(settings)?;
        let snapshot = watcher.next().await?;
        assert!(snapshot.settings.skip_add_torrent_dialog);
        Ok(())
    }

    #[tokio::test]
    async fn watcher_reports_closed_service() -> anyhow::Result<()> {
        let service = SettingsService::new(ShellSettings::default())?;
        let mut watcher = service.watch();
        drop(service);
        assert!(matches!(watcher.next().await, Err(ConfigError::WatchClosed)));
        Ok(())
    }
}
