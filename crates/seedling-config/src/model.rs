//! Typed settings and label models.

use std::path::{Path, PathBuf};

use seedling_events::LabelId;
use serde::{Deserialize, Serialize};

use crate::defaults;

/// User-defined label used for classification and auto-configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Stable identifier, never reused within a process.
    pub id: LabelId,
    /// Display name.
    pub name: String,
    /// Display color as `#rrggbb`.
    pub color: String,
    /// Destination override applied when the label is assigned at admission.
    pub save_path: Option<PathBuf>,
    /// Whether `save_path` is in effect.
    pub save_path_enabled: bool,
    /// Pattern searched (case-insensitively) in candidate job names.
    pub apply_filter: Option<String>,
    /// Whether `apply_filter` is in effect.
    pub apply_filter_enabled: bool,
}

impl Label {
    /// Save-path override, only when enabled and non-empty.
    #[must_use]
    pub fn active_save_path(&self) -> Option<&Path> {
        self.save_path
            .as_deref()
            .filter(|path| self.save_path_enabled && !path.as_os_str().is_empty())
    }

    /// Auto-match pattern, only when enabled and non-empty.
    #[must_use]
    pub fn active_pattern(&self) -> Option<&str> {
        self.apply_filter
            .as_deref()
            .filter(|pattern| self.apply_filter_enabled && !pattern.is_empty())
    }
}

/// Label fields supplied on create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDraft {
    /// Display name.
    pub name: String,
    /// Display color as `#rrggbb`.
    pub color: String,
    /// Destination override.
    pub save_path: Option<PathBuf>,
    /// Whether `save_path` is in effect.
    pub save_path_enabled: bool,
    /// Auto-match pattern.
    pub apply_filter: Option<String>,
    /// Whether `apply_filter` is in effect.
    pub apply_filter_enabled: bool,
}

impl LabelDraft {
    pub(crate) fn into_label(self, id: LabelId) -> Label {
        Label {
            id,
            name: self.name,
            color: self.color,
            save_path: self.save_path,
            save_path_enabled: self.save_path_enabled,
            apply_filter: self.apply_filter,
            apply_filter_enabled: self.apply_filter_enabled,
        }
    }
}

/// Shell behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Destination applied to every admitted job before label overrides.
    pub default_save_path: PathBuf,
    /// Submit admitted jobs directly instead of opening confirmation surfaces.
    pub skip_add_torrent_dialog: bool,
    /// Pause jobs whose destination volume runs low on space.
    pub pause_on_low_disk_space: bool,
    /// Free-space percentage that triggers the pause.
    pub pause_on_low_disk_space_limit: u8,
    /// Whether the engine runs the DHT; drives the status surface node count.
    pub enable_dht: bool,
    /// Tint list rows with their label color.
    pub use_label_as_list_bgcolor: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            default_save_path: defaults::save_path(),
            skip_add_torrent_dialog: false,
            pause_on_low_disk_space: false,
            pause_on_low_disk_space_limit: defaults::LOW_DISK_LIMIT_PERCENT,
            enable_dht: true,
            use_label_as_list_bgcolor: false,
        }
    }
}

/// Immutable view of settings and labels published to watchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// Incremented on every change.
    pub revision: u64,
    /// Shell settings.
    pub settings: ShellSettings,
    /// Labels in display order.
    pub labels: Vec<Label>,
}

impl SettingsSnapshot {
    /// Find a label by id.
    #[must_use]
    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.iter().find(|label| label.id == id)
    }
}
