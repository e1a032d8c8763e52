//! Environment overrides for shell settings.

use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::model::ShellSettings;
use crate::validate::{parse_flag, parse_percent, validate_settings};

const ENV_SAVE_PATH: &str = "SEEDLING_DEFAULT_SAVE_PATH";
const ENV_SKIP_DIALOG: &str = "SEEDLING_SKIP_ADD_DIALOG";
const ENV_PAUSE_LOW_DISK: &str = "SEEDLING_PAUSE_ON_LOW_DISK";
const ENV_LOW_DISK_LIMIT: &str = "SEEDLING_LOW_DISK_LIMIT";
const ENV_ENABLE_DHT: &str = "SEEDLING_ENABLE_DHT";

impl ShellSettings {
    /// Defaults overlaid with `SEEDLING_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] when a variable cannot be parsed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values produced by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] when a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(path) = lookup(ENV_SAVE_PATH).filter(|value| !value.trim().is_empty()) {
            settings.default_save_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_SKIP_DIALOG) {
            settings.skip_add_torrent_dialog = parse_flag(ENV_SKIP_DIALOG, &value)?;
        }
        if let Some(value) = lookup(ENV_PAUSE_LOW_DISK) {
            settings.pause_on_low_disk_space = parse_flag(ENV_PAUSE_LOW_DISK, &value)?;
        }
        if let Some(value) = lookup(ENV_LOW_DISK_LIMIT) {
            settings.pause_on_low_disk_space_limit = parse_percent(ENV_LOW_DISK_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_ENABLE_DHT) {
            settings.enable_dht = parse_flag(ENV_ENABLE_DHT, &value)?;
        }
        validate_settings(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() -> anyhow::Result<()> {
        let settings = ShellSettings::from_lookup(lookup(&[
            ("SEEDLING_DEFAULT_SAVE_PATH", "/data/downloads"),
            ("SEEDLING_SKIP_ADD_DIALOG", "true"),
            ("SEEDLING_PAUSE_ON_LOW_DISK", "1"),
            ("SEEDLING_LOW_DISK_LIMIT", "12"),
            ("SEEDLING_ENABLE_DHT", "no"),
        ]))?;
        assert_eq!(settings.default_save_path, PathBuf::from("/data/downloads"));
        assert!(settings.skip_add_torrent_dialog);
        assert!(settings.pause_on_low_disk_space);
        assert_eq!(settings.pause_on_low_disk_space_limit, 12);
        assert!(!settings.enable_dht);
        Ok(())
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = ShellSettings::from_lookup(lookup(&[("SEEDLING_LOW_DISK_LIMIT", "lots")]))
            .expect_err("invalid percent");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "SEEDLING_LOW_DISK_LIMIT",
                ..
            }
        ));
    }
}
