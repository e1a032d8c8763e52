//! Validation helpers and parsing utilities for settings values.

#![allow(clippy::redundant_pub_crate)]

use crate::error::{ConfigError, ConfigResult};
use crate::model::{LabelDraft, ShellSettings};

pub(crate) fn validate_label(draft: &LabelDraft) -> ConfigResult<()> {
    if draft.name.trim().is_empty() {
        return Err(ConfigError::invalid("label", "name", None, "empty"));
    }
    if !is_hex_color(&draft.color) {
        return Err(ConfigError::invalid(
            "label",
            "color",
            Some(draft.color.clone()),
            "expected_hex_rgb",
        ));
    }
    Ok(())
}

pub(crate) fn validate_settings(settings: &ShellSettings) -> ConfigResult<()> {
    if settings.pause_on_low_disk_space_limit > 100 {
        return Err(ConfigError::invalid(
            "shell",
            "pause_on_low_disk_space_limit",
            Some(settings.pause_on_low_disk_space_limit.to_string()),
            "out_of_range",
        ));
    }
    if settings.default_save_path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(
            "shell",
            "default_save_path",
            None,
            "empty",
        ));
    }
    Ok(())
}

pub(crate) fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            "env",
            field,
            Some(value.to_string()),
            "expected_bool",
        )),
    }
}

pub(crate) fn parse_percent(field: &'static str, value: &str) -> ConfigResult<u8> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|percent| *percent <= 100)
        .ok_or_else(|| {
            ConfigError::invalid("env", field, Some(value.to_string()), "expected_percent")
        })
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|digits| digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()))
}
