//! Default values for shell settings.

#![allow(clippy::redundant_pub_crate)]

use std::path::PathBuf;

/// Free-space percentage below which jobs are paused.
pub(crate) const LOW_DISK_LIMIT_PERCENT: u8 = 5;

/// Download directory used when nothing else is configured.
pub(crate) fn save_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map_or_else(|| PathBuf::from("."), |home| home.join("Downloads"))
}
