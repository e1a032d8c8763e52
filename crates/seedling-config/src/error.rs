//! Error types for configuration operations.

use seedling_events::LabelId;
use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Referenced label does not exist.
    #[error("unknown label")]
    UnknownLabel {
        /// Label identifier that was not found.
        id: LabelId,
    },
    /// The label id space has been used up for this process.
    #[error("label identifiers exhausted")]
    LabelIdsExhausted,
    /// The settings publisher has been dropped.
    #[error("settings watch closed")]
    WatchClosed,
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
