//! Error types for transfer job parsing and engine operations.

use std::error::Error;

use seedling_events::JobId;
use thiserror::Error;

/// Primary error type for transfer job operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Magnet URI could not be interpreted.
    #[error("invalid magnet link")]
    InvalidMagnet {
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Metainfo payload could not be interpreted.
    #[error("invalid metainfo")]
    InvalidMetainfo {
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Byte offset where decoding stopped, when known.
        offset: Option<usize>,
    },
    /// Operation is not supported by the underlying engine.
    #[error("transfer operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Operation failed in the underlying engine.
    #[error("transfer operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Job identifier when available.
        job_id: Option<JobId>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Job was not found.
    #[error("transfer job not found")]
    NotFound {
        /// Missing job identifier.
        job_id: JobId,
    },
}

impl TorrentError {
    pub(crate) const fn magnet(reason: &'static str) -> Self {
        Self::InvalidMagnet { reason }
    }

    pub(crate) const fn metainfo(reason: &'static str, offset: Option<usize>) -> Self {
        Self::InvalidMetainfo { reason, offset }
    }
}

/// Convenience alias for transfer job results.
pub type TorrentResult<T> = Result<T, TorrentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_constant() {
        assert_eq!(
            TorrentError::magnet("missing_info_hash").to_string(),
            "invalid magnet link"
        );
        assert_eq!(
            TorrentError::metainfo("truncated", Some(3)).to_string(),
            "invalid metainfo"
        );
    }
}
