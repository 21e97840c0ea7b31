use ledgermerge_core::UploadToken;
use ledgermerge_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("no staged snapshot for upload {0}")]
    NoStagedSnapshot(UploadToken),

    #[error("merge aborted, nothing was written: {0}")]
    MergeFailure(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("snapshot of {size} bytes exceeds the {max} byte limit")]
    SnapshotTooLarge { size: u64, max: u64 },

    #[error("staging error: {0}")]
    Staging(#[from] std::io::Error),
}

impl EngineError {
    /// Classify a failure that happened while reading the snapshot or the store.
    pub(crate) fn on_read(err: StorageError) -> Self {
        match err {
            StorageError::InvalidSnapshot(msg) => Self::InvalidSnapshot(msg),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }

    /// Classify a failure inside the merge transaction.
    pub(crate) fn on_write(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable { .. } => Self::StoreUnavailable(err.to_string()),
            other => Self::MergeFailure(other.to_string()),
        }
    }
}
