use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("core error: {0}")]
    Core(#[from] ledgermerge_core::CoreError),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("store unavailable after {attempts} attempt(s): {reason}")]
    Unavailable { attempts: u32, reason: String },
}
