//! Uploaded snapshots waiting for confirmation, one temp file per upload.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use ledgermerge_core::UploadToken;

use crate::error::EngineError;

/// A snapshot written to disk under its upload token. The file is removed
/// when this value is dropped or discarded.
#[derive(Debug)]
pub struct StagedSnapshot {
    token: UploadToken,
    file: NamedTempFile,
    size: u64,
    digest: blake3::Hash,
}

impl StagedSnapshot {
    pub fn token(&self) -> UploadToken {
        self.token
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn digest(&self) -> &blake3::Hash {
        &self.digest
    }

    /// Delete the temp file now, logging rather than failing if that is not possible.
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(token = %self.token, path = %path.display(), error = %e, "failed to remove staged snapshot");
        } else {
            debug!(token = %self.token, "staged snapshot removed");
        }
    }
}

/// Uploads kept waiting for confirmation before the oldest is evicted.
pub const DEFAULT_MAX_STAGED: usize = 8;

/// Result of `StagingArea::stage`: the new token plus any older uploads that
/// were evicted to make room for it.
#[derive(Debug)]
pub struct Staged {
    pub token: UploadToken,
    pub evicted: Vec<UploadToken>,
}

/// Staged snapshots in upload order, oldest first.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    max_bytes: u64,
    max_entries: usize,
    entries: VecDeque<StagedSnapshot>,
}

impl StagingArea {
    /// Use `dir` for staged files, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Result<Self, EngineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_bytes,
            max_entries: DEFAULT_MAX_STAGED,
            entries: VecDeque::new(),
        })
    }

    /// Keep at most `max_entries` uploads staged. Zero is treated as one.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Write `bytes` to a fresh temp file and register it under a new token.
    /// When the area is full the oldest uploads are discarded first.
    pub fn stage(&mut self, bytes: &[u8]) -> Result<Staged, EngineError> {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(EngineError::SnapshotTooLarge {
                size,
                max: self.max_bytes,
            });
        }

        let mut file = tempfile::Builder::new()
            .prefix("snapshot-")
            .suffix(".db")
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let mut evicted = Vec::new();
        while self.entries.len() >= self.max_entries {
            let Some(oldest) = self.entries.pop_front() else {
                break;
            };
            warn!(token = %oldest.token, "staging area full, evicting oldest upload");
            evicted.push(oldest.token);
            oldest.discard();
        }

        let token = UploadToken::new();
        let digest = blake3::hash(bytes);
        debug!(%token, size, digest = %digest.to_hex(), path = %file.path().display(), "snapshot staged");
        self.entries.push_back(StagedSnapshot {
            token,
            file,
            size,
            digest,
        });
        Ok(Staged { token, evicted })
    }

    fn position(&self, token: &UploadToken) -> Option<usize> {
        self.entries.iter().position(|s| s.token == *token)
    }

    pub fn get(&self, token: &UploadToken) -> Option<&StagedSnapshot> {
        self.entries.iter().find(|s| s.token == *token)
    }

    /// Remove the entry from the area and hand it to the caller.
    pub fn take(&mut self, token: &UploadToken) -> Option<StagedSnapshot> {
        let idx = self.position(token)?;
        self.entries.remove(idx)
    }

    /// Remove and delete the entry. Returns whether one existed.
    pub fn discard(&mut self, token: &UploadToken) -> bool {
        match self.take(token) {
            Some(staged) => {
                staged.discard();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, token: &UploadToken) -> bool {
        self.position(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
