//! Upload, review, then confirm or cancel.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ledgermerge_core::UploadToken;
use ledgermerge_storage::LedgerStore;

use crate::diff::{DiffOptions, DiffReport, diff_snapshot};
use crate::error::EngineError;
use crate::merge::{MergeStats, merge_snapshot};
use crate::staging::{Staged, StagingArea};

/// Terminal outcomes kept for status queries.
const HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportState {
    Upload,
    DiffReady,
    Committed,
    Cancelled,
    Error,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "UPLOAD",
            Self::DiffReady => "DIFF_READY",
            Self::Committed => "COMMITTED",
            Self::Cancelled => "CANCELLED",
            Self::Error => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled | Self::Error)
    }

    pub fn can_transition_to(&self, next: ImportState) -> bool {
        matches!(
            (self, next),
            (Self::Upload, Self::DiffReady)
                | (Self::Upload, Self::Error)
                | (Self::DiffReady, Self::Committed)
                | (Self::DiffReady, Self::Cancelled)
                | (Self::DiffReady, Self::Error)
        )
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives snapshots through the import states. Every staged file is gone by
/// the time its token reaches a terminal state.
#[derive(Debug)]
pub struct Importer {
    staging: StagingArea,
    options: DiffOptions,
    history: VecDeque<(UploadToken, ImportState)>,
}

impl Importer {
    pub fn new(staging: StagingArea, options: DiffOptions) -> Self {
        Self {
            staging,
            options,
            history: VecDeque::new(),
        }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Stage `bytes` and diff them against `store`. On failure nothing stays
    /// staged. Uploads evicted to make room are recorded as cancelled.
    pub fn upload<S: LedgerStore>(
        &mut self,
        store: &S,
        bytes: &[u8],
    ) -> Result<(UploadToken, DiffReport), EngineError> {
        let Staged { token, evicted } = self.staging.stage(bytes)?;
        for old in evicted {
            info!(token = %old, "unconfirmed import evicted");
            self.finish(old, ImportState::DiffReady, ImportState::Cancelled);
        }
        let Some(staged) = self.staging.get(&token) else {
            return Err(EngineError::NoStagedSnapshot(token));
        };
        match diff_snapshot(store, staged.path(), &self.options) {
            Ok(report) => {
                info!(%token, size = bytes.len(), state = %ImportState::DiffReady, "snapshot ready for review");
                Ok((token, report))
            }
            Err(e) => {
                warn!(%token, error = %e, "diff failed, discarding upload");
                self.staging.discard(&token);
                self.finish(token, ImportState::Upload, ImportState::Error);
                Err(e)
            }
        }
    }

    /// Merge the snapshot staged under `token`. The staged file is removed
    /// whether or not the merge succeeds.
    pub fn confirm<S: LedgerStore>(
        &mut self,
        store: &mut S,
        token: UploadToken,
    ) -> Result<MergeStats, EngineError> {
        let staged = self
            .staging
            .take(&token)
            .ok_or(EngineError::NoStagedSnapshot(token))?;
        let result = merge_snapshot(store, staged.path());
        staged.discard();
        match &result {
            Ok(stats) => {
                info!(%token, changed = stats.has_changes(), "import committed");
                self.finish(token, ImportState::DiffReady, ImportState::Committed);
            }
            Err(e) => {
                warn!(%token, error = %e, "merge failed");
                self.finish(token, ImportState::DiffReady, ImportState::Error);
            }
        }
        result
    }

    /// Drop the snapshot staged under `token` without merging.
    /// Returns `false` if nothing was staged under it.
    pub fn cancel(&mut self, token: UploadToken) -> bool {
        if !self.staging.discard(&token) {
            return false;
        }
        info!(%token, "import cancelled");
        self.finish(token, ImportState::DiffReady, ImportState::Cancelled);
        true
    }

    /// Current state of `token`, or `None` if it is unknown or has aged out.
    pub fn state(&self, token: UploadToken) -> Option<ImportState> {
        if self.staging.contains(&token) {
            return Some(ImportState::DiffReady);
        }
        self.history
            .iter()
            .rev()
            .find(|(t, _)| *t == token)
            .map(|(_, state)| *state)
    }

    /// Record that `token` left `from` for the terminal state `to`.
    fn finish(&mut self, token: UploadToken, from: ImportState, to: ImportState) {
        debug_assert!(
            from.can_transition_to(to) && to.is_terminal(),
            "illegal import transition {from} -> {to}"
        );
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back((token, to));
    }
}
