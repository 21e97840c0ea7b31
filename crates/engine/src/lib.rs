pub mod diff;
pub mod error;
pub mod merge;
pub mod staging;
pub mod workflow;

pub use diff::{
    AccountDiff, BalanceDiff, CategoryDiff, DEFAULT_DETAIL_LIMIT, DateRange, DiffOptions, DiffReport,
    MatchStrategy, TransactionDiff, TransferDiff, diff_snapshot,
};
pub use error::EngineError;
pub use merge::{MergeStats, merge_rows, merge_snapshot};
pub use staging::{DEFAULT_MAX_STAGED, Staged, StagedSnapshot, StagingArea};
pub use workflow::{ImportState, Importer};
