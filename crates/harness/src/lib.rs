pub mod ledger;
pub mod rows;
pub mod snapshot;

pub use ledger::TestLedger;
pub use snapshot::SnapshotFile;
