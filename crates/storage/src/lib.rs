pub mod error;
pub mod retry;
pub mod rows;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
pub mod traits;
pub mod views;

pub use error::StorageError;
pub use retry::RetryPolicy;
pub use snapshot::{SnapshotHandle, load_snapshot};
pub use sqlite::{SqliteLedger, SqliteWriter};
pub use traits::*;
