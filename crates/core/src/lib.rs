pub mod entries;
pub mod error;
pub mod id_map;
pub mod ids;
pub mod records;

pub use entries::{TransactionEntry, TransferEntry};
pub use error::CoreError;
pub use id_map::IdMap;
pub use ids::*;
pub use records::*;
