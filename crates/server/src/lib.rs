//! HTTP surface over the import workflow and the ledger listings.
//!
//! The binary `main.rs` depends on this library target; tests build the
//! router directly.

pub mod api_types;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
