//! The write-transaction state machine: stage, prepare, commit/rollback,
//! recovery replay, and the chain/property-placement algorithms that back
//! it (spec.md §4.1–§4.3).
//!
//! Everything here operates purely on staged, in-memory copies of records
//! obtained through `graphtx_store::GraphStore`; no store write happens
//! before `commit`.

pub mod chain_ops;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod node_ops;
pub mod property_ops;
pub mod relationship_ops;
pub mod staging;
pub mod transaction;

#[cfg(test)]
mod proptests;

pub use config::EngineConfig;
pub use error::EngineError;
pub use transaction::{TxPhase, WriteTransaction};
