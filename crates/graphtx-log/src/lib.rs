//! The command stream shape and the logical-log contract.
//!
//! Byte-level framing (segments, checksums, recovery of a torn write) is an
//! external collaborator per spec.md §1 — see `spacetimedb_commitlog` for
//! what a production-grade implementation of that framing looks like. This
//! crate only fixes the *shape* `prepare`/`commit` agree on (an ordered
//! list of [`Command`]s per transaction) and provides an in-memory
//! reference implementation for tests and recovery-replay verification.

pub mod command;
pub mod error;
pub mod memory_log;

pub use command::{ChangeKind, Command, LoggedTransaction};
pub use error::LogError;
pub use memory_log::InMemoryLog;

/// An append-only stream of opaque, already-ordered command batches, with
/// replay (spec.md §1 "logical log framework ... treated as an append-only
/// stream of opaque commands with replay").
pub trait LogicalLog: Send + Sync {
    /// Append a prepared transaction's commands, in the order `prepare`
    /// produced them, under the tx id the caller already assigned. The log
    /// is a dumb collaborator: it does not mint ids (spec.md §1 treats it
    /// as "an append-only stream of opaque commands with replay"); id
    /// assignment belongs to whoever begins the transaction.
    fn append(&self, tx_id: i64, commands: Vec<Command>) -> Result<(), LogError>;

    /// All logged transactions in append order, for recovery replay.
    fn replay(&self) -> Vec<LoggedTransaction>;
}
