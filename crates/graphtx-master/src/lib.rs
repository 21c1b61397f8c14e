//! The master coordinator (spec.md §4.4): per-slave-context transaction
//! resumption, lock brokering, batched id allocation, and the idle
//! transaction reaper, built on top of `graphtx-engine`'s write-transaction
//! state machine.
//!
//! Scheduling model is plain OS threads (spec.md §5), not an async
//! runtime: `parking_lot` mutexes guard the shared table, and the reaper is
//! a real `std::thread::spawn` loop.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod lock;
pub mod response;
pub mod tx_table;

#[cfg(test)]
mod tests;

pub use config::CoordinatorConfig;
pub use coordinator::MasterCoordinator;
pub use error::CoordinatorError;
pub use graphtx_model::SlaveContext;
pub use lock::{EntityKind, InMemoryLockManager, LockKind, LockManager, LockOwnerId, LockStatus};
pub use response::{Response, ResponseStatus};
