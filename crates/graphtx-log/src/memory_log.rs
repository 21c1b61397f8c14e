use parking_lot::Mutex;

use crate::command::{Command, LoggedTransaction};
use crate::error::LogError;
use crate::LogicalLog;

/// An in-memory [`LogicalLog`], standing in for the append-only byte
/// stream spec.md §1 delegates to a collaborator. Good enough to drive
/// recovery-replay tests (invariant 5, spec.md §8) without a real WAL.
#[derive(Default)]
pub struct InMemoryLog {
    transactions: Mutex<Vec<LoggedTransaction>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self { transactions: Mutex::new(Vec::new()) }
    }

    /// For tests that want to inspect exactly what was written, without
    /// going through `replay`'s recovery framing.
    pub fn transactions(&self) -> Vec<LoggedTransaction> {
        self.transactions.lock().clone()
    }
}

impl LogicalLog for InMemoryLog {
    fn append(&self, tx_id: i64, commands: Vec<Command>) -> Result<(), LogError> {
        self.transactions.lock().push(LoggedTransaction { tx_id, commands });
        Ok(())
    }

    fn replay(&self) -> Vec<LoggedTransaction> {
        self.transactions.lock().clone()
    }
}
