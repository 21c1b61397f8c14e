use thiserror::Error;

/// Errors surfaced by the store surface (spec.md §2 component 2). The
/// engine never raises these for ordinary "not found" conditions — a
/// missing record is `Option::None`, not an error — this enum is reserved
/// for failures of the collaborator itself (I/O, corrupted free lists).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("attempted to advance lastCommittedTx out of order: have {have}, attempted {attempted}")]
    OutOfOrderCommit { have: i64, attempted: i64 },
}
