use graphtx_model::{NodeId, PropertyIndexId, PropertyRecordId, RelationshipId};
use thiserror::Error;

/// Errors the engine can surface (spec.md §7).
///
/// `IntegrityViolation` is fatal to the transaction: the caller must roll
/// back. `AlreadyDeleted` and `MissingBlock` are surfaced but leave the
/// transaction usable for further operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("node {0} is already deleted")]
    NodeAlreadyDeleted(NodeId),
    #[error("relationship {0} is already deleted")]
    RelationshipAlreadyDeleted(RelationshipId),

    #[error("property key {key} not found on record {record}")]
    MissingBlock {
        key: PropertyIndexId,
        record: PropertyRecordId,
    },

    #[error("transaction already prepared")]
    AlreadyPrepared,
    #[error("transaction not yet prepared")]
    NotPrepared,
    #[error("transaction already committed")]
    AlreadyCommitted,
    #[error("transaction already rolled back")]
    AlreadyRolledBack,

    #[error("commit rejected: lastCommittedTx+1 is {expected} but transaction was assigned {actual}")]
    OutOfSequenceCommit { expected: i64, actual: i64 },

    #[error(transparent)]
    Store(#[from] graphtx_store::StoreError),
    #[error(transparent)]
    Log(#[from] graphtx_log::LogError),
}
