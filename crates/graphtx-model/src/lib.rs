//! Record model for the graphtx write-path transactional store engine.
//!
//! Plain data structures only — no persistence, no locking. Grounded on the
//! newtype-id conventions of `spacetimedb_primitives` and the
//! staged-record shape of `spacetimedb_core::db::datastore`.

pub mod ids;
pub mod node;
pub mod property;
pub mod relationship;
pub mod slave_context;

pub use ids::{DynamicRecordId, NodeId, Owner, PropertyIndexId, PropertyRecordId, RelationshipId, RelationshipTypeId};
pub use node::NodeRecord;
pub use property::{
    DynamicChainKind, DynamicRef, PropertyBlock, PropertyData, PropertyHandle, PropertyIndexRecord, PropertyRecord,
    PropertyValue, RelationshipTypeRecord, BLOCK_HEADER_BYTES,
};
pub use relationship::{ChainLinks, RelationshipRecord, Side};
pub use slave_context::SlaveContext;
