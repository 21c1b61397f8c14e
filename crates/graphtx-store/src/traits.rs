use graphtx_model::{
    DynamicChainKind, DynamicRecordId, NodeId, NodeRecord, PropertyIndexId, PropertyIndexRecord, PropertyRecord,
    PropertyRecordId, RelationshipId, RelationshipRecord, RelationshipTypeId, RelationshipTypeRecord,
};

use crate::error::StoreError;

/// The typed CRUD surface the write-transaction engine is built against.
///
/// Out of scope per spec.md §1: the on-disk page store and free list are an
/// external collaborator. This trait is the contract, not an
/// implementation — `graphtx-store::memory::MemoryStore` is a reference
/// implementation used for testing and recovery-replay verification only.
pub trait GraphStore: Send + Sync {
    fn get_node(&self, id: NodeId) -> Option<NodeRecord>;
    fn update_node(&self, record: &NodeRecord);
    fn next_node_id(&self) -> NodeId;
    fn free_node_id(&self, id: NodeId);

    fn get_relationship(&self, id: RelationshipId) -> Option<RelationshipRecord>;
    fn update_relationship(&self, record: &RelationshipRecord);
    fn next_relationship_id(&self) -> RelationshipId;
    fn free_relationship_id(&self, id: RelationshipId);

    fn get_property_record(&self, id: PropertyRecordId) -> Option<PropertyRecord>;
    fn update_property_record(&self, record: &PropertyRecord);
    fn next_property_record_id(&self) -> PropertyRecordId;
    fn free_property_record_id(&self, id: PropertyRecordId);

    fn get_property_index(&self, id: PropertyIndexId) -> Option<PropertyIndexRecord>;
    fn update_property_index(&self, record: &PropertyIndexRecord);

    fn get_relationship_type(&self, id: RelationshipTypeId) -> Option<RelationshipTypeRecord>;
    fn update_relationship_type(&self, record: &RelationshipTypeRecord);

    /// Materialize a dynamic value chain ("heavy" load, spec.md GLOSSARY).
    fn load_dynamic_chain(&self, head: DynamicRecordId) -> Vec<u8>;
    /// Allocate a fresh dynamic chain holding `bytes`, returning its head id.
    fn allocate_dynamic_chain(&self, bytes: &[u8]) -> DynamicRecordId;
    /// Return every block of the chain rooted at `head` to the free list
    /// appropriate for `kind` (spec.md §4.1 Rollback: "classified by block type").
    fn free_dynamic_chain(&self, head: DynamicRecordId, kind: DynamicChainKind);

    /// Stream the store's persisted files to `writer` (spec.md §4.4 "Store
    /// copy"). Byte layout is delegated to the store collaborator per
    /// spec.md §1/§6; the default no-op is correct for in-memory stores
    /// that have no files to stream.
    fn copy_files(&self, _writer: &mut dyn std::io::Write) -> std::io::Result<()> {
        Ok(())
    }

    fn last_committed_tx(&self) -> i64;

    /// Advance `lastCommittedTx`. `in_recovery` mirrors spec.md §4.1:
    /// "Mark the store 'in recovery' around the lastCommittedTx advance so
    /// ID generators are refreshed, not rewritten."
    fn advance_last_committed_tx(&self, tx_id: i64, in_recovery: bool) -> Result<(), StoreError>;
}

/// The cache-invalidation side channel the engine dispatches to at prepare
/// and recovery-commit time (spec.md §4.1). Kept as a separate trait from
/// [`GraphStore`] because it is logically a different collaborator (a
/// query-layer cache, out of scope per spec.md §1) even though a single
/// implementation may back both.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_node(&self, id: NodeId);
    fn invalidate_relationship(&self, id: RelationshipId);
    fn register_property_index(&self, id: PropertyIndexId);
    fn register_relationship_type(&self, id: RelationshipTypeId);
}

/// No-op invalidator for tests that don't care about the side channel.
pub struct NoopCacheInvalidator;

impl CacheInvalidator for NoopCacheInvalidator {
    fn invalidate_node(&self, _id: NodeId) {}
    fn invalidate_relationship(&self, _id: RelationshipId) {}
    fn register_property_index(&self, _id: PropertyIndexId) {}
    fn register_relationship_type(&self, _id: RelationshipTypeId) {}
}

/// Which id generator an `allocateIds` request targets (spec.md §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdType {
    Node,
    Relationship,
    PropertyRecord,
    PropertyIndex,
    RelationshipType,
}

/// Response shape for `allocateIds` (spec.md §6): a contiguous batch plus
/// the generator's current high-water mark and defrag count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdBatch {
    pub ids: Vec<i64>,
    pub high_id: i64,
    pub defrag_count: i64,
}

/// Atomic, thread-safe batch id allocation (spec.md §4.4/§5: "ID generators
/// are shared, thread-safe allocators; `nextIdBatch` is atomic.").
pub trait IdBatchAllocator: Send + Sync {
    fn allocate_batch(&self, id_type: IdType, count: u64) -> IdBatch;
}
