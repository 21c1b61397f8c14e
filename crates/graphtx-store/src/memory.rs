//! An in-memory reference implementation of [`GraphStore`], [`CacheInvalidator`]
//! and [`IdBatchAllocator`].
//!
//! This is a test double, not the deliverable: spec.md §1 treats the page
//! store and free list as an external collaborator. It exists so the
//! engine's unit and property tests (spec.md §8) have something to run
//! against without pulling in a real storage engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;

use graphtx_model::{
    DynamicChainKind, DynamicRecordId, NodeId, NodeRecord, PropertyIndexId, PropertyIndexRecord, PropertyRecord,
    PropertyRecordId, RelationshipId, RelationshipRecord, RelationshipTypeId, RelationshipTypeRecord,
};

use crate::error::StoreError;
use crate::traits::{CacheInvalidator, GraphStore, IdBatch, IdBatchAllocator, IdType};

#[derive(Default)]
struct Tables {
    nodes: HashMap<u64, NodeRecord>,
    relationships: HashMap<u64, RelationshipRecord>,
    property_records: HashMap<u64, PropertyRecord>,
    property_indexes: HashMap<u32, PropertyIndexRecord>,
    relationship_types: HashMap<u32, RelationshipTypeRecord>,
    dynamic_chains: HashMap<u64, Vec<u8>>,
}

/// A free list per record kind, reused across `next_id`/`free_id` the way
/// the real page store's allocator would (spec.md §1: "typed record store
/// with get(id), update(record), nextId(), freeId(id)").
#[derive(Default)]
struct FreeLists {
    nodes: Vec<u64>,
    relationships: Vec<u64>,
    property_records: Vec<u64>,
    dynamic_chains: HashSet<u64>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    free: Mutex<FreeLists>,
    next_node: AtomicU64,
    next_rel: AtomicU64,
    next_prop: AtomicU64,
    next_dynamic: AtomicU64,
    last_committed_tx: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            free: Mutex::new(FreeLists::default()),
            next_node: AtomicU64::new(1),
            next_rel: AtomicU64::new(1),
            next_prop: AtomicU64::new(1),
            next_dynamic: AtomicU64::new(1),
            last_committed_tx: AtomicI64::new(0),
        }
    }

    /// Test helper: true iff the id is neither present-and-in-use nor held
    /// by any table (used to assert invariant 4: "create-then-rollback
    /// leaks nothing").
    pub fn is_in_use_node(&self, id: NodeId) -> bool {
        self.tables
            .lock()
            .nodes
            .get(&id.get())
            .map(|r| r.in_use)
            .unwrap_or(false)
    }

    pub fn is_free_node(&self, id: NodeId) -> bool {
        self.free.lock().nodes.contains(&id.get())
    }

    pub fn is_free_relationship(&self, id: RelationshipId) -> bool {
        self.free.lock().relationships.contains(&id.get())
    }
}

impl GraphStore for MemoryStore {
    fn get_node(&self, id: NodeId) -> Option<NodeRecord> {
        self.tables.lock().nodes.get(&id.get()).cloned()
    }

    fn update_node(&self, record: &NodeRecord) {
        self.tables.lock().nodes.insert(record.id.get(), record.clone());
    }

    fn next_node_id(&self) -> NodeId {
        if let Some(id) = self.free.lock().nodes.pop() {
            return NodeId::new(id);
        }
        NodeId::new(self.next_node.fetch_add(1, Ordering::SeqCst))
    }

    fn free_node_id(&self, id: NodeId) {
        self.tables.lock().nodes.remove(&id.get());
        self.free.lock().nodes.push(id.get());
    }

    fn get_relationship(&self, id: RelationshipId) -> Option<RelationshipRecord> {
        self.tables.lock().relationships.get(&id.get()).cloned()
    }

    fn update_relationship(&self, record: &RelationshipRecord) {
        self.tables
            .lock()
            .relationships
            .insert(record.id.get(), record.clone());
    }

    fn next_relationship_id(&self) -> RelationshipId {
        if let Some(id) = self.free.lock().relationships.pop() {
            return RelationshipId::new(id);
        }
        RelationshipId::new(self.next_rel.fetch_add(1, Ordering::SeqCst))
    }

    fn free_relationship_id(&self, id: RelationshipId) {
        self.tables.lock().relationships.remove(&id.get());
        self.free.lock().relationships.push(id.get());
    }

    fn get_property_record(&self, id: PropertyRecordId) -> Option<PropertyRecord> {
        self.tables.lock().property_records.get(&id.get()).cloned()
    }

    fn update_property_record(&self, record: &PropertyRecord) {
        self.tables
            .lock()
            .property_records
            .insert(record.id.get(), record.clone());
    }

    fn next_property_record_id(&self) -> PropertyRecordId {
        if let Some(id) = self.free.lock().property_records.pop() {
            return PropertyRecordId::new(id);
        }
        PropertyRecordId::new(self.next_prop.fetch_add(1, Ordering::SeqCst))
    }

    fn free_property_record_id(&self, id: PropertyRecordId) {
        self.tables.lock().property_records.remove(&id.get());
        self.free.lock().property_records.push(id.get());
    }

    fn get_property_index(&self, id: PropertyIndexId) -> Option<PropertyIndexRecord> {
        self.tables.lock().property_indexes.get(&id.get()).cloned()
    }

    fn update_property_index(&self, record: &PropertyIndexRecord) {
        self.tables
            .lock()
            .property_indexes
            .insert(record.id.get(), record.clone());
    }

    fn get_relationship_type(&self, id: RelationshipTypeId) -> Option<RelationshipTypeRecord> {
        self.tables.lock().relationship_types.get(&id.get()).cloned()
    }

    fn update_relationship_type(&self, record: &RelationshipTypeRecord) {
        self.tables
            .lock()
            .relationship_types
            .insert(record.id.get(), record.clone());
    }

    fn load_dynamic_chain(&self, head: DynamicRecordId) -> Vec<u8> {
        self.tables
            .lock()
            .dynamic_chains
            .get(&head.get())
            .cloned()
            .unwrap_or_default()
    }

    fn allocate_dynamic_chain(&self, bytes: &[u8]) -> DynamicRecordId {
        let id = self.next_dynamic.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().dynamic_chains.insert(id, bytes.to_vec());
        DynamicRecordId::new(id)
    }

    fn free_dynamic_chain(&self, head: DynamicRecordId, _kind: DynamicChainKind) {
        self.tables.lock().dynamic_chains.remove(&head.get());
        self.free.lock().dynamic_chains.insert(head.get());
    }

    fn last_committed_tx(&self) -> i64 {
        self.last_committed_tx.load(Ordering::SeqCst)
    }

    fn advance_last_committed_tx(&self, tx_id: i64, in_recovery: bool) -> Result<(), StoreError> {
        let have = self.last_committed_tx.load(Ordering::SeqCst);
        if !in_recovery && tx_id != have + 1 {
            return Err(StoreError::OutOfOrderCommit { have, attempted: tx_id });
        }
        self.last_committed_tx.store(tx_id, Ordering::SeqCst);
        Ok(())
    }
}

/// A cache double that just records what it was told, for assertions in
/// tests (spec.md §8 invariant checks around invalidation).
#[derive(Default)]
pub struct RecordingCache {
    invalidated_nodes: Mutex<Vec<NodeId>>,
    invalidated_rels: Mutex<Vec<RelationshipId>>,
    registered_indexes: Mutex<Vec<PropertyIndexId>>,
    registered_types: Mutex<Vec<RelationshipTypeId>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidated_nodes(&self) -> Vec<NodeId> {
        self.invalidated_nodes.lock().clone()
    }

    pub fn invalidated_relationships(&self) -> Vec<RelationshipId> {
        self.invalidated_rels.lock().clone()
    }
}

impl CacheInvalidator for RecordingCache {
    fn invalidate_node(&self, id: NodeId) {
        self.invalidated_nodes.lock().push(id);
    }

    fn invalidate_relationship(&self, id: RelationshipId) {
        self.invalidated_rels.lock().push(id);
    }

    fn register_property_index(&self, id: PropertyIndexId) {
        self.registered_indexes.lock().push(id);
    }

    fn register_relationship_type(&self, id: RelationshipTypeId) {
        self.registered_types.lock().push(id);
    }
}

/// Batch id allocation backed by the same atomics `MemoryStore` uses for
/// single-id generation; in a real deployment the two would share a
/// generator so `GRAB_SIZE` batches stay consistent with single `nextId`
/// calls (spec.md §4.4).
pub struct MemoryIdAllocator {
    counters: Mutex<BTreeMap<&'static str, u64>>,
    defrag_counts: Mutex<BTreeMap<&'static str, i64>>,
}

impl Default for MemoryIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdAllocator {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(BTreeMap::new()),
            defrag_counts: Mutex::new(BTreeMap::new()),
        }
    }

    fn key(id_type: IdType) -> &'static str {
        match id_type {
            IdType::Node => "node",
            IdType::Relationship => "relationship",
            IdType::PropertyRecord => "property_record",
            IdType::PropertyIndex => "property_index",
            IdType::RelationshipType => "relationship_type",
        }
    }
}

impl IdBatchAllocator for MemoryIdAllocator {
    fn allocate_batch(&self, id_type: IdType, count: u64) -> IdBatch {
        let key = Self::key(id_type);
        let mut counters = self.counters.lock();
        let entry = counters.entry(key).or_insert(1);
        let start = *entry;
        *entry += count;
        let high_id = *entry - 1;
        let defrag_count = *self.defrag_counts.lock().entry(key).or_insert(0);
        let ids = (start..start + count).map(|v| v as i64).collect();
        IdBatch {
            ids,
            high_id: high_id as i64,
            defrag_count,
        }
    }
}
