use std::collections::BTreeMap;

use graphtx_model::{
    NodeId, NodeRecord, PropertyIndexId, PropertyIndexRecord, PropertyRecord, PropertyRecordId, RelationshipId,
    RelationshipRecord, RelationshipTypeId, RelationshipTypeRecord,
};

/// One record's staged state: the record itself, plus whether this
/// transaction is the one that brought it into existence (needed at
/// rollback, to know whose ids go back to the free list, and at commit, to
/// split into the created/modified/deleted groups of spec.md §4.1).
#[derive(Clone, Debug)]
pub struct StagedRecord<T> {
    pub record: T,
    pub created: bool,
}

impl<T> StagedRecord<T> {
    pub fn existing(record: T) -> Self {
        Self { record, created: false }
    }

    pub fn new(record: T) -> Self {
        Self { record, created: true }
    }
}

/// Per-transaction, per-kind mapping from record id to the mutated record
/// instance (spec.md GLOSSARY "Staging map").
///
/// Five separate maps, not one heterogeneous one: prepare and commit
/// iterate by kind in a specific order (spec.md §9 Design Notes), and
/// collapsing them would destroy that ordering.
#[derive(Default)]
pub struct Staging {
    pub relationship_types: BTreeMap<RelationshipTypeId, StagedRecord<RelationshipTypeRecord>>,
    pub nodes: BTreeMap<NodeId, StagedRecord<NodeRecord>>,
    pub relationships: BTreeMap<RelationshipId, StagedRecord<RelationshipRecord>>,
    pub property_indexes: BTreeMap<PropertyIndexId, StagedRecord<PropertyIndexRecord>>,
    pub property_records: BTreeMap<PropertyRecordId, StagedRecord<PropertyRecord>>,
}

impl Staging {
    pub fn clear(&mut self) {
        self.relationship_types.clear();
        self.nodes.clear();
        self.relationships.clear();
        self.property_indexes.clear();
        self.property_records.clear();
    }
}
