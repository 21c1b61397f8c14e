use std::collections::HashSet;

use graphtx_model::{
    DynamicRef, NodeId, Owner, PropertyBlock, PropertyData, PropertyHandle, PropertyIndexId, PropertyIndexRecord,
    PropertyRecord, PropertyRecordId, PropertyValue, RelationshipId, RelationshipTypeId, RelationshipTypeRecord,
    BLOCK_HEADER_BYTES,
};
use graphtx_store::GraphStore;

use crate::error::EngineError;
use crate::staging::StagedRecord;
use crate::transaction::WriteTransaction;

impl WriteTransaction {
    pub fn node_add_property(&mut self, owner: NodeId, key: PropertyIndexId, value: PropertyValue) -> Result<PropertyHandle, EngineError> {
        self.require_active()?;
        self.add_property(Owner::Node(owner), key, value)
    }

    pub fn rel_add_property(
        &mut self,
        owner: RelationshipId,
        key: PropertyIndexId,
        value: PropertyValue,
    ) -> Result<PropertyHandle, EngineError> {
        self.require_active()?;
        self.add_property(Owner::Relationship(owner), key, value)
    }

    pub fn node_change_property(
        &mut self,
        owner: NodeId,
        handle: PropertyHandle,
        value: PropertyValue,
    ) -> Result<PropertyHandle, EngineError> {
        self.require_active()?;
        self.change_property(Owner::Node(owner), handle, value)
    }

    pub fn rel_change_property(
        &mut self,
        owner: RelationshipId,
        handle: PropertyHandle,
        value: PropertyValue,
    ) -> Result<PropertyHandle, EngineError> {
        self.require_active()?;
        self.change_property(Owner::Relationship(owner), handle, value)
    }

    pub fn node_remove_property(&mut self, owner: NodeId, handle: PropertyHandle) -> Result<(), EngineError> {
        self.require_active()?;
        self.remove_property(Owner::Node(owner), handle)
    }

    pub fn rel_remove_property(&mut self, owner: RelationshipId, handle: PropertyHandle) -> Result<(), EngineError> {
        self.require_active()?;
        self.remove_property(Owner::Relationship(owner), handle)
    }

    pub fn create_relationship_type(&mut self, id: RelationshipTypeId, name: String) -> Result<(), EngineError> {
        self.require_active()?;
        self.staging.relationship_types.insert(
            id,
            StagedRecord::new(RelationshipTypeRecord { id, in_use: true, name }),
        );
        Ok(())
    }

    pub fn create_property_index(&mut self, id: PropertyIndexId, key: String) -> Result<(), EngineError> {
        self.require_active()?;
        self.staging
            .property_indexes
            .insert(id, StagedRecord::new(PropertyIndexRecord { id, in_use: true, key }));
        Ok(())
    }

    /// `loadProperties(ownerId, lightFlag)` (spec.md §4.1). When `light` is
    /// false, dynamic string/array values are materialized and the
    /// materialized record is written back into staging so a second read
    /// within the same transaction doesn't re-hit the store.
    pub fn load_properties(&mut self, owner: Owner, light: bool) -> Result<PropertyData, EngineError> {
        let mut data = PropertyData::default();
        let mut cursor = self.owner_next_prop(owner)?;
        let mut visited = HashSet::new();
        while let Some(rid) = cursor {
            if !visited.insert(rid) {
                break;
            }
            let mut rec = self.property_record(rid, owner)?;
            if !light {
                materialize(&*self.store, &mut rec);
            }
            for block in &rec.blocks {
                if block.in_use {
                    data.entries.insert(block.key_index_id, block.value.clone());
                }
            }
            cursor = rec.next_prop;
            if !light {
                self.with_property_record_mut(rid, owner, move |staged| *staged = rec)?;
            }
        }
        Ok(data)
    }

    fn owner_next_prop(&mut self, owner: Owner) -> Result<Option<PropertyRecordId>, EngineError> {
        match owner {
            Owner::Node(id) => Ok(self.node(id)?.next_prop),
            Owner::Relationship(id) => Ok(self.relationship(id)?.next_prop),
        }
    }

    fn set_owner_next_prop(&mut self, owner: Owner, head: Option<PropertyRecordId>) -> Result<(), EngineError> {
        match owner {
            Owner::Node(id) => self.with_node_mut(id, |n| n.next_prop = head),
            Owner::Relationship(id) => self.with_relationship_mut(id, |r| r.next_prop = head),
        }
    }

    fn add_property(&mut self, owner: Owner, key: PropertyIndexId, value: PropertyValue) -> Result<PropertyHandle, EngineError> {
        let head = self.owner_next_prop(owner)?;
        let (handle, new_head) = self.add_property_to_chain(owner, head, key, value)?;
        if let Some(h) = new_head {
            self.set_owner_next_prop(owner, Some(h))?;
        }
        Ok(handle)
    }

    /// `Add(block, primitive)` (spec.md §4.3): first-fit placement, prepend
    /// a new record on overflow.
    fn add_property_to_chain(
        &mut self,
        owner: Owner,
        head: Option<PropertyRecordId>,
        key: PropertyIndexId,
        value: PropertyValue,
    ) -> Result<(PropertyHandle, Option<PropertyRecordId>), EngineError> {
        let block_size = BLOCK_HEADER_BYTES + value.inline_size();
        let mut cursor = head;
        while let Some(rid) = cursor {
            let rec = self.property_record(rid, owner)?;
            if rec.live_size() + block_size <= self.config.payload_cap {
                self.with_property_record_mut(rid, owner, |r| r.blocks.push(PropertyBlock::new(key, value)))?;
                return Ok((PropertyHandle { record_id: rid, key_index_id: key }, None));
            }
            cursor = rec.next_prop;
        }

        let new_id = self.store.next_property_record_id();
        let mut new_rec = PropertyRecord::new(new_id, owner);
        new_rec.next_prop = head;
        new_rec.blocks.push(PropertyBlock::new(key, value));
        if let Some(old_head) = head {
            self.with_property_record_mut(old_head, owner, |r| r.prev_prop = Some(new_id))?;
        }
        self.stage_new_property_record(new_rec);
        Ok((PropertyHandle { record_id: new_id, key_index_id: key }, Some(new_id)))
    }

    /// `Change(propData, value)` (spec.md §4.3).
    fn change_property(&mut self, owner: Owner, handle: PropertyHandle, value: PropertyValue) -> Result<PropertyHandle, EngineError> {
        let rec = self.property_record(handle.record_id, owner)?;
        let old_block = rec
            .find_block(handle.key_index_id)
            .cloned()
            .ok_or(EngineError::MissingBlock { key: handle.key_index_id, record: handle.record_id })?;

        let new_size = BLOCK_HEADER_BYTES + value.inline_size();
        if new_size <= old_block.size() {
            self.with_property_record_mut(handle.record_id, owner, |r| {
                if let Some(b) = r.find_block_mut(handle.key_index_id) {
                    b.value = value;
                }
            })?;
            return Ok(handle);
        }

        if let (Some(head), Some(kind)) = (old_block.value.dynamic_head(), old_block.value.dynamic_chain_kind()) {
            self.store.free_dynamic_chain(head, kind);
        }
        self.with_property_record_mut(handle.record_id, owner, |r| {
            if let Some(b) = r.find_block_mut(handle.key_index_id) {
                b.in_use = false;
            }
        })?;
        self.add_property(owner, handle.key_index_id, value)
    }

    /// `Remove(propData)` (spec.md §4.3): mark the block dead, free its
    /// dynamic chain, and unlink the host record if nothing live remains.
    fn remove_property(&mut self, owner: Owner, handle: PropertyHandle) -> Result<(), EngineError> {
        let rec = self.property_record(handle.record_id, owner)?;
        let block = rec
            .find_block(handle.key_index_id)
            .cloned()
            .ok_or(EngineError::MissingBlock { key: handle.key_index_id, record: handle.record_id })?;

        if let (Some(head), Some(kind)) = (block.value.dynamic_head(), block.value.dynamic_chain_kind()) {
            self.store.free_dynamic_chain(head, kind);
        }
        self.with_property_record_mut(handle.record_id, owner, |r| {
            if let Some(b) = r.find_block_mut(handle.key_index_id) {
                b.in_use = false;
            }
        })?;

        let rec = self.property_record(handle.record_id, owner)?;
        if rec.has_live_blocks() {
            return Ok(());
        }

        let prev = rec.prev_prop;
        let next = rec.next_prop;
        self.with_property_record_mut(handle.record_id, owner, |r| r.in_use = false)?;
        if let Some(p) = prev {
            self.with_property_record_mut(p, owner, |r| r.next_prop = next)?;
        }
        if let Some(n) = next {
            self.with_property_record_mut(n, owner, |r| r.prev_prop = prev)?;
        }
        if self.owner_next_prop(owner)? == Some(handle.record_id) {
            self.set_owner_next_prop(owner, next)?;
        }
        Ok(())
    }

    /// `Delete chain` (spec.md §4.3): walk, materialize, mark every block
    /// and host record dead, free dynamic chains, return the collected map.
    pub(crate) fn delete_property_chain(&mut self, owner: Owner) -> Result<PropertyData, EngineError> {
        let mut data = PropertyData::default();
        let mut cursor = self.owner_next_prop(owner)?;
        let mut visited = HashSet::new();
        while let Some(rid) = cursor {
            if !visited.insert(rid) {
                break;
            }
            let mut rec = self.property_record(rid, owner)?;
            materialize(&*self.store, &mut rec);
            for block in rec.blocks.iter_mut() {
                if !block.in_use {
                    continue;
                }
                data.entries.insert(block.key_index_id, block.value.clone());
                if let (Some(head), Some(kind)) = (block.value.dynamic_head(), block.value.dynamic_chain_kind()) {
                    self.store.free_dynamic_chain(head, kind);
                }
                block.in_use = false;
            }
            rec.in_use = false;
            cursor = rec.next_prop;
            self.with_property_record_mut(rid, owner, move |staged| *staged = rec)?;
        }
        self.set_owner_next_prop(owner, None)?;
        Ok(data)
    }
}

fn materialize(store: &dyn GraphStore, rec: &mut PropertyRecord) {
    for block in rec.blocks.iter_mut() {
        if !block.in_use {
            continue;
        }
        if let PropertyValue::String(r) | PropertyValue::Array(r) = &mut block.value {
            if r.is_light() {
                let bytes = store.load_dynamic_chain(r.head());
                *r = DynamicRef::Loaded { head: r.head(), bytes };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphtx_log::InMemoryLog;
    use graphtx_store::{MemoryStore, NoopCacheInvalidator};

    use super::*;
    use crate::config::EngineConfig;

    fn new_tx() -> WriteTransaction {
        WriteTransaction::new(
            Arc::new(MemoryStore::default()),
            Arc::new(NoopCacheInvalidator),
            Arc::new(InMemoryLog::default()),
            EngineConfig { payload_cap: 32 },
            1,
        )
    }

    #[test]
    fn overflowing_payload_cap_allocates_new_head() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        for i in 0..8u32 {
            tx.node_add_property(NodeId::new(1), PropertyIndexId::new(i), PropertyValue::Int(i as i64))
                .unwrap();
        }
        let node = tx.node(NodeId::new(1)).unwrap();
        let head = node.next_prop.expect("head present");
        let head_rec = tx.property_record(head, Owner::Node(NodeId::new(1))).unwrap();
        assert!(head_rec.next_prop.is_some(), "payload cap of 32 should have forced a second record");

        let data = tx.load_properties(Owner::Node(NodeId::new(1)), false).unwrap();
        assert_eq!(data.entries.len(), 8);
    }

    #[test]
    fn remove_last_block_unlinks_record() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        let handle = tx
            .node_add_property(NodeId::new(1), PropertyIndexId::new(0), PropertyValue::Bool(true))
            .unwrap();
        tx.node_remove_property(NodeId::new(1), handle).unwrap();
        assert!(tx.node(NodeId::new(1)).unwrap().next_prop.is_none());
    }

    #[test]
    fn change_to_bigger_value_may_relocate() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        let handle = tx
            .node_add_property(NodeId::new(1), PropertyIndexId::new(0), PropertyValue::Bool(true))
            .unwrap();
        let new_handle = tx
            .node_change_property(NodeId::new(1), handle, PropertyValue::Int(42))
            .unwrap();
        let data = tx.load_properties(Owner::Node(NodeId::new(1)), false).unwrap();
        assert_eq!(data.entries.get(&new_handle.key_index_id), Some(&PropertyValue::Int(42)));
    }
}
