use graphtx_model::{NodeId, Owner, PropertyData, RelationshipId, RelationshipRecord, RelationshipTypeId};

use crate::error::EngineError;
use crate::transaction::WriteTransaction;

impl WriteTransaction {
    /// `relationshipCreate(id, typeId, firstNodeId, secondNodeId)` —
    /// `Create(R, a, b)` of spec.md §4.2.
    pub fn relationship_create(
        &mut self,
        id: RelationshipId,
        rel_type: RelationshipTypeId,
        first_node: NodeId,
        second_node: NodeId,
    ) -> Result<(), EngineError> {
        self.require_active()?;
        let first_head = self.node(first_node)?.next_rel;
        let second_head = self.node(second_node)?.next_rel;

        let mut rel = RelationshipRecord::new(id, rel_type, first_node, second_node);
        rel.first.next = first_head;
        rel.second.next = second_head;

        if let Some(h) = first_head {
            self.fix_old_head_prev(h, first_node, id)?;
        }
        if let Some(h) = second_head {
            self.fix_old_head_prev(h, second_node, id)?;
        }

        self.stage_new_relationship(rel);
        self.with_node_mut(first_node, |n| n.next_rel = Some(id))?;
        self.with_node_mut(second_node, |n| n.next_rel = Some(id))?;
        Ok(())
    }

    /// `relDelete(id)` — `Delete(R)` of spec.md §4.2 plus the property-chain
    /// teardown of §4.3.
    pub fn rel_delete(&mut self, id: RelationshipId) -> Result<PropertyData, EngineError> {
        self.require_active()?;
        let rel = self.relationship(id)?;
        if !rel.in_use {
            return Err(EngineError::RelationshipAlreadyDeleted(id));
        }

        let data = self.delete_property_chain(Owner::Relationship(id))?;
        self.unsplice_side(id, rel.first_node, rel.first)?;
        self.unsplice_side(id, rel.second_node, rel.second)?;
        self.with_relationship_mut(id, |r| {
            r.in_use = false;
            r.next_prop = None;
        })?;
        Ok(data)
    }

    /// `loadLightRelationship(id)` — no inline property payload to strip,
    /// so this is just the staged record.
    pub fn load_light_relationship(&mut self, id: RelationshipId) -> Result<RelationshipRecord, EngineError> {
        self.relationship(id)
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
            EngineConfig::default(),
            1,
        )
    }

    /// S1: two nodes, one relationship, freshly created chain pointers are
    /// all NONE on both sides.
    #[test]
    fn single_relationship_chain_is_empty_both_sides() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        tx.node_create(NodeId::new(2)).unwrap();
        tx.relationship_create(RelationshipId::new(100), RelationshipTypeId::new(0), NodeId::new(1), NodeId::new(2))
            .unwrap();

        assert_eq!(tx.node(NodeId::new(1)).unwrap().next_rel, Some(RelationshipId::new(100)));
        assert_eq!(tx.node(NodeId::new(2)).unwrap().next_rel, Some(RelationshipId::new(100)));
        let rel = tx.relationship(RelationshipId::new(100)).unwrap();
        assert_eq!(rel.first.prev, None);
        assert_eq!(rel.first.next, None);
        assert_eq!(rel.second.prev, None);
        assert_eq!(rel.second.next, None);
    }

    #[test]
    fn self_loop_create_and_delete_round_trips() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        tx.relationship_create(RelationshipId::new(100), RelationshipTypeId::new(0), NodeId::new(1), NodeId::new(1))
            .unwrap();
        assert_eq!(tx.node(NodeId::new(1)).unwrap().next_rel, Some(RelationshipId::new(100)));

        tx.rel_delete(RelationshipId::new(100)).unwrap();
        assert_eq!(tx.node(NodeId::new(1)).unwrap().next_rel, None);
        assert!(!tx.relationship(RelationshipId::new(100)).unwrap().in_use);
    }

    #[test]
    fn delete_of_head_relinks_node_head() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        tx.node_create(NodeId::new(2)).unwrap();
        let ty = RelationshipTypeId::new(0);
        tx.relationship_create(RelationshipId::new(100), ty, NodeId::new(1), NodeId::new(2)).unwrap();
        tx.relationship_create(RelationshipId::new(101), ty, NodeId::new(1), NodeId::new(2)).unwrap();

        tx.rel_delete(RelationshipId::new(101)).unwrap();
        assert_eq!(tx.node(NodeId::new(1)).unwrap().next_rel, Some(RelationshipId::new(100)));
        assert_eq!(tx.node(NodeId::new(2)).unwrap().next_rel, Some(RelationshipId::new(100)));
    }
}
