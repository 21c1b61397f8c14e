use graphtx_model::{ChainLinks, NodeId, RelationshipId, Side};

use crate::error::EngineError;
use crate::transaction::WriteTransaction;

impl WriteTransaction {
    /// Fix the `prev` pointer, on whichever side faces `endpoint`, of the
    /// relationship that used to be `endpoint`'s chain head — the second
    /// half of `Create(R, a, b)` (spec.md §4.2).
    pub(crate) fn fix_old_head_prev(
        &mut self,
        head_id: RelationshipId,
        endpoint: NodeId,
        new_id: RelationshipId,
    ) -> Result<(), EngineError> {
        let head = self.relationship(head_id)?;
        let side = head.side_facing(endpoint).ok_or_else(|| {
            EngineError::IntegrityViolation(format!(
                "relationship {head_id} does not reference endpoint {endpoint} while splicing in {new_id}"
            ))
        })?;
        self.with_relationship_mut(head_id, |r| r.links_mut(side).prev = Some(new_id))
    }

    /// Splice `id` out of `endpoint`'s chain, given the links it held on the
    /// side facing `endpoint` before deletion — `Delete(R)` (spec.md §4.2).
    pub(crate) fn unsplice_side(&mut self, id: RelationshipId, endpoint: NodeId, links: ChainLinks) -> Result<(), EngineError> {
        match links.prev {
            Some(prev_id) => self.relink_neighbor(prev_id, endpoint, Slot::Next, links.next)?,
            None => self.with_node_mut(endpoint, |n| n.next_rel = links.next)?,
        }
        if let Some(next_id) = links.next {
            self.relink_neighbor(next_id, endpoint, Slot::Prev, links.prev)?;
        }
        Ok(())
    }

    fn relink_neighbor(
        &mut self,
        neighbor_id: RelationshipId,
        endpoint: NodeId,
        slot: Slot,
        value: Option<RelationshipId>,
    ) -> Result<(), EngineError> {
        let neighbor = self.relationship(neighbor_id)?;
        let side = neighbor.side_facing(endpoint).ok_or_else(|| {
            EngineError::IntegrityViolation(format!(
                "neighbor relationship {neighbor_id} does not reference endpoint {endpoint}"
            ))
        })?;
        self.with_relationship_mut(neighbor_id, |r| {
            let links = r.links_mut(side);
            match slot {
                Slot::Prev => links.prev = value,
                Slot::Next => links.next = value,
            }
        })
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Prev,
    Next,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphtx_log::InMemoryLog;
    use graphtx_store::{MemoryStore, NoopCacheInvalidator};

    use super::*;
    use crate::config::EngineConfig;
    use graphtx_model::RelationshipTypeId;

    fn new_tx() -> WriteTransaction {
        WriteTransaction::new(
            Arc::new(MemoryStore::default()),
            Arc::new(NoopCacheInvalidator),
            Arc::new(InMemoryLog::default()),
            EngineConfig::default(),
            1,
        )
    }

    /// S2: three relationships between 1 and 2, created in order, then the
    /// middle one is deleted. The chain head on either endpoint is the last
    /// one created (prepend semantics).
    #[test]
    fn three_way_create_then_delete_middle() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        tx.node_create(NodeId::new(2)).unwrap();
        let ty = RelationshipTypeId::new(0);
        tx.relationship_create(RelationshipId::new(100), ty, NodeId::new(1), NodeId::new(2))
            .unwrap();
        tx.relationship_create(RelationshipId::new(101), ty, NodeId::new(1), NodeId::new(2))
            .unwrap();
        tx.relationship_create(RelationshipId::new(102), ty, NodeId::new(1), NodeId::new(2))
            .unwrap();

        assert_eq!(tx.node(NodeId::new(1)).unwrap().next_rel, Some(RelationshipId::new(102)));
        assert_eq!(
            tx.relationship(RelationshipId::new(102)).unwrap().first.next,
            Some(RelationshipId::new(101))
        );

        tx.rel_delete(RelationshipId::new(101)).unwrap();

        assert_eq!(
            tx.relationship(RelationshipId::new(102)).unwrap().first.next,
            Some(RelationshipId::new(100))
        );
        assert_eq!(
            tx.relationship(RelationshipId::new(100)).unwrap().first.prev,
            Some(RelationshipId::new(102))
        );
        assert!(!tx.relationship(RelationshipId::new(101)).unwrap().in_use);
    }
}
