use graphtx_model::{NodeId, NodeRecord, Owner, PropertyData};

use crate::error::EngineError;
use crate::staging::StagedRecord;
use crate::transaction::WriteTransaction;

impl WriteTransaction {
    /// `nodeCreate(id)` (spec.md §4.1).
    pub fn node_create(&mut self, id: NodeId) -> Result<(), EngineError> {
        self.require_active()?;
        self.staging.nodes.insert(id, StagedRecord::new(NodeRecord::new(id)));
        Ok(())
    }

    /// `nodeDelete(id)` (spec.md §4.1/§4.3 "Delete chain"). Returns every
    /// live property the node carried, for the caller to mirror into
    /// higher-level caches.
    pub fn node_delete(&mut self, id: NodeId) -> Result<PropertyData, EngineError> {
        self.require_active()?;
        let node = self.node(id)?;
        if !node.in_use {
            return Err(EngineError::NodeAlreadyDeleted(id));
        }
        let data = self.delete_property_chain(Owner::Node(id))?;
        self.with_node_mut(id, |n| {
            n.in_use = false;
            n.next_prop = None;
        })?;
        Ok(data)
    }

    /// `loadLightNode(id)` — the node record carries no inline property
    /// payload, so loading it "light" is identical to loading it at all.
    pub fn load_light_node(&mut self, id: NodeId) -> Result<NodeRecord, EngineError> {
        self.node(id)
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

    #[test]
    fn create_then_delete_is_empty() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        let data = tx.node_delete(NodeId::new(1)).unwrap();
        assert!(data.entries.is_empty());
        assert!(!tx.node(NodeId::new(1)).unwrap().in_use);
    }

    #[test]
    fn double_delete_is_reported_not_fatal() {
        let mut tx = new_tx();
        tx.node_create(NodeId::new(1)).unwrap();
        tx.node_delete(NodeId::new(1)).unwrap();
        let err = tx.node_delete(NodeId::new(1)).unwrap_err();
        assert!(matches!(err, EngineError::NodeAlreadyDeleted(_)));
    }
}
