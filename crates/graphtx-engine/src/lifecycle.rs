use graphtx_log::{ChangeKind, Command};
use graphtx_model::Owner;

use crate::error::EngineError;
use crate::staging::StagedRecord;
use crate::transaction::{TxPhase, WriteTransaction};

fn classify<T>(staged: &StagedRecord<T>, in_use: bool) -> ChangeKind {
    if !in_use {
        ChangeKind::Deleted
    } else if staged.created {
        ChangeKind::Created
    } else {
        ChangeKind::Modified
    }
}

impl WriteTransaction {
    /// `prepare()` (spec.md §4.1): integrity-check, synthesize the command
    /// stream in record-kind order, dispatch cache invalidations, and
    /// append to the log.
    #[tracing::instrument(skip(self), fields(tx_id = self.commit_tx_id()))]
    pub fn prepare(&mut self) -> Result<(), EngineError> {
        self.require_active()?;

        for staged in self.staging.nodes.values() {
            if !staged.record.in_use && staged.record.next_rel.is_some() {
                return Err(EngineError::IntegrityViolation(format!(
                    "node {} deleted while still holding relationships",
                    staged.record.id
                )));
            }
        }

        let mut commands = Vec::new();
        for staged in self.staging.relationship_types.values() {
            commands.push(Command::RelationshipType {
                kind: classify(staged, staged.record.in_use),
                record: staged.record.clone(),
            });
        }
        for staged in self.staging.nodes.values() {
            commands.push(Command::Node {
                kind: classify(staged, staged.record.in_use),
                record: staged.record.clone(),
            });
        }
        for staged in self.staging.relationships.values() {
            commands.push(Command::Relationship {
                kind: classify(staged, staged.record.in_use),
                record: staged.record.clone(),
                first_node: staged.record.first_node,
                second_node: staged.record.second_node,
            });
        }
        for staged in self.staging.property_indexes.values() {
            commands.push(Command::PropertyIndex {
                kind: classify(staged, staged.record.in_use),
                record: staged.record.clone(),
            });
        }
        for staged in self.staging.property_records.values() {
            commands.push(Command::Property {
                kind: classify(staged, staged.record.in_use),
                record: staged.record.clone(),
            });
        }

        for staged in self.staging.nodes.values() {
            if !staged.record.in_use {
                self.cache.invalidate_node(staged.record.id);
            }
        }
        for staged in self.staging.relationships.values() {
            if !staged.record.in_use {
                self.cache.invalidate_relationship(staged.record.id);
            }
        }

        self.log.append(self.commit_tx_id(), commands.clone())?;
        self.set_prepared_commands(commands);
        self.set_phase(TxPhase::Prepared);
        tracing::debug!(commands = self.prepared_command_count(), "transaction prepared");
        Ok(())
    }

    /// `commit()` (spec.md §4.1 "Commit (normal)" / "Commit (recovery
    /// replay)"). A recovery transaction (built via
    /// [`WriteTransaction::recovery`]) skips the sequential-txId check and
    /// applies in the recovery order instead.
    #[tracing::instrument(skip(self), fields(tx_id = self.commit_tx_id(), recovery = self.is_recovery()))]
    pub fn commit(&mut self) -> Result<(), EngineError> {
        if self.is_recovery() {
            let commands = self.take_prepared_commands();
            self.apply_recovery(&commands);
            self.store.advance_last_committed_tx(self.commit_tx_id(), true)?;
            self.set_phase(TxPhase::Committed);
            self.staging.clear();
            return Ok(());
        }

        match self.phase() {
            TxPhase::Prepared => {}
            TxPhase::Active => return Err(EngineError::NotPrepared),
            TxPhase::Committed => return Err(EngineError::AlreadyCommitted),
            TxPhase::RolledBack => return Err(EngineError::AlreadyRolledBack),
        }

        let expected = self.store.last_committed_tx() + 1;
        if self.commit_tx_id() != expected {
            return Err(EngineError::OutOfSequenceCommit { expected, actual: self.commit_tx_id() });
        }

        let commands = self.take_prepared_commands();
        self.apply_normal(&commands);
        self.store.advance_last_committed_tx(self.commit_tx_id(), false)?;
        self.set_phase(TxPhase::Committed);
        self.staging.clear();
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// `rollback()` (spec.md §4.1). Never touches the store except to free
    /// ids this transaction itself allocated.
    #[tracing::instrument(skip(self), fields(tx_id = self.commit_tx_id()))]
    pub fn rollback(&mut self) -> Result<(), EngineError> {
        match self.phase() {
            TxPhase::Active | TxPhase::Prepared => {}
            TxPhase::Committed => return Err(EngineError::AlreadyCommitted),
            TxPhase::RolledBack => return Err(EngineError::AlreadyRolledBack),
        }

        for staged in self.staging.nodes.values() {
            if staged.created {
                self.store.free_node_id(staged.record.id);
            }
            self.cache.invalidate_node(staged.record.id);
        }
        for staged in self.staging.relationships.values() {
            if staged.created {
                self.store.free_relationship_id(staged.record.id);
            }
            self.cache.invalidate_relationship(staged.record.id);
        }
        for staged in self.staging.property_records.values() {
            if staged.created {
                self.store.free_property_record_id(staged.record.id);
                for block in &staged.record.blocks {
                    if let (Some(head), Some(kind)) = (block.value.dynamic_head(), block.value.dynamic_chain_kind()) {
                        self.store.free_dynamic_chain(head, kind);
                    }
                }
            }
        }

        self.staging.clear();
        self.set_phase(TxPhase::RolledBack);
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// `injectCommand(cmd)` (spec.md §4.1 recovery path). Only valid on a
    /// transaction built via [`WriteTransaction::recovery`].
    pub fn inject_command(&mut self, cmd: Command) -> Result<(), EngineError> {
        if !self.is_recovery() {
            return Err(EngineError::IntegrityViolation(
                "inject_command is only valid on a recovery transaction".to_string(),
            ));
        }
        self.push_injected_command(cmd);
        Ok(())
    }

    fn prepared_command_count(&self) -> usize {
        // Re-borrowed rather than stored: staging is already cleared by the
        // time this would matter for anything except the debug log above.
        self.staging.relationship_types.len()
            + self.staging.nodes.len()
            + self.staging.relationships.len()
            + self.staging.property_indexes.len()
            + self.staging.property_records.len()
    }

    fn apply_normal(&self, commands: &[Command]) {
        for cmd in commands {
            if let Command::RelationshipType { record, .. } = cmd {
                self.store.update_relationship_type(record);
            }
        }
        for cmd in commands {
            if let Command::PropertyIndex { record, .. } = cmd {
                self.store.update_property_index(record);
            }
        }

        for kind in [ChangeKind::Created, ChangeKind::Modified] {
            for cmd in commands {
                if let Command::Node { kind: k, record } = cmd {
                    if *k == kind {
                        self.store.update_node(record);
                    }
                }
            }
            for cmd in commands {
                if let Command::Relationship { kind: k, record, .. } = cmd {
                    if *k == kind {
                        self.store.update_relationship(record);
                    }
                }
            }
            for cmd in commands {
                if let Command::Property { kind: k, record } = cmd {
                    if *k == kind {
                        self.store.update_property_record(record);
                    }
                }
            }
        }

        for cmd in commands {
            if let Command::Property { kind: ChangeKind::Deleted, record } = cmd {
                self.store.update_property_record(record);
                self.store.free_property_record_id(record.id);
            }
        }
        for cmd in commands {
            if let Command::Relationship { kind: ChangeKind::Deleted, record, .. } = cmd {
                self.store.update_relationship(record);
                self.store.free_relationship_id(record.id);
            }
        }
        for cmd in commands {
            if let Command::Node { kind: ChangeKind::Deleted, record } = cmd {
                self.store.update_node(record);
                self.store.free_node_id(record.id);
            }
        }
    }

    fn apply_recovery(&self, commands: &[Command]) {
        for cmd in commands {
            if let Command::PropertyIndex { record, .. } = cmd {
                self.store.update_property_index(record);
                self.cache.register_property_index(record.id);
            }
        }
        for cmd in commands {
            if let Command::Property { kind, record } = cmd {
                if *kind == ChangeKind::Deleted {
                    self.store.update_property_record(record);
                    self.store.free_property_record_id(record.id);
                } else {
                    self.store.update_property_record(record);
                }
                if let Some(owner) = record.owner {
                    match owner {
                        Owner::Node(id) => self.cache.invalidate_node(id),
                        Owner::Relationship(id) => self.cache.invalidate_relationship(id),
                    }
                }
            }
        }
        for cmd in commands {
            if let Command::RelationshipType { record, .. } = cmd {
                self.store.update_relationship_type(record);
                self.cache.register_relationship_type(record.id);
            }
        }
        for cmd in commands {
            if let Command::Relationship { kind, record, first_node, second_node } = cmd {
                if *kind == ChangeKind::Deleted {
                    self.store.update_relationship(record);
                    self.store.free_relationship_id(record.id);
                } else {
                    self.store.update_relationship(record);
                }
                self.cache.invalidate_node(*first_node);
                self.cache.invalidate_node(*second_node);
            }
        }
        for cmd in commands {
            if let Command::Node { kind, record } = cmd {
                if *kind == ChangeKind::Deleted {
                    self.store.update_node(record);
                    self.store.free_node_id(record.id);
                } else {
                    self.store.update_node(record);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphtx_log::InMemoryLog;
    use graphtx_model::{NodeId, RelationshipId, RelationshipTypeId};
    use graphtx_store::{MemoryStore, NoopCacheInvalidator};

    use super::*;
    use crate::config::EngineConfig;

    fn store_and_log() -> (Arc<MemoryStore>, Arc<InMemoryLog>) {
        (Arc::new(MemoryStore::default()), Arc::new(InMemoryLog::default()))
    }

    /// S1.
    #[test]
    fn create_nodes_and_relationship_commits() {
        let (store, log) = store_and_log();
        let mut tx = WriteTransaction::new(store.clone(), Arc::new(NoopCacheInvalidator), log, EngineConfig::default(), 1);
        tx.node_create(NodeId::new(1)).unwrap();
        tx.node_create(NodeId::new(2)).unwrap();
        tx.relationship_create(RelationshipId::new(100), RelationshipTypeId::new(0), NodeId::new(1), NodeId::new(2))
            .unwrap();
        tx.prepare().unwrap();
        tx.commit().unwrap();

        assert_eq!(store.last_committed_tx(), 1);
        assert_eq!(store.get_node(NodeId::new(1)).unwrap().next_rel, Some(RelationshipId::new(100)));
    }

    /// S3.
    #[test]
    fn delete_node_with_live_relationship_fails_prepare() {
        let (store, log) = store_and_log();
        let mut tx = WriteTransaction::new(store.clone(), Arc::new(NoopCacheInvalidator), log, EngineConfig::default(), 1);
        tx.node_create(NodeId::new(1)).unwrap();
        tx.node_create(NodeId::new(2)).unwrap();
        tx.relationship_create(RelationshipId::new(100), RelationshipTypeId::new(0), NodeId::new(1), NodeId::new(2))
            .unwrap();
        tx.staging.nodes.get_mut(&NodeId::new(1)).unwrap().record.in_use = false;

        let err = tx.prepare().unwrap_err();
        assert!(matches!(err, EngineError::IntegrityViolation(_)));
        assert_eq!(store.last_committed_tx(), 0);
    }

    /// S5.
    #[test]
    fn out_of_order_commit_is_rejected() {
        let (store, log) = store_and_log();
        let mut tx = WriteTransaction::new(store.clone(), Arc::new(NoopCacheInvalidator), log, EngineConfig::default(), 2);
        tx.node_create(NodeId::new(1)).unwrap();
        tx.prepare().unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, EngineError::OutOfSequenceCommit { expected: 1, actual: 2 }));
        assert_eq!(store.last_committed_tx(), 0);
    }

    /// Invariant 4: create-then-rollback leaks nothing.
    #[test]
    fn rollback_frees_created_ids() {
        let (store, log) = store_and_log();
        let mut tx = WriteTransaction::new(store.clone(), Arc::new(NoopCacheInvalidator), log, EngineConfig::default(), 1);
        tx.node_create(NodeId::new(1)).unwrap();
        tx.rollback().unwrap();
        assert!(!store.is_in_use_node(NodeId::new(1)));
        assert!(store.is_free_node(NodeId::new(1)));
    }

    /// Invariant 5: durability across recovery.
    #[test]
    fn recovery_replay_reconstructs_committed_state() {
        let (store, log) = store_and_log();
        {
            let mut tx = WriteTransaction::new(store.clone(), Arc::new(NoopCacheInvalidator), log.clone(), EngineConfig::default(), 1);
            tx.node_create(NodeId::new(1)).unwrap();
            tx.node_create(NodeId::new(2)).unwrap();
            tx.relationship_create(RelationshipId::new(100), RelationshipTypeId::new(0), NodeId::new(1), NodeId::new(2))
                .unwrap();
            tx.prepare().unwrap();
            tx.commit().unwrap();
        }

        let fresh_store = Arc::new(MemoryStore::default());
        for logged in log.transactions() {
            let mut recovery = WriteTransaction::recovery(
                fresh_store.clone(),
                Arc::new(NoopCacheInvalidator),
                log.clone(),
                logged.tx_id,
            );
            for cmd in logged.commands {
                recovery.inject_command(cmd).unwrap();
            }
            recovery.commit().unwrap();
        }

        assert_eq!(fresh_store.last_committed_tx(), 1);
        assert_eq!(
            fresh_store.get_node(NodeId::new(1)).unwrap().next_rel,
            Some(RelationshipId::new(100))
        );
        assert_eq!(fresh_store.get_relationship(RelationshipId::new(100)).unwrap().first_node, NodeId::new(1));
    }
}
