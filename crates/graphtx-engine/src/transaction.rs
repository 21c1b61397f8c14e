use std::sync::Arc;

use graphtx_log::{Command, LogicalLog};
use graphtx_model::{
    NodeId, NodeRecord, Owner, PropertyIndexId, PropertyIndexRecord, PropertyRecord, PropertyRecordId, RelationshipId,
    RelationshipRecord, RelationshipTypeId, RelationshipTypeRecord,
};
use graphtx_store::{CacheInvalidator, GraphStore};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::staging::{StagedRecord, Staging};

/// Where a [`WriteTransaction`] sits in the stage -> prepare -> commit /
/// rollback state machine (spec.md §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxPhase {
    Active,
    Prepared,
    Committed,
    RolledBack,
}

/// The write-transaction engine (spec.md §4.1). Owns its staging maps and
/// command list exclusively until prepare; nothing outside may observe
/// them before then (spec.md §3 Ownership).
pub struct WriteTransaction {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) cache: Arc<dyn CacheInvalidator>,
    pub(crate) log: Arc<dyn LogicalLog>,
    pub(crate) config: EngineConfig,
    pub(crate) staging: Staging,
    phase: TxPhase,
    commit_tx_id: i64,
    recovery: bool,
    prepared_commands: Vec<Command>,
}

impl WriteTransaction {
    /// Begin a new transaction that will attempt to commit as `commit_tx_id`.
    pub fn new(
        store: Arc<dyn GraphStore>,
        cache: Arc<dyn CacheInvalidator>,
        log: Arc<dyn LogicalLog>,
        config: EngineConfig,
        commit_tx_id: i64,
    ) -> Self {
        Self {
            store,
            cache,
            log,
            config,
            staging: Staging::default(),
            phase: TxPhase::Active,
            commit_tx_id,
            recovery: false,
            prepared_commands: Vec::new(),
        }
    }

    /// A transaction reconstituted from the log for recovery replay
    /// (spec.md §4.1 "Commit (recovery replay)"). Commands are pushed in
    /// directly via [`Self::inject_command`] instead of going through the
    /// normal create/delete API; `tx_id` is the id the command batch was
    /// logged under (`LoggedTransaction::tx_id`).
    pub fn recovery(store: Arc<dyn GraphStore>, cache: Arc<dyn CacheInvalidator>, log: Arc<dyn LogicalLog>, tx_id: i64) -> Self {
        Self {
            store,
            cache,
            log,
            config: EngineConfig::default(),
            staging: Staging::default(),
            phase: TxPhase::Active,
            commit_tx_id: tx_id,
            recovery: true,
            prepared_commands: Vec::new(),
        }
    }

    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    /// The transaction's assigned commit id, public for callers (like the
    /// coordinator) that need to report it after commit.
    pub fn id(&self) -> i64 {
        self.commit_tx_id
    }

    /// A transaction with nothing staged has made no writes.
    pub fn is_read_only(&self) -> bool {
        self.staging.nodes.is_empty()
            && self.staging.relationships.is_empty()
            && self.staging.property_records.is_empty()
            && self.staging.property_indexes.is_empty()
            && self.staging.relationship_types.is_empty()
    }

    pub(crate) fn set_phase(&mut self, phase: TxPhase) {
        self.phase = phase;
    }

    pub(crate) fn require_active(&self) -> Result<(), EngineError> {
        match self.phase {
            TxPhase::Active => Ok(()),
            TxPhase::Prepared => Err(EngineError::AlreadyPrepared),
            TxPhase::Committed => Err(EngineError::AlreadyCommitted),
            TxPhase::RolledBack => Err(EngineError::AlreadyRolledBack),
        }
    }

    pub(crate) fn commit_tx_id(&self) -> i64 {
        self.commit_tx_id
    }

    pub(crate) fn is_recovery(&self) -> bool {
        self.recovery
    }

    pub(crate) fn take_prepared_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.prepared_commands)
    }

    pub(crate) fn set_prepared_commands(&mut self, commands: Vec<Command>) {
        self.prepared_commands = commands;
    }

    pub(crate) fn push_injected_command(&mut self, cmd: Command) {
        self.prepared_commands.push(cmd);
    }

    // -- staging-map-first record access -----------------------------------
    //
    // Every read within a transaction must go through these: a cache miss
    // loads from the store and inserts before returning, so that every
    // subsequent read (even outside this call) sees the same staged
    // instance (spec.md §4.1 "Staging invariants").

    pub(crate) fn ensure_node_staged(&mut self, id: NodeId) -> Result<(), EngineError> {
        if !self.staging.nodes.contains_key(&id) {
            let rec = self
                .store
                .get_node(id)
                .ok_or(EngineError::NodeAlreadyDeleted(id))?;
            self.staging.nodes.insert(id, StagedRecord::existing(rec));
        }
        Ok(())
    }

    pub(crate) fn node(&mut self, id: NodeId) -> Result<NodeRecord, EngineError> {
        self.ensure_node_staged(id)?;
        Ok(self.staging.nodes[&id].record.clone())
    }

    pub(crate) fn with_node_mut<F: FnOnce(&mut NodeRecord)>(&mut self, id: NodeId, f: F) -> Result<(), EngineError> {
        self.ensure_node_staged(id)?;
        f(&mut self.staging.nodes.get_mut(&id).unwrap().record);
        Ok(())
    }

    pub(crate) fn ensure_relationship_staged(&mut self, id: RelationshipId) -> Result<(), EngineError> {
        if !self.staging.relationships.contains_key(&id) {
            let rec = self
                .store
                .get_relationship(id)
                .ok_or(EngineError::RelationshipAlreadyDeleted(id))?;
            self.staging.relationships.insert(id, StagedRecord::existing(rec));
        }
        Ok(())
    }

    pub(crate) fn relationship(&mut self, id: RelationshipId) -> Result<RelationshipRecord, EngineError> {
        self.ensure_relationship_staged(id)?;
        Ok(self.staging.relationships[&id].record.clone())
    }

    pub(crate) fn with_relationship_mut<F: FnOnce(&mut RelationshipRecord)>(
        &mut self,
        id: RelationshipId,
        f: F,
    ) -> Result<(), EngineError> {
        self.ensure_relationship_staged(id)?;
        f(&mut self.staging.relationships.get_mut(&id).unwrap().record);
        Ok(())
    }

    pub(crate) fn ensure_property_record_staged(&mut self, id: PropertyRecordId, owner: Owner) -> Result<(), EngineError> {
        if !self.staging.property_records.contains_key(&id) {
            let rec = self
                .store
                .get_property_record(id)
                .unwrap_or_else(|| PropertyRecord::new(id, owner));
            self.staging.property_records.insert(id, StagedRecord::existing(rec));
        }
        Ok(())
    }

    pub(crate) fn property_record(&mut self, id: PropertyRecordId, owner: Owner) -> Result<PropertyRecord, EngineError> {
        self.ensure_property_record_staged(id, owner)?;
        Ok(self.staging.property_records[&id].record.clone())
    }

    pub(crate) fn with_property_record_mut<F: FnOnce(&mut PropertyRecord)>(
        &mut self,
        id: PropertyRecordId,
        owner: Owner,
        f: F,
    ) -> Result<(), EngineError> {
        self.ensure_property_record_staged(id, owner)?;
        f(&mut self.staging.property_records.get_mut(&id).unwrap().record);
        Ok(())
    }

    pub(crate) fn stage_new_property_record(&mut self, record: PropertyRecord) {
        self.staging
            .property_records
            .insert(record.id, StagedRecord::new(record));
    }

    pub(crate) fn stage_new_relationship(&mut self, record: RelationshipRecord) {
        self.staging.relationships.insert(record.id, StagedRecord::new(record));
    }

    pub(crate) fn property_index(&mut self, id: PropertyIndexId) -> Result<Option<PropertyIndexRecord>, EngineError> {
        if let Some(staged) = self.staging.property_indexes.get(&id) {
            return Ok(Some(staged.record.clone()));
        }
        if let Some(rec) = self.store.get_property_index(id) {
            self.staging.property_indexes.insert(id, StagedRecord::existing(rec.clone()));
            return Ok(Some(rec));
        }
        Ok(None)
    }

    pub(crate) fn relationship_type(&mut self, id: RelationshipTypeId) -> Result<Option<RelationshipTypeRecord>, EngineError> {
        if let Some(staged) = self.staging.relationship_types.get(&id) {
            return Ok(Some(staged.record.clone()));
        }
        if let Some(rec) = self.store.get_relationship_type(id) {
            self.staging
                .relationship_types
                .insert(id, StagedRecord::existing(rec.clone()));
            return Ok(Some(rec));
        }
        Ok(None)
    }
}
