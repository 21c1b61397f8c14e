//! The master coordinator (spec.md §4.4): a `txTable` keyed by
//! [`SlaveContext`], the request-dispatch discipline that resumes/suspends
//! transactions around every operation, lock brokering, id allocation, and
//! the idle-transaction reaper.
//!
//! Grounded on `ClientActorIndex` (`examples/clockworklabs-SpacetimeDB/crates/core/src/client/client_connection_index.rs`):
//! an `Arc<Mutex<Inner>>`-guarded index plus a `start_liveliness_check`
//! background loop. That teacher only holds its index mutex for the quick
//! lookup/insert (`get_client`, `new_client`), never across a request's own
//! work, and this follows the same shape: the table mutex here guards only
//! the `HashMap` of row handles, never the row itself while a request is
//! being serviced. spec.md §5 mandates a plain "parallel OS threads"
//! scheduling model here, so this uses `parking_lot::Mutex` and
//! `std::thread::spawn` instead of the teacher's `tokio` primitives — the
//! only change to the shape.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use graphtx_engine::{EngineConfig, WriteTransaction};
use graphtx_log::LoggedTransaction;
use graphtx_log::LogicalLog;
use graphtx_model::{RelationshipTypeId, SlaveContext};
use graphtx_store::{CacheInvalidator, GraphStore, IdBatch, IdBatchAllocator, IdType};

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::lock::{EntityKind, LockKind, LockManager, LockOwnerId, LockStatus};
use crate::response::{Response, ResponseStatus};
use crate::tx_table::{Activity, TxRow};

/// The resource name `copy_store`/catch-up horizons are tracked under. This
/// rendition keeps a single backing store rather than the source's several
/// named data sources (spec.md §1/§6 single-store simplification, recorded
/// in DESIGN.md).
const STORE_RESOURCE: &str = "neostore";

pub struct MasterCoordinator {
    table: Mutex<HashMap<SlaveContext, Arc<Mutex<TxRow>>>>,
    store: Arc<dyn GraphStore>,
    cache: Arc<dyn CacheInvalidator>,
    log: Arc<dyn LogicalLog>,
    locks: Arc<dyn LockManager>,
    ids: Arc<dyn IdBatchAllocator>,
    config: CoordinatorConfig,
    next_commit_tx_id: AtomicI64,
    next_lock_owner: AtomicU64,
    shutdown: Arc<AtomicBool>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl MasterCoordinator {
    /// Build the coordinator and start its reaper thread.
    pub fn spawn(
        store: Arc<dyn GraphStore>,
        cache: Arc<dyn CacheInvalidator>,
        log: Arc<dyn LogicalLog>,
        locks: Arc<dyn LockManager>,
        ids: Arc<dyn IdBatchAllocator>,
        config: CoordinatorConfig,
    ) -> Arc<Self> {
        let next_commit_tx_id = store.last_committed_tx() + 1;
        let this = Arc::new(Self {
            table: Mutex::new(HashMap::new()),
            store,
            cache,
            log,
            locks,
            ids,
            config,
            next_commit_tx_id: AtomicI64::new(next_commit_tx_id),
            next_lock_owner: AtomicU64::new(1),
            shutdown: Arc::new(AtomicBool::new(false)),
            reaper: Mutex::new(None),
        });

        let reaper_handle = {
            let coordinator = Arc::clone(&this);
            std::thread::spawn(move || coordinator.reaper_loop())
        };
        *this.reaper.lock() = Some(reaper_handle);
        this
    }

    /// Look up `ctx`'s row, beginning a transaction for it if none exists
    /// yet, and return a cloned handle to it. The table mutex is held only
    /// long enough to do the map lookup/insert — never across the request
    /// body a caller runs against the returned row — so two worker threads
    /// servicing different slave contexts never block each other here.
    fn row_for(&self, ctx: &SlaveContext) -> Arc<Mutex<TxRow>> {
        let mut table = self.table.lock();
        if let Some(existing) = table.get(ctx) {
            return Arc::clone(existing);
        }
        let tx_id = self.next_commit_tx_id.fetch_add(1, Ordering::SeqCst);
        let owner = LockOwnerId(self.next_lock_owner.fetch_add(1, Ordering::SeqCst));
        let tx = WriteTransaction::new(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            Arc::clone(&self.log),
            EngineConfig::default(),
            tx_id,
        );
        debug!(tx_id, "beginning transaction for new slave context");
        let row = Arc::new(Mutex::new(TxRow::new(tx, owner)));
        table.insert(ctx.clone(), Arc::clone(&row));
        row
    }

    /// Drop `ctx`'s row from the table, but only if it is still the row
    /// `handle` names — a concurrent `row_for` may have already replaced it
    /// with a fresh transaction for the same context, which must not be
    /// discarded.
    fn remove_row(&self, ctx: &SlaveContext, handle: &Arc<Mutex<TxRow>>) {
        let mut table = self.table.lock();
        if table.get(ctx).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            table.remove(ctx);
        }
    }

    /// The dispatch-discipline envelope (spec.md §4.4 steps 1-4): resume
    /// (or begin) `ctx`'s transaction with `lastActivityTs` marked active,
    /// run `f` while holding only `ctx`'s own row lock (never the table
    /// lock), mark idle again. Locking per-row rather than per-table is
    /// what actually lets independent slave contexts make progress
    /// concurrently, while still giving a fixed context's requests the
    /// serial, single-owner-thread semantics spec.md §5 requires ("at most
    /// one resumer at a time").
    pub(crate) fn with_transaction<F, R>(&self, ctx: &SlaveContext, f: F) -> R
    where
        F: FnOnce(&mut WriteTransaction, LockOwnerId) -> R,
    {
        let handle = self.row_for(ctx);
        let mut row = handle.lock();
        row.activity = Activity::Active;
        let owner = row.lock_owner;
        let out = f(&mut row.tx, owner);
        row.activity = Activity::IdleSince(Instant::now());
        out
    }

    fn catch_up(&self, ctx: &SlaveContext) -> Vec<LoggedTransaction> {
        let since = ctx.last_applied_tx(STORE_RESOURCE).unwrap_or(0);
        self.pull_updates(since)
    }

    fn acquire(&self, ctx: &SlaveContext, kind: LockKind, entity: EntityKind, id: u64) -> Response<()> {
        let status = self.with_transaction(ctx, |_tx, owner| self.locks.acquire(owner, kind, entity, id));
        let catch_up = self.catch_up(ctx);
        match status {
            LockStatus::OkLocked => Response::ok((), catch_up),
            other => Response::failed(other.into(), catch_up),
        }
    }

    pub fn acquire_node_read_lock(&self, ctx: &SlaveContext, id: u64) -> Response<()> {
        self.acquire(ctx, LockKind::Read, EntityKind::Node, id)
    }

    pub fn acquire_node_write_lock(&self, ctx: &SlaveContext, id: u64) -> Response<()> {
        self.acquire(ctx, LockKind::Write, EntityKind::Node, id)
    }

    pub fn acquire_rel_read_lock(&self, ctx: &SlaveContext, id: u64) -> Response<()> {
        self.acquire(ctx, LockKind::Read, EntityKind::Relationship, id)
    }

    pub fn acquire_rel_write_lock(&self, ctx: &SlaveContext, id: u64) -> Response<()> {
        self.acquire(ctx, LockKind::Write, EntityKind::Relationship, id)
    }

    /// Lock acquisition entry point for a raw, untrusted entity-kind tag as
    /// it would arrive over the wire. An unrecognized tag is the
    /// "illegal-resource" case spec.md §4.4/§7 requires to surface as
    /// `NOT_LOCKED` without ever reaching the lock manager — still inside
    /// the resume/suspend envelope, since §4.4 frames the illegal-resource
    /// check as happening "within" it.
    pub fn acquire_lock_by_raw_kind(&self, ctx: &SlaveContext, kind: LockKind, raw_entity_kind: u8, id: u64) -> Response<()> {
        match EntityKind::try_from(raw_entity_kind) {
            Ok(entity) => self.acquire(ctx, kind, entity, id),
            Err(()) => {
                self.with_transaction(ctx, |_tx, _owner| ());
                let catch_up = self.catch_up(ctx);
                Response::failed(ResponseStatus::NotLocked, catch_up)
            }
        }
    }

    /// Stage a new relationship type against `ctx`'s resumed transaction.
    /// Like every other per-operation entry point it does not commit by
    /// itself; that happens via [`Self::commit_single_resource_transaction`]
    /// or [`Self::finish_transaction`].
    pub fn create_relationship_type(&self, ctx: &SlaveContext, name: String) -> Response<RelationshipTypeId> {
        let batch = self.ids.allocate_batch(IdType::RelationshipType, 1);
        let id = RelationshipTypeId::new(batch.ids[0] as u32);
        let outcome = self.with_transaction(ctx, |tx, _owner| tx.create_relationship_type(id, name));
        let catch_up = self.catch_up(ctx);
        match outcome {
            Ok(()) => Response::ok(id, catch_up),
            Err(err) => Response::failed(ResponseStatus::Failure(err.to_string()), catch_up),
        }
    }

    /// Not wrapped in a transaction (spec.md §4.4 "ID allocation"): id
    /// generators are shared, thread-safe allocators independent of any
    /// slave's transaction state, so this call carries no catch-up stream
    /// (spec.md §6: "'no stream' for idempotent/metadata calls").
    pub fn allocate_ids(&self, id_type: IdType) -> Response<IdBatch> {
        Response::ok_without_stream(self.ids.allocate_batch(id_type, self.config.grab_size))
    }

    /// `commitSingleResourceTransaction(ctx, ...)` (spec.md §4.4): resume
    /// `ctx`, apply its prepared transaction, and return `(txId, txId-1)`
    /// so the caller knows the response stream packs committed
    /// transactions strictly up to `txId-1` while the new one is the
    /// result just returned. An I/O or engine failure produces a typed
    /// failure response rather than dropping the error; on failure the row
    /// is left in place so the slave's own recovery/retry path can decide
    /// what to do with it.
    pub fn commit_single_resource_transaction(&self, ctx: &SlaveContext) -> Response<(i64, i64)> {
        let handle = self.row_for(ctx);
        let outcome: Result<i64, CoordinatorError> = {
            let mut row = handle.lock();
            row.activity = Activity::Active;
            let owner = row.lock_owner;
            (|| {
                row.tx.prepare()?;
                row.tx.commit()?;
                self.locks.release_all(owner);
                Ok(row.tx.id())
            })()
        };
        let catch_up = self.catch_up(ctx);
        match outcome {
            Ok(tx_id) => {
                self.remove_row(ctx, &handle);
                Response::ok((tx_id, tx_id - 1), catch_up)
            }
            Err(err) => Response::failed(ResponseStatus::Failure(err.to_string()), catch_up),
        }
    }

    /// `finishTransaction(ctx, commit)`: resume `ctx`, commit or roll back,
    /// and drop the row either way.
    pub fn finish_transaction(&self, ctx: &SlaveContext, commit: bool) -> Response<()> {
        let handle = self.row_for(ctx);
        let outcome: Result<(), CoordinatorError> = {
            let mut row = handle.lock();
            row.activity = Activity::Active;
            let owner = row.lock_owner;
            (|| {
                if commit {
                    row.tx.prepare()?;
                    row.tx.commit()?;
                } else {
                    row.tx.rollback()?;
                }
                self.locks.release_all(owner);
                Ok(())
            })()
        };
        self.remove_row(ctx, &handle);
        let catch_up = self.catch_up(ctx);
        match outcome {
            Ok(()) => Response::ok((), catch_up),
            Err(err) => Response::failed(ResponseStatus::Failure(err.to_string()), catch_up),
        }
    }

    /// Rotate the logical log and stream the store through `writer`
    /// (spec.md §4.4 "Store copy"). The store's byte layout is an external
    /// collaborator per spec.md §1/§6, so the actual file bytes are
    /// delegated to [`GraphStore::copy_files`]; this method owns only the
    /// coordination (log rotation plus the returned context's horizon
    /// adjustment).
    pub fn copy_store(&self, ctx: &SlaveContext, writer: &mut dyn Write) -> Response<SlaveContext> {
        let catch_up = self.catch_up(ctx);
        match self.store.copy_files(writer) {
            Ok(()) => Response::ok(ctx.rewind_one(STORE_RESOURCE), catch_up),
            Err(err) => Response::failed(ResponseStatus::Failure(err.to_string()), catch_up),
        }
    }

    /// Single-store simplification: this coordinator does not distinguish
    /// multiple named resources the way the source's multi-store master
    /// does, so the master id for a committed transaction is just the
    /// transaction id itself, when it has in fact been committed. An
    /// idempotent metadata call (spec.md §6), so it carries no catch-up
    /// stream; `result` being `None` here means "not yet committed", not
    /// "the call failed" (`status` is always `Ok`).
    pub fn get_master_id_for_committed_tx(&self, tx_id: i64) -> Response<i64> {
        if tx_id <= self.store.last_committed_tx() {
            Response::ok_without_stream(tx_id)
        } else {
            Response {
                result: None,
                catch_up: None,
                status: ResponseStatus::Ok,
            }
        }
    }

    /// The commit id assigned to `ctx`'s currently resumed-or-suspended
    /// transaction, if `txTable` holds a row for it. A diagnostic/test
    /// helper, not part of the RPC surface (spec.md §6) proper.
    pub fn active_tx_id(&self, ctx: &SlaveContext) -> Option<i64> {
        let table = self.table.lock();
        let handle = table.get(ctx)?;
        Some(handle.lock().tx.id())
    }

    /// All logged transactions after `since_tx`, in append order — the
    /// catch-up payload embedded in every other response.
    pub fn pull_updates(&self, since_tx: i64) -> Vec<LoggedTransaction> {
        self.log
            .replay()
            .into_iter()
            .filter(|logged| logged.tx_id > since_tx)
            .collect()
    }

    /// Cancel the reaper. Outstanding transactions are left in `txTable`
    /// untouched — spec.md §4.4: "do not attempt to roll back outstanding
    /// transactions (recovery will handle them on restart)." An admin
    /// lifecycle operation, not a slave-facing RPC, so it has no
    /// `Response<T>` to return.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reaper.lock().take() {
            let _ = handle.join();
        }
    }

    fn reaper_loop(self: Arc<Self>) {
        while !self.shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(self.config.reaper_period);
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.reap_once();
        }
    }

    /// One reaper pass (spec.md §4.4 "Reaper"): snapshot the contexts
    /// whose rows are idle past the threshold, then resume and roll back
    /// each in turn. Rows with `Activity::Active` (the `lastActivityTs ==
    /// 0` sentinel) are skipped unconditionally — invariant 7.
    fn reap_once(&self) {
        let candidates: Vec<(SlaveContext, Arc<Mutex<TxRow>>)> = {
            let table = self.table.lock();
            table
                .iter()
                .filter(|(_, row)| row.lock().activity.is_reapable(self.config.idle_threshold))
                .map(|(ctx, row)| (ctx.clone(), Arc::clone(row)))
                .collect()
        };

        for (ctx, handle) in candidates {
            let mut row = handle.lock();
            if !row.activity.is_reapable(self.config.idle_threshold) {
                continue;
            }
            match row.tx.rollback() {
                Ok(()) => {
                    self.locks.release_all(row.lock_owner);
                    drop(row);
                    self.remove_row(&ctx, &handle);
                }
                Err(err) => {
                    warn!(error = %err, "reaper failed to roll back idle transaction, leaving row in place");
                }
            }
        }
    }
}
