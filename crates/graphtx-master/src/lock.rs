//! The lock manager contract the coordinator brokers on behalf of slaves
//! (spec.md §4.4 "Lock acquisition on behalf of slaves", §9 "Polymorphic
//! lock grab", "Lockable placeholder objects").
//!
//! The real deadlock detector (a wait-for-graph walk over blocked lock
//! requests) is an external collaborator per spec.md §1/§9 — out of scope
//! here. [`InMemoryLockManager`] is a test double: it refuses a conflicting
//! grab immediately rather than blocking and detecting cycles, which is
//! enough to drive the `NotLocked`/`Deadlock` response shapes without
//! pulling in a real scheduler.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// A lockable entity kind. Per spec.md §9 the abstract requirement is a
/// key space of `(entity-kind, id)`, not the source's dummy placeholder
/// objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Relationship,
}

impl TryFrom<u8> for EntityKind {
    type Error = ();

    /// Decode a raw, untrusted entity-kind tag as it would arrive over the
    /// wire. An unrecognized tag is the "illegal-resource" case spec.md
    /// §4.4/§7 requires the coordinator to turn into `NOT_LOCKED` rather
    /// than a panic or a fabricated entity kind.
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(EntityKind::Node),
            1 => Ok(EntityKind::Relationship),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Write,
}

/// Result of a lock grab (spec.md §7): never panicked on, always returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockStatus {
    OkLocked,
    NotLocked,
    Deadlock(String),
}

/// Identifies the transaction a lock is held on behalf of, so the
/// per-transaction releaser can free everything it acquired on commit or
/// rollback (spec.md §4.4: "Every lock acquired is registered with the
/// transaction-scoped lock releaser so rollback/commit frees it.").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LockOwnerId(pub u64);

pub trait LockManager: Send + Sync {
    fn acquire(&self, owner: LockOwnerId, kind: LockKind, entity: EntityKind, id: u64) -> LockStatus;
    /// Free every lock held by `owner`, matching spec.md §4.4's
    /// transaction-scoped releaser invoked on commit or rollback.
    fn release_all(&self, owner: LockOwnerId);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Key(EntityKind, u64);

enum Held {
    Read(HashSet<LockOwnerId>),
    Write(LockOwnerId),
}

#[derive(Default)]
pub struct InMemoryLockManager {
    held: Mutex<HashMap<Key, Held>>,
}

/// What `acquire` needs to do to `held` once the read-only decision below
/// has been made; kept separate so no reference derived from `held` is
/// ever alive across a call that mutates it.
enum Action {
    InsertNewReader,
    Insert(Held),
    None,
}

impl LockManager for InMemoryLockManager {
    fn acquire(&self, owner: LockOwnerId, kind: LockKind, entity: EntityKind, id: u64) -> LockStatus {
        let key = Key(entity, id);
        let mut held = self.held.lock();

        let (status, action) = match held.get(&key) {
            None => match kind {
                LockKind::Read => (LockStatus::OkLocked, Action::Insert(Held::Read(HashSet::from([owner])))),
                LockKind::Write => (LockStatus::OkLocked, Action::Insert(Held::Write(owner))),
            },
            Some(Held::Read(_)) if kind == LockKind::Read => (LockStatus::OkLocked, Action::InsertNewReader),
            Some(Held::Read(readers)) if readers.len() == 1 && readers.contains(&owner) => {
                (LockStatus::OkLocked, Action::Insert(Held::Write(owner)))
            }
            Some(Held::Read(_)) => (
                LockStatus::Deadlock(format!("entity {:?}/{} already read-locked by another owner", entity, id)),
                Action::None,
            ),
            Some(Held::Write(existing)) if *existing == owner => (LockStatus::OkLocked, Action::None),
            Some(Held::Write(_)) => (
                LockStatus::Deadlock(format!("entity {:?}/{} already write-locked by another owner", entity, id)),
                Action::None,
            ),
        };

        match action {
            Action::InsertNewReader => {
                if let Some(Held::Read(readers)) = held.get_mut(&key) {
                    readers.insert(owner);
                }
            }
            Action::Insert(new_held) => {
                held.insert(key, new_held);
            }
            Action::None => {}
        }

        status
    }

    fn release_all(&self, owner: LockOwnerId) {
        self.held.lock().retain(|_, held| match held {
            Held::Read(readers) => {
                readers.remove(&owner);
                !readers.is_empty()
            }
            Held::Write(existing) => *existing != owner,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_decodes_known_tags_and_rejects_unknown() {
        assert_eq!(EntityKind::try_from(0u8), Ok(EntityKind::Node));
        assert_eq!(EntityKind::try_from(1u8), Ok(EntityKind::Relationship));
        assert_eq!(EntityKind::try_from(2u8), Err(()));
    }

    #[test]
    fn second_reader_then_upgrade_is_rejected_for_the_other_owner() {
        let locks = InMemoryLockManager::default();
        let a = LockOwnerId(1);
        let b = LockOwnerId(2);
        assert_eq!(locks.acquire(a, LockKind::Read, EntityKind::Node, 1), LockStatus::OkLocked);
        assert_eq!(locks.acquire(b, LockKind::Read, EntityKind::Node, 1), LockStatus::OkLocked);
        assert!(matches!(locks.acquire(a, LockKind::Write, EntityKind::Node, 1), LockStatus::Deadlock(_)));
    }
}
