use std::collections::BTreeMap;

/// Identifies a remote (slave) transaction across the wire.
///
/// Equality is by all four fields (spec.md §3/§6). `last_applied` carries
/// the slave's knowledge horizon per named resource, used by the master to
/// compute the catch-up stream embedded in every response.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlaveContext {
    pub session_id: i64,
    pub machine_id: i32,
    pub event_id: i32,
    pub last_applied: BTreeMap<String, i64>,
}

impl SlaveContext {
    pub fn new(session_id: i64, machine_id: i32, event_id: i32) -> Self {
        Self {
            session_id,
            machine_id,
            event_id,
            last_applied: BTreeMap::new(),
        }
    }

    pub fn last_applied_tx(&self, resource: &str) -> Option<i64> {
        self.last_applied.get(resource).copied()
    }

    /// Adjust the recorded horizon for `resource` downward by one, so the
    /// slave is guaranteed to receive at least one transaction on its next
    /// pull and thereby learn the master id assigned to every txId it
    /// already applied (spec.md §4.4 "Store copy").
    pub fn rewind_one(&self, resource: &str) -> Self {
        let mut next = self.clone();
        if let Some(tx_id) = next.last_applied.get_mut(resource) {
            *tx_id -= 1;
        }
        next
    }
}
