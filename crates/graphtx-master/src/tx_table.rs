use std::time::{Duration, Instant};

use graphtx_engine::WriteTransaction;

use crate::lock::LockOwnerId;

/// Rendition of `lastActivityTs` (spec.md §4.4): `0` means "active, do not
/// reap", any other value is the instant it went idle. A sentinel integer
/// does not carry its meaning in Rust the way an `Option` does, so this is
/// modeled as a two-variant enum instead of literally porting the `i64`.
#[derive(Clone, Copy, Debug)]
pub enum Activity {
    Active,
    IdleSince(Instant),
}

impl Activity {
    pub fn is_reapable(&self, idle_threshold: Duration) -> bool {
        match self {
            Activity::Active => false,
            Activity::IdleSince(at) => at.elapsed() >= idle_threshold,
        }
    }
}

/// One row of `txTable`: the resumed-or-suspended transaction plus its
/// liveness bookkeeping and the lock-owner token its acquisitions are
/// registered under.
pub struct TxRow {
    pub tx: WriteTransaction,
    pub activity: Activity,
    pub lock_owner: LockOwnerId,
}

impl TxRow {
    pub fn new(tx: WriteTransaction, lock_owner: LockOwnerId) -> Self {
        Self {
            tx,
            activity: Activity::Active,
            lock_owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_is_never_reapable_regardless_of_threshold() {
        assert!(!Activity::Active.is_reapable(Duration::from_secs(0)));
        assert!(!Activity::Active.is_reapable(Duration::from_nanos(1)));
    }

    #[test]
    fn idle_past_threshold_is_reapable() {
        let idle = Activity::IdleSince(Instant::now() - Duration::from_secs(60));
        assert!(idle.is_reapable(Duration::from_secs(30)));
    }

    #[test]
    fn idle_within_threshold_is_not_reapable() {
        let idle = Activity::IdleSince(Instant::now());
        assert!(!idle.is_reapable(Duration::from_secs(30)));
    }
}
