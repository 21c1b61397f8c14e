use std::time::Duration;

/// Tunables the original hardcoded as 5 s / 30 s / 1000 (spec.md §4.4,
/// §6: "Reaper configuration... SHOULD be configurable in a
/// reimplementation; they are not here.").
#[derive(Clone, Copy, Debug)]
pub struct CoordinatorConfig {
    /// How often the reaper wakes up to scan `txTable`.
    pub reaper_period: Duration,
    /// A transaction idle at least this long is a reap candidate.
    pub idle_threshold: Duration,
    /// Consecutive ids reserved per `allocateIds` call.
    pub grab_size: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            reaper_period: Duration::from_secs(5),
            idle_threshold: Duration::from_secs(30),
            grab_size: 1000,
        }
    }
}
