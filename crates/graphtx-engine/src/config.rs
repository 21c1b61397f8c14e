/// Tunables the original hardcoded (spec.md §6: "Reaper configuration ...
/// SHOULD be configurable in a reimplementation; they are not here."). The
/// property-chain payload cap is the one of these that belongs to the
/// engine rather than the master coordinator.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Maximum total size, in bytes, of live blocks in one property record
    /// (spec.md §4.3).
    pub payload_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { payload_cap: 64 }
    }
}
