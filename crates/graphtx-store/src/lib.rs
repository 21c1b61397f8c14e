//! Store-surface contract the write-transaction engine is built against.
//!
//! Everything here is a trait plus, for testing, a [`memory::MemoryStore`]
//! reference implementation. Persistence itself — page layout, the free
//! list's on-disk format, WAL/log framing — is an external collaborator
//! per spec.md §1 and is not implemented in this crate.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::{MemoryIdAllocator, MemoryStore, RecordingCache};
pub use traits::{CacheInvalidator, GraphStore, IdBatch, IdBatchAllocator, IdType, NoopCacheInvalidator};
