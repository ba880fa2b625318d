//! Memory store: processed pages per user, deduplicated by content hash

pub mod store;
pub mod types;

pub use store::{InMemoryStore, MemoryStore};
pub use types::{content_hash, AddOutcome, MemoryEntry, MemoryMetadata};
