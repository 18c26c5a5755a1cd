//! Storage contract consumed by the AX pipeline.
//!
//! The trait is backend-agnostic; the matcher centralises filter semantics
//! so every backend returns identical results for identical inputs. The
//! in-memory backend lives here; durable backends live in their own crates.

pub mod error;
pub mod matcher;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use matcher::{apply_filter, matches_filter, matches_over};
pub use memory::MemoryStore;
pub use traits::{AttestationStore, QueryResult, QuerySummary, StorageStats};
