//! SQLite storage backend for ATS.
//!
//! Implements the `ats_core::storage::AttestationStore` contract plus
//! watcher persistence. Filter semantics are delegated to the shared
//! matcher in ats-core so that this backend and the in-memory backend are
//! interchangeable, signatures included.

pub mod error;
pub mod json;
pub mod migrate;
mod store;
mod watcher_store;

pub use error::{Result, SqliteError};
pub use store::SqliteStore;
