//! ATS watcher engine.
//!
//! Watchers are saved AX filters paired with an action. When a new
//! attestation is created, the engine matches it against the enabled set
//! (same overlap semantics as storage queries), applies per-watcher rate
//! limits, and drives python or webhook actions asynchronously with
//! exponential-backoff retries.
//!
//! The watcher data model lives in `ats_core::watcher`; persistence lives
//! in `ats-sqlite`. This crate owns the runtime only.

mod action;
mod engine;

pub use action::{
    python_payload, webhook_payload, ActionTransport, HttpTransport, TransportResponse, WatchError,
};
pub use engine::{EngineConfig, WatchEngine};
