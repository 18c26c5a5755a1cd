//! Storage trait definitions

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::attestation::{asid, AsCommand, Attestation, AxFilter};
use crate::storage::error::{StoreError, StoreResult};

/// Retry budget for vanity ASID allocation.
const ASID_MAX_ATTEMPTS: u32 = 16;

/// Core storage operations for attestations.
///
/// All backends must exhibit identical query semantics; the shared
/// implementation lives in [`crate::storage::matcher`] and backends either
/// call it directly or reproduce its results exactly.
pub trait AttestationStore {
    /// Persist a new attestation. Fails with `AlreadyExists` when the id is
    /// taken.
    fn create(&mut self, attestation: Attestation) -> StoreResult<()>;

    /// Retrieve an attestation by id. Tombstoned records are absent.
    fn get(&self, id: &str) -> StoreResult<Option<Attestation>>;

    /// Check whether an attestation exists.
    fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Replace an existing attestation. Fails with `NotFound` when absent.
    fn update(&mut self, attestation: Attestation) -> StoreResult<()>;

    /// Tombstone an attestation. Returns `true` if it existed.
    fn delete(&mut self, id: &str) -> StoreResult<bool>;

    /// All live attestation ids.
    fn list_ids(&self) -> StoreResult<Vec<String>>;

    /// Count of live attestations.
    fn count(&self) -> StoreResult<u64> {
        Ok(self.list_ids()?.len() as u64)
    }

    /// Execute a filter. Results are whole attestations ordered by
    /// timestamp descending and truncated to the filter limit.
    fn query(&self, filter: &AxFilter) -> StoreResult<QueryResult>;

    /// Allocate an ASID for the command and persist the attestation.
    ///
    /// Vanity allocation retries with an incremented attempt counter until
    /// the id is free. A command that declines to name actors is
    /// self-certifying: its actors become `[id]`.
    fn generate_and_create(
        &mut self,
        command: AsCommand,
        source: &str,
    ) -> StoreResult<Attestation> {
        let subject = command.subjects.first().cloned().unwrap_or_default();
        let predicate = command.predicates.first().cloned().unwrap_or_default();
        let context = command.contexts.first().cloned().unwrap_or_default();
        let actor = command.actors.first().cloned().unwrap_or_default();

        let mut id = None;
        for attempt in 0..ASID_MAX_ATTEMPTS {
            let candidate = asid::generate(&subject, &predicate, &context, &actor, attempt);
            if !self.exists(&candidate)? {
                id = Some(candidate);
                break;
            }
        }
        let id = id.ok_or_else(|| StoreError::IdExhausted(subject.clone()))?;

        let now_ms = Utc::now().timestamp_millis();
        let mut attestation = command.into_attestation(id.clone(), source, now_ms);
        if attestation.actors.is_empty() {
            attestation.actors = vec![id];
        }

        self.create(attestation.clone())?;
        Ok(attestation)
    }

    /// Distinct subjects across live attestations, sorted.
    fn subjects(&self) -> StoreResult<Vec<String>>;

    /// Distinct predicates across live attestations, sorted. Feeds the
    /// fuzzy index.
    fn predicates(&self) -> StoreResult<Vec<String>>;

    /// Distinct contexts across live attestations, sorted.
    fn contexts(&self) -> StoreResult<Vec<String>>;

    /// Distinct actors across live attestations, sorted.
    fn actors(&self) -> StoreResult<Vec<String>>;

    /// Storage statistics.
    fn stats(&self) -> StoreResult<StorageStats> {
        Ok(StorageStats {
            total_attestations: self.count()? as usize,
            unique_subjects: self.subjects()?.len(),
            unique_predicates: self.predicates()?.len(),
            unique_contexts: self.contexts()?.len(),
            unique_actors: self.actors()?.len(),
        })
    }
}

/// Result of a query: matching attestations plus aggregate counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub attestations: Vec<Attestation>,
    pub summary: QuerySummary,
}

/// Aggregated information about query results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuerySummary {
    pub total_attestations: usize,
    pub unique_subjects: HashMap<String, usize>,
    pub unique_predicates: HashMap<String, usize>,
    pub unique_contexts: HashMap<String, usize>,
    pub unique_actors: HashMap<String, usize>,
}

impl QuerySummary {
    /// Tally per-field frequencies over a result set.
    pub fn from_attestations(attestations: &[Attestation]) -> Self {
        let mut summary = Self {
            total_attestations: attestations.len(),
            ..Default::default()
        };

        for attestation in attestations {
            for subject in &attestation.subjects {
                *summary.unique_subjects.entry(subject.clone()).or_insert(0) += 1;
            }
            for predicate in &attestation.predicates {
                *summary
                    .unique_predicates
                    .entry(predicate.clone())
                    .or_insert(0) += 1;
            }
            for context in &attestation.contexts {
                *summary.unique_contexts.entry(context.clone()).or_insert(0) += 1;
            }
            for actor in &attestation.actors {
                *summary.unique_actors.entry(actor.clone()).or_insert(0) += 1;
            }
        }

        summary
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub total_attestations: usize,
    pub unique_subjects: usize,
    pub unique_predicates: usize,
    pub unique_contexts: usize,
    pub unique_actors: usize,
}
