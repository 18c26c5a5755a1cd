//! In-memory storage backend.
//!
//! A HashMap-based implementation for testing and short-lived processes.
//! Deletion is tombstone-based, matching the durable backends: a deleted
//! record stays in the map with `deleted_at` set and disappears from every
//! read path.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::attestation::{Attestation, AxFilter};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::matcher;
use crate::storage::traits::{AttestationStore, QueryResult, QuerySummary};

#[derive(Debug, Clone)]
struct Record {
    attestation: Attestation,
    deleted_at: Option<i64>,
}

/// In-memory attestation store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Record>,
    numeric_predicates: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the numeric-predicate set driving `over` comparisons,
    /// usually sourced from a `QueryExpander`.
    pub fn with_numeric_predicates(mut self, predicates: Vec<String>) -> Self {
        self.numeric_predicates = predicates;
        self
    }

    fn live(&self) -> impl Iterator<Item = &Attestation> {
        self.records
            .values()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| &r.attestation)
    }

    fn distinct(&self, field: impl Fn(&Attestation) -> &Vec<String>) -> Vec<String> {
        let mut set: HashSet<String> = HashSet::new();
        for attestation in self.live() {
            for value in field(attestation) {
                set.insert(value.clone());
            }
        }
        let mut values: Vec<String> = set.into_iter().collect();
        values.sort();
        values
    }
}

impl AttestationStore for MemoryStore {
    fn create(&mut self, attestation: Attestation) -> StoreResult<()> {
        if let Some(record) = self.records.get(&attestation.id) {
            if record.deleted_at.is_none() {
                return Err(StoreError::AlreadyExists(attestation.id));
            }
        }
        self.records.insert(
            attestation.id.clone(),
            Record {
                attestation,
                deleted_at: None,
            },
        );
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Attestation>> {
        Ok(self
            .records
            .get(id)
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.attestation.clone()))
    }

    fn update(&mut self, attestation: Attestation) -> StoreResult<()> {
        match self.records.get_mut(&attestation.id) {
            Some(record) if record.deleted_at.is_none() => {
                record.attestation = attestation;
                Ok(())
            }
            _ => Err(StoreError::NotFound(attestation.id)),
        }
    }

    fn delete(&mut self, id: &str) -> StoreResult<bool> {
        match self.records.get_mut(id) {
            Some(record) if record.deleted_at.is_none() => {
                record.deleted_at = Some(Utc::now().timestamp_millis());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self.live().map(|a| a.id.clone()).collect();
        ids.sort();
        Ok(ids)
    }

    fn query(&self, filter: &AxFilter) -> StoreResult<QueryResult> {
        let candidates: Vec<Attestation> = self.live().cloned().collect();
        let attestations = matcher::apply_filter(candidates, filter, &self.numeric_predicates);
        let summary = QuerySummary::from_attestations(&attestations);
        Ok(QueryResult {
            attestations,
            summary,
        })
    }

    fn subjects(&self) -> StoreResult<Vec<String>> {
        Ok(self.distinct(|a| &a.subjects))
    }

    fn predicates(&self) -> StoreResult<Vec<String>> {
        Ok(self.distinct(|a| &a.predicates))
    }

    fn contexts(&self) -> StoreResult<Vec<String>> {
        Ok(self.distinct(|a| &a.contexts))
    }

    fn actors(&self) -> StoreResult<Vec<String>> {
        Ok(self.distinct(|a| &a.actors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{AsCommand, AttestationBuilder};
    use pretty_assertions::assert_eq;

    fn test_attestation(id: &str) -> Attestation {
        AttestationBuilder::new()
            .id(id)
            .subject("ALICE")
            .predicate("knows")
            .context("work")
            .actor("human:bob")
            .timestamp(1704067200000)
            .source("test")
            .build()
    }

    #[test]
    fn create_and_get() {
        let mut store = MemoryStore::new();
        store.create(test_attestation("AS-1")).unwrap();

        let retrieved = store.get("AS-1").unwrap();
        assert_eq!(retrieved.unwrap().id, "AS-1");
        assert!(store.exists("AS-1").unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn create_duplicate_fails() {
        let mut store = MemoryStore::new();
        store.create(test_attestation("AS-1")).unwrap();
        let result = store.create(test_attestation("AS-1"));
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn delete_is_tombstone() {
        let mut store = MemoryStore::new();
        store.create(test_attestation("AS-1")).unwrap();

        assert!(store.delete("AS-1").unwrap());
        assert!(!store.delete("AS-1").unwrap());
        assert!(store.get("AS-1").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.query(&AxFilter::default()).unwrap().attestations.is_empty());
    }

    #[test]
    fn update_missing_fails() {
        let mut store = MemoryStore::new();
        let result = store.update(test_attestation("AS-missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_replaces() {
        let mut store = MemoryStore::new();
        store.create(test_attestation("AS-1")).unwrap();

        let mut updated = test_attestation("AS-1");
        updated.subjects = vec!["BOB".to_string()];
        store.update(updated).unwrap();

        assert_eq!(store.get("AS-1").unwrap().unwrap().subjects, vec!["BOB"]);
    }

    #[test]
    fn query_by_subject() {
        let mut store = MemoryStore::new();
        store.create(test_attestation("AS-1")).unwrap();
        store
            .create(
                AttestationBuilder::new()
                    .id("AS-2")
                    .subject("BOB")
                    .predicate("knows")
                    .actor("x")
                    .build(),
            )
            .unwrap();

        let filter = AxFilter {
            subjects: vec!["ALICE".to_string()],
            ..Default::default()
        };
        let result = store.query(&filter).unwrap();
        assert_eq!(result.attestations.len(), 1);
        assert_eq!(result.summary.total_attestations, 1);
    }

    #[test]
    fn distinct_listings() {
        let mut store = MemoryStore::new();
        store.create(test_attestation("AS-1")).unwrap();
        store
            .create(
                AttestationBuilder::new()
                    .id("AS-2")
                    .subject("BOB")
                    .predicate("works_at")
                    .context("work")
                    .actor("human:alice")
                    .build(),
            )
            .unwrap();

        assert_eq!(store.subjects().unwrap(), vec!["ALICE", "BOB"]);
        assert_eq!(store.predicates().unwrap(), vec!["knows", "works_at"]);
        assert_eq!(store.contexts().unwrap(), vec!["work"]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_attestations, 2);
        assert_eq!(stats.unique_contexts, 1);
    }

    #[test]
    fn generate_and_create_allocates_id() {
        let mut store = MemoryStore::new();
        let command = AsCommand {
            subjects: vec!["ALICE".into()],
            predicates: vec!["engineer".into()],
            contexts: vec!["acme".into()],
            actors: vec!["ats+test@host".into()],
            ..Default::default()
        };

        let attestation = store.generate_and_create(command, "cli").unwrap();
        assert!(attestation.id.starts_with("AS-ALICE-"));
        assert_eq!(attestation.source, "cli");
        assert_eq!(attestation.actors, vec!["ats+test@host"]);
        assert!(store.exists(&attestation.id).unwrap());
    }

    #[test]
    fn generate_and_create_self_certifies_without_actors() {
        let mut store = MemoryStore::new();
        let command = AsCommand {
            subjects: vec!["person".into()],
            predicates: vec!["type".into()],
            contexts: vec!["graph".into()],
            ..Default::default()
        };

        let attestation = store.generate_and_create(command, "boot").unwrap();
        assert_eq!(attestation.actors, vec![attestation.id.clone()]);
    }

    #[test]
    fn generate_and_create_retries_on_collision() {
        let mut store = MemoryStore::new();
        let command = || AsCommand {
            subjects: vec!["ALICE".into()],
            ..Default::default()
        };

        let first = store.generate_and_create(command(), "cli").unwrap();
        let second = store.generate_and_create(command(), "cli").unwrap();
        assert_ne!(first.id, second.id);
    }
}
