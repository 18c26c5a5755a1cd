//! Query tests for SqliteStore

use ats_core::{AttestationBuilder, AttestationStore, AxFilter, OverComparison};
use ats_sqlite::SqliteStore;
use serde_json::json;

fn create_attestation(
    id: &str,
    subject: &str,
    predicate: &str,
    context: &str,
    actor: &str,
    timestamp: i64,
) -> ats_core::Attestation {
    AttestationBuilder::new()
        .id(id)
        .subject(subject)
        .predicate(predicate)
        .context(context)
        .actor(actor)
        .timestamp(timestamp)
        .source("test")
        .build()
}

fn seeded_store() -> SqliteStore {
    let mut store = SqliteStore::in_memory().unwrap();
    store
        .create(create_attestation("AS-1", "ALICE", "knows", "work", "human:bob", 1000))
        .unwrap();
    store
        .create(create_attestation("AS-2", "BOB", "knows", "work", "human:alice", 2000))
        .unwrap();
    store
        .create(create_attestation("AS-3", "ALICE", "works_at", "acme", "human:bob", 3000))
        .unwrap();
    store
}

#[test]
fn test_query_by_subject() {
    let store = seeded_store();
    let filter = AxFilter {
        subjects: vec!["ALICE".to_string()],
        ..Default::default()
    };

    let result = store.query(&filter).unwrap();
    assert_eq!(result.attestations.len(), 2);
    assert!(result
        .attestations
        .iter()
        .all(|a| a.subjects.contains(&"ALICE".to_string())));
}

#[test]
fn test_query_subject_tolerates_mixed_case_input() {
    let store = seeded_store();
    let filter = AxFilter {
        subjects: vec!["alice".to_string()],
        ..Default::default()
    };
    assert_eq!(store.query(&filter).unwrap().attestations.len(), 2);
}

#[test]
fn test_query_by_predicate_case_insensitive() {
    let store = seeded_store();
    let filter = AxFilter {
        predicates: vec!["KNOWS".to_string()],
        ..Default::default()
    };

    let result = store.query(&filter).unwrap();
    assert_eq!(result.attestations.len(), 2);
}

#[test]
fn test_query_by_context_and_actor() {
    let store = seeded_store();

    let by_context = AxFilter {
        contexts: vec!["acme".to_string()],
        ..Default::default()
    };
    assert_eq!(store.query(&by_context).unwrap().attestations.len(), 1);

    let by_actor = AxFilter {
        actors: vec!["human:bob".to_string()],
        ..Default::default()
    };
    assert_eq!(store.query(&by_actor).unwrap().attestations.len(), 2);
}

#[test]
fn test_query_time_range_inclusive() {
    let store = seeded_store();
    let filter = AxFilter {
        time_start: Some(1000),
        time_end: Some(2000),
        ..Default::default()
    };

    let result = store.query(&filter).unwrap();
    assert_eq!(result.attestations.len(), 2);
}

#[test]
fn test_query_orders_by_timestamp_desc() {
    let store = seeded_store();
    let result = store.query(&AxFilter::default()).unwrap();
    let ids: Vec<&str> = result.attestations.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["AS-3", "AS-2", "AS-1"]);
}

#[test]
fn test_query_limit_truncates() {
    let store = seeded_store();
    let filter = AxFilter {
        limit: 2,
        ..Default::default()
    };

    let result = store.query(&filter).unwrap();
    assert_eq!(result.attestations.len(), 2);
    assert_eq!(result.attestations[0].id, "AS-3");
}

#[test]
fn test_query_overlap_needs_one_element() {
    let store = seeded_store();
    let filter = AxFilter {
        subjects: vec!["NOBODY".to_string(), "BOB".to_string()],
        ..Default::default()
    };

    let result = store.query(&filter).unwrap();
    assert_eq!(result.attestations.len(), 1);
    assert_eq!(result.attestations[0].id, "AS-2");
}

#[test]
fn test_query_summary_counts() {
    let store = seeded_store();
    let result = store.query(&AxFilter::default()).unwrap();

    assert_eq!(result.summary.total_attestations, 3);
    assert_eq!(result.summary.unique_subjects.get("ALICE"), Some(&2));
    assert_eq!(result.summary.unique_predicates.get("knows"), Some(&2));
}

#[test]
fn test_query_over_comparison() {
    let mut store = SqliteStore::in_memory().unwrap();
    store
        .create(
            AttestationBuilder::new()
                .id("AS-exp")
                .subject("CHOMSKY")
                .predicate("has_experience")
                .context("linguistics")
                .actor("mit")
                .timestamp(1000)
                .attribute("has_experience", json!(55))
                .build(),
        )
        .unwrap();
    store
        .create(
            AttestationBuilder::new()
                .id("AS-junior")
                .subject("INTERN")
                .predicate("has_experience")
                .context("linguistics")
                .actor("mit")
                .timestamp(2000)
                .attribute("has_experience", json!(2))
                .build(),
        )
        .unwrap();
    store.set_numeric_predicates(vec!["has_experience".to_string()]);

    let filter = AxFilter {
        over_comparison: OverComparison::parse("50y"),
        ..Default::default()
    };

    let result = store.query(&filter).unwrap();
    assert_eq!(result.attestations.len(), 1);
    assert_eq!(result.attestations[0].id, "AS-exp");
}

#[test]
fn test_distinct_listings() {
    let store = seeded_store();
    assert_eq!(store.subjects().unwrap(), vec!["ALICE", "BOB"]);
    assert_eq!(store.predicates().unwrap(), vec!["knows", "works_at"]);
    assert_eq!(store.contexts().unwrap(), vec!["acme", "work"]);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_attestations, 3);
    assert_eq!(stats.unique_subjects, 2);
}
