//! Canonical attestation encoding for signing.
//!
//! Produces deterministic bytes over {id, subjects, predicates, contexts,
//! actors, timestamp (unix ms), source, attributes} in that fixed order.
//! `created_at` and the signature fields are excluded. Attribute keys keep
//! writer insertion order (serde_json `preserve_order`), so every backend
//! that round-trips the attribute map verbatim produces identical bytes.

use serde::Serialize;

use crate::attestation::Attestation;
use crate::attrs::AttrMap;

/// The signable view of an attestation. Field order here is the wire order;
/// do not reorder.
#[derive(Serialize)]
struct CanonicalView<'a> {
    id: &'a str,
    subjects: &'a [String],
    predicates: &'a [String],
    contexts: &'a [String],
    actors: &'a [String],
    timestamp: i64,
    source: &'a str,
    #[serde(skip_serializing_if = "AttrMap::is_empty")]
    attributes: &'a AttrMap,
}

/// Encode the canonical byte form of an attestation.
pub fn canonical_bytes(attestation: &Attestation) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&CanonicalView {
        id: &attestation.id,
        subjects: &attestation.subjects,
        predicates: &attestation.predicates,
        contexts: &attestation.contexts,
        actors: &attestation.actors,
        timestamp: attestation.timestamp,
        source: &attestation.source,
        attributes: &attestation.attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Attestation {
        AttestationBuilder::new()
            .id("AS-ALICE-00aabbcc")
            .subject("ALICE")
            .predicate("works_at")
            .context("acme")
            .actor("human:bob")
            .timestamp(1704067200000)
            .source("cli")
            .attribute("note", json!("first"))
            .attribute("level", json!(3))
            .build()
    }

    #[test]
    fn stable_across_runs() {
        assert_eq!(
            canonical_bytes(&sample()).unwrap(),
            canonical_bytes(&sample()).unwrap()
        );
    }

    #[test]
    fn independent_of_created_at_and_signature() {
        let mut a = sample();
        let baseline = canonical_bytes(&a).unwrap();

        a.created_at = 99_999;
        a.signature = "deadbeef".to_string();
        a.signer_did = "did:key:zExample".to_string();

        assert_eq!(canonical_bytes(&a).unwrap(), baseline);
    }

    #[test]
    fn field_order_is_fixed() {
        let bytes = canonical_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let id_pos = text.find("\"id\"").unwrap();
        let subjects_pos = text.find("\"subjects\"").unwrap();
        let timestamp_pos = text.find("\"timestamp\"").unwrap();
        let attributes_pos = text.find("\"attributes\"").unwrap();
        assert!(id_pos < subjects_pos);
        assert!(subjects_pos < timestamp_pos);
        assert!(timestamp_pos < attributes_pos);
    }

    #[test]
    fn attribute_insertion_order_preserved() {
        let bytes = canonical_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        // "note" was inserted before "level" and must serialize first
        assert!(text.find("\"note\"").unwrap() < text.find("\"level\"").unwrap());
    }

    #[test]
    fn timestamp_is_integer_ms() {
        let bytes = canonical_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"timestamp\":1704067200000"));
    }

    #[test]
    fn empty_attributes_omitted() {
        let a = AttestationBuilder::new()
            .id("AS-x")
            .subject("X")
            .actor("a")
            .build();
        let text = String::from_utf8(canonical_bytes(&a).unwrap()).unwrap();
        assert!(!text.contains("attributes"));
    }
}
