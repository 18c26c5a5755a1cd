//! Cartesian claim expansion for multi-dimensional attestations.
//!
//! Attestations are stored compactly: one record with multiple subjects,
//! predicates, contexts, and actors. Downstream consumers reason about
//! individual claims — a single (subject, predicate, context, actor) tuple.
//! This module bridges the two representations.
//!
//! `expand` explodes compact attestations into individual claims.
//! `group_by_key` re-groups claims by (subject, predicate, context); the
//! actor is deliberately excluded so that multiple actors attesting to the
//! same fact land in the same bin.
//! `to_attestations` collapses claims back to their distinct source
//! attestations.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::attestation::Attestation;

/// A single claim extracted from a multi-dimensional attestation.
///
/// Claims are derived views; they borrow from the attestations they were
/// expanded from and are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualClaim<'a> {
    pub subject: &'a str,
    pub predicate: &'a str,
    pub context: &'a str,
    pub actor: &'a str,
    pub timestamp: i64,
    /// The attestation this claim was expanded from
    pub source: &'a Attestation,
}

impl IndividualClaim<'_> {
    pub fn source_id(&self) -> &str {
        &self.source.id
    }
}

/// A group of claims sharing the same (subject, predicate, context) key.
#[derive(Debug, Clone)]
pub struct ClaimGroup<'a> {
    pub key: String,
    pub claims: Vec<IndividualClaim<'a>>,
}

/// Separator joining subject, predicate, and context into a group key.
const CLAIM_KEY_SEP: &str = "|";

/// Expand attestations into individual claims via Cartesian product, in
/// subjects × predicates × contexts × actors nesting order.
///
/// The output length is the sum of each attestation's dimension product;
/// capacity is computed up front so expansion never reallocates.
pub fn expand(attestations: &[Attestation]) -> Vec<IndividualClaim<'_>> {
    let total: usize = attestations
        .iter()
        .map(|a| a.subjects.len() * a.predicates.len() * a.contexts.len() * a.actors.len())
        .sum();

    let mut claims = Vec::with_capacity(total);

    for attestation in attestations {
        for subject in &attestation.subjects {
            for predicate in &attestation.predicates {
                for context in &attestation.contexts {
                    for actor in &attestation.actors {
                        claims.push(IndividualClaim {
                            subject,
                            predicate,
                            context,
                            actor,
                            timestamp: attestation.timestamp,
                            source: attestation,
                        });
                    }
                }
            }
        }
    }

    claims
}

/// Group claims by their (subject, predicate, context) key, sorted by key
/// for deterministic output.
pub fn group_by_key<'a>(claims: &[IndividualClaim<'a>]) -> Vec<ClaimGroup<'a>> {
    let mut map: BTreeMap<String, Vec<IndividualClaim<'a>>> = BTreeMap::new();

    for claim in claims {
        let key = format!(
            "{}{}{}{}{}",
            claim.subject, CLAIM_KEY_SEP, claim.predicate, CLAIM_KEY_SEP, claim.context
        );
        map.entry(key).or_default().push(claim.clone());
    }

    map.into_iter()
        .map(|(key, claims)| ClaimGroup { key, claims })
        .collect()
}

/// Deduplicate claims back to their distinct source attestations by id,
/// preserving first-seen order.
pub fn to_attestations(claims: &[IndividualClaim<'_>]) -> Vec<Attestation> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut attestations = Vec::new();

    for claim in claims {
        if seen.insert(claim.source.id.as_str()) {
            attestations.push(claim.source.clone());
        }
    }

    attestations
}
