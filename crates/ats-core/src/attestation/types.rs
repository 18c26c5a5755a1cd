//! Attestation type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attrs::AttrMap;

/// Default result cap applied when a query does not name one.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Default output format for query results.
pub const DEFAULT_QUERY_FORMAT: &str = "table";

/// Placeholder element for an unspecified predicate or context.
pub const UNSPECIFIED: &str = "_";

/// An attestation - a verifiable claim about subjects, predicates, and
/// contexts with actor attribution and timestamps.
///
/// This is the fundamental unit of data in ATS. Every piece of information
/// is represented as an attestation with full provenance. Attestations are
/// immutable once created; only the signature may be attached afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    /// ASID derived from the subject/predicate/context/actor seeds
    /// (e.g. "AS-LUKE-3fa2b4c9"). Case-sensitive, globally unique.
    pub id: String,

    /// Entities being attested about
    pub subjects: Vec<String>,

    /// What is being claimed (the relationship/property)
    pub predicates: Vec<String>,

    /// Context for the claim (e.g., "acme", "graph")
    pub contexts: Vec<String>,

    /// Who made the attestation
    pub actors: Vec<String>,

    /// When the attestation was made (Unix timestamp milliseconds)
    pub timestamp: i64,

    /// How the attestation was created (e.g., "cli", "prompt", an ingester name)
    pub source: String,

    /// Arbitrary attributes; insertion order is preserved and significant
    /// for the canonical fingerprint
    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attributes: AttrMap,

    /// Hex-encoded Ed25519 signature over the canonical form.
    /// Empty iff `signer_did` is empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,

    /// did:key identifier of the signing key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signer_did: String,

    /// Persistence timestamp (Unix milliseconds). Never part of the
    /// canonical form.
    #[serde(default)]
    pub created_at: i64,
}

impl Attestation {
    /// Returns true if this is a simple existence attestation
    /// (predicates and contexts are both exactly `["_"]`).
    pub fn is_existence_attestation(&self) -> bool {
        self.predicates.len() == 1
            && self.predicates[0] == UNSPECIFIED
            && self.contexts.len() == 1
            && self.contexts[0] == UNSPECIFIED
    }

    /// Returns true if this attestation has multiple subjects, predicates,
    /// or contexts.
    pub fn has_multiple_dimensions(&self) -> bool {
        self.subjects.len() > 1 || self.predicates.len() > 1 || self.contexts.len() > 1
    }

    /// Returns the total number of individual claims this attestation
    /// represents (Cartesian product of subjects × predicates × contexts).
    pub fn cartesian_count(&self) -> usize {
        self.subjects.len() * self.predicates.len() * self.contexts.len()
    }

    /// Returns true if the signature fields are consistent: both empty or
    /// both populated.
    pub fn signature_fields_consistent(&self) -> bool {
        self.signature.is_empty() == self.signer_did.is_empty()
    }
}

impl Default for Attestation {
    fn default() -> Self {
        Self {
            id: String::new(),
            subjects: Vec::new(),
            predicates: vec![UNSPECIFIED.to_string()],
            contexts: vec![UNSPECIFIED.to_string()],
            actors: Vec::new(),
            timestamp: 0,
            source: String::new(),
            attributes: AttrMap::new(),
            signature: String::new(),
            signer_did: String::new(),
            created_at: 0,
        }
    }
}

/// Builder for creating attestations
#[derive(Debug, Default)]
pub struct AttestationBuilder {
    attestation: Attestation,
}

impl AttestationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.attestation.id = id.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.attestation.subjects.push(subject.into());
        self
    }

    pub fn subjects(mut self, subjects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.attestation
            .subjects
            .extend(subjects.into_iter().map(|s| s.into()));
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        // Clear default "_" when adding a real predicate
        if self.attestation.predicates == vec![UNSPECIFIED] {
            self.attestation.predicates.clear();
        }
        self.attestation.predicates.push(predicate.into());
        self
    }

    pub fn predicates(mut self, predicates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if self.attestation.predicates == vec![UNSPECIFIED] {
            self.attestation.predicates.clear();
        }
        self.attestation
            .predicates
            .extend(predicates.into_iter().map(|s| s.into()));
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        if self.attestation.contexts == vec![UNSPECIFIED] {
            self.attestation.contexts.clear();
        }
        self.attestation.contexts.push(context.into());
        self
    }

    pub fn contexts(mut self, contexts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if self.attestation.contexts == vec![UNSPECIFIED] {
            self.attestation.contexts.clear();
        }
        self.attestation
            .contexts
            .extend(contexts.into_iter().map(|s| s.into()));
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.attestation.actors.push(actor.into());
        self
    }

    pub fn actors(mut self, actors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.attestation
            .actors
            .extend(actors.into_iter().map(|s| s.into()));
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.attestation.timestamp = timestamp;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.attestation.source = source.into();
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attestation.attributes.insert(key.into(), value);
        self
    }

    pub fn created_at(mut self, created_at: i64) -> Self {
        self.attestation.created_at = created_at;
        self
    }

    pub fn build(self) -> Attestation {
        self.attestation
    }
}

/// The pre-attestation form produced by the AS parser.
///
/// Carries the raw PCSA fields as parsed; placeholders and provenance are
/// filled in by [`AsCommand::into_attestation`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsCommand {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,

    /// Explicit timestamp from an `on <date>` clause; defaults to "now"
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attributes: AttrMap,
}

impl AsCommand {
    /// Convert the command into a persistable attestation.
    ///
    /// Empty predicates/contexts become the `"_"` placeholder, the timestamp
    /// defaults to `now_ms`, and `created_at` is stamped. Actors are taken
    /// as-is; callers that want the self-certifying `actors=[id]` rule go
    /// through the storage layer's `generate_and_create`.
    pub fn into_attestation(self, id: String, source: &str, now_ms: i64) -> Attestation {
        let predicates = if self.predicates.is_empty() {
            vec![UNSPECIFIED.to_string()]
        } else {
            self.predicates
        };
        let contexts = if self.contexts.is_empty() {
            vec![UNSPECIFIED.to_string()]
        } else {
            self.contexts
        };

        Attestation {
            id,
            subjects: self.subjects,
            predicates,
            contexts,
            actors: self.actors,
            timestamp: self.timestamp.unwrap_or(now_ms),
            source: source.to_string(),
            attributes: self.attributes,
            signature: String::new(),
            signer_did: String::new(),
            created_at: now_ms,
        }
    }
}

/// Unit of an `over` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverUnit {
    #[serde(rename = "y")]
    Years,
    #[serde(rename = "m")]
    Months,
    #[serde(rename = "w")]
    Weeks,
    #[serde(rename = "d")]
    Days,
}

impl OverUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "y" | "yr" | "yrs" | "year" | "years" => Some(OverUnit::Years),
            "m" | "mo" | "mos" | "month" | "months" => Some(OverUnit::Months),
            "w" | "wk" | "wks" | "week" | "weeks" => Some(OverUnit::Weeks),
            "d" | "day" | "days" => Some(OverUnit::Days),
            _ => None,
        }
    }

    /// Conversion factor from this unit to years, the storage-layer
    /// interpretation for numeric duration attributes.
    pub fn to_years(self, value: f64) -> f64 {
        match self {
            OverUnit::Years => value,
            OverUnit::Months => value / 12.0,
            OverUnit::Weeks => value * 7.0 / 365.0,
            OverUnit::Days => value / 365.0,
        }
    }
}

impl fmt::Display for OverUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverUnit::Years => write!(f, "y"),
            OverUnit::Months => write!(f, "m"),
            OverUnit::Weeks => write!(f, "w"),
            OverUnit::Days => write!(f, "d"),
        }
    }
}

/// Numeric temporal comparison for "over 5y" style clauses.
///
/// The parser only records this; evaluation against numeric-predicate
/// attributes happens in the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverComparison {
    pub value: f64,
    pub unit: OverUnit,
    /// Comparison operator; "over" means >=
    #[serde(rename = "op")]
    pub operator: String,
}

impl OverComparison {
    /// Parse a compact or spaced duration expression: "50y", "5 years",
    /// "18 m". Returns None when no leading number or no recognisable unit.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut num_end = 0;
        for (i, c) in trimmed.char_indices() {
            if c.is_ascii_digit() || c == '.' {
                num_end = i + c.len_utf8();
            } else {
                break;
            }
        }

        let value = trimmed[..num_end].parse::<f64>().ok()?;
        let unit = OverUnit::parse(trimmed[num_end..].trim())?;

        Some(Self {
            value,
            unit,
            operator: "over".to_string(),
        })
    }

    /// Threshold expressed in years.
    pub fn threshold_years(&self) -> f64 {
        self.unit.to_years(self.value)
    }
}

impl fmt::Display for OverComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "over {}{}", self.value, self.unit)
    }
}

/// Query filter consumed by the storage layer.
///
/// Each non-empty PCSA sequence constrains the corresponding attestation
/// field by overlap; see the storage matcher for the exact comparison rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxFilter {
    #[serde(default)]
    pub subjects: Vec<String>,

    #[serde(default)]
    pub predicates: Vec<String>,

    #[serde(default)]
    pub contexts: Vec<String>,

    #[serde(default)]
    pub actors: Vec<String>,

    /// Temporal range start (Unix ms, inclusive)
    pub time_start: Option<i64>,

    /// Temporal range end (Unix ms, inclusive)
    pub time_end: Option<i64>,

    /// Numeric temporal comparison (e.g., "over 5y")
    pub over_comparison: Option<OverComparison>,

    /// Maximum results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Output format hint for renderers
    #[serde(default = "default_format")]
    pub format: String,

    /// Post-query directives; preserved but never executed by the core
    #[serde(default)]
    pub so_actions: Vec<String>,
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

fn default_format() -> String {
    DEFAULT_QUERY_FORMAT.to_string()
}

impl Default for AxFilter {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            predicates: Vec::new(),
            contexts: Vec::new(),
            actors: Vec::new(),
            time_start: None,
            time_end: None,
            over_comparison: None,
            limit: DEFAULT_QUERY_LIMIT,
            format: DEFAULT_QUERY_FORMAT.to_string(),
            so_actions: Vec::new(),
        }
    }
}

impl AxFilter {
    /// True when no PCSA constraint, temporal bound, or over-comparison is
    /// present; such a query returns everything up to `limit`.
    pub fn is_unconstrained(&self) -> bool {
        self.subjects.is_empty()
            && self.predicates.is_empty()
            && self.contexts.is_empty()
            && self.actors.is_empty()
            && self.time_start.is_none()
            && self.time_end.is_none()
            && self.over_comparison.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder() {
        let attestation = AttestationBuilder::new()
            .id("AS-ALICE-00000001")
            .subject("ALICE")
            .predicate("is_author_of")
            .context("github")
            .actor("human:bob")
            .source("cli")
            .timestamp(1704067200000)
            .build();

        assert_eq!(attestation.id, "AS-ALICE-00000001");
        assert_eq!(attestation.subjects, vec!["ALICE"]);
        assert_eq!(attestation.predicates, vec!["is_author_of"]);
        assert_eq!(attestation.contexts, vec!["github"]);
        assert_eq!(attestation.actors, vec!["human:bob"]);
        assert!(attestation.signature_fields_consistent());
    }

    #[test]
    fn existence_attestation() {
        let existence = AttestationBuilder::new()
            .subject("ALICE")
            .actor("human:bob")
            .build();
        assert!(existence.is_existence_attestation());

        let regular = AttestationBuilder::new()
            .subject("ALICE")
            .predicate("works_at")
            .context("acme")
            .build();
        assert!(!regular.is_existence_attestation());
    }

    #[test]
    fn cartesian_count() {
        let multi = AttestationBuilder::new()
            .subjects(["ALICE", "BOB"])
            .predicates(["knows", "works_with"])
            .contexts(["acme", "github"])
            .build();
        assert_eq!(multi.cartesian_count(), 8);
    }

    #[test]
    fn multiple_dimensions() {
        let single = AttestationBuilder::new()
            .subject("ALICE")
            .predicate("is_author")
            .context("github")
            .build();
        assert!(!single.has_multiple_dimensions());

        let multi = AttestationBuilder::new()
            .subjects(["ALICE", "BOB"])
            .predicate("is_author")
            .build();
        assert!(multi.has_multiple_dimensions());
    }

    #[test]
    fn command_fills_placeholders() {
        let command = AsCommand {
            subjects: vec!["ALICE".into()],
            ..Default::default()
        };
        let attestation = command.into_attestation("AS-x".into(), "cli", 1_700_000_000_000);

        assert_eq!(attestation.predicates, vec!["_"]);
        assert_eq!(attestation.contexts, vec!["_"]);
        assert_eq!(attestation.source, "cli");
        assert_eq!(attestation.timestamp, 1_700_000_000_000);
        assert_eq!(attestation.created_at, 1_700_000_000_000);
    }

    #[test]
    fn command_keeps_explicit_timestamp() {
        let command = AsCommand {
            subjects: vec!["ALICE".into()],
            timestamp: Some(42),
            ..Default::default()
        };
        let attestation = command.into_attestation("AS-x".into(), "cli", 1000);
        assert_eq!(attestation.timestamp, 42);
        assert_eq!(attestation.created_at, 1000);
    }

    #[test]
    fn over_comparison_parse() {
        let over = OverComparison::parse("50y").unwrap();
        assert_eq!(over.value, 50.0);
        assert_eq!(over.unit, OverUnit::Years);
        assert_eq!(over.operator, "over");

        let spaced = OverComparison::parse("18 months").unwrap();
        assert_eq!(spaced.unit, OverUnit::Months);

        assert!(OverComparison::parse("").is_none());
        assert!(OverComparison::parse("fifty years").is_none());
        assert!(OverComparison::parse("5x").is_none());
    }

    #[test]
    fn filter_defaults() {
        let filter = AxFilter::default();
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.format, "table");
        assert!(filter.is_unconstrained());
    }

    #[test]
    fn partial_filter_json_gets_defaults() {
        let filter: AxFilter =
            serde_json::from_str(r#"{"predicates": ["login"]}"#).unwrap();
        assert_eq!(filter.predicates, vec!["login"]);
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.format, "table");
        assert_eq!(filter.time_start, None);
    }
}
