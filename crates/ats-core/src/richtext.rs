//! Rich-text search over attestation attributes.
//!
//! Operates on the attribute fields a node type designates via
//! `TypeDef.rich_string_fields`, falling back to a fixed set of well-known
//! field names. Three strategies are tried in order per field:
//!
//! 1. Exact case-insensitive substring; score `1 − position/length`.
//! 2. Fuzzy match over the field's word tokens (threshold 0.4), tagged
//!    `fuzzy:<strategy>`.
//! 3. Typo variants of the query (doubled-letter removal and insertion plus
//!    a curated substitution table) re-run as exact substring; scores are
//!    scaled by 0.8 and tagged `typo-correction`.
//!
//! At most one hit per node is returned.

use serde_json::Value;

use crate::attestation::Attestation;
use crate::attrs::AttrMap;
use crate::fuzzy::FuzzyEngine;
use crate::typedefs::TypeDef;

/// Fields searched when the node's type does not designate any.
pub const FALLBACK_RICH_FIELDS: &[&str] = &[
    "message",
    "description",
    "content",
    "summary",
    "body",
    "text",
    "title",
    "name",
];

/// Default result cap.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Minimum similarity for the fuzzy stage.
const FUZZY_THRESHOLD: f64 = 0.4;

/// Excerpts are centred on the match and capped at this many characters.
const EXCERPT_LENGTH: usize = 150;

/// Score multiplier applied to typo-corrected hits.
const TYPO_PENALTY: f64 = 0.8;

/// Curated substitution pairs for typo variants.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("ph", "f"),
    ("f", "ph"),
    ("c", "k"),
    ("k", "c"),
    ("s", "z"),
    ("z", "s"),
    ("ei", "ie"),
    ("ie", "ei"),
];

/// A single search hit.
#[derive(Debug, Clone)]
pub struct RichTextHit {
    /// First subject of the matching attestation
    pub node_id: String,
    /// Node type, taken from the "type" attribute
    pub type_name: String,
    pub field: String,
    pub value: String,
    /// Excerpt centred on the match
    pub excerpt: String,
    pub score: f64,
    pub strategy: String,
    /// Display label: name or title attribute, else the node id
    pub label: String,
    pub attributes: AttrMap,
}

/// Rich-text searcher configured with the known type definitions.
pub struct RichTextSearch<'a> {
    type_defs: &'a [TypeDef],
    limit: usize,
}

impl<'a> RichTextSearch<'a> {
    pub fn new(type_defs: &'a [TypeDef]) -> Self {
        Self {
            type_defs,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Search attestation attributes for the query. Hits are sorted by
    /// score descending and truncated to the limit; each node contributes
    /// at most one hit.
    pub fn search(&self, attestations: &[Attestation], query: &str) -> Vec<RichTextHit> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<RichTextHit> = Vec::new();

        for attestation in attestations {
            let Some(node_id) = attestation.subjects.first() else {
                continue;
            };
            if hits.iter().any(|h| &h.node_id == node_id) {
                continue;
            }
            if let Some(hit) = self.search_node(attestation, node_id, query) {
                hits.push(hit);
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        hits.truncate(self.limit);
        hits
    }

    /// Best hit across the node's rich fields, or None.
    fn search_node(
        &self,
        attestation: &Attestation,
        node_id: &str,
        query: &str,
    ) -> Option<RichTextHit> {
        let type_name = match attestation.attributes.get("type") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let fields = self.rich_fields(&type_name);

        let mut best: Option<(String, String, String, f64, String)> = None;

        for field in &fields {
            let Some(value) = field_text(&attestation.attributes, field) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            if let Some((score, strategy, excerpt)) = match_field(&value, query) {
                let better = best.as_ref().map(|(_, _, _, s, _)| score > *s).unwrap_or(true);
                if better {
                    best = Some((field.clone(), value, excerpt, score, strategy));
                }
            }
        }

        best.map(|(field, value, excerpt, score, strategy)| RichTextHit {
            node_id: node_id.to_string(),
            type_name,
            label: display_label(&attestation.attributes, node_id),
            field,
            value,
            excerpt,
            score,
            strategy,
            attributes: attestation.attributes.clone(),
        })
    }

    fn rich_fields(&self, type_name: &str) -> Vec<String> {
        self.type_defs
            .iter()
            .find(|d| d.name == type_name)
            .and_then(|d| d.rich_string_fields.clone())
            .unwrap_or_else(|| FALLBACK_RICH_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}

/// Run the strategy ladder for one field value.
fn match_field(value: &str, query: &str) -> Option<(f64, String, String)> {
    let value_lower = value.to_lowercase();
    let query_lower = query.to_lowercase();

    // 1. Exact substring
    if let Some(pos) = value_lower.find(&query_lower) {
        let score = 1.0 - (pos as f64 / value_lower.len() as f64);
        let char_pos = value_lower[..pos].chars().count();
        return Some((
            score,
            "exact".to_string(),
            excerpt(value, char_pos, query_lower.chars().count()),
        ));
    }

    // 2. Fuzzy over the field's word tokens
    let words: Vec<String> = value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect();
    if !words.is_empty() {
        let mut engine = FuzzyEngine::new();
        engine.rebuild_index(words);
        if let Some(m) = engine.search(query, 1, FUZZY_THRESHOLD).into_iter().next() {
            let matched_lower = m.value.to_lowercase();
            let pos = value_lower.find(&matched_lower).unwrap_or(0);
            let char_pos = value_lower[..pos].chars().count();
            return Some((
                m.score,
                format!("fuzzy:{}", m.strategy),
                excerpt(value, char_pos, matched_lower.chars().count()),
            ));
        }
    }

    // 3. Typo variants, exact substring again
    for variant in typo_variants(&query_lower) {
        if let Some(pos) = value_lower.find(&variant) {
            let score = (1.0 - (pos as f64 / value_lower.len() as f64)) * TYPO_PENALTY;
            let char_pos = value_lower[..pos].chars().count();
            return Some((
                score,
                "typo-correction".to_string(),
                excerpt(value, char_pos, variant.chars().count()),
            ));
        }
    }

    None
}

/// Generate typo variants: remove doubled letters, insert doubled letters,
/// and apply the substitution table. The original query is excluded.
fn typo_variants(query: &str) -> Vec<String> {
    let chars: Vec<char> = query.chars().collect();
    let mut variants = Vec::new();

    // Remove one of each doubled letter
    for i in 1..chars.len() {
        if chars[i] == chars[i - 1] {
            let mut v: String = chars[..i].iter().collect();
            v.extend(&chars[i + 1..]);
            variants.push(v);
        }
    }

    // Double each letter
    for i in 0..chars.len() {
        let mut v: String = chars[..=i].iter().collect();
        v.push(chars[i]);
        v.extend(&chars[i + 1..]);
        variants.push(v);
    }

    // Curated substitutions
    for (from, to) in SUBSTITUTIONS {
        if query.contains(from) {
            variants.push(query.replace(from, to));
        }
    }

    variants.retain(|v| v != query);
    variants.dedup();
    variants
}

/// Extract a character-safe excerpt centred on the match.
fn excerpt(text: &str, char_pos: usize, match_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= EXCERPT_LENGTH {
        return text.to_string();
    }

    let half = (EXCERPT_LENGTH.saturating_sub(match_len)) / 2;
    let start = char_pos.saturating_sub(half);
    let end = (start + EXCERPT_LENGTH).min(chars.len());
    let start = end.saturating_sub(EXCERPT_LENGTH);

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}

fn field_text(attributes: &AttrMap, field: &str) -> Option<String> {
    match attributes.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

fn display_label(attributes: &AttrMap, node_id: &str) -> String {
    for key in ["name", "title"] {
        if let Some(Value::String(s)) = attributes.get(key) {
            if !s.is_empty() {
                return s.clone();
            }
        }
    }
    node_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationBuilder;
    use serde_json::json;

    fn note(id: &str, subject: &str, message: &str) -> Attestation {
        AttestationBuilder::new()
            .id(id)
            .subject(subject)
            .predicate("note")
            .context("workspace")
            .actor("cli")
            .attribute("message", json!(message))
            .build()
    }

    #[test]
    fn exact_substring_scores_by_position() {
        let attestations = vec![
            note("AS-1", "N1", "deployment failed on node seven"),
            note("AS-2", "N2", "the deployment went fine"),
        ];

        let hits = RichTextSearch::new(&[]).search(&attestations, "deployment");
        assert_eq!(hits.len(), 2);
        // Earlier match position scores higher
        assert_eq!(hits[0].node_id, "N1");
        assert_eq!(hits[0].strategy, "exact");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn fuzzy_fallback_tags_strategy() {
        let attestations = vec![note("AS-1", "N1", "kubernetes cluster restarted")];
        let hits = RichTextSearch::new(&[]).search(&attestations, "kubernets");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].strategy.starts_with("fuzzy:"), "{}", hits[0].strategy);
    }

    #[test]
    fn typo_variant_fallback() {
        // Multi-word queries defeat the per-word fuzzy stage; the
        // doubled-letter removal variant "cofee machine" still hits.
        let attestations = vec![note("AS-1", "N1", "cofee machine broken again")];
        let hits = RichTextSearch::new(&[]).search(&attestations, "coffee machine");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].strategy, "typo-correction");
        assert!((hits[0].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn respects_type_rich_fields() {
        let defs = vec![TypeDef {
            name: "person".to_string(),
            rich_string_fields: Some(vec!["bio".to_string()]),
            ..Default::default()
        }];

        let person = AttestationBuilder::new()
            .id("AS-1")
            .subject("ALICE")
            .actor("cli")
            .attribute("type", json!("person"))
            .attribute("bio", json!("rust contributor"))
            .attribute("message", json!("rust is irrelevant here"))
            .build();

        let hits = RichTextSearch::new(&defs).search(&[person], "rust");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, "bio");
        assert_eq!(hits[0].type_name, "person");
    }

    #[test]
    fn one_hit_per_node() {
        let attestations = vec![
            note("AS-1", "N1", "alpha message"),
            note("AS-2", "N1", "alpha again for the same node"),
        ];
        let hits = RichTextSearch::new(&[]).search(&attestations, "alpha");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn limit_truncates() {
        let attestations: Vec<Attestation> = (0..5)
            .map(|i| note(&format!("AS-{i}"), &format!("N{i}"), "shared keyword here"))
            .collect();
        let hits = RichTextSearch::new(&[])
            .with_limit(3)
            .search(&attestations, "keyword");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn excerpt_is_centred_and_bounded() {
        let long = format!("{} needle {}", "x".repeat(200), "y".repeat(200));
        let attestations = vec![note("AS-1", "N1", &long)];
        let hits = RichTextSearch::new(&[]).search(&attestations, "needle");
        assert_eq!(hits.len(), 1);
        let excerpt_chars = hits[0].excerpt.chars().count();
        assert!(excerpt_chars <= EXCERPT_LENGTH + 6, "got {excerpt_chars}");
        assert!(hits[0].excerpt.contains("needle"));
    }

    #[test]
    fn label_prefers_name_attribute() {
        let mut a = note("AS-1", "N1", "hello world");
        a.attributes.insert("name".into(), json!("Readable Name"));
        let hits = RichTextSearch::new(&[]).search(&[a], "hello");
        assert_eq!(hits[0].label, "Readable Name");
    }

    #[test]
    fn array_fields_are_joined() {
        let a = AttestationBuilder::new()
            .id("AS-1")
            .subject("N1")
            .actor("cli")
            .attribute("text", json!(["first part", "second part"]))
            .build();
        let hits = RichTextSearch::new(&[]).search(&[a], "second");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let attestations = vec![note("AS-1", "N1", "anything")];
        assert!(RichTextSearch::new(&[]).search(&attestations, "  ").is_empty());
    }
}
