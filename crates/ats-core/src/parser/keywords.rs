//! Keyword classification for the AX/AS surface languages.
//!
//! Uses compile-time perfect hashing (phf) for O(1) lookup. Quoted tokens
//! never reach these tables.

use phf::{phf_map, phf_set};

/// Keyword classes driving the grammar state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    /// Grammatical connector (is, are)
    Grammatical,
    /// Context transition (of, from)
    ContextTransit,
    /// Actor transition (by, via)
    ActorTransit,
    /// Temporal keyword (since, until, on, between, over)
    Temporal,
    /// Action keyword (so, therefore)
    SoAction,
    /// Natural language predicate (speaks, knows, works, ...)
    NaturalPredicate,
}

static KEYWORDS: phf::Map<&'static str, KeywordKind> = phf_map! {
    // Grammatical connectors
    "is" => KeywordKind::Grammatical,
    "are" => KeywordKind::Grammatical,

    // Context transitions
    "of" => KeywordKind::ContextTransit,
    "from" => KeywordKind::ContextTransit,

    // Actor transitions
    "by" => KeywordKind::ActorTransit,
    "via" => KeywordKind::ActorTransit,

    // Temporal keywords
    "since" => KeywordKind::Temporal,
    "until" => KeywordKind::Temporal,
    "on" => KeywordKind::Temporal,
    "between" => KeywordKind::Temporal,
    "over" => KeywordKind::Temporal,

    // Action keywords
    "so" => KeywordKind::SoAction,
    "therefore" => KeywordKind::SoAction,

    // Natural language predicates (singular and inflected forms)
    "speak" => KeywordKind::NaturalPredicate,
    "speaks" => KeywordKind::NaturalPredicate,
    "know" => KeywordKind::NaturalPredicate,
    "knows" => KeywordKind::NaturalPredicate,
    "work" => KeywordKind::NaturalPredicate,
    "works" => KeywordKind::NaturalPredicate,
    "worked" => KeywordKind::NaturalPredicate,
    "study" => KeywordKind::NaturalPredicate,
    "studied" => KeywordKind::NaturalPredicate,
    "has" => KeywordKind::NaturalPredicate,
    "have" => KeywordKind::NaturalPredicate,
    "has_experience" => KeywordKind::NaturalPredicate,
    "occupation" => KeywordKind::NaturalPredicate,
};

/// Superset of transitions used when analysing kept-whole "is" phrases.
static CONTEXT_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "of", "from", "by", "via", "at", "in", "for", "with"
};

/// Classify a word; None for regular tokens. Case-insensitive.
#[inline]
pub fn classify(word: &str) -> Option<KeywordKind> {
    let lower = word.to_ascii_lowercase();
    KEYWORDS.get(lower.as_str()).copied()
}

/// True when the word belongs to the wider context-keyword set used for
/// natural-language phrase analysis.
#[inline]
pub fn is_context_keyword(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    CONTEXT_KEYWORDS.contains(lower.as_str())
}

/// True when the word is a built-in natural-language predicate.
#[inline]
pub fn is_natural_predicate(word: &str) -> bool {
    matches!(classify(word), Some(KeywordKind::NaturalPredicate))
}

/// True when the word is any AX keyword.
#[inline]
pub fn is_keyword(word: &str) -> bool {
    classify(word).is_some()
}
