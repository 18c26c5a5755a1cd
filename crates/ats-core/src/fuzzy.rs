//! Fuzzy matching engine with a rebuildable vocabulary index.
//!
//! Strategies are applied in order of specificity:
//! 1. Exact match (score: 1.0)
//! 2. Prefix match (score: 0.9)
//! 3. Word boundary match (score: 0.85)
//! 4. Substring match (score: 0.65-0.75, earlier positions score higher)
//! 5. Jaro-Winkler similarity (score: 0.6-0.82)
//! 6. Levenshtein edit distance (score: 0.6-0.8)
//!
//! The index hash changes whenever the vocabulary does, letting callers
//! skip redundant rebuilds.

use ahash::AHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use strsim::{jaro_winkler, levenshtein};

/// A ranked match result with score and strategy information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub value: String,
    pub score: f64,
    pub strategy: &'static str,
}

impl FuzzyMatch {
    fn new(value: String, score: f64, strategy: &'static str) -> Self {
        Self {
            value,
            score,
            strategy,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum score threshold (0.0-1.0)
    pub min_score: f64,
    /// Maximum results to return
    pub max_results: usize,
    /// Maximum edit distance for Levenshtein matching
    pub max_edit_distance: usize,
    /// Queries shorter than this use exact/prefix/substring only
    pub min_fuzzy_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_score: 0.6,
            max_results: 20,
            max_edit_distance: 2,
            min_fuzzy_length: 3,
        }
    }
}

/// Fuzzy matching engine over a single vocabulary.
pub struct FuzzyEngine {
    terms: Vec<String>,
    terms_lower: Vec<String>,
    index_hash: String,
    config: EngineConfig,
}

impl Default for FuzzyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            terms: Vec::new(),
            terms_lower: Vec::new(),
            index_hash: String::new(),
            config,
        }
    }

    /// Rebuild the index with a new vocabulary.
    /// Returns (term_count, hash).
    pub fn rebuild_index(&mut self, terms: Vec<String>) -> (usize, String) {
        let mut terms = terms;
        terms.sort();
        terms.dedup();

        let terms_lower: Vec<String> = terms.iter().map(|s| s.to_lowercase()).collect();
        let hash = compute_hash(&terms);
        let count = terms.len();

        self.terms = terms;
        self.terms_lower = terms_lower;
        self.index_hash = hash.clone();

        (count, hash)
    }

    /// Find matches for a query in the vocabulary, best first.
    pub fn search(&self, query: &str, limit: usize, min_score: f64) -> Vec<FuzzyMatch> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<FuzzyMatch> = self
            .terms_lower
            .iter()
            .enumerate()
            .filter_map(|(idx, term_lower)| {
                self.score_match(&query_lower, term_lower, &self.terms[idx])
            })
            .filter(|m| m.score >= min_score)
            .collect();

        // Sort by score descending, then by value for stability
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.value.cmp(&b.value))
        });

        matches.truncate(limit);
        matches
    }

    /// Score a single item against the query through the strategy ladder.
    fn score_match(
        &self,
        query_lower: &str,
        item_lower: &str,
        original_value: &str,
    ) -> Option<FuzzyMatch> {
        if query_lower == item_lower {
            return Some(FuzzyMatch::new(original_value.to_string(), 1.0, "exact"));
        }

        if item_lower.starts_with(query_lower) {
            return Some(FuzzyMatch::new(original_value.to_string(), 0.9, "prefix"));
        }

        for word in item_lower.split(|c: char| c.is_whitespace() || c == '_' || c == '-') {
            if word == query_lower {
                return Some(FuzzyMatch::new(
                    original_value.to_string(),
                    0.85,
                    "word_boundary",
                ));
            }
        }

        if let Some(pos) = item_lower.find(query_lower) {
            // Earlier positions score higher
            let pos_penalty = (pos as f64 / item_lower.len() as f64) * 0.1;
            let score = (0.75 - pos_penalty).max(0.65);
            return Some(FuzzyMatch::new(
                original_value.to_string(),
                score,
                "substring",
            ));
        }

        // Short queries skip the expensive strategies
        if query_lower.len() < self.config.min_fuzzy_length {
            return None;
        }

        let jw_score = jaro_winkler(query_lower, item_lower);
        if jw_score > 0.85 {
            // Maps 0.85-1.0 onto 0.6-0.825
            let score = 0.6 + (jw_score - 0.85) * 1.5;
            return Some(FuzzyMatch::new(
                original_value.to_string(),
                score.min(0.82),
                "jaro_winkler",
            ));
        }

        let edit_dist = levenshtein(query_lower, item_lower);
        if edit_dist <= self.config.max_edit_distance {
            let max_len = query_lower.len().max(item_lower.len());
            if max_len > 0 {
                let score = 0.8 - (edit_dist as f64 / max_len as f64) * 0.4;
                if score >= 0.6 {
                    return Some(FuzzyMatch::new(
                        original_value.to_string(),
                        score,
                        "levenshtein",
                    ));
                }
            }
        }

        None
    }

    /// Current index hash for change detection.
    pub fn index_hash(&self) -> &str {
        &self.index_hash
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn is_ready(&self) -> bool {
        !self.terms.is_empty()
    }
}

fn compute_hash(terms: &[String]) -> String {
    let mut hasher = AHasher::default();
    for term in terms {
        term.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> FuzzyEngine {
        let mut engine = FuzzyEngine::new();
        engine.rebuild_index(vec![
            "is_author_of".to_string(),
            "is_maintainer_of".to_string(),
            "works_at".to_string(),
            "speaks".to_string(),
        ]);
        engine
    }

    #[test]
    fn exact_match() {
        let engine = test_engine();
        let matches = engine.search("works_at", 10, 0.6);
        assert_eq!(matches[0].value, "works_at");
        assert_eq!(matches[0].score, 1.0);
        assert_eq!(matches[0].strategy, "exact");
    }

    #[test]
    fn prefix_match() {
        let engine = test_engine();
        let matches = engine.search("is_", 10, 0.5);
        assert!(matches.len() >= 2);
        assert!(matches.iter().all(|m| m.value.starts_with("is_")));
        assert_eq!(matches[0].strategy, "prefix");
    }

    #[test]
    fn word_boundary_match() {
        let engine = test_engine();
        let matches = engine.search("author", 10, 0.6);
        assert!(matches.iter().any(|m| m.value == "is_author_of"));
        assert_eq!(matches[0].strategy, "word_boundary");
    }

    #[test]
    fn typo_matches_via_levenshtein() {
        let engine = test_engine();
        let matches = engine.search("speakz", 10, 0.4);
        assert!(matches.iter().any(|m| m.value == "speaks"));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let engine = test_engine();
        assert!(engine.search("", 10, 0.6).is_empty());
        assert!(engine.search("   ", 10, 0.6).is_empty());
    }

    #[test]
    fn threshold_filters() {
        let engine = test_engine();
        assert!(engine.search("zzzzqqqq", 10, 0.9).is_empty());
    }

    #[test]
    fn index_hash_tracks_vocabulary() {
        let mut engine = FuzzyEngine::new();
        let (count, first) = engine.rebuild_index(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(count, 2, "duplicates are collapsed");

        let (_, second) = engine.rebuild_index(vec!["a".into(), "b".into()]);
        assert_eq!(first, second, "same vocabulary, same hash");

        let (_, third) = engine.rebuild_index(vec!["a".into(), "c".into()]);
        assert_ne!(first, third);
    }

    #[test]
    fn results_sorted_by_score() {
        let engine = test_engine();
        let matches = engine.search("is", 10, 0.0);
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
