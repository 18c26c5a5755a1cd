//! Pluggable expansion hooks: alias resolution, predicate expansion, and
//! actor detection.
//!
//! Domains plug in behind these traits; the no-op implementations are the
//! defaults everywhere. Filter expansion is stable (no reordering beyond
//! what the plugin supplies) and idempotent; it never collapses duplicates
//! already present in the filter — de-duplication is the storage layer's
//! concern.

use std::env;

use crate::attestation::AxFilter;

/// Expands an entity identifier into its known aliases.
pub trait EntityResolver {
    /// Alternative identifiers for `id`. Empty output is valid.
    fn alt_ids(&self, id: &str) -> Vec<String>;
}

/// Domain-specific query expansion.
pub trait QueryExpander {
    /// Rewrite `(predicate, values)` into a list of `(predicate, value)`
    /// search patterns. The no-op returns literal identity pairs.
    fn expand_predicate(&self, predicate: &str, values: &[String]) -> Vec<(String, String)>;

    /// Predicate names whose attribute values are numeric; these drive
    /// `over` comparisons in the storage layer.
    fn numeric_predicates(&self) -> Vec<String>;

    /// Predicates that may appear sentence-initially; fed to the tokenizer
    /// as additional natural-language predicates.
    fn natural_language_predicates(&self) -> Vec<String>;
}

/// Supplies default actors for assertions that name none.
pub trait ActorDetector {
    /// The system actor credited by default, typically `ats+<user>@<host>`.
    fn system_actor(&self) -> String;

    /// An additional LLM actor reported by the environment, when present.
    fn llm_actor(&self) -> Option<String> {
        None
    }
}

/// Canonical no-op resolver: no known aliases.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl EntityResolver for NoopResolver {
    fn alt_ids(&self, _id: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Canonical no-op expander: identity patterns, no numeric or natural
/// predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExpander;

impl QueryExpander for NoopExpander {
    fn expand_predicate(&self, predicate: &str, values: &[String]) -> Vec<(String, String)> {
        if values.is_empty() {
            vec![(predicate.to_string(), String::new())]
        } else {
            values
                .iter()
                .map(|v| (predicate.to_string(), v.clone()))
                .collect()
        }
    }

    fn numeric_predicates(&self) -> Vec<String> {
        Vec::new()
    }

    fn natural_language_predicates(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Environment variable consulted for an ambient LLM actor.
pub const LLM_ACTOR_ENV: &str = "ATS_LLM_ACTOR";

/// Actor detection from the process environment: `ats+<user>@<host>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemActorDetector;

impl ActorDetector for SystemActorDetector {
    fn system_actor(&self) -> String {
        let user = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let host = env::var("HOSTNAME")
            .or_else(|_| env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "localhost".to_string());
        format!("ats+{}@{}", user, host)
    }

    fn llm_actor(&self) -> Option<String> {
        env::var(LLM_ACTOR_ENV).ok().filter(|s| !s.is_empty())
    }
}

/// Expand a filter through the alias resolver and query expander.
///
/// Subjects and contexts gain the union of their known aliases; predicates
/// gain the expander's search patterns. Already-present values are not
/// re-added, which makes the operation idempotent, but duplicates supplied
/// in the original filter are left untouched.
pub fn expand_filter(
    filter: &AxFilter,
    resolver: &dyn EntityResolver,
    expander: &dyn QueryExpander,
) -> AxFilter {
    let mut expanded = filter.clone();

    for subject in &filter.subjects {
        for alt in resolver.alt_ids(subject) {
            if !expanded.subjects.contains(&alt) {
                expanded.subjects.push(alt);
            }
        }
    }

    for context in &filter.contexts {
        for alt in resolver.alt_ids(context) {
            if !expanded.contexts.contains(&alt) {
                expanded.contexts.push(alt);
            }
        }
    }

    for predicate in &filter.predicates {
        for (pred, value) in expander.expand_predicate(predicate, &filter.contexts) {
            if !expanded.predicates.contains(&pred) {
                expanded.predicates.push(pred);
            }
            if !value.is_empty() && !expanded.contexts.contains(&value) {
                expanded.contexts.push(value);
            }
        }
    }

    expanded
}
