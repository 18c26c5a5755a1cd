//! Shared filter matching semantics.
//!
//! Every backend routes its PCSA overlap comparisons, time-range bounds,
//! and `over` evaluation through this module so that results, signatures,
//! and test fixtures stay interchangeable across backends. A backend may
//! pre-filter in its own query language, but the final word is here.

use serde_json::Value;

use crate::attestation::{Attestation, AxFilter, OverComparison};

/// True when the attestation matches every constraint of the filter except
/// the `over` comparison, which needs the numeric-predicate set and is
/// checked by [`matches_over`].
///
/// Each non-empty filter sequence constrains the corresponding field by
/// overlap: at least one filter element must appear in the attestation's
/// sequence. Subject comparison uses the stored case but tolerates
/// mixed-case input by uppercasing filter tokens; the other fields compare
/// case-insensitively. Time bounds are inclusive.
pub fn matches_filter(attestation: &Attestation, filter: &AxFilter) -> bool {
    if !filter.subjects.is_empty() {
        let hit = attestation
            .subjects
            .iter()
            .any(|s| filter.subjects.iter().any(|f| s == &f.to_uppercase()));
        if !hit {
            return false;
        }
    }

    if !overlaps_ci(&attestation.predicates, &filter.predicates) {
        return false;
    }
    if !overlaps_ci(&attestation.contexts, &filter.contexts) {
        return false;
    }
    if !overlaps_ci(&attestation.actors, &filter.actors) {
        return false;
    }

    if let Some(start) = filter.time_start {
        if attestation.timestamp < start {
            return false;
        }
    }
    if let Some(end) = filter.time_end {
        if attestation.timestamp > end {
            return false;
        }
    }

    true
}

/// Case-insensitive overlap; an empty filter sequence matches everything.
fn overlaps_ci(stored: &[String], wanted: &[String]) -> bool {
    wanted.is_empty()
        || stored
            .iter()
            .any(|s| wanted.iter().any(|w| s.eq_ignore_ascii_case(w)))
}

/// Evaluate an `over` comparison against an attestation.
///
/// Matches when the attestation carries a numeric attribute under one of
/// its own predicates that is also a known numeric predicate, and the
/// value (interpreted in years) meets or exceeds the threshold. When no
/// numeric-predicate set is configured, every predicate with a numeric
/// attribute under its own name is eligible.
pub fn matches_over(
    attestation: &Attestation,
    over: &OverComparison,
    numeric_predicates: &[String],
) -> bool {
    let threshold = over.threshold_years();

    attestation.predicates.iter().any(|predicate| {
        let known = numeric_predicates.is_empty()
            || numeric_predicates
                .iter()
                .any(|p| p.eq_ignore_ascii_case(predicate));
        if !known {
            return false;
        }
        match attestation.attributes.get(predicate.as_str()) {
            Some(Value::Number(n)) => n.as_f64().map(|v| v >= threshold).unwrap_or(false),
            _ => false,
        }
    })
}

/// Apply full filter semantics to a list of attestations: match, order by
/// timestamp descending, truncate to the filter limit.
pub fn apply_filter(
    mut attestations: Vec<Attestation>,
    filter: &AxFilter,
    numeric_predicates: &[String],
) -> Vec<Attestation> {
    attestations.retain(|a| {
        matches_filter(a, filter)
            && filter
                .over_comparison
                .as_ref()
                .map(|over| matches_over(a, over, numeric_predicates))
                .unwrap_or(true)
    });

    attestations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    attestations.truncate(filter.limit);
    attestations
}
