//! Query pipeline glue: filter expansion followed by storage execution.

use tracing::debug;

use crate::attestation::AxFilter;
use crate::resolve::{expand_filter, EntityResolver, QueryExpander};
use crate::storage::{AttestationStore, QueryResult, StoreResult};

/// Expand a filter through the configured plugins and execute it.
///
/// The parser, expansion, and storage are each independently usable; this
/// is the conventional composition used by the CLI and the server surface.
pub fn run_query<S: AttestationStore + ?Sized>(
    store: &S,
    filter: &AxFilter,
    resolver: &dyn EntityResolver,
    expander: &dyn QueryExpander,
) -> StoreResult<QueryResult> {
    let expanded = expand_filter(filter, resolver, expander);
    debug!(
        subjects = expanded.subjects.len(),
        predicates = expanded.predicates.len(),
        contexts = expanded.contexts.len(),
        "executing expanded query"
    );
    store.query(&expanded)
}
