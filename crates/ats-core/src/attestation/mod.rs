//! Attestation data model: the `Attestation` entity, its pre-persistence
//! command form, query filters, and ASID derivation.

pub mod asid;
mod types;

pub use types::{
    AsCommand, Attestation, AttestationBuilder, AxFilter, OverComparison, OverUnit,
    DEFAULT_QUERY_FORMAT, DEFAULT_QUERY_LIMIT, UNSPECIFIED,
};
