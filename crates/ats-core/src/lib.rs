//! ATS Core Engine
//!
//! The attestation-centric data plane and AX/AS language pipeline:
//!
//! - **parser**: tokenizer, keyword classifier, and the state-machine
//!   grammar engine for the AX query and AS assertion languages
//! - **temporal**: the temporal sublanguage (absolute, relative, and
//!   named-day expressions)
//! - **diagnostic**: structured errors with source positions and dual
//!   terminal/plain rendering
//! - **attestation / attrs**: the `Attestation` entity, command form,
//!   filters, and attribute marshalling
//! - **expand**: Cartesian expansion into individual claims
//! - **resolve / query**: pluggable alias and predicate expansion
//! - **storage**: the backend contract, shared matcher, and the in-memory
//!   backend
//! - **sign / canonical**: Ed25519 signing over the canonical byte form,
//!   did:key encoding
//! - **fuzzy / richtext**: fuzzy matching and rich-text attribute search
//! - **typedefs**: self-certifying type attestations
//! - **watcher**: the persisted watcher model (the engine lives in
//!   `ats-watch`)
//!
//! # Example
//!
//! ```rust
//! use ats_core::parser::Parser;
//!
//! let parsed = Parser::new()
//!     .parse_query_str("ALICE is author_of of github since 2024-01-01")
//!     .unwrap();
//! assert_eq!(parsed.value.subjects, vec!["ALICE"]);
//! assert_eq!(parsed.value.predicates, vec!["author_of"]);
//! assert_eq!(parsed.value.contexts, vec!["github"]);
//! ```

pub mod attestation;
pub mod attrs;
pub mod canonical;
pub mod diagnostic;
pub mod expand;
pub mod fuzzy;
pub mod parser;
pub mod query;
pub mod resolve;
pub mod richtext;
pub mod sign;
pub mod storage;
pub mod temporal;
pub mod typedefs;
pub mod watcher;

// Re-export main types at crate root
pub use attestation::{
    AsCommand, Attestation, AttestationBuilder, AxFilter, OverComparison, OverUnit,
};
pub use attrs::{AttrMap, AttributeRecord};
pub use canonical::canonical_bytes;
pub use diagnostic::{Diagnostic, ErrorKind, LspDiagnostic, Severity};
pub use expand::{expand, group_by_key, to_attestations, ClaimGroup, IndividualClaim};
pub use fuzzy::{FuzzyEngine, FuzzyMatch};
pub use parser::{Parsed, ParseError, Parser};
pub use query::run_query;
pub use resolve::{
    expand_filter, ActorDetector, EntityResolver, NoopExpander, NoopResolver, QueryExpander,
    SystemActorDetector,
};
pub use richtext::{RichTextHit, RichTextSearch};
pub use sign::{decode_did_key, encode_did_key, verify, AttestationSigner, SignError};
pub use storage::{
    AttestationStore, MemoryStore, QueryResult, QuerySummary, StorageStats, StoreError,
    StoreResult,
};
pub use temporal::{parse_when, TemporalError, TimeSpec};
pub use typedefs::{ensure_relationship_types, ensure_types, RelationshipTypeDef, TypeDef};
pub use watcher::{ActionType, Watcher};
