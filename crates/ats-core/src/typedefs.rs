//! Self-certifying type attestations.
//!
//! A type is an attestation with predicate `"type"`, context `"graph"`,
//! subject = type name, and actor = type name. The loopback in the actor
//! namespace is a convention, not a graph edge.

use thiserror::Error;
use tracing::{debug, warn};

use crate::attestation::{asid, Attestation, AttestationBuilder};
use crate::attrs::{self, AttrMap, AttributeRecord};
use crate::storage::AttestationStore;

/// Predicate marking a node type attestation.
pub const TYPE_PREDICATE: &str = "type";

/// Predicate marking a relationship type attestation.
pub const RELATIONSHIP_TYPE_PREDICATE: &str = "relationship_type";

/// Context shared by all type attestations.
pub const TYPE_CONTEXT: &str = "graph";

/// Metadata for a semantic node category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub label: String,
    pub color: String,
    pub opacity: Option<f64>,
    pub deprecated: bool,
    /// Attribute keys participating in rich-text search
    pub rich_string_fields: Option<Vec<String>>,
    pub array_fields: Option<Vec<String>>,
}

impl AttributeRecord for TypeDef {
    fn to_attributes(&self) -> AttrMap {
        let mut map = AttrMap::new();
        attrs::put_string(&mut map, "name", &self.name);
        attrs::put_string(&mut map, "label", &self.label);
        attrs::put_string(&mut map, "color", &self.color);
        attrs::put_opt_f64(&mut map, "opacity", self.opacity);
        attrs::put_bool(&mut map, "deprecated", self.deprecated);
        attrs::put_opt_string_vec(&mut map, "rich_string_fields", self.rich_string_fields.as_ref());
        attrs::put_opt_string_vec(&mut map, "array_fields", self.array_fields.as_ref());
        map
    }

    fn from_attributes(map: &AttrMap) -> Self {
        Self {
            name: attrs::get_string(map, "name"),
            label: attrs::get_string(map, "label"),
            color: attrs::get_string(map, "color"),
            opacity: attrs::get_opt_f64(map, "opacity"),
            deprecated: attrs::get_bool(map, "deprecated"),
            rich_string_fields: attrs::get_opt_string_vec(map, "rich_string_fields"),
            array_fields: attrs::get_opt_string_vec(map, "array_fields"),
        }
    }
}

/// Metadata for a relationship category, including graph physics hints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipTypeDef {
    pub name: String,
    pub label: String,
    pub color: Option<String>,
    pub link_distance: f64,
    pub link_strength: f64,
}

impl AttributeRecord for RelationshipTypeDef {
    fn to_attributes(&self) -> AttrMap {
        let mut map = AttrMap::new();
        attrs::put_string(&mut map, "name", &self.name);
        attrs::put_string(&mut map, "label", &self.label);
        attrs::put_string(&mut map, "color", self.color.as_deref().unwrap_or(""));
        attrs::put_f64(&mut map, "link_distance", self.link_distance);
        attrs::put_f64(&mut map, "link_strength", self.link_strength);
        map
    }

    fn from_attributes(map: &AttrMap) -> Self {
        let color = attrs::get_string(map, "color");
        Self {
            name: attrs::get_string(map, "name"),
            label: attrs::get_string(map, "label"),
            color: if color.is_empty() { None } else { Some(color) },
            link_distance: attrs::get_f64(map, "link_distance"),
            link_strength: attrs::get_f64(map, "link_strength"),
        }
    }
}

/// Accumulated failures from a best-effort registration pass.
#[derive(Debug, Error)]
#[error("{} type registrations failed: {}", failures.len(), failures.join("; "))]
pub struct EnsureError {
    pub failures: Vec<String>,
}

/// Ensure the given node types exist as attestations.
///
/// Best-effort: each definition is attempted independently, failures are
/// accumulated, and partial success is acceptable. Existing registrations
/// are left untouched. Missing opacity defaults to 1.0.
pub fn ensure_types(
    store: &mut dyn AttestationStore,
    source: &str,
    defs: &[TypeDef],
) -> Result<(), EnsureError> {
    let mut failures = Vec::new();

    for def in defs {
        let mut def = def.clone();
        if def.opacity.is_none() {
            def.opacity = Some(1.0);
        }

        if let Err(e) = ensure_one(store, source, &def.name, TYPE_PREDICATE, def.to_attributes()) {
            warn!(name = %def.name, error = %e, "type registration failed");
            failures.push(format!("{}: {}", def.name, e));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(EnsureError { failures })
    }
}

/// Ensure relationship types exist, mirroring [`ensure_types`].
pub fn ensure_relationship_types(
    store: &mut dyn AttestationStore,
    source: &str,
    defs: &[RelationshipTypeDef],
) -> Result<(), EnsureError> {
    let mut failures = Vec::new();

    for def in defs {
        if let Err(e) = ensure_one(
            store,
            source,
            &def.name,
            RELATIONSHIP_TYPE_PREDICATE,
            def.to_attributes(),
        ) {
            warn!(name = %def.name, error = %e, "relationship type registration failed");
            failures.push(format!("{}: {}", def.name, e));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(EnsureError { failures })
    }
}

fn ensure_one(
    store: &mut dyn AttestationStore,
    source: &str,
    name: &str,
    predicate: &str,
    attributes: AttrMap,
) -> Result<(), crate::storage::StoreError> {
    // The ASID seed uses an empty actor so the id is stable regardless of
    // the self-certifying actor filled below.
    let id = asid::generate(name, predicate, TYPE_CONTEXT, "", 0);

    if store.exists(&id)? {
        debug!(%name, %id, "type already registered");
        return Ok(());
    }

    let attestation = build_type_attestation(id, name, predicate, source, attributes);
    store.create(attestation)
}

fn build_type_attestation(
    id: String,
    name: &str,
    predicate: &str,
    source: &str,
    attributes: AttrMap,
) -> Attestation {
    let mut builder = AttestationBuilder::new()
        .id(id)
        .subject(name)
        .predicate(predicate)
        .context(TYPE_CONTEXT)
        .actor(name)
        .source(source)
        .timestamp(chrono::Utc::now().timestamp_millis());
    for (key, value) in attributes {
        builder = builder.attribute(key, value);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn person_type() -> TypeDef {
        TypeDef {
            name: "person".to_string(),
            label: "Person".to_string(),
            color: "#4a90d9".to_string(),
            rich_string_fields: Some(vec!["bio".to_string(), "name".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn typedef_roundtrip() {
        let def = TypeDef {
            opacity: Some(0.8),
            deprecated: true,
            array_fields: Some(vec!["aliases".to_string()]),
            ..person_type()
        };
        let decoded = TypeDef::from_attributes(&def.to_attributes());
        assert_eq!(decoded, def);
    }

    #[test]
    fn relationship_typedef_roundtrip() {
        let def = RelationshipTypeDef {
            name: "works_at".to_string(),
            label: "Works At".to_string(),
            color: Some("#999999".to_string()),
            link_distance: 120.0,
            link_strength: 0.7,
        };
        let decoded = RelationshipTypeDef::from_attributes(&def.to_attributes());
        assert_eq!(decoded, def);
    }

    #[test]
    fn ensure_creates_self_certifying_attestation() {
        let mut store = MemoryStore::new();
        ensure_types(&mut store, "boot", &[person_type()]).unwrap();

        let ids = store.list_ids().unwrap();
        assert_eq!(ids.len(), 1);

        let attestation = store.get(&ids[0]).unwrap().unwrap();
        assert_eq!(attestation.subjects, vec!["person"]);
        assert_eq!(attestation.predicates, vec![TYPE_PREDICATE]);
        assert_eq!(attestation.contexts, vec![TYPE_CONTEXT]);
        // actor is the type name: self-certifying
        assert_eq!(attestation.actors, vec!["person"]);
        // opacity defaulted
        assert_eq!(attrs::get_opt_f64(&attestation.attributes, "opacity"), Some(1.0));
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut store = MemoryStore::new();
        ensure_types(&mut store, "boot", &[person_type()]).unwrap();
        ensure_types(&mut store, "boot", &[person_type()]).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn ensure_accumulates_failures_best_effort() {
        struct FailingStore {
            inner: MemoryStore,
        }

        impl AttestationStore for FailingStore {
            fn create(&mut self, attestation: Attestation) -> crate::storage::StoreResult<()> {
                if attestation.subjects[0] == "broken" {
                    return Err(crate::storage::StoreError::Backend("disk full".into()));
                }
                self.inner.create(attestation)
            }
            fn get(&self, id: &str) -> crate::storage::StoreResult<Option<Attestation>> {
                self.inner.get(id)
            }
            fn update(&mut self, a: Attestation) -> crate::storage::StoreResult<()> {
                self.inner.update(a)
            }
            fn delete(&mut self, id: &str) -> crate::storage::StoreResult<bool> {
                self.inner.delete(id)
            }
            fn list_ids(&self) -> crate::storage::StoreResult<Vec<String>> {
                self.inner.list_ids()
            }
            fn query(
                &self,
                f: &crate::attestation::AxFilter,
            ) -> crate::storage::StoreResult<crate::storage::QueryResult> {
                self.inner.query(f)
            }
            fn subjects(&self) -> crate::storage::StoreResult<Vec<String>> {
                self.inner.subjects()
            }
            fn predicates(&self) -> crate::storage::StoreResult<Vec<String>> {
                self.inner.predicates()
            }
            fn contexts(&self) -> crate::storage::StoreResult<Vec<String>> {
                self.inner.contexts()
            }
            fn actors(&self) -> crate::storage::StoreResult<Vec<String>> {
                self.inner.actors()
            }
        }

        let mut store = FailingStore {
            inner: MemoryStore::new(),
        };
        let broken = TypeDef {
            name: "broken".to_string(),
            ..Default::default()
        };

        let err = ensure_types(&mut store, "boot", &[person_type(), broken]).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert!(err.failures[0].contains("broken"));
        // the good definition still landed
        assert_eq!(store.inner.count().unwrap(), 1);
    }
}
