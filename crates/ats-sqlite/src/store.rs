//! SQLite storage backend implementing the AttestationStore trait.
//!
//! SQL does a conservative pre-filter (tombstones, time bounds, a
//! case-folded PCSA overlap superset); the rows that survive are re-checked
//! through `ats_core::storage::matcher`, which is the single source of
//! truth for filter semantics. Both backends therefore return bit-identical
//! results for identical inputs.

use ats_core::{
    attestation::{Attestation, AxFilter},
    storage::{matcher, AttestationStore, QueryResult, QuerySummary, StoreError, StoreResult},
};
use rusqlite::{Connection, OptionalExtension};

use crate::json::{
    deserialize_attributes, deserialize_string_vec, serialize_attributes, serialize_string_vec,
    sql_to_timestamp, timestamp_to_sql,
};

const ATTESTATION_COLUMNS: &str = "id, subjects, predicates, contexts, actors, timestamp, \
     source, attributes, signature, signer_did, created_at";

/// SQLite-backed attestation store.
pub struct SqliteStore {
    conn: Connection,
    numeric_predicates: Vec<String>,
}

impl SqliteStore {
    /// Wrap an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            numeric_predicates: Vec::new(),
        }
    }

    /// Create a new in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::migrate::migrate(&conn)?;
        Ok(Self::new(conn))
    }

    /// Open or create a file-backed store.
    pub fn open(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        crate::migrate::migrate(&conn)?;
        Ok(Self::new(conn))
    }

    /// Configure the numeric-predicate set driving `over` comparisons.
    pub fn set_numeric_predicates(&mut self, predicates: Vec<String>) {
        self.numeric_predicates = predicates;
    }

    /// The underlying connection, for migrations and watcher persistence.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn row_to_attestation(
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<(
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        Option<String>,
        String,
        String,
        String,
    )> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn hydrate(
        row: (
            String,
            String,
            String,
            String,
            String,
            String,
            String,
            Option<String>,
            String,
            String,
            String,
        ),
    ) -> StoreResult<Attestation> {
        let (
            id,
            subjects,
            predicates,
            contexts,
            actors,
            timestamp,
            source,
            attributes,
            signature,
            signer_did,
            created_at,
        ) = row;

        Ok(Attestation {
            id,
            subjects: deserialize_string_vec(&subjects).map_err(StoreError::from)?,
            predicates: deserialize_string_vec(&predicates).map_err(StoreError::from)?,
            contexts: deserialize_string_vec(&contexts).map_err(StoreError::from)?,
            actors: deserialize_string_vec(&actors).map_err(StoreError::from)?,
            timestamp: sql_to_timestamp(&timestamp).map_err(StoreError::from)?,
            source,
            attributes: deserialize_attributes(attributes).map_err(StoreError::from)?,
            signature,
            signer_did,
            created_at: sql_to_timestamp(&created_at).map_err(StoreError::from)?,
        })
    }

    fn distinct_values(&self, field: &str) -> StoreResult<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT value FROM attestations, json_each({}) \
             WHERE deleted_at IS NULL ORDER BY value",
            field
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .collect::<Result<Vec<String>, rusqlite::Error>>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(values)
    }
}

impl AttestationStore for SqliteStore {
    fn create(&mut self, attestation: Attestation) -> StoreResult<()> {
        if self.exists(&attestation.id)? {
            return Err(StoreError::AlreadyExists(attestation.id));
        }

        let subjects = serialize_string_vec(&attestation.subjects).map_err(StoreError::from)?;
        let predicates = serialize_string_vec(&attestation.predicates).map_err(StoreError::from)?;
        let contexts = serialize_string_vec(&attestation.contexts).map_err(StoreError::from)?;
        let actors = serialize_string_vec(&attestation.actors).map_err(StoreError::from)?;
        let attributes = serialize_attributes(&attestation.attributes).map_err(StoreError::from)?;

        self.conn
            .execute(
                "INSERT INTO attestations \
                 (id, subjects, predicates, contexts, actors, timestamp, source, attributes, \
                  signature, signer_did, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    attestation.id,
                    subjects,
                    predicates,
                    contexts,
                    actors,
                    timestamp_to_sql(attestation.timestamp),
                    attestation.source,
                    attributes,
                    attestation.signature,
                    attestation.signer_did,
                    timestamp_to_sql(attestation.created_at),
                ],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Attestation>> {
        let sql = format!(
            "SELECT {} FROM attestations WHERE id = ? AND deleted_at IS NULL",
            ATTESTATION_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let row = stmt
            .query_row([id], Self::row_to_attestation)
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(Self::hydrate).transpose()
    }

    fn update(&mut self, attestation: Attestation) -> StoreResult<()> {
        if !self.exists(&attestation.id)? {
            return Err(StoreError::NotFound(attestation.id));
        }

        let subjects = serialize_string_vec(&attestation.subjects).map_err(StoreError::from)?;
        let predicates = serialize_string_vec(&attestation.predicates).map_err(StoreError::from)?;
        let contexts = serialize_string_vec(&attestation.contexts).map_err(StoreError::from)?;
        let actors = serialize_string_vec(&attestation.actors).map_err(StoreError::from)?;
        let attributes = serialize_attributes(&attestation.attributes).map_err(StoreError::from)?;

        // created_at is immutable
        self.conn
            .execute(
                "UPDATE attestations \
                 SET subjects = ?, predicates = ?, contexts = ?, actors = ?, timestamp = ?, \
                     source = ?, attributes = ?, signature = ?, signer_did = ? \
                 WHERE id = ?",
                rusqlite::params![
                    subjects,
                    predicates,
                    contexts,
                    actors,
                    timestamp_to_sql(attestation.timestamp),
                    attestation.source,
                    attributes,
                    attestation.signature,
                    attestation.signer_did,
                    attestation.id,
                ],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    fn delete(&mut self, id: &str) -> StoreResult<bool> {
        let affected = self
            .conn
            .execute(
                "UPDATE attestations SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
                rusqlite::params![timestamp_to_sql(chrono::Utc::now().timestamp_millis()), id],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(affected > 0)
    }

    fn list_ids(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM attestations WHERE deleted_at IS NULL ORDER BY id")
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .collect::<Result<Vec<String>, rusqlite::Error>>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(ids)
    }

    fn query(&self, filter: &AxFilter) -> StoreResult<QueryResult> {
        // Conservative SQL pre-filter: a case-folded superset of the PCSA
        // overlap plus the time bounds. The matcher has the final word.
        let mut sql = format!(
            "SELECT {} FROM attestations WHERE deleted_at IS NULL",
            ATTESTATION_COLUMNS
        );
        let mut params: Vec<String> = Vec::new();

        for (column, values) in [
            ("subjects", &filter.subjects),
            ("predicates", &filter.predicates),
            ("contexts", &filter.contexts),
            ("actors", &filter.actors),
        ] {
            if !values.is_empty() {
                let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
                sql.push_str(&format!(
                    " AND EXISTS (SELECT 1 FROM json_each({}) WHERE lower(value) IN ({}))",
                    column, placeholders
                ));
                params.extend(values.iter().map(|v| v.to_lowercase()));
            }
        }

        if let Some(start) = filter.time_start {
            sql.push_str(" AND timestamp >= ?");
            params.push(timestamp_to_sql(start));
        }
        if let Some(end) = filter.time_end {
            sql.push_str(" AND timestamp <= ?");
            params.push(timestamp_to_sql(end));
        }

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let param_refs: Vec<&dyn rusqlite::ToSql> =
            params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

        let rows = stmt
            .query_map(&param_refs[..], Self::row_to_attestation)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut candidates = Vec::new();
        for row in rows {
            let row = row.map_err(|e| StoreError::Backend(e.to_string()))?;
            candidates.push(Self::hydrate(row)?);
        }

        let attestations = matcher::apply_filter(candidates, filter, &self.numeric_predicates);
        let summary = QuerySummary::from_attestations(&attestations);

        Ok(QueryResult {
            attestations,
            summary,
        })
    }

    fn subjects(&self) -> StoreResult<Vec<String>> {
        self.distinct_values("subjects")
    }

    fn predicates(&self) -> StoreResult<Vec<String>> {
        self.distinct_values("predicates")
    }

    fn contexts(&self) -> StoreResult<Vec<String>> {
        self.distinct_values("contexts")
    }

    fn actors(&self) -> StoreResult<Vec<String>> {
        self.distinct_values("actors")
    }
}
