//! Database migration runner.
//!
//! Migrations are embedded SQL applied in order and recorded in
//! `schema_migrations`; re-running is a no-op.

use rusqlite::Connection;

use crate::error::Result;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "000",
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    ),
    (
        "001",
        "CREATE TABLE attestations (
            id TEXT PRIMARY KEY,
            subjects TEXT NOT NULL,
            predicates TEXT NOT NULL,
            contexts TEXT NOT NULL,
            actors TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            source TEXT NOT NULL,
            attributes TEXT,
            signature TEXT NOT NULL DEFAULT '',
            signer_did TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX idx_attestations_timestamp ON attestations(timestamp);
        CREATE INDEX idx_attestations_deleted_at ON attestations(deleted_at);",
    ),
    (
        "002",
        "CREATE TABLE watchers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            filter TEXT NOT NULL,
            action_type TEXT NOT NULL,
            action_data TEXT NOT NULL,
            max_fires_per_minute INTEGER NOT NULL DEFAULT 60,
            enabled INTEGER NOT NULL DEFAULT 1,
            fire_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT NOT NULL DEFAULT '',
            last_fired TEXT
        );",
    ),
];

/// Apply all pending migrations to the database.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    for (version, sql) in MIGRATIONS {
        apply_migration(conn, version, sql)?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: &str, sql: &str) -> Result<()> {
    if is_migration_applied(conn, version)? {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    record_migration(&tx, version)?;
    tx.commit()?;

    Ok(())
}

fn is_migration_applied(conn: &Connection, version: &str) -> Result<bool> {
    let table_exists: bool = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='schema_migrations'")?
        .exists([])?;

    if !table_exists {
        return Ok(false);
    }

    let exists = conn
        .prepare("SELECT 1 FROM schema_migrations WHERE version = ?")?
        .exists([version])?;

    Ok(exists)
}

fn record_migration(conn: &Connection, version: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?, CURRENT_TIMESTAMP)",
        [version],
    )?;
    Ok(())
}
