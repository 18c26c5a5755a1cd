//! Watcher persistence.
//!
//! CRUD plus the counter updates the watch engine reports after action
//! execution. The filter column stores the `AxFilter` as JSON.

use ats_core::watcher::{ActionType, Watcher};
use rusqlite::OptionalExtension;

use crate::error::{Result, SqliteError};
use crate::json::{sql_to_timestamp, timestamp_to_sql};
use crate::store::SqliteStore;

const WATCHER_COLUMNS: &str = "id, name, filter, action_type, action_data, \
     max_fires_per_minute, enabled, fire_count, error_count, last_error, last_fired";

impl SqliteStore {
    pub fn create_watcher(&mut self, watcher: &Watcher) -> Result<()> {
        self.connection().execute(
            "INSERT INTO watchers \
             (id, name, filter, action_type, action_data, max_fires_per_minute, enabled, \
              fire_count, error_count, last_error, last_fired) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                watcher.id,
                watcher.name,
                serde_json::to_string(&watcher.filter)?,
                watcher.action_type.to_string(),
                watcher.action_data,
                watcher.max_fires_per_minute,
                watcher.enabled,
                watcher.fire_count,
                watcher.error_count,
                watcher.last_error,
                watcher.last_fired.map(timestamp_to_sql),
            ],
        )?;
        Ok(())
    }

    pub fn get_watcher(&self, id: &str) -> Result<Option<Watcher>> {
        let sql = format!("SELECT {} FROM watchers WHERE id = ?", WATCHER_COLUMNS);
        let mut stmt = self.connection().prepare(&sql)?;
        let row = stmt.query_row([id], row_to_watcher_parts).optional()?;
        row.map(hydrate_watcher).transpose()
    }

    pub fn update_watcher(&mut self, watcher: &Watcher) -> Result<()> {
        let affected = self.connection().execute(
            "UPDATE watchers \
             SET name = ?, filter = ?, action_type = ?, action_data = ?, \
                 max_fires_per_minute = ?, enabled = ? \
             WHERE id = ?",
            rusqlite::params![
                watcher.name,
                serde_json::to_string(&watcher.filter)?,
                watcher.action_type.to_string(),
                watcher.action_data,
                watcher.max_fires_per_minute,
                watcher.enabled,
                watcher.id,
            ],
        )?;
        if affected == 0 {
            return Err(SqliteError::NotFound(watcher.id.clone()));
        }
        Ok(())
    }

    pub fn delete_watcher(&mut self, id: &str) -> Result<bool> {
        let affected = self
            .connection()
            .execute("DELETE FROM watchers WHERE id = ?", [id])?;
        Ok(affected > 0)
    }

    pub fn list_watchers(&self) -> Result<Vec<Watcher>> {
        self.watchers_where("1=1")
    }

    /// The enabled set loaded by the watch engine on start and reload.
    pub fn list_enabled_watchers(&self) -> Result<Vec<Watcher>> {
        self.watchers_where("enabled = 1")
    }

    /// Record a successful fire: bump the counter and stamp last_fired.
    pub fn record_watcher_fire(&mut self, id: &str, fired_at_ms: i64) -> Result<()> {
        self.connection().execute(
            "UPDATE watchers SET fire_count = fire_count + 1, last_fired = ? WHERE id = ?",
            rusqlite::params![timestamp_to_sql(fired_at_ms), id],
        )?;
        Ok(())
    }

    /// Record a failed execution: bump the error counter and keep the
    /// message.
    pub fn record_watcher_error(&mut self, id: &str, error: &str) -> Result<()> {
        self.connection().execute(
            "UPDATE watchers SET error_count = error_count + 1, last_error = ? WHERE id = ?",
            rusqlite::params![error, id],
        )?;
        Ok(())
    }

    fn watchers_where(&self, predicate: &str) -> Result<Vec<Watcher>> {
        let sql = format!(
            "SELECT {} FROM watchers WHERE {} ORDER BY id",
            WATCHER_COLUMNS, predicate
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_watcher_parts)?;

        let mut watchers = Vec::new();
        for row in rows {
            watchers.push(hydrate_watcher(row?)?);
        }
        Ok(watchers)
    }
}

type WatcherParts = (
    String,
    String,
    String,
    String,
    String,
    u32,
    bool,
    u64,
    u64,
    String,
    Option<String>,
);

fn row_to_watcher_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatcherParts> {
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

fn hydrate_watcher(parts: WatcherParts) -> Result<Watcher> {
    let (
        id,
        name,
        filter,
        action_type,
        action_data,
        max_fires_per_minute,
        enabled,
        fire_count,
        error_count,
        last_error,
        last_fired,
    ) = parts;

    Ok(Watcher {
        id,
        name,
        filter: serde_json::from_str(&filter)?,
        action_type: action_type
            .parse::<ActionType>()
            .map_err(SqliteError::Migration)?,
        action_data,
        max_fires_per_minute,
        enabled,
        fire_count,
        error_count,
        last_error,
        last_fired: last_fired.map(|s| sql_to_timestamp(&s)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_core::attestation::AxFilter;
    use pretty_assertions::assert_eq;

    fn login_watcher(id: &str) -> Watcher {
        Watcher::new(
            id,
            "login watcher",
            AxFilter {
                predicates: vec!["login".into()],
                ..Default::default()
            },
            ActionType::Webhook,
            "https://example.com/hook",
        )
    }

    #[test]
    fn crud_roundtrip() {
        let mut store = SqliteStore::in_memory().unwrap();
        let watcher = login_watcher("w-1");

        store.create_watcher(&watcher).unwrap();
        let loaded = store.get_watcher("w-1").unwrap().unwrap();
        assert_eq!(loaded, watcher);

        let mut updated = watcher.clone();
        updated.enabled = false;
        updated.max_fires_per_minute = 5;
        store.update_watcher(&updated).unwrap();

        let loaded = store.get_watcher("w-1").unwrap().unwrap();
        assert!(!loaded.enabled);
        assert_eq!(loaded.max_fires_per_minute, 5);

        assert!(store.delete_watcher("w-1").unwrap());
        assert!(!store.delete_watcher("w-1").unwrap());
        assert!(store.get_watcher("w-1").unwrap().is_none());
    }

    #[test]
    fn enabled_listing_filters() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.create_watcher(&login_watcher("w-1")).unwrap();

        let mut disabled = login_watcher("w-2");
        disabled.enabled = false;
        store.create_watcher(&disabled).unwrap();

        assert_eq!(store.list_watchers().unwrap().len(), 2);
        let enabled = store.list_enabled_watchers().unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "w-1");
    }

    #[test]
    fn counters_update() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.create_watcher(&login_watcher("w-1")).unwrap();

        store.record_watcher_fire("w-1", 1704067200000).unwrap();
        store.record_watcher_fire("w-1", 1704067260000).unwrap();
        store.record_watcher_error("w-1", "executor unreachable").unwrap();

        let loaded = store.get_watcher("w-1").unwrap().unwrap();
        assert_eq!(loaded.fire_count, 2);
        assert_eq!(loaded.error_count, 1);
        assert_eq!(loaded.last_error, "executor unreachable");
        assert_eq!(loaded.last_fired, Some(1704067260000));
    }

    #[test]
    fn update_missing_watcher_fails() {
        let mut store = SqliteStore::in_memory().unwrap();
        let result = store.update_watcher(&login_watcher("w-missing"));
        assert!(matches!(result, Err(SqliteError::NotFound(_))));
    }
}
