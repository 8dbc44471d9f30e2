//! The counter store (spec §4.8, C10): one sqlite table, one row per named item.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use umps_base::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS counters (
    item TEXT PRIMARY KEY,
    value INTEGER NOT NULL,
    increment INTEGER NOT NULL,
    initial INTEGER NOT NULL
)";

/// Items present by default (spec §4.8: "a small, enumerable set of named items").
pub const DEFAULT_ITEMS: &[&str] = &[
    "Amplitude",
    "Event",
    "Magnitude",
    "Origin",
    "PhasePick",
    "PhaseArrival",
];

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens or creates the store at `path`, creating parent directories if missing (spec
    /// §4.8: "the store file path is created with its parents if missing"). When
    /// `delete_if_exists` is set, any existing file is truncated first.
    pub fn initialize<P: AsRef<Path>>(path: P, delete_if_exists: bool) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if delete_if_exists && path.exists() {
            std::fs::remove_file(path)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        let store = Self { conn: Mutex::new(conn) };
        for item in DEFAULT_ITEMS {
            match store.add_item(item, 0, 1) {
                Ok(()) | Err(Error::InvalidArgument { .. }) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(store)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("incrementer store mutex poisoned")
    }

    /// Inserts a new row. Fails if `increment <= 0` or the item already exists.
    pub fn add_item(&self, name: &str, initial: i64, increment: i64) -> Result<()> {
        if increment <= 0 {
            return Err(Error::invalid_argument(format!(
                "increment must be positive, got {increment}"
            )));
        }
        let conn = self.lock();
        let inserted = conn
            .prepare_cached(
                "INSERT OR IGNORE INTO counters (item, value, increment, initial) VALUES (?1, ?2, ?3, ?2)",
            )?
            .execute((name, initial, increment))?;
        if inserted == 0 {
            return Err(Error::invalid_argument(format!("item {name:?} already exists")));
        }
        Ok(())
    }

    /// `value <- value + increment` in one transaction; returns the new value.
    pub fn get_next_value(&self, name: &str) -> Result<i64> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let (value, increment): (i64, i64) = tx
            .query_row(
                "SELECT value, increment FROM counters WHERE item = ?1",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| Error::invalid_argument(format!("unknown item {name:?}")))?;
        let next = value
            .checked_add(increment)
            .ok_or_else(|| Error::algorithm_failure(format!("counter {name:?} would overflow i64")))?;
        tx.execute("UPDATE counters SET value = ?1 WHERE item = ?2", (next, name))?;
        tx.commit()?;
        Ok(next)
    }

    pub fn get_current_value(&self, name: &str) -> Result<i64> {
        self.lock()
            .prepare_cached("SELECT value FROM counters WHERE item = ?1")?
            .query_row([name], |row| row.get(0))
            .optional()?
            .ok_or_else(|| Error::invalid_argument(format!("unknown item {name:?}")))
    }

    /// Resets one item's value back to `initial`. Spec §4.8: "explicitly documented as capable
    /// of producing duplicates", so callers who need uniqueness must not call this concurrently
    /// with `get_next_value`.
    pub fn reset(&self, name: &str) -> Result<()> {
        let updated = self
            .lock()
            .prepare_cached("UPDATE counters SET value = initial WHERE item = ?1")?
            .execute([name])?;
        if updated == 0 {
            return Err(Error::invalid_argument(format!("unknown item {name:?}")));
        }
        Ok(())
    }

    pub fn reset_all(&self) -> Result<()> {
        self.lock()
            .execute("UPDATE counters SET value = initial", [])?;
        Ok(())
    }

    pub fn get_items(&self) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("SELECT item FROM counters")?;
        let items = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(items)
    }

    pub fn have_item(&self, name: &str) -> Result<bool> {
        Ok(self
            .lock()
            .prepare_cached("SELECT 1 FROM counters WHERE item = ?1")?
            .query_row([name], |_| Ok(()))
            .optional()?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_items_are_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap();
        for item in DEFAULT_ITEMS {
            assert!(store.have_item(item).unwrap());
        }
    }

    #[test]
    fn get_next_value_increments_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap();
        store.add_item("Pick", 0, 5).unwrap();
        assert_eq!(store.get_next_value("Pick").unwrap(), 5);
        assert_eq!(store.get_next_value("Pick").unwrap(), 10);
        assert_eq!(store.get_current_value("Pick").unwrap(), 10);
    }

    #[test]
    fn add_item_rejects_nonpositive_increment() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap();
        assert!(store.add_item("Bad", 0, 0).is_err());
    }

    #[test]
    fn add_item_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap();
        assert!(store.add_item("Amplitude", 0, 1).is_err());
    }

    #[test]
    fn reset_restores_initial_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap();
        store.add_item("Pick", 100, 1).unwrap();
        store.get_next_value("Pick").unwrap();
        store.reset("Pick").unwrap();
        assert_eq!(store.get_current_value("Pick").unwrap(), 100);
    }

    #[test]
    fn get_next_value_detects_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap();
        store.add_item("Pick", i64::MAX - 1, 5).unwrap();
        assert!(store.get_next_value("Pick").is_err());
    }

    #[test]
    fn delete_if_exists_truncates_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.sqlite3");
        {
            let store = Store::initialize(&path, false).unwrap();
            store.add_item("Custom", 0, 1).unwrap();
        }
        let store = Store::initialize(&path, true).unwrap();
        assert!(!store.have_item("Custom").unwrap());
        assert!(store.have_item("Amplitude").unwrap());
    }
}
