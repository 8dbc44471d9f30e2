//! The local-module table (spec §6 "Local modules"): one row per module registered in this
//! process, so a `uLocalCommand` CLI can discover what is running without a running requestor.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::OptionalExtension;

use umps_base::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS local_modules (
    name TEXT PRIMARY KEY,
    pid INTEGER NOT NULL,
    ipc_path TEXT NOT NULL,
    started_at INTEGER NOT NULL
)";

#[derive(Clone, Debug, PartialEq)]
pub struct LocalModuleRow {
    pub name: String,
    pub pid: u32,
    pub ipc_path: String,
    pub started_at: i64,
}

pub struct LocalModuleTable {
    conn: Mutex<rusqlite::Connection>,
}

impl LocalModuleTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Registers (or re-registers, on a stale row left by a crashed process) a module.
    pub fn register(&self, name: &str, pid: u32, ipc_path: &str, started_at: i64) -> Result<()> {
        self.conn
            .lock()
            .expect("local module table mutex poisoned")
            .prepare_cached(
                "INSERT INTO local_modules (name, pid, ipc_path, started_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET pid = ?2, ipc_path = ?3, started_at = ?4",
            )?
            .execute((name, pid, ipc_path, started_at))?;
        Ok(())
    }

    pub fn deregister(&self, name: &str) -> Result<()> {
        self.conn
            .lock()
            .expect("local module table mutex poisoned")
            .prepare_cached("DELETE FROM local_modules WHERE name = ?1")?
            .execute([name])?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<LocalModuleRow>> {
        self.conn
            .lock()
            .expect("local module table mutex poisoned")
            .prepare_cached("SELECT name, pid, ipc_path, started_at FROM local_modules WHERE name = ?1")?
            .query_row([name], row_to_entry)
            .optional()
            .map_err(Into::into)
    }

    pub fn list(&self) -> Result<Vec<LocalModuleRow>> {
        let conn = self.conn.lock().expect("local module table mutex poisoned");
        let mut stmt = conn.prepare_cached("SELECT name, pid, ipc_path, started_at FROM local_modules")?;
        let rows = stmt
            .query_map([], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocalModuleRow> {
    Ok(LocalModuleRow {
        name: row.get(0)?,
        pid: row.get(1)?,
        ipc_path: row.get(2)?,
        started_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let table = LocalModuleTable::open(dir.path().join("modules.sqlite3")).unwrap();
        table.register("picker", 123, "/tmp/umps/picker.ipc", 1_000).unwrap();
        let rows = table.list().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "picker");
        assert_eq!(rows[0].pid, 123);
    }

    #[test]
    fn deregister_removes_row() {
        let dir = tempfile::tempdir().unwrap();
        let table = LocalModuleTable::open(dir.path().join("modules.sqlite3")).unwrap();
        table.register("picker", 123, "/tmp/umps/picker.ipc", 1_000).unwrap();
        table.deregister("picker").unwrap();
        assert!(table.get("picker").unwrap().is_none());
    }

    #[test]
    fn register_twice_updates_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let table = LocalModuleTable::open(dir.path().join("modules.sqlite3")).unwrap();
        table.register("picker", 123, "/tmp/umps/picker.ipc", 1_000).unwrap();
        table.register("picker", 456, "/tmp/umps/picker.ipc", 2_000).unwrap();
        let row = table.get("picker").unwrap().unwrap();
        assert_eq!(row.pid, 456);
        assert_eq!(row.started_at, 2_000);
    }
}
