//! Relational on-disk `Authenticator` backend (spec §4.1, §6 persistent layouts).
//!
//! Three tables: `users`, `whitelist`, `blacklist`. A single connection guarded by a mutex
//! serializes every call, the same idiom `umps_incrementer::Store` and
//! `umps_modules::LocalModuleTable` use for their own SQLite-backed state; this crate has no
//! concurrent-transaction throughput requirement that would justify a connection pool.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use umps_base::error::{Error, Result};

use crate::authenticator::{Authenticator, Decision, Privilege, User, Verdict};
use crate::hash;
use crate::keypair::UsernameAndPassword;

pub struct SqliteAuthenticator {
    conn: Mutex<Connection>,
}

impl SqliteAuthenticator {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn transact<T>(&self, body: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let result = body(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("sqlite authenticator mutex poisoned")
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    email TEXT NOT NULL,
    hashed_password TEXT,
    hashed_public_key TEXT,
    privilege INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS whitelist (address TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS blacklist (address TEXT PRIMARY KEY);
";

fn privilege_to_i64(privilege: Privilege) -> i64 {
    match privilege {
        Privilege::ReadOnly => 0,
        Privilege::ReadWrite => 1,
        Privilege::Admin => 2,
    }
}

fn privilege_from_i64(value: i64) -> Privilege {
    match value {
        1 => Privilege::ReadWrite,
        2 => Privilege::Admin,
        _ => Privilege::ReadOnly,
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        hashed_password: row.get("hashed_password")?,
        hashed_public_key: row.get("hashed_public_key")?,
        privilege: privilege_from_i64(row.get("privilege")?),
    })
}

impl Authenticator for SqliteAuthenticator {
    fn is_blacklisted(&self, address: &str) -> Decision {
        match self
            .lock()
            .query_row(
                "SELECT 1 FROM blacklist WHERE address = ?1",
                params![address],
                |_| Ok(()),
            )
            .optional()
            .map_err(Error::from)
        {
            Ok(Some(())) => (Verdict::Deny, format!("{address} is blacklisted")),
            Ok(None) => (Verdict::Allow, "not blacklisted".to_string()),
            Err(error) => (Verdict::Deny, format!("blacklist lookup failed: {error}")),
        }
    }

    fn is_whitelisted(&self, address: &str) -> Decision {
        match self
            .lock()
            .query_row(
                "SELECT 1 FROM whitelist WHERE address = ?1",
                params![address],
                |_| Ok(()),
            )
            .optional()
            .map_err(Error::from)
        {
            Ok(Some(())) => (Verdict::Allow, "whitelisted".to_string()),
            Ok(None) => (Verdict::Deny, format!("{address} is not whitelisted")),
            Err(error) => (Verdict::Deny, format!("whitelist lookup failed: {error}")),
        }
    }

    fn is_valid_credentials(&self, credentials: &UsernameAndPassword) -> Decision {
        let user = self
            .lock()
            .query_row(
                "SELECT id, name, email, hashed_password, hashed_public_key, privilege \
                 FROM users WHERE name = ?1",
                params![credentials.username()],
                row_to_user,
            )
            .optional()
            .map_err(Error::from);
        match user {
            Ok(Some(user)) => match &user.hashed_password {
                Some(stored) if hash::verify_password(credentials.password(), stored) => {
                    (Verdict::Allow, "password matches".to_string())
                }
                _ => (Verdict::Deny, "password mismatch".to_string()),
            },
            Ok(None) => (Verdict::Deny, "no such user".to_string()),
            Err(error) => (Verdict::Deny, format!("user lookup failed: {error}")),
        }
    }

    fn is_valid_public_key(&self, public_key: &[u8; 32]) -> Decision {
        let users = self.get_users();
        match users {
            Ok(users) => {
                for user in users {
                    if let Some(stored) = &user.hashed_public_key {
                        if hash::verify_public_key(public_key, stored) {
                            return (Verdict::Allow, "public key matches".to_string());
                        }
                    }
                }
                (Verdict::Deny, "no matching public key".to_string())
            }
            Err(error) => (Verdict::Deny, format!("user lookup failed: {error}")),
        }
    }

    fn add_to_whitelist(&self, address: &str) -> Result<()> {
        if address.is_empty() {
            return Err(Error::invalid_argument("address must not be empty"));
        }
        self.transact(|conn| {
            let blacklisted: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM blacklist WHERE address = ?1",
                    params![address],
                    |row| row.get(0),
                )
                .optional()?;
            if blacklisted.is_some() {
                return Err(rusqlite::Error::ExecuteReturnedResults);
            }
            conn.execute(
                "INSERT OR IGNORE INTO whitelist (address) VALUES (?1)",
                params![address],
            )?;
            Ok(())
        })
        .map_err(|_| Error::invalid_argument("address is already blacklisted"))
    }

    fn remove_from_whitelist(&self, address: &str) -> Result<()> {
        self.transact(|conn| {
            conn.execute("DELETE FROM whitelist WHERE address = ?1", params![address])
        })?;
        Ok(())
    }

    fn add_to_blacklist(&self, address: &str) -> Result<()> {
        if address.is_empty() {
            return Err(Error::invalid_argument("address must not be empty"));
        }
        self.transact(|conn| {
            let whitelisted: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM whitelist WHERE address = ?1",
                    params![address],
                    |row| row.get(0),
                )
                .optional()?;
            if whitelisted.is_some() {
                return Err(rusqlite::Error::ExecuteReturnedResults);
            }
            conn.execute(
                "INSERT OR IGNORE INTO blacklist (address) VALUES (?1)",
                params![address],
            )?;
            Ok(())
        })
        .map_err(|_| Error::invalid_argument("address is already whitelisted"))
    }

    fn remove_from_blacklist(&self, address: &str) -> Result<()> {
        self.transact(|conn| {
            conn.execute("DELETE FROM blacklist WHERE address = ?1", params![address])
        })?;
        Ok(())
    }

    fn add_user(&self, user: &User) -> Result<()> {
        if user.name.is_empty() {
            return Err(Error::invalid_argument("user name is required"));
        }
        self.transact(|conn| {
            conn.execute(
                "INSERT INTO users (name, email, hashed_password, hashed_public_key, privilege) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.name,
                    user.email,
                    user.hashed_password,
                    user.hashed_public_key,
                    privilege_to_i64(user.privilege),
                ],
            )
        })
        .map(|_| ())
        .map_err(|error| Error::invalid_argument(format!("add_user: {error}")))
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let updated = self.transact(|conn| {
            conn.execute(
                "UPDATE users SET email = ?2, hashed_password = ?3, hashed_public_key = ?4, \
                 privilege = ?5 WHERE name = ?1",
                params![
                    user.name,
                    user.email,
                    user.hashed_password,
                    user.hashed_public_key,
                    privilege_to_i64(user.privilege),
                ],
            )
        })?;
        if updated == 0 {
            return Err(Error::not_found(format!("no such user: {}", user.name)));
        }
        Ok(())
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        let deleted =
            self.transact(|conn| conn.execute("DELETE FROM users WHERE name = ?1", params![name]))?;
        if deleted == 0 {
            return Err(Error::not_found(format!("no such user: {name}")));
        }
        Ok(())
    }

    fn have_user(&self, name: &str) -> Result<bool> {
        let conn = self.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM users WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.lock();
        let mut statement = conn.prepare(
            "SELECT id, name, email, hashed_password, hashed_public_key, privilege FROM users",
        )?;
        let users = statement
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open() -> SqliteAuthenticator {
        let file = NamedTempFile::new().unwrap();
        SqliteAuthenticator::open(file.path()).unwrap()
    }

    #[test]
    fn whitelist_and_blacklist_are_mutually_exclusive() {
        let auth = open();
        auth.add_to_whitelist("10.0.0.1").unwrap();
        assert!(auth.add_to_blacklist("10.0.0.1").is_err());
    }

    #[test]
    fn add_and_lookup_user() {
        let auth = open();
        auth.add_user(&User {
            id: 0,
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            hashed_password: Some(hash::hash_password("secret").unwrap()),
            hashed_public_key: None,
            privilege: Privilege::ReadWrite,
        })
        .unwrap();
        assert!(auth.have_user("alice").unwrap());
        let decision = auth.is_valid_credentials(&UsernameAndPassword::new("alice", "secret"));
        assert_eq!(decision.0, Verdict::Allow);
        auth.delete_user("alice").unwrap();
        assert!(!auth.have_user("alice").unwrap());
    }
}
