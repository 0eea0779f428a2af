use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed key under which the admin credential is persisted.
pub const ADMIN_KEY_STORAGE_KEY: &str = "personabench.adminKey";

/// Durable home for the admin credential.
pub trait CredentialStore: Send {
    fn load(&self) -> Result<Option<String>>;
    fn save(&mut self, value: &str) -> Result<()>;
    fn remove(&mut self) -> Result<()>;
}

/// Single-table key/value store in a SQLite file.
pub struct SqliteCredentialStore {
    conn: Connection,
}

impl SqliteCredentialStore {
    pub fn open(path: &str) -> Result<Self> {
        let mut store = Self { conn: Connection::open(path)? };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![ADMIN_KEY_STORAGE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&mut self, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![ADMIN_KEY_STORAGE_KEY, value, crate::logging::ts_now()],
        )?;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![ADMIN_KEY_STORAGE_KEY])?;
        Ok(())
    }
}

/// Process-local store. Used when persistence is disabled and in tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut values) = store.values.lock() {
            values.insert(ADMIN_KEY_STORAGE_KEY.to_string(), value.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| anyhow!("credential store poisoned"))?;
        Ok(values.get(ADMIN_KEY_STORAGE_KEY).cloned())
    }

    fn save(&mut self, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow!("credential store poisoned"))?;
        values.insert(ADMIN_KEY_STORAGE_KEY.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow!("credential store poisoned"))?;
        values.remove(ADMIN_KEY_STORAGE_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_round_trip_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cred.sqlite");
        let path = path.to_str().unwrap();

        let mut store = SqliteCredentialStore::open(path).unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.save("first").unwrap();
        store.save("second").unwrap();
        drop(store);

        let mut reopened = SqliteCredentialStore::open(path).unwrap();
        assert_eq!(reopened.load().unwrap().as_deref(), Some("second"));
        reopened.remove().unwrap();
        assert_eq!(reopened.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryCredentialStore::with_value("k");
        assert_eq!(store.load().unwrap().as_deref(), Some("k"));
        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
