use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::error::StoreError;

/// Key-value persistence boundary shared by the command store and the
/// recent-files ledger. Values are opaque bytes.
pub trait SettingsStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Write several keys as one unit: either every value lands or none does.
    ///
    /// The default writes one key at a time and, when a write fails, puts
    /// back whatever the earlier keys held before returning the error.
    /// Backends with real transactions should override it.
    fn save_many(&self, entries: &[(&str, &[u8])]) -> Result<(), StoreError> {
        let mut written: Vec<(&str, Option<Vec<u8>>)> = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            let previous = self.load(key)?;
            if let Err(e) = self.save(key, value) {
                // Roll back in reverse order
                for (key, previous) in written.into_iter().rev() {
                    let restored = match previous {
                        Some(bytes) => self.save(key, &bytes),
                        None => self.remove(key),
                    };
                    if let Err(restore_err) = restored {
                        warn!("⚠️  Could not restore {} after a failed write: {}", key, restore_err);
                    }
                }
                return Err(e);
            }
            written.push((key, previous));
        }
        Ok(())
    }
}

pub type SharedSettings = Arc<dyn SettingsStore>;

/// SQLite-backed settings.
///
/// The database file lives in the user's data directory:
/// - Linux: ~/.local/share/OfficeViewer/office_viewer.db
/// - macOS: ~/Library/Application Support/OfficeViewer/office_viewer.db
/// - Windows: %APPDATA%\OfficeViewer\office_viewer.db
pub struct SqliteSettings {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteSettings {
    /// Open (or create) the settings database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Persistence(format!(
                    "Failed to create data directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;

        info!("📁 Settings database at: {}", db_path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Settings held in a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Persistence(format!("DB lock failed: {}", e)))
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_settings (
            key             TEXT PRIMARY KEY,
            value           BLOB NOT NULL,
            updated_at      INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

impl SettingsStore for SqliteSettings {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(UPSERT_SQL, params![key, value, unix_now()])?;
        Ok(())
    }

    /// One transaction for all keys; dropping it on error rolls everything back
    fn save_many(&self, entries: &[(&str, &[u8])]) -> Result<(), StoreError> {
        let now = unix_now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for &(key, value) in entries {
            tx.execute(UPSERT_SQL, params![key, value, now])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM app_settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}

const UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)";

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl std::fmt::Debug for SqliteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSettings")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Settings kept in memory only, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemorySettings {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self
            .data
            .lock()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn save_many(&self, entries: &[(&str, &[u8])]) -> Result<(), StoreError> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        for &(key, value) in entries {
            data.insert(key.to_string(), value.to_vec());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        data.remove(key);
        Ok(())
    }
}
