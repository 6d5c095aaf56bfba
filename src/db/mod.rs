use anyhow::{Context, Result};
use rusqlite::Connection;
use std::cell::Cell;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, info};

mod labels;
mod notes;
mod schema;
mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use schema::SCHEMA_VERSION;
pub use store::NoteStore;

/// Capacity of the change channel; slow subscribers see `Lagged` and re-query.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// What kind of rows a committed write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Notes,
    Labels,
}

pub struct Database {
    conn: Connection,
    changes: broadcast::Sender<StoreChange>,
    pending_notes: Cell<bool>,
    pending_labels: Cell<bool>,
}

impl Database {
    /// Open database at the default location, creating if needed, running migrations
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(&path).context("Failed to open note database")?;
        let db = Self::with_connection(conn)?;
        info!(db_path = %path.display(), "Note store opened");
        Ok(db)
    }

    /// Open in-memory database for testing
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let db = Self {
            conn,
            changes,
            pending_notes: Cell::new(false),
            pending_labels: Cell::new(false),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join("notecmd").join("notes.db"))
    }

    /// Receive a `StoreChange` after every committed write.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Handle for subscribing without holding the store.
    pub(crate) fn change_sender(&self) -> broadcast::Sender<StoreChange> {
        self.changes.clone()
    }

    /// Publish now, or after commit when a transaction is open.
    fn notify(&self, change: StoreChange) {
        if self.conn.is_autocommit() {
            // No subscribers is not an error
            let _ = self.changes.send(change);
            return;
        }
        match change {
            StoreChange::Notes => self.pending_notes.set(true),
            StoreChange::Labels => self.pending_labels.set(true),
        }
    }

    /// Run `f` inside a transaction, joining the caller's if one is already open.
    pub(crate) fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self.conn.unchecked_transaction()?;
        let result = f(self).and_then(|value| {
            tx.commit().context("Failed to commit transaction")?;
            Ok(value)
        });

        let notes = self.pending_notes.replace(false);
        let labels = self.pending_labels.replace(false);
        match &result {
            Ok(_) => {
                if labels {
                    let _ = self.changes.send(StoreChange::Labels);
                }
                if notes {
                    let _ = self.changes.send(StoreChange::Notes);
                }
            }
            Err(e) => debug!(error = %e, "Transaction rolled back"),
        }
        result
    }

    fn migrate(&self) -> Result<()> {
        let version = self.get_schema_version()?;

        if version == 0 {
            // Run migration in a transaction for atomicity
            self.conn
                .execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", schema::SCHEMA_V1))?;
            self.set_schema_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Result<i32> {
        let result: Result<i32, _> =
            self.conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                });

        match result {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                // "no such table" is error code 1 (SQLITE_ERROR)
                if err.code == rusqlite::ErrorCode::Unknown
                    && msg.as_ref().map_or(false, |m| m.contains("no such table"))
                {
                    Ok(0)
                } else {
                    Err(rusqlite::Error::SqliteFailure(err, msg).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_schema_version(&self, version: i32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
            [version],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;

    #[test]
    fn test_open_memory() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.get_schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_exist() {
        let db = Database::open_memory().unwrap();

        let tables: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"notes".to_string()));
        assert!(tables.contains(&"labels".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_fresh_store_has_ordering_index_at_version_one() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.get_schema_version().unwrap(), 1);

        let indexes: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='notes'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(indexes.contains(&"idx_note_folder_order".to_string()));
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.db");

        {
            let db = Database::open_at(path.clone()).unwrap();
            db.insert_notes(&[Note::plain("kept", "")]).unwrap();
        }

        let db = Database::open_at(path).unwrap();
        assert_eq!(db.get_schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(db.count_notes().unwrap(), 1);
    }

    #[test]
    fn test_write_notifies_subscribers() {
        let db = Database::open_memory().unwrap();
        let mut rx = db.subscribe();

        db.insert_notes(&[Note::plain("a", "")]).unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreChange::Notes);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transaction_defers_and_drops_notifications_on_rollback() {
        let db = Database::open_memory().unwrap();
        let mut rx = db.subscribe();

        let result: Result<()> = db.in_transaction(|db| {
            db.insert_notes(&[Note::plain("a", "")])?;
            anyhow::bail!("boom")
        });
        assert!(result.is_err());
        assert!(rx.try_recv().is_err());
        assert_eq!(db.count_notes().unwrap(), 0);

        db.in_transaction(|db| db.insert_notes(&[Note::plain("b", "")]))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreChange::Notes);
        assert_eq!(db.count_notes().unwrap(), 1);
    }
}
