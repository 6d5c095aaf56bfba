use anyhow::Result;
use rusqlite::params;

use super::{Database, StoreChange};
use crate::models::Label;

impl Database {
    pub fn all_labels(&self) -> Result<Vec<Label>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM labels ORDER BY value")?;
        let labels = stmt
            .query_map([], |row| Ok(Label { value: row.get(0)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    /// Insert labels, ignoring ones that already exist.
    pub fn insert_labels(&self, labels: &[Label]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }

        self.in_transaction(|db| {
            for label in labels {
                db.conn.execute(
                    "INSERT OR IGNORE INTO labels (value) VALUES (?)",
                    [&label.value],
                )?;
            }
            Ok(())
        })?;
        self.notify(StoreChange::Labels);
        Ok(())
    }

    /// Insert a single label; fails if it already exists.
    pub fn insert_label(&self, label: &Label) -> Result<()> {
        self.conn
            .execute("INSERT INTO labels (value) VALUES (?)", [&label.value])?;
        self.notify(StoreChange::Labels);
        Ok(())
    }

    /// Delete a label and strip it from every note that carries it.
    pub fn delete_label(&self, value: &str) -> Result<()> {
        self.in_transaction(|db| {
            db.conn
                .execute("DELETE FROM labels WHERE value = ?", [value])?;
            for mut note in db.notes_with_label(value)? {
                note.labels.remove(value);
                db.update_labels(note.id, &note.labels)?;
            }
            Ok(())
        })?;
        self.notify(StoreChange::Labels);
        Ok(())
    }

    /// Rename a label everywhere; fails if `new` already exists.
    pub fn update_label(&self, old: &str, new: &str) -> Result<()> {
        self.in_transaction(|db| {
            db.conn.execute(
                "UPDATE labels SET value = ? WHERE value = ?",
                params![new, old],
            )?;
            for mut note in db.notes_with_label(old)? {
                note.labels.remove(old);
                note.labels.insert(new.to_string());
                db.update_labels(note.id, &note.labels)?;
            }
            Ok(())
        })?;
        self.notify(StoreChange::Labels);
        Ok(())
    }
}
