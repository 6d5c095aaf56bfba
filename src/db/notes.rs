use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

use super::{Database, StoreChange};
use crate::models::{Folder, Note, NoteId, NoteType};

const NOTE_COLUMNS: &str =
    "id, folder, type, title, body, spans, items, labels, pinned, timestamp";

const STORE_ORDER: &str = "ORDER BY pinned DESC, timestamp DESC";

/// Helper to surface malformed JSON columns as rusqlite conversion errors
fn parse_json<T: DeserializeOwned>(column: usize, s: &str) -> rusqlite::Result<T> {
    serde_json::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

impl Database {
    // ==================== NOTE CREATE ====================

    /// Upsert notes. Unsaved notes (`id == 0`) get a fresh id; returns ids in input order.
    pub fn insert_notes(&self, notes: &[Note]) -> Result<Vec<NoteId>> {
        if notes.is_empty() {
            return Ok(vec![]);
        }

        let ids = self.in_transaction(|db| {
            let mut ids = Vec::with_capacity(notes.len());
            for note in notes {
                ids.push(db.insert_note(note)?);
            }
            Ok(ids)
        })?;
        self.notify(StoreChange::Notes);
        Ok(ids)
    }

    fn insert_note(&self, note: &Note) -> Result<NoteId> {
        let spans = serde_json::to_string(&note.spans)?;
        let items = serde_json::to_string(&note.items)?;
        let labels = serde_json::to_string(&note.labels)?;
        let id = if note.id == 0 { None } else { Some(note.id) };

        self.conn.execute(
            r#"INSERT OR REPLACE INTO notes (
                id, folder, type, title, body, spans, items, labels, pinned, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                id,
                note.folder.as_str(),
                note.note_type.as_str(),
                note.title,
                note.body,
                spans,
                items,
                labels,
                note.pinned as i32,
                note.timestamp,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ==================== NOTE READ ====================

    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        let sql = format!("SELECT {} FROM notes WHERE id = ?", NOTE_COLUMNS);
        let note = self
            .conn
            .query_row(&sql, [id], Self::row_to_note)
            .optional()?;
        Ok(note)
    }

    /// Notes in a folder, pinned first, newest first.
    pub fn notes_in_folder(&self, folder: Folder) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE folder = ? {}",
            NOTE_COLUMNS, STORE_ORDER
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map([folder.as_str()], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Notes carrying `label`, in every folder.
    pub fn notes_with_label(&self, label: &str) -> Result<Vec<Note>> {
        let sql = format!(
            r#"SELECT {} FROM notes
               WHERE EXISTS (SELECT 1 FROM json_each(notes.labels) WHERE json_each.value = ?)
               {}"#,
            NOTE_COLUMNS, STORE_ORDER
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map([label], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Case-insensitive keyword search over active notes.
    /// Matches title, body, checklist item text and labels.
    pub fn search_notes(&self, keyword: &str) -> Result<Vec<Note>> {
        if keyword.is_empty() {
            return Ok(vec![]);
        }

        let pattern = format!("%{}%", Self::escape_like(&keyword.to_lowercase()));
        let sql = format!(
            r#"SELECT {} FROM notes
               WHERE folder = ?1 AND (
                   LOWER(title) LIKE ?2 ESCAPE '\'
                   OR LOWER(body) LIKE ?2 ESCAPE '\'
                   OR EXISTS (SELECT 1 FROM json_each(notes.items)
                              WHERE LOWER(json_extract(json_each.value, '$.body')) LIKE ?2 ESCAPE '\')
                   OR EXISTS (SELECT 1 FROM json_each(notes.labels)
                              WHERE LOWER(json_each.value) LIKE ?2 ESCAPE '\')
               )
               {}"#,
            NOTE_COLUMNS, STORE_ORDER
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(params![Folder::Active.as_str(), pattern], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    pub fn count_notes(&self) -> Result<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether a note with the same type, title and creation time is stored.
    pub fn contains_note(&self, note: &Note) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM notes WHERE type = ? AND title = ? AND timestamp = ? LIMIT 1",
                params![note.note_type.as_str(), note.title, note.timestamp],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Escape LIKE metacharacters (% _ \)
    fn escape_like(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '%' | '_' | '\\' => {
                    result.push('\\');
                    result.push(c);
                }
                _ => result.push(c),
            }
        }
        result
    }

    // ==================== NOTE UPDATE ====================

    pub fn update_pinned(&self, id: NoteId, pinned: bool) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE notes SET pinned = ? WHERE id = ?",
            params![pinned as i32, id],
        )?;
        self.notify(StoreChange::Notes);
        Ok(rows > 0)
    }

    pub fn move_note(&self, id: NoteId, folder: Folder) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE notes SET folder = ? WHERE id = ?",
            params![folder.as_str(), id],
        )?;
        self.notify(StoreChange::Notes);
        Ok(rows > 0)
    }

    pub fn update_labels(&self, id: NoteId, labels: &BTreeSet<String>) -> Result<bool> {
        let labels = serde_json::to_string(labels)?;
        let rows = self.conn.execute(
            "UPDATE notes SET labels = ? WHERE id = ?",
            params![labels, id],
        )?;
        self.notify(StoreChange::Notes);
        Ok(rows > 0)
    }

    // ==================== NOTE DELETE ====================

    pub fn delete_note(&self, id: NoteId) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM notes WHERE id = ?", [id])?;
        self.notify(StoreChange::Notes);
        Ok(rows > 0)
    }

    pub fn delete_all_in_folder(&self, folder: Folder) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE folder = ?", [folder.as_str()])?;
        self.notify(StoreChange::Notes);
        Ok(rows)
    }

    // ==================== ROW MAPPERS ====================

    pub(super) fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
        let folder: String = row.get("folder")?;
        let note_type: String = row.get("type")?;
        let spans: String = row.get("spans")?;
        let items: String = row.get("items")?;
        let labels: String = row.get("labels")?;

        Ok(Note {
            id: row.get("id")?,
            folder: Folder::parse(&folder).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    Type::Text,
                    format!("unknown folder '{}'", folder).into(),
                )
            })?,
            note_type: NoteType::parse(&note_type).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    Type::Text,
                    format!("unknown note type '{}'", note_type).into(),
                )
            })?,
            title: row.get("title")?,
            body: row.get("body")?,
            spans: parse_json(5, &spans)?,
            items: parse_json(6, &items)?,
            labels: parse_json(7, &labels)?,
            pinned: row.get::<_, i32>("pinned")? == 1,
            timestamp: row.get("timestamp")?,
        })
    }
}
