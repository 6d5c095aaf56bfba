//! Logical contract between the note core and its storage engine.
//!
//! Backup, export, migration and the live feeds only ever talk to a
//! `NoteStore`; `Database` is the SQLite implementation.

use anyhow::Result;
use std::collections::BTreeSet;
use tokio::sync::broadcast;

use super::{Database, StoreChange};
use crate::models::{Folder, Label, Note, NoteId};

pub trait NoteStore {
    /// Snapshot of a folder, pinned first then newest first.
    fn notes_in_folder(&self, folder: Folder) -> Result<Vec<Note>>;
    fn notes_with_label(&self, label: &str) -> Result<Vec<Note>>;
    fn search_notes(&self, keyword: &str) -> Result<Vec<Note>>;
    fn get_note(&self, id: NoteId) -> Result<Option<Note>>;
    fn contains_note(&self, note: &Note) -> Result<bool>;
    fn all_labels(&self) -> Result<Vec<Label>>;

    fn insert_notes(&self, notes: &[Note]) -> Result<Vec<NoteId>>;
    fn insert_labels(&self, labels: &[Label]) -> Result<()>;
    fn insert_label(&self, label: &Label) -> Result<()>;

    fn update_pinned(&self, id: NoteId, pinned: bool) -> Result<bool>;
    fn move_note(&self, id: NoteId, folder: Folder) -> Result<bool>;
    fn update_labels(&self, id: NoteId, labels: &BTreeSet<String>) -> Result<bool>;

    fn delete_note(&self, id: NoteId) -> Result<bool>;
    fn delete_all_in_folder(&self, folder: Folder) -> Result<usize>;
    fn delete_label(&self, value: &str) -> Result<()>;
    fn update_label(&self, old: &str, new: &str) -> Result<()>;

    /// All-or-nothing: either every write in `block` commits or none does.
    fn run_atomically<T>(&self, block: impl FnOnce(&Self) -> Result<T>) -> Result<T>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

impl NoteStore for Database {
    fn notes_in_folder(&self, folder: Folder) -> Result<Vec<Note>> {
        Database::notes_in_folder(self, folder)
    }

    fn notes_with_label(&self, label: &str) -> Result<Vec<Note>> {
        Database::notes_with_label(self, label)
    }

    fn search_notes(&self, keyword: &str) -> Result<Vec<Note>> {
        Database::search_notes(self, keyword)
    }

    fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        Database::get_note(self, id)
    }

    fn contains_note(&self, note: &Note) -> Result<bool> {
        Database::contains_note(self, note)
    }

    fn all_labels(&self) -> Result<Vec<Label>> {
        Database::all_labels(self)
    }

    fn insert_notes(&self, notes: &[Note]) -> Result<Vec<NoteId>> {
        Database::insert_notes(self, notes)
    }

    fn insert_labels(&self, labels: &[Label]) -> Result<()> {
        Database::insert_labels(self, labels)
    }

    fn insert_label(&self, label: &Label) -> Result<()> {
        Database::insert_label(self, label)
    }

    fn update_pinned(&self, id: NoteId, pinned: bool) -> Result<bool> {
        Database::update_pinned(self, id, pinned)
    }

    fn move_note(&self, id: NoteId, folder: Folder) -> Result<bool> {
        Database::move_note(self, id, folder)
    }

    fn update_labels(&self, id: NoteId, labels: &BTreeSet<String>) -> Result<bool> {
        Database::update_labels(self, id, labels)
    }

    fn delete_note(&self, id: NoteId) -> Result<bool> {
        Database::delete_note(self, id)
    }

    fn delete_all_in_folder(&self, folder: Folder) -> Result<usize> {
        Database::delete_all_in_folder(self, folder)
    }

    fn delete_label(&self, value: &str) -> Result<()> {
        Database::delete_label(self, value)
    }

    fn update_label(&self, old: &str, new: &str) -> Result<()> {
        Database::update_label(self, old, new)
    }

    fn run_atomically<T>(&self, block: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.in_transaction(block)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        Database::subscribe(self)
    }
}
