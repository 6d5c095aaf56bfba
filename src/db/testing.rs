//! Store doubles for exercising rollback paths.

use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use tokio::sync::broadcast;

use super::{Database, NoteStore, StoreChange};
use crate::models::{Folder, Label, Note, NoteId};

/// Passes everything through to the database except note inserts, which fail.
pub(crate) struct FailingNoteInserts<'a>(pub &'a Database);

impl NoteStore for FailingNoteInserts<'_> {
    fn notes_in_folder(&self, folder: Folder) -> Result<Vec<Note>> {
        self.0.notes_in_folder(folder)
    }

    fn notes_with_label(&self, label: &str) -> Result<Vec<Note>> {
        self.0.notes_with_label(label)
    }

    fn search_notes(&self, keyword: &str) -> Result<Vec<Note>> {
        self.0.search_notes(keyword)
    }

    fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        self.0.get_note(id)
    }

    fn contains_note(&self, note: &Note) -> Result<bool> {
        self.0.contains_note(note)
    }

    fn all_labels(&self) -> Result<Vec<Label>> {
        self.0.all_labels()
    }

    fn insert_notes(&self, _notes: &[Note]) -> Result<Vec<NoteId>> {
        Err(anyhow!("disk full"))
    }

    fn insert_labels(&self, labels: &[Label]) -> Result<()> {
        self.0.insert_labels(labels)
    }

    fn insert_label(&self, label: &Label) -> Result<()> {
        self.0.insert_label(label)
    }

    fn update_pinned(&self, id: NoteId, pinned: bool) -> Result<bool> {
        self.0.update_pinned(id, pinned)
    }

    fn move_note(&self, id: NoteId, folder: Folder) -> Result<bool> {
        self.0.move_note(id, folder)
    }

    fn update_labels(&self, id: NoteId, labels: &BTreeSet<String>) -> Result<bool> {
        self.0.update_labels(id, labels)
    }

    fn delete_note(&self, id: NoteId) -> Result<bool> {
        self.0.delete_note(id)
    }

    fn delete_all_in_folder(&self, folder: Folder) -> Result<usize> {
        self.0.delete_all_in_folder(folder)
    }

    fn delete_label(&self, value: &str) -> Result<()> {
        self.0.delete_label(value)
    }

    fn update_label(&self, old: &str, new: &str) -> Result<()> {
        self.0.update_label(old, new)
    }

    fn run_atomically<T>(&self, block: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.0.in_transaction(|_| block(self))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.0.subscribe()
    }
}
