//! Full-store backup: every note in every folder plus the label set.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::db::NoteStore;
use crate::models::{Folder, Label, Note};

pub mod tags;
mod xml;

pub use xml::{read_backup, read_note, write_backup, write_note};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("malformed backup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed backup: document ends before all elements are closed")]
    Truncated,

    #[error("malformed backup: unexpected <{name}> in {parent}")]
    UnexpectedElement { parent: String, name: String },

    #[error("malformed backup: missing <{0}>")]
    MissingTag(&'static str),

    #[error("malformed backup: invalid value {value:?} in <{tag}>")]
    InvalidValue { tag: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Snapshot of the whole store. Folder is implied by the list a note sits in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backup {
    pub active: Vec<Note>,
    pub deleted: Vec<Note>,
    pub archived: Vec<Note>,
    pub labels: BTreeSet<String>,
}

impl Backup {
    pub fn collect<S: NoteStore>(store: &S) -> Result<Self> {
        Ok(Self {
            active: store.notes_in_folder(Folder::Active)?,
            deleted: store.notes_in_folder(Folder::Deleted)?,
            archived: store.notes_in_folder(Folder::Archived)?,
            labels: store.all_labels()?.into_iter().map(|l| l.value).collect(),
        })
    }

    pub fn note_count(&self) -> usize {
        self.active.len() + self.deleted.len() + self.archived.len()
    }

    /// All notes as one insertion batch, ids cleared so the store assigns fresh ones.
    pub fn into_notes(self) -> Vec<Note> {
        self.active
            .into_iter()
            .chain(self.deleted)
            .chain(self.archived)
            .map(|mut note| {
                note.id = 0;
                note
            })
            .collect()
    }
}

/// Write the whole store to `dest`, replacing any previous contents.
pub fn export_backup<S: NoteStore>(store: &S, dest: &Path) -> Result<()> {
    let backup = Backup::collect(store)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dest)
        .with_context(|| format!("Failed to open {}", dest.display()))?;
    write_backup(&backup, file)?;

    info!(
        path = %dest.display(),
        notes = backup.note_count(),
        labels = backup.labels.len(),
        "Backup exported"
    );
    Ok(())
}

/// Decode `src` completely, then insert its labels and notes in one transaction.
/// Returns the number of notes imported.
pub fn import_backup<S: NoteStore>(store: &S, src: &Path) -> Result<usize> {
    let file = File::open(src).with_context(|| format!("Failed to open {}", src.display()))?;
    let backup = read_backup(BufReader::new(file))?;

    let labels: Vec<Label> = backup.labels.iter().map(Label::new).collect();
    let notes = backup.into_notes();
    let count = notes.len();

    store.run_atomically(|store| {
        store.insert_labels(&labels)?;
        store.insert_notes(&notes)?;
        Ok(())
    })?;

    info!(path = %src.display(), notes = count, labels = labels.len(), "Backup imported");
    Ok(count)
}
