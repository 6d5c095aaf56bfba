//! One-time import of the pre-database storage layout.
//!
//! Older installs kept one XML file per note in `notes/`, `deleted/` and
//! `archived/`, and the label set in `shared_prefs/labelsPreferences.xml`.
//! Everything is inserted in a single transaction; the legacy files are only
//! removed once that transaction has committed.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::backup;
use crate::db::NoteStore;
use crate::models::{Folder, Label, Note};

const LABELS_FILE: &str = "shared_prefs/labelsPreferences.xml";
const LABELS_KEY: &str = "labelItems";
const EMPTY_PREFERENCES: &str = "<?xml version='1.0' encoding='utf-8' standalone='yes' ?>\n<map />\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    NotStarted,
    Detecting,
    Migrating,
    CleaningUp,
    Done,
    Failed,
}

fn legacy_dir_name(folder: Folder) -> &'static str {
    match folder {
        Folder::Active => "notes",
        Folder::Deleted => "deleted",
        Folder::Archived => "archived",
    }
}

/// What was found on disk.
#[derive(Debug, Default)]
struct LegacyFiles {
    notes: Vec<(PathBuf, Folder)>,
    labels: Vec<String>,
    labels_file: Option<PathBuf>,
}

impl LegacyFiles {
    fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.labels.is_empty()
    }
}

pub struct LegacyMigration {
    root: PathBuf,
    state: MigrationState,
    migrated: usize,
}

impl LegacyMigration {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: MigrationState::NotStarted,
            migrated: 0,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Notes inserted by the last run.
    pub fn migrated(&self) -> usize {
        self.migrated
    }

    /// Drive the migration to `Done` or `Failed`. A failure before commit
    /// leaves both the store and the legacy files untouched.
    pub fn run<S: NoteStore>(&mut self, store: &S) -> MigrationState {
        self.migrated = 0;
        if let Err(e) = self.advance(store) {
            warn!(error = %e, state = ?self.state, "Legacy migration failed");
            self.set_state(MigrationState::Failed);
        }
        self.state
    }

    fn advance<S: NoteStore>(&mut self, store: &S) -> Result<()> {
        self.set_state(MigrationState::Detecting);
        let files = self.detect()?;
        if files.is_empty() {
            self.set_state(MigrationState::Done);
            return Ok(());
        }

        self.set_state(MigrationState::Migrating);
        let mut notes = Vec::with_capacity(files.notes.len());
        for (path, folder) in &files.notes {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            let note = backup::read_note(BufReader::new(file), *folder)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            notes.push(note);
        }
        let labels: Vec<Label> = files.labels.iter().map(Label::new).collect();

        self.migrated = store.run_atomically(|store| {
            store.insert_labels(&labels)?;
            let fresh: Vec<Note> = notes
                .into_iter()
                .map(|note| store.contains_note(&note).map(|found| (!found).then_some(note)))
                .filter_map(Result::transpose)
                .collect::<Result<_>>()?;
            store.insert_notes(&fresh)?;
            Ok(fresh.len())
        })?;
        info!(
            notes = self.migrated,
            skipped = files.notes.len() - self.migrated,
            labels = labels.len(),
            "Legacy notes migrated"
        );

        self.set_state(MigrationState::CleaningUp);
        self.clean_up(&files);
        self.set_state(MigrationState::Done);
        Ok(())
    }

    fn set_state(&mut self, state: MigrationState) {
        self.state = state;
        info!(?state, "Legacy migration");
    }

    fn detect(&self) -> Result<LegacyFiles> {
        let mut files = LegacyFiles::default();

        for folder in Folder::all() {
            let dir = self.root.join(legacy_dir_name(*folder));
            if !dir.is_dir() {
                continue;
            }
            let mut paths = Vec::new();
            for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
                let path = entry?.path();
                if path.is_file() {
                    paths.push(path);
                }
            }
            paths.sort();
            files.notes.extend(paths.into_iter().map(|path| (path, *folder)));
        }

        let labels_file = self.root.join(LABELS_FILE);
        if labels_file.is_file() {
            files.labels = read_label_set(&labels_file)?;
            files.labels_file = Some(labels_file);
        }
        Ok(files)
    }

    /// Leftovers from a failed delete are skipped on the next run because
    /// their notes are already in the store.
    fn clean_up(&self, files: &LegacyFiles) {
        for (path, _) in &files.notes {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to delete legacy note");
            }
        }
        if let Some(path) = &files.labels_file {
            if let Err(e) = fs::write(path, EMPTY_PREFERENCES) {
                warn!(path = %path.display(), error = %e, "Failed to clear legacy labels");
            }
        }
    }
}

/// Values of `<set name="labelItems">` in a shared-preferences file.
fn read_label_set(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    let mut buf = Vec::new();
    let mut in_set = false;
    let mut in_string = false;
    let mut labels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"set" => {
                in_set = e.attributes().flatten().any(|attr| {
                    attr.key.as_ref() == b"name" && attr.value.as_ref() == LABELS_KEY.as_bytes()
                });
            }
            Event::End(ref e) if e.name().as_ref() == b"set" => in_set = false,
            Event::Start(ref e) if in_set && e.name().as_ref() == b"string" => {
                in_string = true;
                labels.push(String::new());
            }
            Event::End(ref e) if e.name().as_ref() == b"string" => in_string = false,
            Event::Text(ref e) if in_string => {
                if let Some(label) = labels.last_mut() {
                    label.push_str(&e.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    labels.retain(|label| !label.is_empty());
    Ok(labels)
}
