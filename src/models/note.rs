use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::span::Span;

pub type NoteId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Folder {
    #[default]
    Active,
    Deleted,
    Archived,
}

impl Folder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "NOTES",
            Self::Deleted => "DELETED",
            Self::Archived => "ARCHIVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOTES" => Some(Self::Active),
            "DELETED" => Some(Self::Deleted),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn all() -> &'static [Folder] {
        &[Self::Active, Self::Deleted, Self::Archived]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NoteType {
    #[default]
    PlainNote,
    ChecklistNote,
    PhoneNumberNote,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainNote => "NOTE",
            Self::ChecklistNote => "LIST",
            Self::PhoneNumberNote => "PHONE_NUMBER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOTE" => Some(Self::PlainNote),
            "LIST" => Some(Self::ChecklistNote),
            "PHONE_NUMBER" => Some(Self::PhoneNumberNote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListItem {
    pub body: String,
    pub checked: bool,
}

impl ListItem {
    pub fn new(body: impl Into<String>, checked: bool) -> Self {
        Self {
            body: body.into(),
            checked,
        }
    }
}

/// A stored note. `id == 0` means the store has not assigned one yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub folder: Folder,
    pub note_type: NoteType,
    pub title: String,
    pub body: String,
    pub items: Vec<ListItem>,
    pub spans: Vec<Span>,
    pub labels: BTreeSet<String>,
    pub pinned: bool,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

impl Note {
    fn new(note_type: NoteType, title: String) -> Self {
        Self {
            id: 0,
            folder: Folder::Active,
            note_type,
            title,
            body: String::new(),
            items: Vec::new(),
            spans: Vec::new(),
            labels: BTreeSet::new(),
            pinned: false,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn plain(title: impl Into<String>, body: impl Into<String>) -> Self {
        let mut note = Self::new(NoteType::PlainNote, title.into());
        note.body = body.into();
        note
    }

    pub fn checklist(title: impl Into<String>, items: Vec<ListItem>) -> Self {
        let mut note = Self::new(NoteType::ChecklistNote, title.into());
        note.items = items;
        note
    }

    /// Name and number are stored with trailing whitespace trimmed.
    pub fn phone_number(name: &str, number: &str) -> Self {
        let mut note = Self::new(NoteType::PhoneNumberNote, name.trim_end().to_string());
        note.body = number.trim_end().to_string();
        note
    }

    /// Text content of the note; checklists join their item bodies.
    pub fn text(&self) -> String {
        match self.note_type {
            NoteType::PlainNote | NoteType::PhoneNumberNote => self.body.clone(),
            NoteType::ChecklistNote => items_body(&self.items),
        }
    }
}

pub fn items_body(items: &[ListItem]) -> String {
    items
        .iter()
        .map(|item| item.body.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_round_trips_through_storage_names() {
        for folder in Folder::all() {
            assert_eq!(Folder::parse(folder.as_str()), Some(*folder));
        }
        assert_eq!(Folder::parse("TRASH"), None);
    }

    #[test]
    fn test_phone_number_trims_trailing_whitespace() {
        let note = Note::phone_number("Mom  ", "555-0100\n");
        assert_eq!(note.title, "Mom");
        assert_eq!(note.body, "555-0100");
        assert_eq!(note.note_type, NoteType::PhoneNumberNote);
    }

    #[test]
    fn test_checklist_text_joins_items() {
        let note = Note::checklist(
            "",
            vec![ListItem::new("Buy milk", false), ListItem::new("Call mom", true)],
        );
        assert_eq!(note.text(), "Buy milk\nCall mom");
    }
}
