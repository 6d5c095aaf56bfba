use super::note::Note;

/// Row of a sectioned note list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Header(String),
    Note(Note),
}

impl Item {
    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Self::Note(note) => Some(note),
            Self::Header(_) => None,
        }
    }
}
