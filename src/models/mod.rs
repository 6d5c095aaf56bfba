mod label;
mod note;
mod row;
mod span;

pub use label::Label;
pub use note::{items_body, Folder, ListItem, Note, NoteId, NoteType};
pub use row::Item;
pub use span::{Span, SpanStyle};
