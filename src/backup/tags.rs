//! Element names of the backup document. Backups written by older builds
//! must keep reading, so these never change.

pub const ROOT: &str = "exported-notes";

pub const ACTIVE_NOTES: &str = "notes";
pub const DELETED_NOTES: &str = "deleted-notes";
pub const ARCHIVED_NOTES: &str = "archived-notes";
pub const LABELS: &str = "labels";

pub const PLAIN_NOTE: &str = "note";
pub const CHECKLIST_NOTE: &str = "list";
pub const PHONE_NUMBER_NOTE: &str = "phone-number";

pub const DATE_CREATED: &str = "date-created";
pub const PINNED: &str = "pinned";
pub const TITLE: &str = "title";
pub const BODY: &str = "body";
pub const LABEL: &str = "label";

pub const SPAN: &str = "span";
pub const START: &str = "start";
pub const END: &str = "end";
pub const STYLE: &str = "style";

pub const ITEM: &str = "item";
pub const TEXT: &str = "text";
pub const CHECKED: &str = "checked";
