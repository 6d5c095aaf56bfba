pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA_V1: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL
);

-- AUTOINCREMENT keeps ids of deleted notes from being handed out again
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folder TEXT NOT NULL DEFAULT 'NOTES',
    type TEXT NOT NULL DEFAULT 'NOTE',
    title TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL DEFAULT '',
    spans TEXT NOT NULL DEFAULT '[]',
    items TEXT NOT NULL DEFAULT '[]',
    labels TEXT NOT NULL DEFAULT '[]',
    pinned INTEGER NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS labels (
    value TEXT PRIMARY KEY
);

-- Folder listings and search filter by folder, then sort pinned-first, newest-first
CREATE INDEX IF NOT EXISTS idx_note_folder_order ON notes(folder, pinned DESC, timestamp DESC);
"#;
