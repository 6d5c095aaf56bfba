use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod backup;
pub mod export;
pub mod label;
pub mod list;
pub mod note;
pub mod ui;

pub use backup::{run_backup_export, run_backup_import};
pub use export::run_export;
pub use label::run_label;
pub use list::{run_labels, run_list, run_search};
pub use note::{run_add, run_delete, run_empty_trash, run_move, run_pin, run_restore, run_tag};

#[derive(Parser)]
#[command(name = "notecmd")]
#[command(about = "Personal notes store for the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes in a folder, pinned first
    List(ListArgs),
    /// List all labels
    Labels,
    /// Search active notes by keyword
    Search(SearchArgs),
    /// Add a note, checklist or phone number
    Add(AddArgs),
    /// Pin a note
    Pin(IdArgs),
    /// Unpin a note
    Unpin(IdArgs),
    /// Move a note to the archive
    Archive(IdArgs),
    /// Move a note to deleted notes
    Trash(IdArgs),
    /// Move a note back to the active notes
    Restore(IdArgs),
    /// Delete a note forever
    Delete(DeleteArgs),
    /// Delete every note in deleted notes
    EmptyTrash(ConfirmArgs),
    /// Replace the labels of a note
    Tag(TagArgs),
    /// Add, rename or delete labels
    Label(LabelArgs),
    /// Write or restore a full backup
    Backup(BackupArgs),
    /// Export one note as json, txt, html, pdf or xml
    Export(ExportArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// notes, deleted or archived
    #[arg(short, long, default_value = "notes")]
    pub folder: String,
    /// Only notes carrying this label
    #[arg(short, long)]
    pub label: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Matches title, body, checklist items and labels
    pub query: String,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(short, long, default_value = "")]
    pub title: String,
    /// Note text
    #[arg(short, long)]
    pub body: Option<String>,
    /// Checklist item; repeat for more, prefix with "x " to check it
    #[arg(short, long = "item")]
    pub items: Vec<String>,
    /// Store a phone number; the title is the contact name
    #[arg(short, long)]
    pub phone: Option<String>,
    #[arg(short, long = "label")]
    pub labels: Vec<String>,
    #[arg(long)]
    pub pin: bool,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: i64,
}

#[derive(Args)]
pub struct ConfirmArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub id: i64,
    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Args)]
pub struct TagArgs {
    pub id: i64,
    /// New label set; empty clears all labels
    pub labels: Vec<String>,
}

#[derive(Args)]
pub struct LabelArgs {
    #[command(subcommand)]
    pub command: LabelCommand,
}

#[derive(Subcommand)]
pub enum LabelCommand {
    Add { value: String },
    Rename { old: String, new: String },
    Delete { value: String },
}

#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(Subcommand)]
pub enum BackupCommand {
    /// Write every note and label to a file (picker when no path is given)
    Export { path: Option<PathBuf> },
    /// Add the notes and labels of a backup file
    Import { path: Option<PathBuf> },
}

#[derive(Args)]
pub struct ExportArgs {
    pub id: i64,
    #[arg(short, long, default_value = "txt")]
    pub format: String,
    /// Include the creation date (txt, html, pdf)
    #[arg(short, long)]
    pub date: bool,
    /// Copy the result here instead of leaving it in the export directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}
