use anyhow::{anyhow, Result};
use rfd::FileDialog;
use std::path::PathBuf;

use crate::cli::ui::status;
use crate::notebook::Notebook;

const DEFAULT_BACKUP_NAME: &str = "Notes Backup.xml";

/// Opens a native save dialog for the backup file.
/// Returns `None` if the user cancels the dialog.
fn pick_backup_destination() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("XML files", &["xml"])
        .set_title("Save backup")
        .set_file_name(DEFAULT_BACKUP_NAME)
        .save_file()
}

/// Opens a native file picker to select a backup to restore.
fn pick_backup_source() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("XML files", &["xml"])
        .set_title("Select backup to import")
        .pick_file()
}

pub async fn run_backup_export(notebook: &Notebook, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(pick_backup_destination) else {
        return Ok(());
    };
    notebook.export_backup(&path).await?;
    status(&format!("Saved to {}.", path.display()));
    Ok(())
}

pub async fn run_backup_import(notebook: &Notebook, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(pick_backup_source) else {
        return Ok(());
    };
    if !path.is_file() {
        return Err(anyhow!("Backup file not found: {}", path.display()));
    }
    let count = notebook.import_backup(&path).await?;
    status(&format!("Imported {} notes.", count));
    Ok(())
}
