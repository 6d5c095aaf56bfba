use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::cli::ui::status;
use crate::export::ExportFormat;
use crate::models::NoteId;
use crate::notebook::Notebook;

/// Execute the export command - write one note, optionally copying it to `out`
pub async fn run_export(
    notebook: &Arc<Notebook>,
    id: NoteId,
    format: &str,
    show_date: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let format = ExportFormat::parse(format)
        .ok_or_else(|| anyhow!("Unknown format '{}'. Use json, txt, html, pdf or xml.", format))?;
    let note = notebook
        .get_note(id)
        .await?
        .ok_or_else(|| anyhow!("No note with id {}.", id))?;

    let path = match format {
        ExportFormat::Pdf => {
            let (tx, rx) = oneshot::channel();
            notebook.pdf_file(note, show_date, move |result| {
                let _ = tx.send(result);
            });
            rx.await??
        }
        _ => notebook.export_note(note, format, show_date).await?,
    };

    match out {
        Some(dest) => {
            notebook.save_current_file(&dest).await?;
            status(&format!("Saved to {}.", dest.display()));
        }
        None => status(&path.display().to_string()),
    }
    Ok(())
}
