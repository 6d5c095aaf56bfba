use anyhow::{anyhow, Result};

use crate::cli::ui::status;
use crate::cli::LabelCommand;
use crate::notebook::Notebook;

/// Execute a label subcommand
pub async fn run_label(notebook: &Notebook, command: &LabelCommand) -> Result<()> {
    match command {
        LabelCommand::Add { value } => {
            let value = value.trim();
            if value.is_empty() {
                return Err(anyhow!("Label cannot be empty."));
            }
            if !notebook.insert_label(value).await {
                return Err(anyhow!("Label '{}' already exists.", value));
            }
            status("Added.");
        }
        LabelCommand::Rename { old, new } => {
            let new = new.trim();
            if new.is_empty() {
                return Err(anyhow!("Label cannot be empty."));
            }
            if !notebook.update_label(old, new).await {
                return Err(anyhow!("Could not rename '{}'; '{}' may already exist.", old, new));
            }
            status("Renamed.");
        }
        LabelCommand::Delete { value } => {
            notebook.delete_label(value).await?;
            status("Deleted.");
        }
    }
    Ok(())
}
