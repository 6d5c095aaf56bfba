use anyhow::{anyhow, Result};

use crate::cli::ui::{print_items, status};
use crate::models::Folder;
use crate::notebook::Notebook;

/// Folder names as typed on the command line.
pub fn parse_folder(name: &str) -> Result<Folder> {
    match name.to_lowercase().as_str() {
        "notes" | "active" => Ok(Folder::Active),
        "deleted" | "trash" => Ok(Folder::Deleted),
        "archived" | "archive" => Ok(Folder::Archived),
        other => Err(anyhow!("Unknown folder '{}'. Use notes, deleted or archived.", other)),
    }
}

/// Execute the list command - print one folder, or every note with a label
pub async fn run_list(notebook: &Notebook, folder: &str, label: Option<&str>) -> Result<()> {
    let items = match label {
        Some(label) => notebook.list_label(label).await?,
        None => notebook.list(parse_folder(folder)?).await?,
    };
    print_items(&items);
    Ok(())
}

pub async fn run_search(notebook: &Notebook, query: &str) -> Result<()> {
    let items = notebook.search(query.trim()).await?;
    print_items(&items);
    Ok(())
}

pub async fn run_labels(notebook: &Notebook) -> Result<()> {
    let labels = notebook.labels_snapshot().await?;
    if labels.is_empty() {
        status("No labels.");
    }
    for label in labels {
        println!("{}", label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folder() {
        assert_eq!(parse_folder("notes").unwrap(), Folder::Active);
        assert_eq!(parse_folder("Trash").unwrap(), Folder::Deleted);
        assert_eq!(parse_folder("archived").unwrap(), Folder::Archived);
        assert!(parse_folder("inbox").is_err());
    }
}
