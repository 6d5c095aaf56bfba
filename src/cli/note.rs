use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

use crate::cli::ui::{confirm, status};
use crate::cli::AddArgs;
use crate::models::{Folder, ListItem, Note, NoteId};
use crate::notebook::Notebook;

/// Checklist item as typed: a leading "x " marks it checked.
fn parse_item(raw: &str) -> ListItem {
    match raw.strip_prefix("x ") {
        Some(body) => ListItem::new(body, true),
        None => ListItem::new(raw, false),
    }
}

fn build_note(args: &AddArgs) -> Result<Note> {
    let mut note = match (&args.phone, args.items.is_empty(), &args.body) {
        (Some(number), true, None) => Note::phone_number(&args.title, number),
        (None, false, None) => Note::checklist(args.title.clone(), args.items.iter().map(|i| parse_item(i)).collect()),
        (None, true, body) => Note::plain(args.title.clone(), body.clone().unwrap_or_default()),
        _ => return Err(anyhow!("Use only one of --body, --item or --phone.")),
    };
    note.labels = args.labels.iter().cloned().collect();
    note.pinned = args.pin;
    Ok(note)
}

/// Execute the add command - labels must already exist
pub async fn run_add(notebook: &Notebook, args: &AddArgs) -> Result<()> {
    let note = build_note(args)?;

    let known: BTreeSet<String> = notebook.labels_snapshot().await?.into_iter().collect();
    if let Some(missing) = note.labels.iter().find(|label| !known.contains(*label)) {
        return Err(anyhow!("Unknown label '{}'. Add it with `notecmd label add`.", missing));
    }

    let id = notebook.add_note(note).await?;
    status(&format!("Added {}.", id));
    Ok(())
}

pub async fn run_pin(notebook: &Notebook, id: NoteId, pinned: bool) -> Result<()> {
    let found = if pinned {
        notebook.pin(id).await?
    } else {
        notebook.unpin(id).await?
    };
    report(found, id, if pinned { "Pinned." } else { "Unpinned." })
}

pub async fn run_move(notebook: &Notebook, id: NoteId, folder: Folder) -> Result<()> {
    let found = match folder {
        Folder::Deleted => notebook.move_to_deleted(id).await?,
        Folder::Archived => notebook.move_to_archive(id).await?,
        Folder::Active => return run_restore(notebook, id).await,
    };
    report(found, id, "Moved.")
}

pub async fn run_restore(notebook: &Notebook, id: NoteId) -> Result<()> {
    let found = notebook.restore(id).await?;
    report(found, id, "Restored.")
}

pub async fn run_tag(notebook: &Notebook, id: NoteId, labels: &[String]) -> Result<()> {
    let labels: BTreeSet<String> = labels.iter().cloned().collect();
    let found = notebook.update_labels(id, labels).await?;
    report(found, id, "Saved.")
}

pub async fn run_delete(notebook: &Notebook, id: NoteId, yes: bool) -> Result<()> {
    let Some(note) = notebook.get_note(id).await? else {
        return report(false, id, "");
    };
    if note.folder != Folder::Deleted {
        return Err(anyhow!("Note {} is not in deleted notes. Trash it first.", id));
    }
    if !yes && !confirm(&format!("Delete note {} forever?", id))? {
        return Ok(());
    }
    let found = notebook.delete_forever(id).await?;
    report(found, id, "Deleted.")
}

pub async fn run_empty_trash(notebook: &Notebook, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete every note in deleted notes forever?")? {
        return Ok(());
    }
    let count = notebook.delete_all_deleted().await?;
    status(&format!("Deleted {} notes.", count));
    Ok(())
}

fn report(found: bool, id: NoteId, done: &str) -> Result<()> {
    if !found {
        return Err(anyhow!("No note with id {}.", id));
    }
    status(done);
    Ok(())
}
