use clap::Parser;
use notecmd::cli::{
    run_add, run_backup_export, run_backup_import, run_delete, run_empty_trash, run_export, run_label,
    run_labels, run_list, run_move, run_pin, run_restore, run_search, run_tag, BackupCommand, Cli, Commands,
};
use notecmd::config::Config;
use notecmd::legacy::MigrationState;
use notecmd::logging;
use notecmd::models::Folder;
use notecmd::Notebook;
use std::sync::Arc;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let notebook = Arc::new(Notebook::open(&config).await?);

    // Commands see the store only after legacy notes are in
    if notebook.wait_for_migration().await == MigrationState::Failed {
        warn!("Legacy notes were not migrated; will retry on next start");
    }

    match cli.command {
        None => {
            // No subcommand provided - show active notes
            run_list(&notebook, "notes", None).await?;
        }
        Some(Commands::List(args)) => {
            run_list(&notebook, &args.folder, args.label.as_deref()).await?;
        }
        Some(Commands::Labels) => run_labels(&notebook).await?,
        Some(Commands::Search(args)) => run_search(&notebook, &args.query).await?,
        Some(Commands::Add(args)) => run_add(&notebook, &args).await?,
        Some(Commands::Pin(args)) => run_pin(&notebook, args.id, true).await?,
        Some(Commands::Unpin(args)) => run_pin(&notebook, args.id, false).await?,
        Some(Commands::Archive(args)) => run_move(&notebook, args.id, Folder::Archived).await?,
        Some(Commands::Trash(args)) => run_move(&notebook, args.id, Folder::Deleted).await?,
        Some(Commands::Restore(args)) => run_restore(&notebook, args.id).await?,
        Some(Commands::Delete(args)) => run_delete(&notebook, args.id, args.confirm.yes).await?,
        Some(Commands::EmptyTrash(args)) => run_empty_trash(&notebook, args.yes).await?,
        Some(Commands::Tag(args)) => run_tag(&notebook, args.id, &args.labels).await?,
        Some(Commands::Label(args)) => run_label(&notebook, &args.command).await?,
        Some(Commands::Backup(args)) => match args.command {
            BackupCommand::Export { path } => run_backup_export(&notebook, path).await?,
            BackupCommand::Import { path } => run_backup_import(&notebook, path).await?,
        },
        Some(Commands::Export(args)) => {
            run_export(&notebook, args.id, &args.format, args.date, args.out).await?;
        }
    }

    Ok(())
}
