//! The facade the command line drives. Every store call and file write runs on
//! the blocking pool; results come back as `Result`s, live feeds or notices.

use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::backup;
use crate::config::Config;
use crate::db::Database;
use crate::export::{CommandRenderer, DocumentRenderer, ExportFormat, Exporter};
use crate::legacy::{LegacyMigration, MigrationState};
use crate::live::{with_store, Content, LabelFeed, SharedStore};
use crate::models::{Folder, Item, Label, Note, NoteId};
use crate::sections::section;

const NOTICE_CHANNEL_CAPACITY: usize = 16;

/// Events for whoever presents the notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A backup or exported file was written to a user-chosen location.
    SavedToDevice,
    /// A note was restored; the view showing `from` should go back to the notes list.
    NavigateToNotes { from: Folder },
}

pub struct Notebook {
    store: SharedStore,
    exporter: Arc<Exporter>,
    active: Content,
    deleted: Content,
    archived: Content,
    labels: LabelFeed,
    // Never evicted for the life of the notebook
    by_label: Mutex<HashMap<String, Content>>,
    keyword: watch::Sender<String>,
    search: Content,
    answered: watch::Receiver<String>,
    notices: broadcast::Sender<Notice>,
    current_file: Mutex<Option<PathBuf>>,
    migration: watch::Receiver<MigrationState>,
}

impl Notebook {
    /// Open the configured store and start the legacy migration in the background.
    pub async fn open(config: &Config) -> Result<Self> {
        let path = config.db_path.clone();
        let db = tokio::task::spawn_blocking(move || Database::open_at(path)).await??;
        let renderer = Arc::new(CommandRenderer::new(config.pdf_renderer.clone()));
        Self::with_database(db, config, renderer)
    }

    pub fn with_database(
        db: Database,
        config: &Config,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Result<Self> {
        let store = SharedStore::new(db);
        let exporter = Exporter::new(config.export_dir.clone(), config.date_formatter(), renderer);

        let (keyword, keyword_rx) = watch::channel(String::new());
        let (search, answered) = Content::spawn_search(&store, keyword_rx)?;
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);

        let notebook = Self {
            active: Content::spawn(&store, |db| db.notes_in_folder(Folder::Active))?,
            deleted: Content::spawn(&store, |db| db.notes_in_folder(Folder::Deleted))?,
            archived: Content::spawn(&store, |db| db.notes_in_folder(Folder::Archived))?,
            labels: LabelFeed::spawn(&store)?,
            search,
            answered,
            by_label: Mutex::new(HashMap::new()),
            keyword,
            notices,
            current_file: Mutex::new(None),
            migration: spawn_migration(&store, config.legacy_dir.clone()),
            exporter: Arc::new(exporter),
            store,
        };
        Ok(notebook)
    }

    /// Resolves once the startup migration has finished.
    pub async fn wait_for_migration(&self) -> MigrationState {
        let mut rx = self.migration.clone();
        let finished = rx
            .wait_for(|state| matches!(state, MigrationState::Done | MigrationState::Failed))
            .await;
        match finished {
            Ok(state) => *state,
            Err(_) => MigrationState::Failed,
        }
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn notify(&self, notice: Notice) {
        // Nobody listening is fine
        let _ = self.notices.send(notice);
    }

    // ==================== FEEDS ====================

    pub fn active_notes(&self) -> Content {
        self.active.clone()
    }

    pub fn deleted_notes(&self) -> Content {
        self.deleted.clone()
    }

    pub fn archived_notes(&self) -> Content {
        self.archived.clone()
    }

    pub fn content(&self, folder: Folder) -> Content {
        match folder {
            Folder::Active => self.active_notes(),
            Folder::Deleted => self.deleted_notes(),
            Folder::Archived => self.archived_notes(),
        }
    }

    pub fn labels(&self) -> LabelFeed {
        self.labels.clone()
    }

    /// Live notes carrying `label`, created on first request and reused after.
    pub fn notes_by_label(&self, label: &str) -> Result<Content> {
        let mut cache = self
            .by_label
            .lock()
            .map_err(|e| anyhow!("Label cache lock error: {}", e))?;
        if let Some(content) = cache.get(label) {
            return Ok(content.clone());
        }

        let value = label.to_string();
        let content = Content::spawn(&self.store, move |db| db.notes_with_label(&value))?;
        cache.insert(label.to_string(), content.clone());
        Ok(content)
    }

    /// One-shot sectioned read of `folder`, straight from the store.
    pub async fn list(&self, folder: Folder) -> Result<Vec<Item>> {
        let notes = with_store(&self.store, move |db| db.notes_in_folder(folder)).await?;
        Ok(section(notes))
    }

    /// One-shot sectioned read of every note carrying `label`.
    pub async fn list_label(&self, label: &str) -> Result<Vec<Item>> {
        let label = label.to_string();
        let notes = with_store(&self.store, move |db| db.notes_with_label(&label)).await?;
        Ok(section(notes))
    }

    /// Re-run the search only when the keyword actually changes.
    pub fn set_keyword(&self, keyword: &str) {
        self.keyword.send_if_modified(|current| {
            if current == keyword {
                return false;
            }
            *current = keyword.to_string();
            true
        });
    }

    pub fn search_results(&self) -> Content {
        self.search.clone()
    }

    /// Set the keyword and wait for the results that answer it.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Item>> {
        self.set_keyword(keyword);
        let mut answered = self.answered.clone();
        answered.wait_for(|current| current == keyword).await?;
        Ok(self.search.current())
    }

    // ==================== NOTES ====================

    pub async fn add_note(&self, note: Note) -> Result<NoteId> {
        let ids = with_store(&self.store, move |db| db.insert_notes(&[note])).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Store returned no id for the new note"))
    }

    pub async fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        with_store(&self.store, move |db| db.get_note(id)).await
    }

    pub async fn pin(&self, id: NoteId) -> Result<bool> {
        with_store(&self.store, move |db| db.update_pinned(id, true)).await
    }

    pub async fn unpin(&self, id: NoteId) -> Result<bool> {
        with_store(&self.store, move |db| db.update_pinned(id, false)).await
    }

    pub async fn move_to_deleted(&self, id: NoteId) -> Result<bool> {
        with_store(&self.store, move |db| db.move_note(id, Folder::Deleted)).await
    }

    pub async fn move_to_archive(&self, id: NoteId) -> Result<bool> {
        with_store(&self.store, move |db| db.move_note(id, Folder::Archived)).await
    }

    /// Move back to the active folder and ask the view to return to the notes list.
    pub async fn restore(&self, id: NoteId) -> Result<bool> {
        let from = with_store(&self.store, move |db| {
            let from = db.get_note(id)?.map(|note| note.folder);
            if from.is_some() {
                db.move_note(id, Folder::Active)?;
            }
            Ok(from)
        })
        .await?;

        match from {
            Some(from) => {
                self.notify(Notice::NavigateToNotes { from });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn delete_forever(&self, id: NoteId) -> Result<bool> {
        with_store(&self.store, move |db| db.delete_note(id)).await
    }

    pub async fn delete_all_deleted(&self) -> Result<usize> {
        let count = with_store(&self.store, |db| db.delete_all_in_folder(Folder::Deleted)).await?;
        info!(count, "Deleted notes emptied");
        Ok(count)
    }

    pub async fn update_labels(&self, id: NoteId, labels: BTreeSet<String>) -> Result<bool> {
        with_store(&self.store, move |db| db.update_labels(id, &labels)).await
    }

    // ==================== LABELS ====================

    pub async fn labels_snapshot(&self) -> Result<Vec<String>> {
        let labels = with_store(&self.store, |db| db.all_labels()).await?;
        Ok(labels.into_iter().map(|label| label.value).collect())
    }

    pub async fn delete_label(&self, value: &str) -> Result<()> {
        let value = value.to_string();
        with_store(&self.store, move |db| db.delete_label(&value)).await
    }

    /// False when the label already exists or the write failed.
    pub async fn insert_label(&self, value: &str) -> bool {
        let label = Label::new(value);
        match with_store(&self.store, move |db| db.insert_label(&label)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(label = value, error = %e, "Label not added");
                false
            }
        }
    }

    /// False when `new` already exists or the write failed.
    pub async fn update_label(&self, old: &str, new: &str) -> bool {
        let (from, to) = (old.to_string(), new.to_string());
        match with_store(&self.store, move |db| db.update_label(&from, &to)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(old, new, error = %e, "Label not renamed");
                false
            }
        }
    }

    // ==================== BACKUP ====================

    pub async fn export_backup(&self, dest: &Path) -> Result<()> {
        let dest = dest.to_path_buf();
        with_store(&self.store, move |db| backup::export_backup(db, &dest)).await?;
        self.notify(Notice::SavedToDevice);
        Ok(())
    }

    /// Returns the number of notes imported.
    pub async fn import_backup(&self, src: &Path) -> Result<usize> {
        let src = src.to_path_buf();
        with_store(&self.store, move |db| backup::import_backup(db, &src)).await
    }

    // ==================== EXPORT ====================

    /// Write `note` into the scratch directory and remember it as the current file.
    /// A failed export leaves no current file.
    pub async fn export_note(&self, note: Note, format: ExportFormat, show_date: bool) -> Result<PathBuf> {
        let exporter = Arc::clone(&self.exporter);
        let exported = tokio::task::spawn_blocking(move || exporter.export(&note, format, show_date))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|result| result);
        match exported {
            Ok(path) => {
                self.set_current_file(Some(path.clone()))?;
                Ok(path)
            }
            Err(e) => {
                self.set_current_file(None)?;
                Err(e)
            }
        }
    }

    /// Render `note` to PDF in the background; `on_result` gets the file or the failure.
    pub fn pdf_file<F>(self: &Arc<Self>, note: Note, show_date: bool, on_result: F)
    where
        F: FnOnce(Result<PathBuf>) + Send + 'static,
    {
        let notebook = Arc::clone(self);
        tokio::spawn(async move {
            let result = notebook.export_note(note, ExportFormat::Pdf, show_date).await;
            on_result(result);
        });
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.current_file.lock().ok().and_then(|file| file.clone())
    }

    fn set_current_file(&self, path: Option<PathBuf>) -> Result<()> {
        let mut current = self
            .current_file
            .lock()
            .map_err(|e| anyhow!("Current file lock error: {}", e))?;
        *current = path;
        Ok(())
    }

    /// Copy the last exported file to `dest`, replacing its contents.
    pub async fn save_current_file(&self, dest: &Path) -> Result<()> {
        let src = self
            .current_file()
            .ok_or_else(|| anyhow!("Nothing has been exported yet"))?;
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || {
            fs::copy(&src, &dest)
                .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))
        })
        .await??;
        self.notify(Notice::SavedToDevice);
        Ok(())
    }
}

fn spawn_migration(store: &SharedStore, legacy_dir: PathBuf) -> watch::Receiver<MigrationState> {
    let (tx, rx) = watch::channel(MigrationState::NotStarted);
    let store = store.clone();
    tokio::task::spawn_blocking(move || {
        let state = match store.lock() {
            Ok(db) => LegacyMigration::new(legacy_dir).run(&*db),
            Err(e) => {
                warn!(error = %e, "Legacy migration skipped");
                MigrationState::Failed
            }
        };
        let _ = tx.send(state);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateFormatter;
    use crate::export::ExportError;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    struct FakeRenderer;

    impl DocumentRenderer for FakeRenderer {
        fn render(&self, _html: &str, dest: &Path) -> Result<(), ExportError> {
            fs::write(dest, b"%PDF-1.4")?;
            Ok(())
        }
    }

    struct BrokenRenderer;

    impl DocumentRenderer for BrokenRenderer {
        fn render(&self, _html: &str, _dest: &Path) -> Result<(), ExportError> {
            Err(ExportError::RendererFailed {
                program: "broken".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }

    fn test_config(dir: &Path) -> Config {
        Config {
            db_path: dir.join("notes.db"),
            export_dir: dir.join("exported"),
            legacy_dir: dir.join("legacy"),
            locale: "en_US".to_string(),
            pdf_renderer: "true".to_string(),
        }
    }

    async fn notebook(dir: &Path) -> Arc<Notebook> {
        let notebook = Notebook::with_database(
            Database::open_memory().unwrap(),
            &test_config(dir),
            Arc::new(FakeRenderer),
        )
        .unwrap();
        assert_eq!(notebook.wait_for_migration().await, MigrationState::Done);
        Arc::new(notebook)
    }

    #[tokio::test]
    async fn test_pin_moves_note_into_pinned_section() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        let first = notebook.add_note(Note::plain("first", "")).await.unwrap();
        notebook.add_note(Note::plain("second", "")).await.unwrap();

        assert!(notebook.pin(first).await.unwrap());

        let mut active = notebook.active_notes();
        let items = timeout(WAIT, active.wait_for(|items| items.len() == 4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(items[0], Item::Header("Pinned".to_string()));
        assert_eq!(items[1].as_note().unwrap().id, first);
        assert_eq!(items[2], Item::Header("Others".to_string()));

        assert!(notebook.unpin(first).await.unwrap());
        timeout(WAIT, active.wait_for(|items| items.len() == 2))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_restore_notifies_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        let mut notices = notebook.notices();
        let id = notebook.add_note(Note::plain("t", "")).await.unwrap();

        assert!(notebook.move_to_archive(id).await.unwrap());
        assert!(notebook.restore(id).await.unwrap());

        assert_eq!(
            notices.recv().await.unwrap(),
            Notice::NavigateToNotes {
                from: Folder::Archived
            }
        );
        assert_eq!(notebook.get_note(id).await.unwrap().unwrap().folder, Folder::Active);
        assert!(!notebook.restore(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_trash_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        let a = notebook.add_note(Note::plain("a", "")).await.unwrap();
        let b = notebook.add_note(Note::plain("b", "")).await.unwrap();
        let c = notebook.add_note(Note::plain("c", "")).await.unwrap();

        notebook.move_to_deleted(a).await.unwrap();
        notebook.move_to_deleted(b).await.unwrap();
        assert!(notebook.delete_forever(a).await.unwrap());
        assert_eq!(notebook.delete_all_deleted().await.unwrap(), 1);

        assert!(notebook.get_note(b).await.unwrap().is_none());
        assert!(notebook.get_note(c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_label_operations_report_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;

        assert!(notebook.insert_label("old").await);
        assert!(!notebook.insert_label("old").await);
        assert!(notebook.insert_label("taken").await);

        let id = notebook.add_note(Note::plain("t", "")).await.unwrap();
        let labels: BTreeSet<String> = ["old".to_string()].into();
        assert!(notebook.update_labels(id, labels).await.unwrap());

        assert!(!notebook.update_label("old", "taken").await);
        assert!(notebook.update_label("old", "new").await);

        let renamed = notebook.get_note(id).await.unwrap().unwrap();
        assert!(renamed.labels.contains("new"));
        assert!(!renamed.labels.contains("old"));
        assert_eq!(notebook.labels_snapshot().await.unwrap(), vec!["new", "taken"]);

        notebook.delete_label("new").await.unwrap();
        assert!(notebook.get_note(id).await.unwrap().unwrap().labels.is_empty());
    }

    #[tokio::test]
    async fn test_notes_by_label_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        let mut note = Note::plain("tagged", "");
        note.labels.insert("work".to_string());
        notebook.add_note(note).await.unwrap();

        let mut first = notebook.notes_by_label("work").unwrap();
        let second = notebook.notes_by_label("work").unwrap();
        assert_eq!(notebook.by_label.lock().unwrap().len(), 1);

        timeout(WAIT, first.wait_for(|items| items.len() == 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.current(), first.current());
    }

    #[tokio::test]
    async fn test_search_results_follow_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        notebook.add_note(Note::plain("Groceries", "milk")).await.unwrap();
        notebook
            .add_note(Note::checklist("", vec![crate::models::ListItem::new("call mom", false)]))
            .await
            .unwrap();

        let mut results = notebook.search_results();
        notebook.set_keyword("mom");
        timeout(WAIT, results.wait_for(|items| items.len() == 1))
            .await
            .unwrap()
            .unwrap();

        notebook.set_keyword("");
        timeout(WAIT, results.wait_for(|items| items.is_empty()))
            .await
            .unwrap()
            .unwrap();

        let found = timeout(WAIT, notebook.search("GROCER")).await.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_note().unwrap().title, "Groceries");
    }

    #[tokio::test]
    async fn test_backup_round_trip_and_notice() {
        let dir = tempfile::tempdir().unwrap();
        let source = notebook(dir.path()).await;
        let mut notices = source.notices();
        source.insert_label("home").await;
        source.add_note(Note::plain("Groceries", "milk")).await.unwrap();

        let path = dir.path().join("backup.xml");
        source.export_backup(&path).await.unwrap();
        assert_eq!(notices.recv().await.unwrap(), Notice::SavedToDevice);

        let target = notebook(dir.path()).await;
        assert_eq!(target.import_backup(&path).await.unwrap(), 1);
        assert_eq!(target.labels_snapshot().await.unwrap(), vec!["home"]);
    }

    #[tokio::test]
    async fn test_export_then_save_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        let mut notices = notebook.notices();
        assert!(notebook.save_current_file(&dir.path().join("x")).await.is_err());

        let note = Note::plain("Groceries", "milk");
        let path = notebook
            .export_note(note.clone(), ExportFormat::Txt, false)
            .await
            .unwrap();
        assert_eq!(notebook.current_file(), Some(path.clone()));

        let dest = dir.path().join("saved.txt");
        fs::write(&dest, "stale contents that are longer than the export").unwrap();
        notebook.save_current_file(&dest).await.unwrap();

        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            crate::export::to_txt(&note, false, &DateFormatter::default())
        );
        assert_eq!(notices.recv().await.unwrap(), Notice::SavedToDevice);
    }

    #[tokio::test]
    async fn test_pdf_file_reports_through_callback() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = notebook(dir.path()).await;
        let (tx, rx) = tokio::sync::oneshot::channel();

        notebook.pdf_file(Note::plain("Report", "body"), true, move |result| {
            let _ = tx.send(result);
        });

        let path = timeout(WAIT, rx).await.unwrap().unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "Report.pdf");
        assert_eq!(notebook.current_file(), Some(path));
    }

    #[tokio::test]
    async fn test_list_reads_every_migrated_note() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let legacy_notes = config.legacy_dir.join("notes");
        fs::create_dir_all(&legacy_notes).unwrap();
        for n in 0..20 {
            let mut note = Note::plain(format!("old {}", n), "");
            note.labels.insert("kept".to_string());
            backup::write_note(
                &note,
                fs::File::create(legacy_notes.join(format!("{}.xml", n))).unwrap(),
            )
            .unwrap();
        }

        let notebook = Notebook::open(&config).await.unwrap();
        assert_eq!(notebook.wait_for_migration().await, MigrationState::Done);

        let items = notebook.list(Folder::Active).await.unwrap();
        assert_eq!(items.len(), 20);
        assert!(items.iter().all(|item| item.as_note().is_some()));
        assert_eq!(notebook.list_label("kept").await.unwrap().len(), 20);
        assert!(notebook.list(Folder::Deleted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_export_clears_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = Notebook::with_database(
            Database::open_memory().unwrap(),
            &test_config(dir.path()),
            Arc::new(BrokenRenderer),
        )
        .unwrap();
        let note = Note::plain("Report", "body");

        notebook
            .export_note(note.clone(), ExportFormat::Txt, false)
            .await
            .unwrap();
        assert!(notebook.current_file().is_some());

        assert!(notebook.export_note(note, ExportFormat::Pdf, false).await.is_err());
        assert_eq!(notebook.current_file(), None);
        assert!(notebook.save_current_file(&dir.path().join("out.pdf")).await.is_err());
    }

    #[tokio::test]
    async fn test_open_runs_legacy_migration() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let legacy_notes = config.legacy_dir.join("notes");
        fs::create_dir_all(&legacy_notes).unwrap();
        backup::write_note(
            &Note::plain("old", "from before"),
            fs::File::create(legacy_notes.join("1.xml")).unwrap(),
        )
        .unwrap();

        let notebook = Notebook::open(&config).await.unwrap();
        assert_eq!(notebook.wait_for_migration().await, MigrationState::Done);

        let mut active = notebook.active_notes();
        let items = timeout(WAIT, active.wait_for(|items| items.len() == 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(items[0].as_note().unwrap().title, "old");
        assert!(fs::read_dir(&legacy_notes).unwrap().next().is_none());
    }
}
