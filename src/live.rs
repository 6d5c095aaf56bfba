//! Observable queries: each feed re-runs its query whenever the store commits
//! a change of the kind it depends on, and publishes the latest result.

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::db::{Database, StoreChange};
use crate::models::{Item, Label, Note};
use crate::sections::section;

/// The store behind a mutex, plus its change channel so feeds can subscribe
/// without waiting on whoever holds the lock.
#[derive(Clone)]
pub struct SharedStore {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<StoreChange>,
}

impl SharedStore {
    pub fn new(db: Database) -> Self {
        let changes = db.change_sender();
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Blocks; call from the blocking pool only.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| anyhow!("Note store lock error: {}", e))
    }
}

/// Run `f` against the store on the blocking pool.
pub(crate) async fn with_store<T, F>(store: &SharedStore, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || {
        let db = store.lock()?;
        f(&db)
    })
    .await?
}

/// Sectioned note list that stays current with the store.
#[derive(Clone)]
pub struct Content {
    rx: watch::Receiver<Vec<Item>>,
}

impl Content {
    pub(crate) fn spawn<F>(store: &SharedStore, query: F) -> Result<Self>
    where
        F: Fn(&Database) -> Result<Vec<Note>> + Send + Sync + 'static,
    {
        let rx = spawn_feed(store, StoreChange::Notes, move |db| query(db).map(section))?;
        Ok(Self { rx })
    }

    /// Active notes matching the latest keyword; re-queried when the keyword
    /// or the notes change. The second receiver names the keyword the
    /// published results answer.
    pub(crate) fn spawn_search(
        store: &SharedStore,
        mut keyword: watch::Receiver<String>,
    ) -> Result<(Self, watch::Receiver<String>)> {
        let mut changes = store.subscribe();
        let (tx, rx) = watch::channel(Vec::new());
        let (answered_tx, answered_rx) = watch::channel(String::new());
        let store = store.clone();

        tokio::spawn(async move {
            loop {
                let current = keyword.borrow_and_update().clone();
                let query = current.clone();
                match with_store(&store, move |db| db.search_notes(&query)).await {
                    Ok(notes) => {
                        if tx.send(section(notes)).is_err() {
                            break;
                        }
                    }
                    // Previous results stay published
                    Err(e) => warn!(error = %e, "Search failed"),
                }
                let _ = answered_tx.send(current);

                tokio::select! {
                    changed = keyword.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    more = wait_for_change(&tx, &mut changes, StoreChange::Notes) => {
                        if !more {
                            break;
                        }
                    }
                }
            }
            debug!("Search feed stopped");
        });

        Ok((Self { rx }, answered_rx))
    }

    /// Latest published list.
    pub fn current(&self) -> Vec<Item> {
        self.rx.borrow().clone()
    }

    /// Wait until a new list is published.
    pub async fn changed(&mut self) -> Result<Vec<Item>> {
        self.rx.changed().await?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the published list satisfies `predicate`.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&Vec<Item>) -> bool) -> Result<Vec<Item>> {
        let items = self.rx.wait_for(predicate).await?;
        Ok(items.clone())
    }

    pub fn notes(&self) -> Vec<Note> {
        self.rx
            .borrow()
            .iter()
            .filter_map(|item| item.as_note().cloned())
            .collect()
    }
}

/// Label list that stays current with the store.
#[derive(Clone)]
pub struct LabelFeed {
    rx: watch::Receiver<Vec<Label>>,
}

impl LabelFeed {
    pub(crate) fn spawn(store: &SharedStore) -> Result<Self> {
        let rx = spawn_feed(store, StoreChange::Labels, |db| db.all_labels())?;
        Ok(Self { rx })
    }

    pub fn current(&self) -> Vec<Label> {
        self.rx.borrow().clone()
    }

    pub async fn wait_for(&mut self, predicate: impl FnMut(&Vec<Label>) -> bool) -> Result<Vec<Label>> {
        let labels = self.rx.wait_for(predicate).await?;
        Ok(labels.clone())
    }
}

/// Publish `query` now and again after every committed change of kind `on`.
/// The task ends once every receiver is gone.
fn spawn_feed<T, F>(store: &SharedStore, on: StoreChange, query: F) -> Result<watch::Receiver<T>>
where
    T: Default + Send + Sync + 'static,
    F: Fn(&Database) -> Result<T> + Send + Sync + 'static,
{
    let mut changes = store.subscribe();
    let (tx, rx) = watch::channel(T::default());
    let store = store.clone();
    let query = Arc::new(query);

    tokio::spawn(async move {
        loop {
            let run = Arc::clone(&query);
            match with_store(&store, move |db| run(db)).await {
                Ok(value) => {
                    if tx.send(value).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Live query failed"),
            }

            if !wait_for_change(&tx, &mut changes, on).await {
                break;
            }
        }
        debug!(?on, "Live feed stopped");
    });

    Ok(rx)
}

/// Returns false when the feed should stop.
async fn wait_for_change<T>(
    tx: &watch::Sender<T>,
    changes: &mut broadcast::Receiver<StoreChange>,
    on: StoreChange,
) -> bool {
    loop {
        tokio::select! {
            _ = tx.closed() => return false,
            change = changes.recv() => match change {
                Ok(change) if change == on => return true,
                Ok(_) => continue,
                // Missed some; re-query to catch up
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            },
        }
    }
}
