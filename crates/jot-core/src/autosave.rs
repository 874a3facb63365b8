//! Auto-save coordinator
//!
//! A background task that owns the entry being edited, applies edits to it,
//! and writes it to the store once the user has stopped typing for a quiet
//! period. Every edit restarts the timer, so a burst of edits produces a
//! single write.
//!
//! Edits and commands are handled one at a time by the task, so two saves
//! never overlap. Edits sent while a save is running wait in the channel and
//! restart the timer once the write has finished.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{EntryAggregate, JournalEntry, Tag, ToDoItem, ToggleBlock};
use crate::store::{EntryWrite, Store};

/// Default quiet period before a pending save is written
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2000);

/// An edit to the tracked entry
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Title(String),
    Content(String),
    /// Append a line to the body
    AppendContent(String),
    AddTag(Tag),
    /// Remove a tag by name
    RemoveTag(String),
    /// Add a checklist item with this description
    AddTodo(String),
    /// Mark the `index`-th checklist item (counting todos only)
    SetTodoDone { index: usize, done: bool },
    AddToggle { title: String, content: String },
    /// Expand or collapse the `index`-th toggle block (counting toggles only)
    SetToggleExpanded { index: usize, expanded: bool },
}

/// Coordinator state, published on [`AutoSaveHandle::status_rx`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    /// Nothing waiting to be written
    Idle,
    /// Edits applied, waiting for the quiet period to elapse
    PendingSave,
    /// A write is in flight
    Saving,
}

/// What caused a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTrigger {
    QuietPeriod,
    Manual,
    Shutdown,
}

/// Summary of one completed save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub entry_id: i64,
    pub entry_write: EntryWrite,
    pub blocks_created: usize,
    pub blocks_updated: usize,
    pub trigger: SaveTrigger,
}

/// Events emitted by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSaveEvent {
    Saved(SaveReport),
    /// A save failed; the coordinator is idle again and will not retry
    Failed(String),
}

/// Errors returned through [`AutoSaveHandle`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AutoSaveError {
    #[error("Auto-save task is no longer running")]
    Stopped,

    #[error("Save failed: {0}")]
    SaveFailed(String),
}

/// Configuration for the coordinator
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    /// How long to wait after the last edit before saving
    pub quiet_period: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

impl AutoSaveConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quiet_period: config.quiet_period(),
        }
    }
}

enum Command {
    Edit(Edit),
    SaveNow(oneshot::Sender<Result<SaveReport, AutoSaveError>>),
    Snapshot(oneshot::Sender<EntryAggregate>),
    Shutdown(oneshot::Sender<EntryAggregate>),
}

/// Handle to control the auto-save task
pub struct AutoSaveHandle {
    command_tx: mpsc::Sender<Command>,
    /// Receive save results
    pub event_rx: mpsc::UnboundedReceiver<AutoSaveEvent>,
    /// Watch the coordinator state
    pub status_rx: watch::Receiver<SaveState>,
}

impl AutoSaveHandle {
    /// Apply an edit and restart the quiet-period timer
    pub async fn edit(&self, edit: Edit) -> Result<(), AutoSaveError> {
        self.command_tx
            .send(Command::Edit(edit))
            .await
            .map_err(|_| AutoSaveError::Stopped)
    }

    /// Write the entry immediately, cancelling any pending timer
    ///
    /// Resolves once the write has finished. Writes even when nothing is
    /// pending.
    pub async fn save_now(&self) -> Result<SaveReport, AutoSaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::SaveNow(reply_tx))
            .await
            .map_err(|_| AutoSaveError::Stopped)?;
        reply_rx.await.map_err(|_| AutoSaveError::Stopped)?
    }

    /// A copy of the tracked entry, including any ids assigned so far
    pub async fn snapshot(&self) -> Result<EntryAggregate, AutoSaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| AutoSaveError::Stopped)?;
        reply_rx.await.map_err(|_| AutoSaveError::Stopped)
    }

    /// Flush any pending save, stop the task, and return the final entry
    pub async fn shutdown(&self) -> Result<EntryAggregate, AutoSaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Shutdown(reply_tx))
            .await
            .map_err(|_| AutoSaveError::Stopped)?;
        reply_rx.await.map_err(|_| AutoSaveError::Stopped)
    }

    /// Current coordinator state
    pub fn state(&self) -> SaveState {
        *self.status_rx.borrow()
    }
}

/// Spawn the auto-save task for an entry
///
/// The store is shared; the aggregate is owned by the task until
/// [`AutoSaveHandle::shutdown`] hands it back.
pub fn spawn_autosave(
    config: AutoSaveConfig,
    store: Arc<Mutex<Store>>,
    aggregate: EntryAggregate,
) -> AutoSaveHandle {
    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(SaveState::Idle);

    tokio::spawn(autosave_loop(
        config, store, aggregate, command_rx, event_tx, status_tx,
    ));

    AutoSaveHandle {
        command_tx,
        event_rx,
        status_rx,
    }
}

struct Coordinator {
    store: Arc<Mutex<Store>>,
    aggregate: EntryAggregate,
    event_tx: mpsc::UnboundedSender<AutoSaveEvent>,
    status_tx: watch::Sender<SaveState>,
}

async fn autosave_loop(
    config: AutoSaveConfig,
    store: Arc<Mutex<Store>>,
    aggregate: EntryAggregate,
    mut command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::UnboundedSender<AutoSaveEvent>,
    status_tx: watch::Sender<SaveState>,
) {
    let mut coordinator = Coordinator {
        store,
        aggregate,
        event_tx,
        status_tx,
    };
    let mut deadline: Option<Instant> = None;

    loop {
        let cmd = match deadline {
            Some(at) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {
                        deadline = None;
                        let _ = coordinator.save(SaveTrigger::QuietPeriod).await;
                        continue;
                    }
                    cmd = command_rx.recv() => cmd,
                }
            }
            None => command_rx.recv().await,
        };

        match cmd {
            Some(Command::Edit(edit)) => {
                if coordinator.apply(edit) {
                    deadline = Some(Instant::now() + config.quiet_period);
                    let _ = coordinator.status_tx.send(SaveState::PendingSave);
                }
            }
            Some(Command::SaveNow(reply)) => {
                deadline = None;
                let result = coordinator.save(SaveTrigger::Manual).await;
                let _ = reply.send(result);
            }
            Some(Command::Snapshot(reply)) => {
                let _ = reply.send(coordinator.aggregate.clone());
            }
            Some(Command::Shutdown(reply)) => {
                if deadline.take().is_some() {
                    let _ = coordinator.save(SaveTrigger::Shutdown).await;
                }
                let _ = reply.send(coordinator.aggregate.clone());
                break;
            }
            None => {
                // Handle dropped; don't lose pending edits
                if deadline.take().is_some() {
                    let _ = coordinator.save(SaveTrigger::Shutdown).await;
                }
                break;
            }
        }
    }

    debug!(entry_id = coordinator.aggregate.entry.id, "auto-save task stopped");
}

impl Coordinator {
    /// Apply an edit; returns false when it referred to nothing
    fn apply(&mut self, edit: Edit) -> bool {
        let entry_id = self.aggregate.entry.id;
        match edit {
            Edit::Title(title) => self.aggregate.entry.set_title(title),
            Edit::Content(content) => self.aggregate.entry.set_content(content),
            Edit::AppendContent(line) => self.aggregate.entry.append_line(&line),
            Edit::AddTag(tag) => {
                if !self.aggregate.entry.add_tag(tag) {
                    return false;
                }
            }
            Edit::RemoveTag(name) => {
                if !self.aggregate.entry.remove_tag(&name) {
                    return false;
                }
            }
            Edit::AddTodo(description) => {
                self.aggregate
                    .push_block(ToDoItem::new(entry_id, description));
            }
            Edit::SetTodoDone { index, done } => match self.aggregate.todo_mut(index) {
                Some(item) => item.is_done = done,
                None => {
                    warn!(index, "ignoring edit of missing todo item");
                    return false;
                }
            },
            Edit::AddToggle { title, content } => {
                self.aggregate
                    .push_block(ToggleBlock::new(entry_id, title, content));
            }
            Edit::SetToggleExpanded { index, expanded } => {
                match self.aggregate.toggle_mut(index) {
                    Some(toggle) => toggle.is_expanded = expanded,
                    None => {
                        warn!(index, "ignoring edit of missing toggle block");
                        return false;
                    }
                }
            }
        }
        true
    }

    async fn save(&mut self, trigger: SaveTrigger) -> Result<SaveReport, AutoSaveError> {
        let _ = self.status_tx.send(SaveState::Saving);
        apply_title_placeholder(&mut self.aggregate.entry, Local::now().naive_local());

        let result = {
            let mut store = self.store.lock().await;
            match store.ensure_connected() {
                Ok(()) => store.save_aggregate(&mut self.aggregate),
                Err(e) => Err(e),
            }
        }
        .map_err(|e| e.to_string())
        .and_then(|saved| {
            if saved.entry_write.is_noop() {
                Err(format!("entry {} no longer exists", saved.entry_id))
            } else {
                Ok(saved)
            }
        });
        let _ = self.status_tx.send(SaveState::Idle);

        match result {
            Ok(saved) => {
                let report = SaveReport {
                    entry_id: saved.entry_id,
                    entry_write: saved.entry_write,
                    blocks_created: saved.blocks_created,
                    blocks_updated: saved.blocks_updated,
                    trigger,
                };
                info!(entry_id = report.entry_id, ?trigger, "entry saved");
                let _ = self.event_tx.send(AutoSaveEvent::Saved(report));
                Ok(report)
            }
            Err(message) => {
                warn!(?trigger, "auto-save failed: {}", message);
                let _ = self.event_tx.send(AutoSaveEvent::Failed(message.clone()));
                Err(AutoSaveError::SaveFailed(message))
            }
        }
    }
}

/// Title given to entries saved without one
pub fn placeholder_title(now: NaiveDateTime) -> String {
    format!("Untitled - {}", now.format("%Y-%m-%d %H:%M"))
}

/// Replace a blank title with the placeholder; returns whether it did
pub fn apply_title_placeholder(entry: &mut JournalEntry, now: NaiveDateTime) -> bool {
    if !entry.title.trim().is_empty() {
        return false;
    }
    entry.title = placeholder_title(now);
    true
}
