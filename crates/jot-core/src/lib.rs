//! jot core library
//!
//! Persistence and auto-save engine for a personal journal: entries with
//! inline colored tags, checklist items and collapsible toggle blocks, kept
//! in a local SQLite database.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = Store::open_with_config(&config)?;
//!
//! let user = store.create_user("ada", "secret")?;
//! let mut entry = JournalEntry::with_title(&user.id, "Trip to Japan");
//! store.create_entry(&mut entry)?;
//!
//! let hits = store.search_entries(&user.id, "Japan")?;
//! ```
//!
//! # Modules
//!
//! - `store`: the document store (main entry point)
//! - `models`: entries, blocks, tags and users
//! - `tags`: the persisted tag string format
//! - `cascade`: entry deletion with its blocks
//! - `search`: keyword search
//! - `session`: the acting user and open entry
//! - `autosave`: debounced background saving of an open entry
//! - `storage`: SQLite handle, schema and errors
//! - `config`: application configuration

pub mod autosave;
pub mod cascade;
pub mod config;
pub mod models;
mod rows;
pub mod search;
pub mod session;
pub mod storage;
pub mod store;
pub mod tags;

pub use autosave::{
    spawn_autosave, AutoSaveConfig, AutoSaveError, AutoSaveEvent, AutoSaveHandle, Edit,
    SaveReport, SaveState, SaveTrigger,
};
pub use cascade::CascadeReport;
pub use config::Config;
pub use models::{Block, BlockKind, EntryAggregate, JournalEntry, Tag, ToDoItem, ToggleBlock, User};
pub use session::Session;
pub use storage::{DataQualityWarning, Database, StorageError, StorageResult, WriteOutcome};
pub use store::{AggregateSave, EntryWrite, Store, UserDeletion};
