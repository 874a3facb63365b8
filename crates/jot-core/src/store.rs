//! Document store
//!
//! The `Store` is the durable home of journal entries, their checklist and
//! toggle blocks, and the users that own them. It assigns ids, stamps
//! modification times, and routes entry deletion through the cascade.
//!
//! ## Identity
//!
//! Entries and blocks carry `id == 0` until inserted. Inserts assign a
//! permanent positive id and write it back into the caller's value; updates
//! are keyed by that id. Inserting a persisted value or updating an unsaved
//! one is rejected.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::new(Database::open(config.database_path())?);
//!
//! let mut entry = JournalEntry::with_title(&user.id, "Trip to Japan");
//! store.create_entry(&mut entry)?;
//!
//! let recent = store.list_entries_for_user(&user.id)?;
//! ```

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cascade::{self, CascadeReport};
use crate::config::Config;
use crate::models::{Block, EntryAggregate, JournalEntry, ToDoItem, ToggleBlock, User};
use crate::rows::{query_entries, EntryRow, ENTRY_COLUMNS};
use crate::search;
use crate::storage::{
    timestamp, DataQualityWarning, Database, StorageError, StorageResult, WriteOutcome,
};

/// Durable storage for journal entries and their blocks
pub struct Store {
    db: Database,
    warnings: Vec<DataQualityWarning>,
}

impl Store {
    /// Create a store over an open database handle
    pub fn new(db: Database) -> Self {
        Self {
            db,
            warnings: Vec::new(),
        }
    }

    /// Open the store at the configured database path
    pub fn open_with_config(config: &Config) -> StorageResult<Self> {
        Ok(Self::new(Database::open(config.database_path())?))
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Get the underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Whether the connection still answers queries
    pub fn is_healthy(&self) -> bool {
        self.db.is_healthy()
    }

    /// Reopen the database connection
    pub fn reconnect(&mut self) -> StorageResult<()> {
        self.db.reconnect()
    }

    /// Reopen the connection if it stopped answering
    ///
    /// Fails with [`StorageError::Unhealthy`] when the reopened connection
    /// still does not answer.
    pub fn ensure_connected(&mut self) -> StorageResult<()> {
        if let Err(e) = self.db.ensure_healthy() {
            warn!("{}; reconnecting", e);
            self.db.reconnect()?;
        }
        Ok(())
    }

    /// Data-quality warnings collected by reads since the last call
    pub fn take_warnings(&mut self) -> Vec<DataQualityWarning> {
        std::mem::take(&mut self.warnings)
    }

    // ==================== Users ====================

    /// Register a new user with a generated id
    pub fn create_user(&mut self, name: &str, credential: &str) -> StorageResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::MissingField("username"));
        }
        if self.username_exists(name)? {
            return Err(StorageError::UsernameTaken(name.to_string()));
        }

        let user = User::new(name, credential);
        self.db.connection().execute(
            "INSERT INTO users (user_id, username, password) VALUES (?, ?, ?)",
            params![user.id, user.name, user.credential],
        )?;

        info!(user_id = %user.id, "registered user {}", user.name);
        Ok(user)
    }

    /// Get a user by id
    pub fn get_user(&self, user_id: &str) -> StorageResult<Option<User>> {
        let user = self
            .db
            .connection()
            .query_row(
                "SELECT user_id, username, password FROM users WHERE user_id = ?",
                params![user_id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by name
    pub fn find_user_by_name(&self, name: &str) -> StorageResult<Option<User>> {
        let user = self
            .db
            .connection()
            .query_row(
                "SELECT user_id, username, password FROM users WHERE username = ?",
                params![name],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Check whether a user name is taken
    pub fn username_exists(&self, name: &str) -> StorageResult<bool> {
        let exists = self
            .db
            .connection()
            .prepare("SELECT 1 FROM users WHERE username = ?")?
            .exists(params![name])?;
        Ok(exists)
    }

    /// Rename a user or change its credential
    ///
    /// The new name must not belong to another user. An id with no row is
    /// reported as [`WriteOutcome::NoRowsAffected`].
    pub fn update_user(&mut self, user: &User) -> StorageResult<WriteOutcome> {
        let name = user.name.trim();
        if name.is_empty() {
            return Err(StorageError::MissingField("username"));
        }
        let taken = self
            .db
            .connection()
            .prepare("SELECT 1 FROM users WHERE username = ? AND user_id != ?")?
            .exists(params![name, user.id])?;
        if taken {
            return Err(StorageError::UsernameTaken(name.to_string()));
        }

        let rows = self.db.connection().execute(
            "UPDATE users SET username = ?, password = ? WHERE user_id = ?",
            params![name, user.credential, user.id],
        )?;

        let outcome = WriteOutcome::from_rows(rows);
        if outcome.is_noop() {
            warn!(user_id = %user.id, "No rows updated for user");
        } else {
            info!(user_id = %user.id, "updated user {}", name);
        }
        Ok(outcome)
    }

    /// Delete a user together with every entry it owns
    ///
    /// Each entry goes through the cascade, so no block or entry outlives its
    /// owner. Everything happens in one transaction.
    pub fn delete_user(&mut self, user_id: &str) -> StorageResult<UserDeletion> {
        let tx = self.db.connection_mut().transaction()?;

        let entry_ids = {
            let mut stmt = tx.prepare("SELECT entry_id FROM journal_entries WHERE user_id = ?")?;
            let ids = stmt
                .query_map(params![user_id], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let mut deletion = UserDeletion::default();
        for entry_id in entry_ids {
            let report = cascade::delete_entry_cascade(&tx, entry_id)?;
            if report.entry_removed {
                deletion.entries_removed += 1;
            }
            deletion.blocks_removed += report.todos_removed + report.toggles_removed;
        }
        deletion.user_removed =
            tx.execute("DELETE FROM users WHERE user_id = ?", params![user_id])? > 0;
        tx.commit()?;

        info!(
            user_id,
            entries = deletion.entries_removed,
            removed = deletion.user_removed,
            "deleted user"
        );
        Ok(deletion)
    }

    // ==================== Entries ====================

    /// Insert a new entry, assigning its id
    ///
    /// `created_at` and `modified_at` are stored as given.
    pub fn create_entry(&mut self, entry: &mut JournalEntry) -> StorageResult<i64> {
        if entry.is_persisted() {
            return Err(StorageError::AlreadyPersisted {
                kind: "entry",
                id: entry.id,
            });
        }
        if entry.user_id.trim().is_empty() {
            return Err(StorageError::MissingField("user_id"));
        }

        let conn = self.db.connection();
        conn.execute(
            r#"
            INSERT INTO journal_entries (user_id, title, content, date_created, date_modified, tags)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.user_id,
                entry.title,
                entry.content,
                timestamp::encode(&entry.created_at),
                timestamp::encode(&entry.modified_at),
                entry.encoded_tags(),
            ],
        )?;

        entry.id = conn.last_insert_rowid();
        debug!(entry_id = entry.id, "created entry");
        Ok(entry.id)
    }

    /// Get an entry by id
    pub fn get_entry(&mut self, id: i64) -> StorageResult<Option<JournalEntry>> {
        let row = self
            .db
            .connection()
            .query_row(
                &format!("SELECT {} FROM journal_entries WHERE entry_id = ?", ENTRY_COLUMNS),
                params![id],
                EntryRow::from_row,
            )
            .optional()?;

        Ok(row.map(|row| row.into_entry(&mut self.warnings)))
    }

    /// Get a user's entries, most recently modified first
    pub fn list_entries_for_user(&mut self, user_id: &str) -> StorageResult<Vec<JournalEntry>> {
        query_entries(
            self.db.connection(),
            &format!(
                "SELECT {} FROM journal_entries WHERE user_id = ? ORDER BY date_modified DESC, entry_id DESC",
                ENTRY_COLUMNS
            ),
            params![user_id],
            &mut self.warnings,
        )
    }

    /// Update an entry's title, body and tags
    ///
    /// The store owns `modified_at`: it is stamped with the current time and
    /// the stamped value is written back into `entry`. An id with no row is
    /// reported as [`WriteOutcome::NoRowsAffected`], never inserted.
    pub fn update_entry(&mut self, entry: &mut JournalEntry) -> StorageResult<WriteOutcome> {
        if !entry.is_persisted() {
            return Err(StorageError::NotPersisted { kind: "entry" });
        }

        let now = Utc::now();
        let rows = self.db.connection().execute(
            r#"
            UPDATE journal_entries
            SET title = ?, content = ?, date_modified = ?, tags = ?
            WHERE entry_id = ?
            "#,
            params![
                entry.title,
                entry.content,
                timestamp::encode(&now),
                entry.encoded_tags(),
                entry.id,
            ],
        )?;

        let outcome = WriteOutcome::from_rows(rows);
        if outcome.is_noop() {
            warn!(entry_id = entry.id, "No rows updated for entry");
        } else {
            entry.modified_at = now;
            debug!(entry_id = entry.id, "updated entry");
        }
        Ok(outcome)
    }

    /// Delete an entry and all of its blocks
    ///
    /// Deleting an id that does not exist succeeds and reports nothing removed.
    pub fn delete_entry(&mut self, id: i64) -> StorageResult<CascadeReport> {
        let tx = self.db.connection_mut().transaction()?;
        let report = cascade::delete_entry_cascade(&tx, id)?;
        tx.commit()?;

        if report.entry_removed {
            info!(entry_id = id, "deleted entry");
        } else {
            debug!(entry_id = id, "delete of missing entry ignored");
        }
        Ok(report)
    }

    /// Find a user's entries whose title, body or tags contain `keyword`
    pub fn search_entries(
        &mut self,
        user_id: &str,
        keyword: &str,
    ) -> StorageResult<Vec<JournalEntry>> {
        search::search_collecting(self.db.connection(), user_id, keyword, &mut self.warnings)
    }

    /// Number of entries owned by a user
    pub fn entry_count_for_user(&self, user_id: &str) -> StorageResult<i64> {
        Ok(self.db.connection().query_row(
            "SELECT COUNT(*) FROM journal_entries WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    // ==================== To-do items ====================

    /// Insert a checklist item, assigning its id
    pub fn add_todo(&mut self, item: &mut ToDoItem) -> StorageResult<i64> {
        if item.id != 0 {
            return Err(StorageError::AlreadyPersisted {
                kind: "todo item",
                id: item.id,
            });
        }

        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO todo_items (entry_id, description, is_done) VALUES (?, ?, ?)",
            params![item.entry_id, item.description, item.is_done as i64],
        )?;

        item.id = conn.last_insert_rowid();
        debug!(todo_id = item.id, entry_id = item.entry_id, "added todo");
        Ok(item.id)
    }

    /// Update a checklist item by id
    pub fn update_todo(&mut self, item: &ToDoItem) -> StorageResult<WriteOutcome> {
        if item.id == 0 {
            return Err(StorageError::NotPersisted { kind: "todo item" });
        }

        let rows = self.db.connection().execute(
            "UPDATE todo_items SET description = ?, is_done = ? WHERE todo_id = ?",
            params![item.description, item.is_done as i64, item.id],
        )?;

        let outcome = WriteOutcome::from_rows(rows);
        if outcome.is_noop() {
            warn!(todo_id = item.id, "No rows updated for todo item");
        }
        Ok(outcome)
    }

    /// Insert or update depending on whether the item has an id
    pub fn save_todo(&mut self, item: &mut ToDoItem) -> StorageResult<WriteOutcome> {
        if item.id == 0 {
            self.add_todo(item)?;
            Ok(WriteOutcome::Applied(1))
        } else {
            self.update_todo(item)
        }
    }

    /// Delete a checklist item by id
    pub fn delete_todo(&mut self, todo_id: i64) -> StorageResult<WriteOutcome> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM todo_items WHERE todo_id = ?", params![todo_id])?;
        Ok(WriteOutcome::from_rows(rows))
    }

    /// Get a checklist item by id
    pub fn get_todo(&self, todo_id: i64) -> StorageResult<Option<ToDoItem>> {
        let item = self
            .db
            .connection()
            .query_row(
                "SELECT todo_id, entry_id, description, is_done FROM todo_items WHERE todo_id = ?",
                params![todo_id],
                map_todo,
            )
            .optional()?;
        Ok(item)
    }

    /// Get an entry's checklist items in insertion order
    pub fn list_todos_for_entry(&self, entry_id: i64) -> StorageResult<Vec<ToDoItem>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT todo_id, entry_id, description, is_done FROM todo_items WHERE entry_id = ? ORDER BY todo_id",
        )?;
        let items = stmt
            .query_map(params![entry_id], map_todo)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Number of checklist items referencing an entry
    pub fn todo_count_for_entry(&self, entry_id: i64) -> StorageResult<i64> {
        Ok(self.db.connection().query_row(
            "SELECT COUNT(*) FROM todo_items WHERE entry_id = ?",
            params![entry_id],
            |row| row.get(0),
        )?)
    }

    // ==================== Toggle blocks ====================

    /// Insert a toggle block, assigning its id
    pub fn add_toggle(&mut self, toggle: &mut ToggleBlock) -> StorageResult<i64> {
        if toggle.id != 0 {
            return Err(StorageError::AlreadyPersisted {
                kind: "toggle block",
                id: toggle.id,
            });
        }

        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO toggle_blocks (entry_id, title, content, is_expanded) VALUES (?, ?, ?, ?)",
            params![
                toggle.entry_id,
                toggle.title,
                toggle.content,
                toggle.is_expanded as i64
            ],
        )?;

        toggle.id = conn.last_insert_rowid();
        debug!(toggle_id = toggle.id, entry_id = toggle.entry_id, "added toggle");
        Ok(toggle.id)
    }

    /// Update a toggle block by id
    pub fn update_toggle(&mut self, toggle: &ToggleBlock) -> StorageResult<WriteOutcome> {
        if toggle.id == 0 {
            return Err(StorageError::NotPersisted {
                kind: "toggle block",
            });
        }

        let rows = self.db.connection().execute(
            "UPDATE toggle_blocks SET title = ?, content = ?, is_expanded = ? WHERE toggle_id = ?",
            params![
                toggle.title,
                toggle.content,
                toggle.is_expanded as i64,
                toggle.id
            ],
        )?;

        let outcome = WriteOutcome::from_rows(rows);
        if outcome.is_noop() {
            warn!(toggle_id = toggle.id, "No rows updated for toggle block");
        }
        Ok(outcome)
    }

    /// Insert or update depending on whether the block has an id
    pub fn save_toggle(&mut self, toggle: &mut ToggleBlock) -> StorageResult<WriteOutcome> {
        if toggle.id == 0 {
            self.add_toggle(toggle)?;
            Ok(WriteOutcome::Applied(1))
        } else {
            self.update_toggle(toggle)
        }
    }

    /// Delete a toggle block by id
    pub fn delete_toggle(&mut self, toggle_id: i64) -> StorageResult<WriteOutcome> {
        let rows = self.db.connection().execute(
            "DELETE FROM toggle_blocks WHERE toggle_id = ?",
            params![toggle_id],
        )?;
        Ok(WriteOutcome::from_rows(rows))
    }

    /// Get a toggle block by id
    pub fn get_toggle(&self, toggle_id: i64) -> StorageResult<Option<ToggleBlock>> {
        let toggle = self
            .db
            .connection()
            .query_row(
                "SELECT toggle_id, entry_id, title, content, is_expanded FROM toggle_blocks WHERE toggle_id = ?",
                params![toggle_id],
                map_toggle,
            )
            .optional()?;
        Ok(toggle)
    }

    /// Get an entry's toggle blocks in insertion order
    pub fn list_toggles_for_entry(&self, entry_id: i64) -> StorageResult<Vec<ToggleBlock>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT toggle_id, entry_id, title, content, is_expanded FROM toggle_blocks WHERE entry_id = ? ORDER BY toggle_id",
        )?;
        let toggles = stmt
            .query_map(params![entry_id], map_toggle)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(toggles)
    }

    /// Number of toggle blocks referencing an entry
    pub fn toggle_count_for_entry(&self, entry_id: i64) -> StorageResult<i64> {
        Ok(self.db.connection().query_row(
            "SELECT COUNT(*) FROM toggle_blocks WHERE entry_id = ?",
            params![entry_id],
            |row| row.get(0),
        )?)
    }

    // ==================== Blocks and aggregates ====================

    /// Insert or update a block of either kind
    pub fn save_block(&mut self, block: &mut Block) -> StorageResult<WriteOutcome> {
        match block {
            Block::Todo(item) => self.save_todo(item),
            Block::Toggle(toggle) => self.save_toggle(toggle),
        }
    }

    /// Delete a block of either kind
    pub fn delete_block(&mut self, block: &Block) -> StorageResult<WriteOutcome> {
        match block {
            Block::Todo(item) => self.delete_todo(item.id),
            Block::Toggle(toggle) => self.delete_toggle(toggle.id),
        }
    }

    /// Load an entry with its todos followed by its toggle blocks
    pub fn load_aggregate(&mut self, id: i64) -> StorageResult<Option<EntryAggregate>> {
        let Some(entry) = self.get_entry(id)? else {
            return Ok(None);
        };

        let mut aggregate = EntryAggregate::new(entry);
        for item in self.list_todos_for_entry(id)? {
            aggregate.blocks.push(Block::Todo(item));
        }
        for toggle in self.list_toggles_for_entry(id)? {
            aggregate.blocks.push(Block::Toggle(toggle));
        }
        Ok(Some(aggregate))
    }

    /// Persist an entry and every block it owns
    ///
    /// An unsaved entry is inserted first so its new id can be handed to the
    /// blocks; a persisted one is updated. Each block is then inserted or
    /// updated according to its own id. If the entry row has disappeared the
    /// result carries `Updated(NoRowsAffected)` and no block is touched.
    pub fn save_aggregate(&mut self, aggregate: &mut EntryAggregate) -> StorageResult<AggregateSave> {
        let entry_write = if aggregate.entry.is_persisted() {
            EntryWrite::Updated(self.update_entry(&mut aggregate.entry)?)
        } else {
            self.create_entry(&mut aggregate.entry)?;
            EntryWrite::Created
        };

        let entry_id = aggregate.entry.id;
        let mut result = AggregateSave {
            entry_id,
            entry_write,
            blocks_created: 0,
            blocks_updated: 0,
        };

        // The entry row is gone; writing blocks now would orphan them
        if entry_write.is_noop() {
            warn!(entry_id, "entry no longer exists, blocks not written");
            return Ok(result);
        }

        for block in &mut aggregate.blocks {
            block.set_entry_id(entry_id);
            let existed = block.is_persisted();
            self.save_block(block)?;
            if existed {
                result.blocks_updated += 1;
            } else {
                result.blocks_created += 1;
            }
        }

        debug!(
            entry_id,
            created = result.blocks_created,
            updated = result.blocks_updated,
            "saved aggregate"
        );
        Ok(result)
    }
}

/// How the entry row of an aggregate was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryWrite {
    Created,
    Updated(WriteOutcome),
}

impl EntryWrite {
    /// Whether an update matched no entry row
    pub fn is_noop(&self) -> bool {
        matches!(self, EntryWrite::Updated(outcome) if outcome.is_noop())
    }
}

/// What [`Store::delete_user`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserDeletion {
    pub user_removed: bool,
    pub entries_removed: usize,
    pub blocks_removed: usize,
}

/// Result of [`Store::save_aggregate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateSave {
    pub entry_id: i64,
    pub entry_write: EntryWrite,
    pub blocks_created: usize,
    pub blocks_updated: usize,
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        credential: row.get(2)?,
    })
}

fn map_todo(row: &rusqlite::Row) -> rusqlite::Result<ToDoItem> {
    Ok(ToDoItem {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        is_done: row.get::<_, Option<i64>>(3)?.unwrap_or(0) == 1,
    })
}

fn map_toggle(row: &rusqlite::Row) -> rusqlite::Result<ToggleBlock> {
    Ok(ToggleBlock {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        is_expanded: row.get::<_, Option<i64>>(4)?.unwrap_or(0) == 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;
    use tempfile::TempDir;

    fn store_with_user() -> (Store, User) {
        let mut store = Store::open_in_memory().unwrap();
        let user = store.create_user("ada", "pw").unwrap();
        (store, user)
    }

    #[test]
    fn test_create_entry_assigns_positive_id() {
        let (mut store, user) = store_with_user();

        let mut first = JournalEntry::with_title(&user.id, "Same");
        let mut second = JournalEntry::with_title(&user.id, "Same");

        let id1 = store.create_entry(&mut first).unwrap();
        let id2 = store.create_entry(&mut second).unwrap();

        assert!(id1 > 0);
        assert!(id2 > 0);
        assert_ne!(id1, id2);
        assert_eq!(first.id, id1);
        assert!(first.is_persisted());
    }

    #[test]
    fn test_create_entry_rejects_persisted() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::new(&user.id);
        store.create_entry(&mut entry).unwrap();

        let err = store.create_entry(&mut entry).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyPersisted { .. }));
    }

    #[test]
    fn test_create_entry_requires_user_id() {
        let mut store = Store::open_in_memory().unwrap();
        let mut entry = JournalEntry::new("");

        let err = store.create_entry(&mut entry).unwrap_err();
        assert!(matches!(err, StorageError::MissingField("user_id")));
        assert_eq!(entry.id, 0);
    }

    #[test]
    fn test_get_entry_round_trips_fields() {
        let (mut store, user) = store_with_user();

        let mut entry = JournalEntry::with_title(&user.id, "Trip to Japan");
        entry.set_content("Kyoto\nOsaka");
        entry.add_tag(Tag::new("travel", "#ff5555"));
        entry.add_tag(Tag::new("2024", "#999999"));
        store.create_entry(&mut entry).unwrap();

        let loaded = store.get_entry(entry.id).unwrap().unwrap();
        assert_eq!(loaded, entry);
        assert_eq!(loaded.tags[0].color, "#ff5555");
        assert_eq!(loaded.created_at, entry.created_at);
        assert!(store.take_warnings().is_empty());
    }

    #[test]
    fn test_get_entry_not_found() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store.get_entry(12345).unwrap().is_none());
    }

    #[test]
    fn test_list_entries_most_recent_first() {
        let (mut store, user) = store_with_user();

        let mut a = JournalEntry::with_title(&user.id, "a");
        let mut b = JournalEntry::with_title(&user.id, "b");
        let mut c = JournalEntry::with_title(&user.id, "c");
        store.create_entry(&mut a).unwrap();
        store.create_entry(&mut b).unwrap();
        store.create_entry(&mut c).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        a.set_content("touched");
        store.update_entry(&mut a).unwrap();

        let titles: Vec<_> = store
            .list_entries_for_user(&user.id)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles[0], "a");
        assert_eq!(titles.len(), 3);
    }

    #[test]
    fn test_list_entries_empty_for_unknown_user() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store.list_entries_for_user("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_update_entry_stamps_modified_at() {
        let (mut store, user) = store_with_user();

        let mut entry = JournalEntry::with_title(&user.id, "Draft");
        store.create_entry(&mut entry).unwrap();
        let created_at = entry.created_at;

        // A caller-supplied modification time is ignored
        let stale = chrono::DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        entry.title = "Final".to_string();
        entry.modified_at = stale;

        let outcome = store.update_entry(&mut entry).unwrap();
        assert_eq!(outcome, WriteOutcome::Applied(1));
        assert!(entry.modified_at > stale);

        let loaded = store.get_entry(entry.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Final");
        assert_eq!(loaded.modified_at, entry.modified_at);
        assert_eq!(loaded.created_at, created_at);
    }

    #[test]
    fn test_update_missing_entry_reports_no_rows() {
        let (mut store, user) = store_with_user();

        let mut ghost = JournalEntry::with_title(&user.id, "ghost");
        ghost.id = 999;

        let outcome = store.update_entry(&mut ghost).unwrap();
        assert_eq!(outcome, WriteOutcome::NoRowsAffected);
        assert_eq!(store.entry_count_for_user(&user.id).unwrap(), 0);
        assert!(store.get_entry(999).unwrap().is_none());
    }

    #[test]
    fn test_update_unsaved_entry_is_rejected() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::new(&user.id);

        let err = store.update_entry(&mut entry).unwrap_err();
        assert!(matches!(err, StorageError::NotPersisted { .. }));
    }

    #[test]
    fn test_delete_entry_cascades_blocks() {
        let (mut store, user) = store_with_user();

        let mut entry = JournalEntry::with_title(&user.id, "Packed");
        store.create_entry(&mut entry).unwrap();
        for i in 0..3 {
            store
                .add_todo(&mut ToDoItem::new(entry.id, format!("todo {}", i)))
                .unwrap();
        }
        for i in 0..2 {
            store
                .add_toggle(&mut ToggleBlock::new(entry.id, format!("t{}", i), "body"))
                .unwrap();
        }

        let report = store.delete_entry(entry.id).unwrap();
        assert_eq!(report.todos_removed, 3);
        assert_eq!(report.toggles_removed, 2);
        assert!(report.entry_removed);

        assert_eq!(store.todo_count_for_entry(entry.id).unwrap(), 0);
        assert_eq!(store.toggle_count_for_entry(entry.id).unwrap(), 0);
        assert!(store.get_entry(entry.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_entry_is_idempotent() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::new(&user.id);
        store.create_entry(&mut entry).unwrap();

        store.delete_entry(entry.id).unwrap();
        let again = store.delete_entry(entry.id).unwrap();
        assert!(again.is_noop());
    }

    #[test]
    fn test_search_entries_delegates() {
        let (mut store, user) = store_with_user();

        let mut trip = JournalEntry::with_title(&user.id, "Trip to Japan");
        trip.add_tag(Tag::new("travel", "red"));
        store.create_entry(&mut trip).unwrap();
        store
            .create_entry(&mut JournalEntry::with_title(&user.id, "Grocery list"))
            .unwrap();

        let by_title = store.search_entries(&user.id, "Japan").unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, trip.id);

        let by_tag = store.search_entries(&user.id, "travel").unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, trip.id);

        assert!(store.search_entries(&user.id, "zzz").unwrap().is_empty());
    }

    #[test]
    fn test_todo_crud() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::new(&user.id);
        store.create_entry(&mut entry).unwrap();

        let mut item = ToDoItem::new(entry.id, "buy milk");
        store.save_todo(&mut item).unwrap();
        assert!(item.id > 0);

        item.is_done = true;
        assert_eq!(store.save_todo(&mut item).unwrap(), WriteOutcome::Applied(1));

        let loaded = store.get_todo(item.id).unwrap().unwrap();
        assert!(loaded.is_done);
        assert_eq!(store.list_todos_for_entry(entry.id).unwrap(), vec![loaded]);

        assert_eq!(store.delete_todo(item.id).unwrap(), WriteOutcome::Applied(1));
        assert_eq!(store.delete_todo(item.id).unwrap(), WriteOutcome::NoRowsAffected);
        assert!(store.get_todo(item.id).unwrap().is_none());
    }

    #[test]
    fn test_toggle_crud() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::new(&user.id);
        store.create_entry(&mut entry).unwrap();

        let mut toggle = ToggleBlock::new(entry.id, "Details", "hidden");
        store.save_toggle(&mut toggle).unwrap();
        assert!(toggle.id > 0);

        toggle.is_expanded = true;
        toggle.content = "shown".to_string();
        store.save_toggle(&mut toggle).unwrap();

        let loaded = store.get_toggle(toggle.id).unwrap().unwrap();
        assert!(loaded.is_expanded);
        assert_eq!(loaded.content, "shown");

        let mut ghost = ToggleBlock::new(entry.id, "x", "y");
        ghost.id = 4242;
        assert_eq!(
            store.update_toggle(&ghost).unwrap(),
            WriteOutcome::NoRowsAffected
        );

        store.delete_toggle(toggle.id).unwrap();
        assert!(store.list_toggles_for_entry(entry.id).unwrap().is_empty());
    }

    #[test]
    fn test_block_insert_with_id_is_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        let mut item = ToDoItem::new(1, "x");
        item.id = 5;
        assert!(matches!(
            store.add_todo(&mut item),
            Err(StorageError::AlreadyPersisted { .. })
        ));
        assert!(matches!(
            store.update_todo(&ToDoItem::new(1, "y")),
            Err(StorageError::NotPersisted { .. })
        ));
    }

    #[test]
    fn test_save_block_dispatches_on_kind() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::new(&user.id);
        store.create_entry(&mut entry).unwrap();

        let mut blocks: Vec<Block> = vec![
            ToDoItem::new(entry.id, "a").into(),
            ToggleBlock::new(entry.id, "b", "c").into(),
        ];
        for block in &mut blocks {
            store.save_block(block).unwrap();
        }

        assert!(blocks.iter().all(|b| b.is_persisted()));
        assert_eq!(store.todo_count_for_entry(entry.id).unwrap(), 1);
        assert_eq!(store.toggle_count_for_entry(entry.id).unwrap(), 1);

        store.delete_block(&blocks[1]).unwrap();
        assert_eq!(store.toggle_count_for_entry(entry.id).unwrap(), 0);
    }

    #[test]
    fn test_load_aggregate() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::with_title(&user.id, "Agg");
        store.create_entry(&mut entry).unwrap();
        store
            .add_toggle(&mut ToggleBlock::new(entry.id, "t", "c"))
            .unwrap();
        store.add_todo(&mut ToDoItem::new(entry.id, "d")).unwrap();

        let aggregate = store.load_aggregate(entry.id).unwrap().unwrap();
        assert_eq!(aggregate.entry.title, "Agg");
        assert_eq!(aggregate.blocks.len(), 2);
        assert_eq!(aggregate.blocks[0].kind(), crate::models::BlockKind::Todo);

        assert!(store.load_aggregate(9999).unwrap().is_none());
    }

    #[test]
    fn test_save_aggregate_creates_then_updates() {
        let (mut store, user) = store_with_user();

        let mut aggregate = EntryAggregate::new(JournalEntry::with_title(&user.id, "New"));
        aggregate.push_block(ToDoItem::new(0, "first"));
        aggregate.push_block(ToggleBlock::new(0, "More", "text"));

        let created = store.save_aggregate(&mut aggregate).unwrap();
        assert_eq!(created.entry_write, EntryWrite::Created);
        assert_eq!(created.blocks_created, 2);
        assert!(aggregate.entry.is_persisted());
        assert!(aggregate
            .blocks
            .iter()
            .all(|b| b.is_persisted() && b.entry_id() == aggregate.entry.id));

        aggregate.todo_mut(0).unwrap().is_done = true;
        aggregate.push_block(ToDoItem::new(0, "second"));
        let updated = store.save_aggregate(&mut aggregate).unwrap();
        assert_eq!(
            updated.entry_write,
            EntryWrite::Updated(WriteOutcome::Applied(1))
        );
        assert_eq!(updated.blocks_updated, 2);
        assert_eq!(updated.blocks_created, 1);

        let loaded = store.load_aggregate(aggregate.entry.id).unwrap().unwrap();
        assert_eq!(loaded.todos().count(), 2);
        assert!(loaded.todos().next().unwrap().is_done);
        assert_eq!(store.entry_count_for_user(&user.id).unwrap(), 1);
    }

    #[test]
    fn test_unparseable_timestamp_is_lenient() {
        let (mut store, user) = store_with_user();
        store
            .database()
            .connection()
            .execute(
                "INSERT INTO journal_entries (user_id, title, date_created, date_modified, tags) VALUES (?, 'old', 'not a date', '2024-05-01T10:20:30.5', 'a:red,bogus')",
                params![user.id],
            )
            .unwrap();

        let before = Utc::now();
        let entries = store.list_entries_for_user(&user.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].created_at >= before);
        assert_eq!(entries[0].tags, vec![Tag::new("a", "red")]);

        let warnings = store.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::UnparseableTimestamp {
                column: "date_created",
                ..
            }
        )));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::MalformedTag { fragment, .. } if fragment == "bogus")));
        assert!(store.take_warnings().is_empty());
    }

    #[test]
    fn test_users() {
        let mut store = Store::open_in_memory().unwrap();
        let user = store.create_user("grace", "pw").unwrap();

        assert!(store.username_exists("grace").unwrap());
        assert!(!store.username_exists("linus").unwrap());
        assert_eq!(store.get_user(&user.id).unwrap().unwrap().name, "grace");
        assert_eq!(
            store.find_user_by_name("grace").unwrap().unwrap().id,
            user.id
        );
        assert!(store.get_user("missing").unwrap().is_none());

        let err = store.create_user("grace", "other").unwrap_err();
        assert!(matches!(err, StorageError::UsernameTaken(_)));
        assert!(matches!(
            store.create_user("  ", "pw"),
            Err(StorageError::MissingField("username"))
        ));
    }

    #[test]
    fn test_update_user() {
        let mut store = Store::open_in_memory().unwrap();
        let mut user = store.create_user("grace", "pw").unwrap();
        store.create_user("linus", "pw").unwrap();

        user.name = "hopper".to_string();
        user.credential = "new-pw".to_string();
        assert_eq!(store.update_user(&user).unwrap(), WriteOutcome::Applied(1));

        let stored = store.get_user(&user.id).unwrap().unwrap();
        assert_eq!(stored.name, "hopper");
        assert_eq!(stored.credential, "new-pw");
        assert!(!store.username_exists("grace").unwrap());

        // Keeping its own name is fine; taking another user's is not
        assert!(store.update_user(&user).is_ok());
        user.name = "linus".to_string();
        assert!(matches!(
            store.update_user(&user),
            Err(StorageError::UsernameTaken(_))
        ));

        let ghost = User::new("ghost", "pw");
        assert_eq!(
            store.update_user(&ghost).unwrap(),
            WriteOutcome::NoRowsAffected
        );
    }

    #[test]
    fn test_delete_user_removes_owned_entries() {
        let (mut store, user) = store_with_user();
        let other = store.create_user("linus", "pw").unwrap();

        let mut aggregate = EntryAggregate::new(JournalEntry::with_title(&user.id, "Mine"));
        aggregate.push_block(ToDoItem::new(0, "task"));
        aggregate.push_block(ToggleBlock::new(0, "More", "text"));
        store.save_aggregate(&mut aggregate).unwrap();
        let mut second = JournalEntry::with_title(&user.id, "Also mine");
        store.create_entry(&mut second).unwrap();
        let mut kept = JournalEntry::with_title(&other.id, "Not mine");
        store.create_entry(&mut kept).unwrap();

        let deletion = store.delete_user(&user.id).unwrap();
        assert_eq!(
            deletion,
            UserDeletion {
                user_removed: true,
                entries_removed: 2,
                blocks_removed: 2,
            }
        );
        assert!(store.get_user(&user.id).unwrap().is_none());
        assert_eq!(store.entry_count_for_user(&user.id).unwrap(), 0);
        assert_eq!(store.todo_count_for_entry(aggregate.entry.id).unwrap(), 0);
        assert_eq!(store.toggle_count_for_entry(aggregate.entry.id).unwrap(), 0);
        assert_eq!(store.entry_count_for_user(&other.id).unwrap(), 1);

        let again = store.delete_user(&user.id).unwrap();
        assert_eq!(again, UserDeletion::default());
    }

    #[test]
    fn test_entries_and_blocks_accept_dangling_references() {
        let mut store = Store::open_in_memory().unwrap();

        let mut entry = JournalEntry::with_title("u1", "");
        assert!(store.create_entry(&mut entry).unwrap() > 0);

        let mut item = ToDoItem::new(999, "floating");
        assert!(store.add_todo(&mut item).unwrap() > 0);
        let mut toggle = ToggleBlock::new(999, "floating", "");
        assert!(store.add_toggle(&mut toggle).unwrap() > 0);
    }

    #[test]
    fn test_save_aggregate_of_deleted_entry_writes_no_blocks() {
        let (mut store, user) = store_with_user();

        let mut aggregate = EntryAggregate::new(JournalEntry::with_title(&user.id, "Gone"));
        store.save_aggregate(&mut aggregate).unwrap();
        let id = aggregate.entry.id;
        store.delete_entry(id).unwrap();

        aggregate.push_block(ToDoItem::new(id, "ghost"));
        let result = store.save_aggregate(&mut aggregate).unwrap();

        assert!(result.entry_write.is_noop());
        assert_eq!(result.blocks_created, 0);
        assert_eq!(result.blocks_updated, 0);
        assert_eq!(store.todo_count_for_entry(id).unwrap(), 0);
        assert!(store.get_entry(id).unwrap().is_none());
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("journal.db");

        let (user_id, entry_id) = {
            let mut store = Store::new(Database::open(&path).unwrap());
            let user = store.create_user("ada", "pw").unwrap();
            let mut entry = JournalEntry::with_title(&user.id, "Persistent");
            store.create_entry(&mut entry).unwrap();
            store.add_todo(&mut ToDoItem::new(entry.id, "keep")).unwrap();
            (user.id, entry.id)
        };

        let mut store = Store::new(Database::open(&path).unwrap());
        let entries = store.list_entries_for_user(&user_id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, entry_id);
        assert_eq!(store.list_todos_for_entry(entry_id).unwrap().len(), 1);
    }

    #[test]
    fn test_ensure_connected_keeps_a_live_connection() {
        let (mut store, user) = store_with_user();
        let mut entry = JournalEntry::with_title(&user.id, "Still here");
        store.create_entry(&mut entry).unwrap();

        store.ensure_connected().unwrap();
        assert!(store.get_entry(entry.id).unwrap().is_some());
    }

    #[test]
    fn test_reconnect_restores_health() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(Database::open(temp_dir.path().join("j.db")).unwrap());
        assert!(store.is_healthy());
        store.reconnect().unwrap();
        assert!(store.is_healthy());
    }
}
