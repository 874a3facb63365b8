//! Data models for jot
//!
//! Defines the journal aggregate: entries, the checklist and toggle blocks
//! they own, inline colored tags, and the users entries belong to.
//!
//! Entries and blocks use store-assigned integer ids. An id of `0` marks an
//! object that has not been persisted yet.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tags;

/// Id carried by entries and blocks that have never been written
pub const UNSAVED_ID: i64 = 0;

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Stable identifier (UUID), used as the foreign key of entries
    pub id: String,
    /// Unique user name
    pub name: String,
    /// Opaque credential, never serialized for output
    #[serde(skip_serializing, default)]
    pub credential: String,
}

impl User {
    /// Create a new user with a freshly generated id
    pub fn new(name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            credential: credential.into(),
        }
    }
}

/// A journal entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    /// Store-assigned id, `0` until first persisted
    pub id: i64,
    /// Owning user
    pub user_id: String,
    pub title: String,
    /// Free text body
    pub content: String,
    /// Inline tags, in display order
    pub tags: Vec<Tag>,
    /// Set once at first persistence
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every update
    pub modified_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Create a new, unsaved entry for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNSAVED_ID,
            user_id: user_id.into(),
            title: String::new(),
            content: String::new(),
            tags: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Create a new, unsaved entry with a title
    pub fn with_title(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let mut entry = Self::new(user_id);
        entry.title = title.into();
        entry
    }

    /// Whether the store has assigned this entry an id
    pub fn is_persisted(&self) -> bool {
        self.id > UNSAVED_ID
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.modified_at = Utc::now();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.modified_at = Utc::now();
    }

    /// Append a line to the body
    pub fn append_line(&mut self, line: &str) {
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(line);
        self.modified_at = Utc::now();
    }

    /// Add a tag; returns false if a tag with the same name is already present
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.modified_at = Utc::now();
        true
    }

    /// Remove a tag by name; returns false if no such tag exists
    pub fn remove_tag(&mut self, name: &str) -> bool {
        match self.tags.iter().position(|t| t.name == name) {
            Some(pos) => {
                self.tags.remove(pos);
                self.modified_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// The tag list in its persisted form
    pub fn encoded_tags(&self) -> String {
        tags::encode(&self.tags)
    }
}

/// A checklist item inside an entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToDoItem {
    /// Store-assigned id, `0` until first persisted
    pub id: i64,
    /// Owning entry
    pub entry_id: i64,
    pub description: String,
    pub is_done: bool,
}

impl ToDoItem {
    pub fn new(entry_id: i64, description: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            entry_id,
            description: description.into(),
            is_done: false,
        }
    }
}

/// A collapsible section inside an entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToggleBlock {
    /// Store-assigned id, `0` until first persisted
    pub id: i64,
    /// Owning entry
    pub entry_id: i64,
    pub title: String,
    pub content: String,
    pub is_expanded: bool,
}

impl ToggleBlock {
    /// Create a collapsed toggle block
    pub fn new(entry_id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            entry_id,
            title: title.into(),
            content: content.into(),
            is_expanded: false,
        }
    }
}

/// Discriminator for [`Block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Todo,
    Toggle,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Todo => "todo",
            BlockKind::Toggle => "toggle",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(BlockKind::Todo),
            "toggle" => Ok(BlockKind::Toggle),
            other => Err(format!("unknown block kind: {}", other)),
        }
    }
}

/// A content block owned by an entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Todo(ToDoItem),
    Toggle(ToggleBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Todo(_) => BlockKind::Todo,
            Block::Toggle(_) => BlockKind::Toggle,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Block::Todo(item) => item.id,
            Block::Toggle(toggle) => toggle.id,
        }
    }

    pub fn entry_id(&self) -> i64 {
        match self {
            Block::Todo(item) => item.entry_id,
            Block::Toggle(toggle) => toggle.entry_id,
        }
    }

    /// Point the block at its owning entry
    pub fn set_entry_id(&mut self, entry_id: i64) {
        match self {
            Block::Todo(item) => item.entry_id = entry_id,
            Block::Toggle(toggle) => toggle.entry_id = entry_id,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id() > UNSAVED_ID
    }
}

impl From<ToDoItem> for Block {
    fn from(item: ToDoItem) -> Self {
        Block::Todo(item)
    }
}

impl From<ToggleBlock> for Block {
    fn from(toggle: ToggleBlock) -> Self {
        Block::Toggle(toggle)
    }
}

/// An entry together with the blocks it owns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryAggregate {
    pub entry: JournalEntry,
    pub blocks: Vec<Block>,
}

impl EntryAggregate {
    pub fn new(entry: JournalEntry) -> Self {
        Self {
            entry,
            blocks: Vec::new(),
        }
    }

    /// Add a block, pointing it at this entry
    pub fn push_block(&mut self, block: impl Into<Block>) {
        let mut block = block.into();
        block.set_entry_id(self.entry.id);
        self.blocks.push(block);
    }

    pub fn todos(&self) -> impl Iterator<Item = &ToDoItem> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Todo(item) => Some(item),
            Block::Toggle(_) => None,
        })
    }

    pub fn toggles(&self) -> impl Iterator<Item = &ToggleBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Toggle(toggle) => Some(toggle),
            Block::Todo(_) => None,
        })
    }

    /// The `index`-th checklist item, counting only todos
    pub fn todo_mut(&mut self, index: usize) -> Option<&mut ToDoItem> {
        self.blocks
            .iter_mut()
            .filter_map(|b| match b {
                Block::Todo(item) => Some(item),
                Block::Toggle(_) => None,
            })
            .nth(index)
    }

    /// The `index`-th toggle block, counting only toggles
    pub fn toggle_mut(&mut self, index: usize) -> Option<&mut ToggleBlock> {
        self.blocks
            .iter_mut()
            .filter_map(|b| match b {
                Block::Toggle(toggle) => Some(toggle),
                Block::Todo(_) => None,
            })
            .nth(index)
    }
}

/// An inline tag with a display color
///
/// Tags are identified by name only: two tags with the same name and
/// different colors are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// Color token, usually a hex string such as `#5599ff`
    pub color: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.color)
    }
}
