//! Storage layer
//!
//! SQLite persistence for users, journal entries and their blocks.
//!
//! ## Layout
//!
//! - `database`: the owned connection handle (open, health check, reconnect)
//! - `schema`: table definitions and version tracking
//! - `timestamp`: text encoding of date/time columns
//! - `error`: storage errors, write outcomes and data-quality warnings

pub mod database;
pub mod error;
pub mod schema;
pub mod timestamp;

pub use database::Database;
pub use error::{DataQualityWarning, StorageError, StorageResult, WriteOutcome};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
