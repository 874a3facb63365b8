//! Database handle
//!
//! Owns the single SQLite connection used by a [`Store`](crate::Store).
//! The handle is created explicitly and passed to the store; it can report
//! whether the connection still answers and reopen it on demand.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init};

/// Where the connection points
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite connection with an explicit open / health / reconnect contract
pub struct Database {
    conn: Connection,
    location: Location,
    foreign_keys: bool,
}

impl Database {
    /// Open or create the database file, initializing the schema if needed
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
            }
        }

        let conn = connect(&Location::File(path.clone()), false)?;
        info!("Database opened at {}", path.display());

        Ok(Self {
            conn,
            location: Location::File(path),
            foreign_keys: false,
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = connect(&Location::Memory, false)?;
        Ok(Self {
            conn,
            location: Location::Memory,
            foreign_keys: false,
        })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get a mutable reference to the underlying connection (for transactions)
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Whether the connection still answers a trivial query
    pub fn is_healthy(&self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|v| v == 1)
            .unwrap_or(false)
    }

    /// Check the connection, failing with [`StorageError::Unhealthy`] if it
    /// no longer answers
    pub fn ensure_healthy(&self) -> StorageResult<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| StorageError::Unhealthy(e.to_string()))
    }

    /// Reopen the connection at the same location
    ///
    /// An in-memory database comes back empty. The foreign key mode is
    /// carried over to the new connection.
    pub fn reconnect(&mut self) -> StorageResult<()> {
        if matches!(self.location, Location::Memory) {
            warn!("Reconnecting an in-memory database discards its contents");
        }
        self.conn = connect(&self.location, self.foreign_keys)?;
        self.ensure_healthy()?;
        info!("Database connection reopened");
        Ok(())
    }

    /// Whether SQLite enforces the declared foreign keys on this handle
    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys
    }

    /// Turn SQLite foreign key enforcement on or off
    ///
    /// Enforcement is off by default; block rows are only advisory references.
    pub fn set_foreign_keys(&mut self, enabled: bool) -> StorageResult<()> {
        apply_foreign_keys(&self.conn, enabled)?;
        self.foreign_keys = enabled;
        debug!(enabled, "foreign key enforcement changed");
        Ok(())
    }
}

fn connect(location: &Location, foreign_keys: bool) -> StorageResult<Connection> {
    let conn = match location {
        Location::File(path) => Connection::open(path)?,
        Location::Memory => Connection::open_in_memory()?,
    };

    if needs_init(&conn) {
        init_schema(&conn)?;
        debug!("Schema initialized");
    }

    // Bundled SQLite may be compiled with enforcement on
    apply_foreign_keys(&conn, foreign_keys)?;

    Ok(conn)
}

fn apply_foreign_keys(conn: &Connection, enabled: bool) -> StorageResult<()> {
    conn.pragma_update(None, "foreign_keys", if enabled { "ON" } else { "OFF" })?;
    Ok(())
}
