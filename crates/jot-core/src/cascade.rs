//! Cascade delete
//!
//! Removes an entry's child rows before the entry row itself, so no block
//! outlives its entry and databases that enforce foreign keys never see a
//! dangling reference.

use rusqlite::{params, Transaction};
use serde::Serialize;
use tracing::debug;

use crate::storage::StorageResult;

/// What a cascading delete removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub todos_removed: usize,
    pub toggles_removed: usize,
    pub entry_removed: bool,
}

impl CascadeReport {
    /// Whether nothing at all matched
    pub fn is_noop(&self) -> bool {
        !self.entry_removed && self.todos_removed == 0 && self.toggles_removed == 0
    }
}

/// Delete every block that references `entry_id`
///
/// Todo items go first, then toggle blocks. The entry row is left in place;
/// see [`delete_entry_cascade`].
pub fn delete_children(tx: &Transaction, entry_id: i64) -> StorageResult<CascadeReport> {
    let todos_removed = tx.execute(
        "DELETE FROM todo_items WHERE entry_id = ?",
        params![entry_id],
    )?;
    let toggles_removed = tx.execute(
        "DELETE FROM toggle_blocks WHERE entry_id = ?",
        params![entry_id],
    )?;

    Ok(CascadeReport {
        todos_removed,
        toggles_removed,
        entry_removed: false,
    })
}

/// Delete an entry and everything it owns, children first
///
/// Runs inside the caller's transaction; commit is left to the caller.
pub fn delete_entry_cascade(tx: &Transaction, entry_id: i64) -> StorageResult<CascadeReport> {
    let mut report = delete_children(tx, entry_id)?;
    let removed = tx.execute(
        "DELETE FROM journal_entries WHERE entry_id = ?",
        params![entry_id],
    )?;
    report.entry_removed = removed > 0;

    debug!(
        entry_id,
        todos = report.todos_removed,
        toggles = report.toggles_removed,
        entry = report.entry_removed,
        "cascade delete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn seed(db: &Database) {
        let conn = db.connection();
        conn.execute_batch(
            r#"
            INSERT INTO users (user_id, username, password) VALUES ('u1', 'ada', 'x');
            INSERT INTO journal_entries (entry_id, user_id, title) VALUES (1, 'u1', 'one');
            INSERT INTO journal_entries (entry_id, user_id, title) VALUES (2, 'u1', 'two');
            INSERT INTO todo_items (entry_id, description, is_done) VALUES (1, 'a', 0);
            INSERT INTO todo_items (entry_id, description, is_done) VALUES (1, 'b', 1);
            INSERT INTO todo_items (entry_id, description, is_done) VALUES (2, 'keep', 0);
            INSERT INTO toggle_blocks (entry_id, title, content, is_expanded) VALUES (1, 't', 'c', 0);
            "#,
        )
        .unwrap();
    }

    fn count(db: &Database, sql: &str) -> i64 {
        db.connection().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_cascade_removes_children_then_entry() {
        let mut db = Database::open_in_memory().unwrap();
        seed(&db);

        let tx = db.connection_mut().transaction().unwrap();
        let report = delete_entry_cascade(&tx, 1).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            report,
            CascadeReport {
                todos_removed: 2,
                toggles_removed: 1,
                entry_removed: true,
            }
        );
        assert_eq!(count(&db, "SELECT COUNT(*) FROM todo_items WHERE entry_id = 1"), 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM toggle_blocks WHERE entry_id = 1"), 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM journal_entries WHERE entry_id = 1"), 0);

        // Sibling entry untouched
        assert_eq!(count(&db, "SELECT COUNT(*) FROM todo_items WHERE entry_id = 2"), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM journal_entries"), 1);
    }

    #[test]
    fn test_cascade_with_foreign_keys_enforced() {
        let mut db = Database::open_in_memory().unwrap();
        seed(&db);
        db.set_foreign_keys(true).unwrap();

        let tx = db.connection_mut().transaction().unwrap();
        let report = delete_entry_cascade(&tx, 1).unwrap();
        tx.commit().unwrap();

        assert!(report.entry_removed);
    }

    #[test]
    fn test_cascade_on_missing_entry_is_noop() {
        let mut db = Database::open_in_memory().unwrap();
        seed(&db);

        let tx = db.connection_mut().transaction().unwrap();
        let report = delete_entry_cascade(&tx, 999).unwrap();
        tx.commit().unwrap();

        assert!(report.is_noop());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM journal_entries"), 2);
    }

    #[test]
    fn test_delete_children_keeps_entry_row() {
        let mut db = Database::open_in_memory().unwrap();
        seed(&db);

        let tx = db.connection_mut().transaction().unwrap();
        let report = delete_children(&tx, 1).unwrap();
        tx.commit().unwrap();

        assert!(!report.entry_removed);
        assert_eq!(report.todos_removed, 2);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM journal_entries WHERE entry_id = 1"), 1);
    }
}
