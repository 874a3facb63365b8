//! Keyword search
//!
//! Case-sensitive substring match over an entry's title, body and encoded
//! tag string, scoped to one user. SQLite's `LIKE` folds ASCII case, so the
//! match uses `instr` instead.
//!
//! An empty keyword is not special-cased: it matches every entry. Callers
//! that want "no query means everything, newest first" should use
//! [`Store::list_entries_for_user`](crate::Store::list_entries_for_user).

use rusqlite::{params, Connection};

use crate::models::JournalEntry;
use crate::rows::{query_entries, ENTRY_COLUMNS};
use crate::storage::{DataQualityWarning, StorageResult};

/// Find a user's entries containing `keyword`
///
/// Results come back in entry id order.
pub fn search(conn: &Connection, user_id: &str, keyword: &str) -> StorageResult<Vec<JournalEntry>> {
    let mut warnings = Vec::new();
    search_collecting(conn, user_id, keyword, &mut warnings)
}

pub(crate) fn search_collecting(
    conn: &Connection,
    user_id: &str,
    keyword: &str,
    warnings: &mut Vec<DataQualityWarning>,
) -> StorageResult<Vec<JournalEntry>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM journal_entries
        WHERE user_id = ?1
          AND (instr(COALESCE(title, ''), ?2) > 0
               OR instr(COALESCE(content, ''), ?2) > 0
               OR instr(COALESCE(tags, ''), ?2) > 0)
        ORDER BY entry_id
        "#,
        ENTRY_COLUMNS
    );
    query_entries(conn, &sql, params![user_id, keyword], warnings)
}
