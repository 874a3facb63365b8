//! Row mapping shared by the store and search
//!
//! Turns `journal_entries` rows into [`JournalEntry`] values, applying the
//! read leniency rules: bad timestamps become "now" and malformed tag
//! fragments are dropped, each leaving a [`DataQualityWarning`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, Row};
use tracing::warn;

use crate::models::JournalEntry;
use crate::storage::{timestamp, DataQualityWarning, StorageResult};
use crate::tags;

/// Column list matching [`EntryRow::from_row`]
pub(crate) const ENTRY_COLUMNS: &str =
    "entry_id, user_id, title, content, date_created, date_modified, tags";

pub(crate) struct EntryRow {
    id: i64,
    user_id: String,
    title: Option<String>,
    content: Option<String>,
    date_created: Option<String>,
    date_modified: Option<String>,
    tags: Option<String>,
}

impl EntryRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            date_created: row.get(4)?,
            date_modified: row.get(5)?,
            tags: row.get(6)?,
        })
    }

    pub(crate) fn into_entry(self, warnings: &mut Vec<DataQualityWarning>) -> JournalEntry {
        let created_at = read_timestamp(self.id, "date_created", self.date_created, warnings);
        let modified_at = read_timestamp(self.id, "date_modified", self.date_modified, warnings);

        let decoded = tags::decode_lossy(self.tags.as_deref().unwrap_or_default());
        for fragment in decoded.rejected {
            let warning = DataQualityWarning::MalformedTag {
                entry_id: self.id,
                fragment,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        JournalEntry {
            id: self.id,
            user_id: self.user_id,
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            tags: decoded.tags,
            created_at,
            modified_at,
        }
    }
}

fn read_timestamp(
    entry_id: i64,
    column: &'static str,
    raw: Option<String>,
    warnings: &mut Vec<DataQualityWarning>,
) -> DateTime<Utc> {
    if let Some(ts) = raw.as_deref().and_then(timestamp::decode) {
        return ts;
    }

    let warning = DataQualityWarning::UnparseableTimestamp {
        entry_id,
        column,
        raw,
    };
    warn!("{}", warning);
    warnings.push(warning);
    Utc::now()
}

/// Run an entry query and hydrate every row
pub(crate) fn query_entries<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    warnings: &mut Vec<DataQualityWarning>,
) -> StorageResult<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, EntryRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|row| row.into_entry(warnings))
        .collect())
}
