//! Command handlers

pub mod block;
pub mod config;
pub mod entry;
pub mod status;
pub mod user;
pub mod write;

use anyhow::{anyhow, Result};

use jot_core::{Config, EntryAggregate, JournalEntry, Session, Store};

use crate::output::Output;

/// Build the session for the configured active user
pub fn active_session(store: &Store, config: &Config) -> Result<Session> {
    let name = config.active_user.as_deref().ok_or_else(|| {
        anyhow!(
            "No active user.\n\
             Create one with `jot user add <name>` or select one with `jot user use <name>`."
        )
    })?;

    let user = store
        .find_user_by_name(name)?
        .ok_or_else(|| anyhow!("Active user '{}' does not exist. Run `jot user add {}`.", name, name))?;

    Ok(Session::for_user(&user))
}

/// Fetch an entry owned by the session user
pub fn owned_entry(store: &mut Store, session: &Session, id: i64) -> Result<JournalEntry> {
    store
        .get_entry(id)?
        .filter(|entry| entry.user_id == session.current_user_id())
        .ok_or_else(|| anyhow!("Entry not found: {}", id))
}

/// Load an entry owned by the session user together with its blocks
pub fn owned_aggregate(store: &mut Store, session: &Session, id: i64) -> Result<EntryAggregate> {
    store
        .load_aggregate(id)?
        .filter(|aggregate| aggregate.entry.user_id == session.current_user_id())
        .ok_or_else(|| anyhow!("Entry not found: {}", id))
}

/// Surface data-quality problems found while reading
pub fn report_warnings(store: &mut Store, output: &Output) {
    for warning in store.take_warnings() {
        output.warning(&warning.to_string());
    }
}
