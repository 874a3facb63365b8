//! Entry command handlers

use anyhow::{anyhow, Context, Result};

use jot_core::{tags, Config, JournalEntry, Store};

use super::{active_session, owned_aggregate, owned_entry, report_warnings};
use crate::editor::{confirm, edit_entry_body, is_interactive};
use crate::output::Output;

/// Create a new entry
pub fn create(
    store: &mut Store,
    config: &Config,
    title: Option<String>,
    body: Option<String>,
    tag_inputs: Vec<String>,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;

    let mut entry = JournalEntry::new(session.current_user_id());
    if let Some(title) = title {
        entry.set_title(title);
    }

    for input in &tag_inputs {
        let tag = tags::parse_input(input)
            .ok_or_else(|| anyhow!("Invalid tag '{}'. Use name or name:color.", input))?;
        entry.add_tag(tag);
    }

    let body = match body {
        Some(body) => body,
        None if is_interactive() && output.should_prompt() => {
            edit_entry_body(&entry.title, "").context("Failed to edit entry")?
        }
        None => String::new(),
    };
    entry.set_content(body);

    if entry.title.trim().is_empty() {
        entry.title =
            jot_core::autosave::placeholder_title(chrono::Local::now().naive_local());
    }

    store.create_entry(&mut entry).context("Failed to create entry")?;

    if output.is_json() {
        output.json(&entry);
    } else if output.is_quiet() {
        println!("{}", entry.id);
    } else {
        output.success(&format!("Created entry: {}", entry.id));
    }
    Ok(())
}

/// List the active user's entries, most recent first
pub fn list(store: &mut Store, config: &Config, output: &Output) -> Result<()> {
    let session = active_session(store, config)?;
    let entries = store.list_entries_for_user(session.current_user_id())?;
    report_warnings(store, output);
    output.print_entries(&entries);
    Ok(())
}

/// Show one entry with its blocks
pub fn show(store: &mut Store, config: &Config, id: i64, output: &Output) -> Result<()> {
    let session = active_session(store, config)?;
    let aggregate = owned_aggregate(store, &session, id)?;
    report_warnings(store, output);
    output.print_aggregate(&aggregate);
    Ok(())
}

/// Search the active user's entries
///
/// An empty keyword lists everything.
pub fn search(
    store: &mut Store,
    config: &Config,
    keyword: Option<String>,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;
    let keyword = keyword.unwrap_or_default();

    let entries = if keyword.is_empty() {
        store.list_entries_for_user(session.current_user_id())?
    } else {
        store.search_entries(session.current_user_id(), &keyword)?
    };
    report_warnings(store, output);
    output.print_entries(&entries);
    Ok(())
}

/// Delete an entry and its blocks
pub fn delete(
    store: &mut Store,
    config: &Config,
    id: i64,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;
    let entry = owned_entry(store, &session, id)?;

    if !yes && output.should_prompt() {
        println!("Delete entry: {} - {}", entry.id, entry.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = store.delete_entry(id).context("Failed to delete entry")?;
    output.print_cascade(id, &report);
    Ok(())
}
