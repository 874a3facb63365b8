//! Block command handlers
//!
//! Checklist items and toggle blocks are children of entries.

use anyhow::{anyhow, bail, Context, Result};

use jot_core::{Block, BlockKind, Config, Store, ToDoItem, ToggleBlock};

use super::{active_session, owned_aggregate, owned_entry, report_warnings};
use crate::output::{format_block, Output};

/// List an entry's blocks
pub fn list(store: &mut Store, config: &Config, entry_id: i64, output: &Output) -> Result<()> {
    let session = active_session(store, config)?;
    let aggregate = owned_aggregate(store, &session, entry_id)?;
    report_warnings(store, output);
    output.print_blocks(&aggregate.blocks);
    Ok(())
}

/// Add a checklist item to an entry
pub fn add_todo(
    store: &mut Store,
    config: &Config,
    entry_id: i64,
    description: String,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;
    owned_entry(store, &session, entry_id)?;

    if description.trim().is_empty() {
        bail!("Todo description cannot be empty");
    }

    let mut block = Block::Todo(ToDoItem::new(entry_id, description));
    store.save_block(&mut block).context("Failed to add todo")?;
    print_created(&block, output);
    Ok(())
}

/// Add a toggle block to an entry
pub fn add_toggle(
    store: &mut Store,
    config: &Config,
    entry_id: i64,
    title: String,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;
    owned_entry(store, &session, entry_id)?;

    let mut block = Block::Toggle(ToggleBlock::new(
        entry_id,
        title,
        content.unwrap_or_default(),
    ));
    store.save_block(&mut block).context("Failed to add toggle")?;
    print_created(&block, output);
    Ok(())
}

/// Check or uncheck a checklist item
pub fn check(
    store: &mut Store,
    config: &Config,
    todo_id: i64,
    done: bool,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;
    let mut item = store
        .get_todo(todo_id)?
        .ok_or_else(|| anyhow!("Todo not found: {}", todo_id))?;
    owned_entry(store, &session, item.entry_id)
        .map_err(|_| anyhow!("Todo not found: {}", todo_id))?;

    item.is_done = done;
    store.update_todo(&item).context("Failed to update todo")?;

    output.success(&format_block(&Block::Todo(item)));
    Ok(())
}

/// Delete a block by kind and id
pub fn remove(
    store: &mut Store,
    config: &Config,
    kind: BlockKind,
    id: i64,
    output: &Output,
) -> Result<()> {
    let session = active_session(store, config)?;

    let entry_id = match kind {
        BlockKind::Todo => store.get_todo(id)?.map(|item| item.entry_id),
        BlockKind::Toggle => store.get_toggle(id)?.map(|toggle| toggle.entry_id),
    }
    .ok_or_else(|| anyhow!("{} not found: {}", kind, id))?;
    owned_entry(store, &session, entry_id).map_err(|_| anyhow!("{} not found: {}", kind, id))?;

    match kind {
        BlockKind::Todo => store.delete_todo(id),
        BlockKind::Toggle => store.delete_toggle(id),
    }
    .with_context(|| format!("Failed to delete {}", kind))?;

    output.success(&format!("Deleted {} {}", kind, id));
    Ok(())
}

fn print_created(block: &Block, output: &Output) {
    if output.is_json() {
        output.json(block);
    } else if output.is_quiet() {
        println!("{}", block.id());
    } else {
        output.success(&format!("Added {}", format_block(block)));
    }
}
