//! User command handlers

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use jot_core::{Config, StorageError, Store};

use crate::editor::confirm;
use crate::output::{Output, OutputFormat};

/// Register a user; the first one becomes the active user
pub fn add(
    store: &mut Store,
    config: &mut Config,
    config_path: Option<&PathBuf>,
    name: String,
    credential: Option<String>,
    output: &Output,
) -> Result<()> {
    let user = match store.create_user(&name, credential.as_deref().unwrap_or_default()) {
        Ok(user) => user,
        Err(StorageError::UsernameTaken(name)) => {
            return Err(anyhow!("User '{}' already exists", name));
        }
        Err(e) => return Err(e).context("Failed to create user"),
    };

    output.success(&format!("Created user: {}", user.name));
    output.print_user(&user);

    if config.active_user.is_none() {
        config.active_user = Some(user.name.clone());
        save_config(config, config_path)?;
        output.message(&format!("Now writing as {}", user.name));
    }

    Ok(())
}

/// Make an existing user the active one
pub fn switch(
    store: &Store,
    config: &mut Config,
    config_path: Option<&PathBuf>,
    name: String,
    output: &Output,
) -> Result<()> {
    let user = store
        .find_user_by_name(&name)?
        .ok_or_else(|| anyhow!("User not found: {}", name))?;

    config.active_user = Some(user.name.clone());
    save_config(config, config_path)?;

    output.success(&format!("Now writing as {}", user.name));
    Ok(())
}

/// Show the active user
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let Some(name) = config.active_user.as_deref() else {
        match output.format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "active_user": null })),
            OutputFormat::Quiet => {}
            OutputFormat::Human => println!("No active user. Create one with `jot user add <name>`."),
        }
        return Ok(());
    };

    let user = store
        .find_user_by_name(name)?
        .ok_or_else(|| anyhow!("Active user '{}' does not exist", name))?;

    output.print_user(&user);
    Ok(())
}

/// Rename the active user
pub fn rename(
    store: &mut Store,
    config: &mut Config,
    config_path: Option<&PathBuf>,
    name: String,
    output: &Output,
) -> Result<()> {
    let current = config
        .active_user
        .clone()
        .ok_or_else(|| anyhow!("No active user to rename"))?;
    let mut user = store
        .find_user_by_name(&current)?
        .ok_or_else(|| anyhow!("Active user '{}' does not exist", current))?;

    user.name = name.trim().to_string();
    match store.update_user(&user) {
        Ok(_) => {}
        Err(StorageError::UsernameTaken(name)) => {
            return Err(anyhow!("User '{}' already exists", name));
        }
        Err(e) => return Err(e).context("Failed to rename user"),
    }

    config.active_user = Some(user.name.clone());
    save_config(config, config_path)?;

    output.success(&format!("Renamed {} to {}", current, user.name));
    Ok(())
}

/// Delete a user and every entry it owns
pub fn delete(
    store: &mut Store,
    config: &mut Config,
    config_path: Option<&PathBuf>,
    name: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let user = store
        .find_user_by_name(&name)?
        .ok_or_else(|| anyhow!("User not found: {}", name))?;

    if !yes && output.should_prompt() {
        let entries = store.entry_count_for_user(&user.id)?;
        println!("Delete user {} and their {} entries", user.name, entries);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deletion = store.delete_user(&user.id).context("Failed to delete user")?;

    if config.active_user.as_deref() == Some(user.name.as_str()) {
        config.active_user = None;
        save_config(config, config_path)?;
    }

    if output.is_json() {
        output.json(&deletion);
    } else {
        output.success(&format!(
            "Deleted user {} ({} entries, {} blocks)",
            user.name, deletion.entries_removed, deletion.blocks_removed
        ));
    }
    Ok(())
}

fn save_config(config: &Config, config_path: Option<&PathBuf>) -> Result<()> {
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")
}
