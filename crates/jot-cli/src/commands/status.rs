//! Status command handler

use anyhow::Result;

use jot_core::storage::schema::get_schema_version;
use jot_core::{Config, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let healthy = store.is_healthy();
    let schema_version = get_schema_version(store.database().connection())
        .ok()
        .flatten();

    let user = match config.active_user.as_deref() {
        Some(name) => store.find_user_by_name(name)?,
        None => None,
    };
    let entries = match &user {
        Some(user) => Some(store.entry_count_for_user(&user.id)?),
        None => None,
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": config.database_path(),
                    "healthy": healthy,
                    "schema_version": schema_version,
                    "active_user": config.active_user,
                    "user_id": user.as_ref().map(|u| &u.id),
                    "entries": entries,
                    "autosave_quiet_ms": config.autosave_quiet_ms
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", if healthy { "ok" } else { "unhealthy" });
        }
        OutputFormat::Human => {
            println!("jot status");
            println!("==========");
            println!();
            println!("Storage:");
            println!("  Database: {}", config.database_path().display());
            println!("  Health:   {}", if healthy { "ok" } else { "unhealthy" });
            if let Some(version) = schema_version {
                println!("  Schema:   v{}", version);
            }
            println!();
            println!("User:");
            match (&config.active_user, &user) {
                (Some(_), Some(user)) => {
                    println!("  Active:  {}", user.name);
                    println!("  Entries: {}", entries.unwrap_or(0));
                }
                (Some(name), None) => println!("  Active:  {} (not registered)", name),
                (None, _) => println!("  Active:  (none)"),
            }
            println!();
            println!("Auto-save: after {} ms without edits", config.autosave_quiet_ms);
        }
    }

    Ok(())
}
