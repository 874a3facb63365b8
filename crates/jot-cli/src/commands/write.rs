//! Interactive writing session
//!
//! Reads lines from stdin and feeds them to the auto-save coordinator.
//! Plain lines are appended to the body; lines starting with `/` are
//! commands. The entry is saved after a quiet period, on `/save`, and when
//! the session ends.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

use jot_core::{
    spawn_autosave, tags, AutoSaveConfig, AutoSaveEvent, Config, Edit, EntryAggregate, EntryWrite,
    JournalEntry, SaveState, Store,
};

use super::{active_session, owned_aggregate, report_warnings};
use crate::output::{format_block, Output};

const HELP: &str = "\
Type to append lines to the entry. Commands:
  /title <text>          set the title
  /tag <name[:color]>    add a tag
  /untag <name>          remove a tag
  /todo <text>           add a checklist item
  /done <n>, /undone <n> check or uncheck item n
  /toggle <title> | <text>  add a collapsible block
  /expand <n>, /collapse <n>
  /show                  print the entry so far
  /save                  save now
  /quit                  save and exit (Ctrl-D works too)
Start a line with // to write a literal /.";

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Edit(Edit),
    Save,
    Show,
    Help,
    Quit,
}

/// Turn one input line into an action
pub fn parse_line(line: &str) -> Result<Action, String> {
    if let Some(literal) = line.strip_prefix("//") {
        return Ok(Action::Edit(Edit::AppendContent(format!("/{}", literal))));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Action::Edit(Edit::AppendContent(line.to_string())));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    let action = match name {
        "title" => Action::Edit(Edit::Title(rest.to_string())),
        "tag" => {
            let tag = tags::parse_input(rest)
                .ok_or_else(|| format!("Invalid tag '{}'. Use name or name:color.", rest))?;
            Action::Edit(Edit::AddTag(tag))
        }
        "untag" => Action::Edit(Edit::RemoveTag(required(rest, "/untag <name>")?)),
        "todo" => Action::Edit(Edit::AddTodo(required(rest, "/todo <text>")?)),
        "done" | "undone" => Action::Edit(Edit::SetTodoDone {
            index: position(rest)?,
            done: name == "done",
        }),
        "toggle" => {
            let (title, content) = match rest.split_once('|') {
                Some((title, content)) => (title.trim(), content.trim()),
                None => (rest, ""),
            };
            Action::Edit(Edit::AddToggle {
                title: required(title, "/toggle <title> | <text>")?,
                content: content.to_string(),
            })
        }
        "expand" | "collapse" => Action::Edit(Edit::SetToggleExpanded {
            index: position(rest)?,
            expanded: name == "expand",
        }),
        "save" => Action::Save,
        "show" => Action::Show,
        "help" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => return Err(format!("Unknown command '/{}'. Type /help.", other)),
    };
    Ok(action)
}

fn required(value: &str, usage: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("Usage: {}", usage))
    } else {
        Ok(value.to_string())
    }
}

/// 1-based position as shown to the user, to a 0-based index
fn position(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Expected an item number, got '{}'", value)),
    }
}

/// Run a writing session on a new or existing entry
pub async fn run(mut store: Store, config: &Config, id: Option<i64>, output: &Output) -> Result<()> {
    let mut session = active_session(&store, config)?;

    let aggregate = match id {
        Some(id) => {
            let aggregate = owned_aggregate(&mut store, &session, id)?;
            report_warnings(&mut store, output);
            aggregate
        }
        None => EntryAggregate::new(JournalEntry::new(session.current_user_id())),
    };
    session.set_current_entry(aggregate);
    let aggregate = session
        .take_current_entry()
        .ok_or_else(|| anyhow!("No entry open"))?;

    let store = Arc::new(Mutex::new(store));
    let mut handle = spawn_autosave(AutoSaveConfig::from_config(config), store, aggregate);

    if output.should_prompt() {
        match id {
            Some(id) => println!("Editing entry {}. Type /help for commands.", id),
            None => println!("New entry. Type /help for commands."),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_line(&line) {
                    Ok(Action::Edit(edit)) => handle.edit(edit).await?,
                    Ok(Action::Save) => {
                        // Outcome arrives on the event channel
                        let _ = handle.save_now().await;
                    }
                    Ok(Action::Show) => {
                        let snapshot = handle.snapshot().await?;
                        print_snapshot(&snapshot);
                    }
                    Ok(Action::Help) => println!("{}", HELP),
                    Ok(Action::Quit) => break,
                    Err(message) => output.warning(&message),
                }
            }
            Some(event) = handle.event_rx.recv() => report_event(&event, output),
        }
    }

    if handle.state() == SaveState::PendingSave {
        debug!("flushing pending edits before exit");
        let _ = handle.save_now().await;
    }
    let final_entry = handle.shutdown().await?;
    while let Ok(event) = handle.event_rx.try_recv() {
        report_event(&event, output);
    }

    session.set_current_entry(final_entry);
    if let Some(aggregate) = session.current_entry() {
        if aggregate.entry.is_persisted() {
            if output.is_json() {
                output.json(aggregate);
            } else if output.is_quiet() {
                println!("{}", aggregate.entry.id);
            }
        } else {
            output.message("Nothing written.");
        }
    }
    Ok(())
}

fn report_event(event: &AutoSaveEvent, output: &Output) {
    match event {
        AutoSaveEvent::Saved(report) => {
            let verb = match report.entry_write {
                EntryWrite::Created => "Created",
                EntryWrite::Updated(_) => "Saved",
            };
            if output.should_prompt() {
                println!("· {} entry {}", verb, report.entry_id);
            }
        }
        AutoSaveEvent::Failed(message) => output.warning(&format!("Save failed: {}", message)),
    }
}

fn print_snapshot(aggregate: &EntryAggregate) {
    let entry = &aggregate.entry;
    println!("# {}", if entry.title.is_empty() { "(untitled)" } else { entry.title.as_str() });
    if !entry.tags.is_empty() {
        let names: Vec<_> = entry.tags.iter().map(|t| t.name.as_str()).collect();
        println!("tags: {}", names.join(", "));
    }
    if !entry.content.is_empty() {
        println!("{}", entry.content);
    }
    for (n, item) in aggregate.todos().enumerate() {
        println!("{}. [{}] {}", n + 1, if item.is_done { "x" } else { " " }, item.description);
    }
    for (n, toggle) in aggregate.toggles().enumerate() {
        let block = jot_core::Block::Toggle(toggle.clone());
        println!("{}. {}", n + 1, format_block(&block));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jot_core::Tag;

    #[test]
    fn test_plain_lines_append() {
        assert_eq!(
            parse_line("Dear diary").unwrap(),
            Action::Edit(Edit::AppendContent("Dear diary".into()))
        );
        assert_eq!(
            parse_line("").unwrap(),
            Action::Edit(Edit::AppendContent(String::new()))
        );
        assert_eq!(
            parse_line("//etc/hosts").unwrap(),
            Action::Edit(Edit::AppendContent("/etc/hosts".into()))
        );
    }

    #[test]
    fn test_title_and_tags() {
        assert_eq!(
            parse_line("/title Trip to Japan").unwrap(),
            Action::Edit(Edit::Title("Trip to Japan".into()))
        );
        assert_eq!(
            parse_line("/tag travel:red").unwrap(),
            Action::Edit(Edit::AddTag(Tag::new("travel", "#ff5555")))
        );
        assert_eq!(
            parse_line("/untag travel").unwrap(),
            Action::Edit(Edit::RemoveTag("travel".into()))
        );
        assert!(parse_line("/tag a,b").is_err());
        assert!(parse_line("/untag").is_err());
    }

    #[test]
    fn test_blocks() {
        assert_eq!(
            parse_line("/todo buy milk").unwrap(),
            Action::Edit(Edit::AddTodo("buy milk".into()))
        );
        assert_eq!(
            parse_line("/done 2").unwrap(),
            Action::Edit(Edit::SetTodoDone { index: 1, done: true })
        );
        assert_eq!(
            parse_line("/undone 1").unwrap(),
            Action::Edit(Edit::SetTodoDone { index: 0, done: false })
        );
        assert_eq!(
            parse_line("/toggle Details | the long version").unwrap(),
            Action::Edit(Edit::AddToggle {
                title: "Details".into(),
                content: "the long version".into()
            })
        );
        assert_eq!(
            parse_line("/collapse 3").unwrap(),
            Action::Edit(Edit::SetToggleExpanded { index: 2, expanded: false })
        );
        assert!(parse_line("/done 0").is_err());
        assert!(parse_line("/expand x").is_err());
        assert!(parse_line("/toggle | body only").is_err());
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(parse_line("/save").unwrap(), Action::Save);
        assert_eq!(parse_line("/show").unwrap(), Action::Show);
        assert_eq!(parse_line("/quit").unwrap(), Action::Quit);
        assert_eq!(parse_line("/help").unwrap(), Action::Help);
        assert!(parse_line("/frobnicate").is_err());
    }
}
