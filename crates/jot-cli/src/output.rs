//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use jot_core::{Block, CascadeReport, EntryAggregate, JournalEntry, User};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print an entry with its blocks
    pub fn print_aggregate(&self, aggregate: &EntryAggregate) {
        let entry = &aggregate.entry;
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", entry.id);
                println!("Title:    {}", entry.title);
                if !entry.tags.is_empty() {
                    println!("Tags:     {}", format_tags(entry));
                }
                println!("Created:  {}", entry.created_at.format("%Y-%m-%d %H:%M"));
                println!("Modified: {}", entry.modified_at.format("%Y-%m-%d %H:%M"));

                if !entry.content.is_empty() {
                    println!();
                    println!("{}", entry.content);
                }

                if !aggregate.blocks.is_empty() {
                    println!();
                    println!("── Blocks ({}) ──", aggregate.blocks.len());
                    for block in &aggregate.blocks {
                        println!("{}", format_block(block));
                    }
                }
            }
            OutputFormat::Json => self.json(aggregate),
            OutputFormat::Quiet => println!("{}", entry.id),
        }
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[JournalEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in entries {
                    let tags = if entry.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", format_tag_names(entry))
                    };
                    println!(
                        "{:>5} | {} | {}{}",
                        entry.id,
                        entry.modified_at.format("%Y-%m-%d %H:%M"),
                        truncate(&entry.title, 40),
                        tags
                    );
                }
                println!("\n{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => self.json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print the blocks of an entry
    pub fn print_blocks(&self, blocks: &[Block]) {
        match self.format {
            OutputFormat::Human => {
                if blocks.is_empty() {
                    println!("No blocks in this entry.");
                    return;
                }
                for block in blocks {
                    println!("{}", format_block(block));
                }
            }
            OutputFormat::Json => self.json(blocks),
            OutputFormat::Quiet => {
                for block in blocks {
                    println!("{} {}", block.kind(), block.id());
                }
            }
        }
    }

    /// Print a user
    pub fn print_user(&self, user: &User) {
        match self.format {
            OutputFormat::Human => {
                println!("Name: {}", user.name);
                println!("ID:   {}", user.id);
            }
            OutputFormat::Json => self.json(user),
            OutputFormat::Quiet => println!("{}", user.id),
        }
    }

    /// Print what a delete removed
    pub fn print_cascade(&self, entry_id: i64, report: &CascadeReport) {
        match self.format {
            OutputFormat::Human => {
                if report.entry_removed {
                    println!(
                        "✓ Deleted entry {} ({} todo(s), {} toggle(s))",
                        entry_id, report.todos_removed, report.toggles_removed
                    );
                } else {
                    println!("Entry {} not found; nothing deleted.", entry_id);
                }
            }
            OutputFormat::Json => self.json(report),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warning(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// One-line rendering of a block
pub fn format_block(block: &Block) -> String {
    match block {
        Block::Todo(item) => format!(
            "[{}] {} (todo {})",
            if item.is_done { "x" } else { " " },
            item.description,
            item.id
        ),
        Block::Toggle(toggle) => {
            let marker = if toggle.is_expanded { "▾" } else { "▸" };
            let mut line = format!("{} {} (toggle {})", marker, toggle.title, toggle.id);
            if toggle.is_expanded && !toggle.content.is_empty() {
                for content_line in toggle.content.lines() {
                    line.push_str("\n    ");
                    line.push_str(content_line);
                }
            }
            line
        }
    }
}

fn format_tags(entry: &JournalEntry) -> String {
    entry
        .tags
        .iter()
        .map(|t| format!("{} ({})", t.name, t.color))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_tag_names(entry: &JournalEntry) -> String {
    entry
        .tags
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jot_core::{ToDoItem, ToggleBlock};

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("日本への旅行の記録です", 5), "日本...");
    }

    #[test]
    fn test_format_block() {
        let mut item = ToDoItem::new(1, "buy milk");
        item.id = 4;
        item.is_done = true;
        assert_eq!(format_block(&item.into()), "[x] buy milk (todo 4)");

        let mut toggle = ToggleBlock::new(1, "Details", "line one\nline two");
        toggle.id = 9;
        assert_eq!(format_block(&toggle.clone().into()), "▸ Details (toggle 9)");

        toggle.is_expanded = true;
        assert_eq!(
            format_block(&toggle.into()),
            "▾ Details (toggle 9)\n    line one\n    line two"
        );
    }
}
