//! Interactive editing support
//!
//! Opens $EDITOR on an entry body with a hint header naming the entry, and
//! asks for confirmation before destructive commands.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::Command;

/// Marker for lines that are stripped from editor output
const COMMENT_PREFIX: &str = "<!--";

const FALLBACK_EDITORS: [&str; 4] = ["nano", "vim", "vi", "notepad"];

/// Edit an entry body in the user's editor
///
/// The file starts with hint lines naming the entry; they are removed from
/// the result along with surrounding whitespace.
pub fn edit_entry_body(title: &str, body: &str) -> Result<String> {
    let editor = find_editor()?;
    let path = draft_path(title);

    fs::write(&path, draft_template(title, body))
        .with_context(|| format!("Failed to create draft file: {:?}", path))?;

    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor));

    let edited = match status {
        Ok(status) if status.success() => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read draft file: {:?}", path)),
        Ok(_) => Err(anyhow::anyhow!(
            "Editor '{}' exited with non-zero status; the entry was not created.",
            editor
        )),
        Err(e) => Err(e),
    };
    let _ = fs::remove_file(&path);

    Ok(strip_comments(&edited?))
}

/// Initial draft contents: hint header, then the body
fn draft_template(title: &str, body: &str) -> String {
    let title = if title.trim().is_empty() {
        "(untitled)"
    } else {
        title
    };
    format!(
        "<!-- Entry: {} -->\n<!-- Write the body below. Lines starting with <!-- are dropped. -->\n\n{}",
        title, body
    )
}

/// Per-process draft file named after the entry title
fn draft_path(title: &str) -> PathBuf {
    let slug: String = title
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            ' ' | '-' | '_' => Some('-'),
            _ => None,
        })
        .take(32)
        .collect();
    let slug = slug.trim_matches('-');
    let name = if slug.is_empty() {
        format!("jot-entry-{}.md", std::process::id())
    } else {
        format!("jot-{}-{}.md", slug, std::process::id())
    };
    env::temp_dir().join(name)
}

/// Drop `<!-- ... -->` hint lines and surrounding whitespace
fn strip_comments(edited: &str) -> String {
    edited
        .lines()
        .filter(|line| !line.trim_start().starts_with(COMMENT_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Whether stdin is attached to a terminal
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// $EDITOR, then $VISUAL, then the first fallback found on PATH
fn find_editor() -> Result<String> {
    let configured = ["EDITOR", "VISUAL"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .find(|editor| !editor.trim().is_empty());
    if let Some(editor) = configured {
        return Ok(editor);
    }

    match FALLBACK_EDITORS.into_iter().find(|cmd| on_path(cmd)) {
        Some(editor) => Ok(editor.to_string()),
        None => bail!("No editor found. Set $EDITOR, or pass the body with --body."),
    }
}

fn on_path(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Ask a y/N question; always "no" without a terminal
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
