//! Shared UI primitives for notecmd
//!
//! Conventions:
//! - Section headers in bold, notes indented beneath them
//! - Feedback: single word when possible: `Saved.`

use anyhow::Result;
use crossterm::style::Stylize;
use inquire::{ui::RenderConfig, Confirm};

use crate::models::{Item, Note};

const TITLE_WIDTH: usize = 48;

// ============================================================================
// Layout Primitives
// ============================================================================

/// Truncate a string to max_chars, adding ellipsis if needed.
/// Result will be at most max_chars characters (including ellipsis if truncated).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars - 1).collect();
    format!("{}…", kept)
}

/// One line per note: id, title (or first line of text), labels.
pub fn note_line(note: &Note) -> String {
    let text = note.text();
    let title = if note.title.is_empty() {
        text.lines().next().unwrap_or_default()
    } else {
        note.title.as_str()
    };
    let title = if title.is_empty() { "(untitled)" } else { title };

    let mut line = format!("{:>5}  {}", note.id, truncate(title, TITLE_WIDTH));
    if !note.labels.is_empty() {
        let labels: Vec<&str> = note.labels.iter().map(String::as_str).collect();
        line.push_str(&format!("  [{}]", labels.join(", ")));
    }
    line
}

pub fn print_items(items: &[Item]) {
    if items.is_empty() {
        status("No notes.");
        return;
    }
    for item in items {
        match item {
            Item::Header(text) => println!("{}", text.as_str().bold()),
            Item::Note(note) => println!("{}", note_line(note)),
        }
    }
}

// ============================================================================
// Message Functions
// ============================================================================

/// Print a status message to stdout
#[inline]
pub fn status(msg: &str) {
    println!("{}", msg);
}

// ============================================================================
// Prompts
// ============================================================================

/// Get a minimal render config for inquire prompts
pub fn minimal_render_config() -> RenderConfig<'static> {
    RenderConfig::default_colored()
        .with_prompt_prefix(inquire::ui::Styled::new(""))
        .with_answered_prompt_prefix(inquire::ui::Styled::new(""))
}

/// Prompt for yes/no confirmation (default: no)
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new(prompt)
        .with_render_config(minimal_render_config())
        .with_default(false)
        .prompt()?;
    Ok(result)
}
