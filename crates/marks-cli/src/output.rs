//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use marks_core::{ChangeRecord, FlatBookmark, FolderStructure};
use serde::Serialize;

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

    /// Print a list of bookmarks
    pub fn print_bookmarks(&self, bookmarks: &[FlatBookmark]) {
        match self.format {
            OutputFormat::Human => {
                if bookmarks.is_empty() {
                    println!("No bookmarks found.");
                    return;
                }
                for bookmark in bookmarks {
                    println!(
                        "{} | {} | {}",
                        truncate(&bookmark.title, 35),
                        truncate(&bookmark.url, 50),
                        bookmark.folder
                    );
                }
                println!("\n{} bookmark(s)", bookmarks.len());
            }
            OutputFormat::Json => self.json(&bookmarks),
            OutputFormat::Quiet => {
                for bookmark in bookmarks {
                    println!("{}", bookmark.url);
                }
            }
        }
    }

    /// Print per-folder tallies
    pub fn print_folders(&self, structure: &FolderStructure) {
        match self.format {
            OutputFormat::Human => {
                let width = structure.keys().map(|k| k.chars().count()).max().unwrap_or(0);
                for (path, summary) in structure {
                    println!(
                        "{:<width$}  {} bookmark(s), {} folder(s)",
                        path,
                        summary.bookmarks,
                        summary.subfolders,
                        width = width
                    );
                }
            }
            OutputFormat::Json => self.json(structure),
            OutputFormat::Quiet => {
                for path in structure.keys() {
                    println!("{}", path);
                }
            }
        }
    }

    /// Print change records, newest first
    pub fn print_history(&self, changes: &[ChangeRecord]) {
        match self.format {
            OutputFormat::Human => {
                if changes.is_empty() {
                    println!("No changes recorded.");
                    return;
                }
                for change in changes {
                    println!(
                        "#{:<5} {}  {}{}",
                        change.id,
                        change.timestamp.format("%Y-%m-%d %H:%M"),
                        change.summary(),
                        if change.reverted { " (reverted)" } else { "" }
                    );
                }
            }
            OutputFormat::Json => self.json(&changes),
            OutputFormat::Quiet => {
                for change in changes {
                    println!("{}", change.id);
                }
            }
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
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

    /// Print a success message, with structured data in JSON mode
    pub fn success_with(&self, message: &str, data: serde_json::Value) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message, "data": data})
                );
            }
            _ => self.success(message),
        }
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

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
