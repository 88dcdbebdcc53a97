//! Bookmark command handlers

use std::io::Read;

use anyhow::{Context, Result};
use serde_json::json;

use marks_core::{Bookmarks, MoveRequest};

use crate::output::{Output, OutputFormat};

/// List bookmarks, optionally only those directly in one folder
pub fn list(bookmarks: &Bookmarks, folder: Option<String>, output: &Output) -> Result<()> {
    let items = bookmarks.list_bookmarks(folder.as_deref())?;
    output.print_bookmarks(&items);
    Ok(())
}

/// Show every folder with its immediate-child counts
pub fn folders(bookmarks: &Bookmarks, output: &Output) -> Result<()> {
    let structure = bookmarks.folder_structure()?;
    output.print_folders(&structure);
    Ok(())
}

pub fn add(
    bookmarks: &Bookmarks,
    url: String,
    title: String,
    folder: String,
    output: &Output,
) -> Result<()> {
    let added = bookmarks.add_bookmark(&url, &title, &folder)?;
    output.success_with(
        &format!("Added '{}' to {}", title, folder),
        json!({"id": added.id, "url": url, "title": title, "folder": folder}),
    );
    Ok(())
}

pub fn mkdir(bookmarks: &Bookmarks, name: String, parent: String, output: &Output) -> Result<()> {
    let added = bookmarks.create_folder(&name, &parent)?;
    output.success_with(
        &format!("Created folder '{}' in {}", name, parent),
        json!({"id": added.id, "name": name, "parent": parent}),
    );
    Ok(())
}

pub fn mv(bookmarks: &Bookmarks, url: String, folder: String, output: &Output) -> Result<()> {
    let moved = bookmarks.move_bookmark(&url, &folder)?;
    output.success_with(
        &format!("Moved {} from {} to {}", url, moved.from_folder, moved.to_folder),
        json!(moved),
    );
    Ok(())
}

pub fn rename(bookmarks: &Bookmarks, url: String, title: String, output: &Output) -> Result<()> {
    let renamed = bookmarks.rename_bookmark(&url, &title)?;
    output.success_with(
        &format!("Renamed '{}' to '{}'", renamed.old_title, renamed.new_title),
        json!(renamed),
    );
    Ok(())
}

pub fn rm(bookmarks: &Bookmarks, url: String, output: &Output) -> Result<()> {
    let deleted = bookmarks.delete_bookmark(&url)?;
    output.success_with(
        &format!("Deleted '{}' from {}", deleted.title, deleted.folder),
        json!(deleted),
    );
    Ok(())
}

/// Apply a JSON list of `{url, target_folder}` moves read from a file or stdin (`-`)
pub fn bulk_move(bookmarks: &Bookmarks, source: String, output: &Output) -> Result<()> {
    let moves = read_moves(&source)?;
    let result = bookmarks.bulk_move(&moves)?;

    match output.format {
        OutputFormat::Json => output.json(&result),
        OutputFormat::Quiet => println!("{}", result.success_count()),
        OutputFormat::Human => {
            println!(
                "✓ Moved {} of {} bookmark(s)",
                result.success_count(),
                result.requested
            );
            for skipped in &result.skipped {
                println!("  ✗ {}: {}", skipped.url, skipped.reason);
            }
        }
    }
    Ok(())
}

fn read_moves(source: &str) -> Result<Vec<MoveRequest>> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read moves from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read moves from {}", source))?
    };

    parse_moves(&content).with_context(|| format!("Invalid move list in {}", source))
}

fn parse_moves(content: &str) -> Result<Vec<MoveRequest>> {
    Ok(serde_json::from_str(content)?)
}
