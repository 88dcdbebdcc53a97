//! Status command handler

use anyhow::Result;

use marks_core::Bookmarks;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(bookmarks: &Bookmarks, output: &Output) -> Result<()> {
    let path = bookmarks.path();
    let exists = path.exists();
    let backup_exists = bookmarks.backup_path().exists();

    let (bookmark_count, folder_count) = if exists {
        (
            bookmarks.list_bookmarks(None)?.len(),
            bookmarks.folder_structure()?.len(),
        )
    } else {
        (0, 0)
    };

    let changes = bookmarks.change_log();
    let change_count = changes.count()?;
    let last_open = changes.get_last_revertable()?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "bookmarks_file": path,
                    "exists": exists,
                    "backup_exists": backup_exists,
                    "backend": bookmarks.backend_name(),
                    "counts": {
                        "bookmarks": bookmark_count,
                        "folders": folder_count,
                        "changes": change_count
                    },
                    "next_undo": last_open
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", path.display());
        }
        OutputFormat::Human => {
            println!("marks status");
            println!("============");
            println!();
            println!("Bookmarks file:");
            println!("  Path:    {}", path.display());
            println!("  Exists:  {}", if exists { "yes" } else { "no" });
            println!("  Backup:  {}", if backup_exists { "yes" } else { "no" });
            println!("  Backend: {}", bookmarks.backend_name());
            println!();
            println!("Contents:");
            println!("  Bookmarks: {}", bookmark_count);
            println!("  Folders:   {}", folder_count);
            println!();
            println!("History:");
            println!("  Changes:   {}", change_count);
            println!(
                "  Next undo: {}",
                last_open
                    .map(|change| change.summary())
                    .unwrap_or_else(|| "(nothing)".to_string())
            );
        }
    }

    Ok(())
}
