//! History and undo command handlers

use anyhow::{bail, Result};

use marks_core::{Bookmarks, RevertOutcome};

use crate::output::{Output, OutputFormat};

/// Show recent changes
pub fn show(bookmarks: &Bookmarks, limit: Option<usize>, output: &Output) -> Result<()> {
    let limit = limit.unwrap_or(bookmarks.config().history_limit);
    let changes = bookmarks.history(limit)?;
    output.print_history(&changes);
    Ok(())
}

/// Revert the most recent change that has not been reverted yet
pub fn undo(bookmarks: &Bookmarks, output: &Output) -> Result<()> {
    let outcome = bookmarks.revert_last_change()?;

    if output.format == OutputFormat::Json {
        output.json(&outcome);
    }

    match outcome {
        RevertOutcome::NothingToRevert => {
            if output.format == OutputFormat::Human {
                output.message("Nothing to undo.");
            }
        }
        RevertOutcome::Reverted { change } => {
            if output.format == OutputFormat::Human {
                output.success(&format!("Reverted: {}", change.summary()));
            }
        }
        RevertOutcome::Skipped { change, reason } => {
            if output.format == OutputFormat::Human {
                output.message(&format!("Skipped: {}\n  {}", change.summary(), reason));
            }
        }
        RevertOutcome::Failed { change, reason } => {
            bail!(
                "Could not revert change #{} ({}): {}",
                change.id,
                change.summary(),
                reason
            );
        }
    }

    Ok(())
}
