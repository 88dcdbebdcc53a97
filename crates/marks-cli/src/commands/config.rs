//! Config command handlers

use anyhow::{Context, Result};

use marks_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "bookmarks_file": config.bookmarks_file,
                    "browser_profile": config.browser_profile,
                    "data_dir": config.data_dir,
                    "history_limit": config.history_limit,
                    "resolved_bookmarks_path": config.bookmarks_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.bookmarks_path().display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!(
                "  bookmarks_file:  {}",
                config
                    .bookmarks_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  browser_profile: {}", config.browser_profile);
            println!("  data_dir:        {}", config.data_dir.display());
            println!("  history_limit:   {}", config.history_limit);
            println!();
            println!("Bookmarks file: {}", config.bookmarks_path().display());
            println!("Config file:    {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    config.set(&key, &value)?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
