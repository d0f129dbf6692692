//! Config command handlers

use anyhow::{bail, Context, Result};

use bmark_core::Config;

/// Show current configuration
pub fn show() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  database: {}", config.database.display());
    println!();
    println!("Config file: {}", Config::config_file_path().display());
    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    match key.as_str() {
        "database" => {
            config.database = value.clone().into();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: database",
                key
            );
        }
    }

    config.save().context("Failed to save configuration")?;
    println!("Set {} = {}", key, value);
    Ok(())
}
