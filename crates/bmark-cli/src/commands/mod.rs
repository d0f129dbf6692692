//! Command handlers

pub mod add;
pub mod config;
pub mod delete;
pub mod import;
pub mod list;
pub mod remove;
pub mod tags;

use anyhow::{Context, Result};

/// Resolve URL arguments, expanding `-` to one URL per stdin line
pub(crate) fn resolve_urls(args: Vec<String>) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for arg in args {
        if arg == "-" {
            let input = std::io::read_to_string(std::io::stdin())
                .context("Failed to read URLs from stdin")?;
            urls.extend(
                input
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        } else {
            urls.push(arg);
        }
    }
    Ok(urls)
}
