//! Add command handler

use anyhow::{Context, Result};

use bmark_core::Store;

use super::resolve_urls;

/// Tag one or more URLs
pub fn run(store: &mut Store, url: String, tags: Vec<String>) -> Result<()> {
    for url in resolve_urls(vec![url])? {
        store
            .add(&url, &tags)
            .with_context(|| format!("Failed to add {}", url))?;
    }
    Ok(())
}
