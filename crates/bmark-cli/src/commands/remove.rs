//! Remove command handler

use anyhow::{Context, Result};

use bmark_core::Store;

use super::resolve_urls;

/// Remove tags from one or more URLs
pub fn run(store: &mut Store, url: String, tags: Vec<String>) -> Result<()> {
    for url in resolve_urls(vec![url])? {
        store
            .remove(&url, &tags)
            .with_context(|| format!("Failed to remove tags from {}", url))?;
    }
    Ok(())
}
