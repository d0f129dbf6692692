//! Delete command handler

use anyhow::{Context, Result};

use bmark_core::Store;

use super::resolve_urls;

/// Delete URLs from the database
pub fn run(store: &mut Store, urls: Vec<String>) -> Result<()> {
    let urls = resolve_urls(urls)?;
    store.delete(&urls).context("Failed to delete bookmarks")
}
