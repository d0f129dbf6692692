//! Tags command handler

use anyhow::{Context, Result};

use bmark_core::{codec, Format, Store};

use crate::output;
use crate::web;

/// List tags, globally or for the given URLs
pub fn run(store: &Store, urls: Vec<String>, format: Format, to_browser: bool) -> Result<()> {
    let summary = store.tags(&urls).context("Failed to list tags")?;

    let title = if urls.is_empty() {
        "All tags".to_string()
    } else {
        urls.join(" ")
    };

    if to_browser {
        let page = codec::encode_tags(&summary, Format::Html, &title)?;
        return web::show(&page);
    }

    let bytes = codec::encode_tags(&summary, format, &title)?;
    output::write_stdout(&bytes)
}
