//! List command handler

use anyhow::{Context, Result};

use bmark_core::{codec, Format, Store};

use crate::output;
use crate::web;

/// List URLs matching every given tag
pub fn run(
    store: &Store,
    tags: Vec<String>,
    format: Format,
    verbose: bool,
    to_browser: bool,
) -> Result<()> {
    // The HTML page always shows tags; the other formats follow --verbose
    let with_tags = verbose || to_browser || format == Format::Html;
    let listing = store
        .list(&tags, with_tags)
        .context("Failed to list bookmarks")?;

    let title = if tags.is_empty() {
        "All urls".to_string()
    } else {
        tags.join(" ")
    };

    if to_browser {
        let page = codec::encode_listing(&listing, Format::Html, &title)?;
        return web::show(&page);
    }

    let bytes = codec::encode_listing(&listing, format, &title)?;
    output::write_stdout(&bytes)
}
