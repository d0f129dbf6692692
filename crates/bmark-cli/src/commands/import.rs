//! Import command handler

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use bmark_core::{Format, Store};

/// Import URL→tags mappings from files (`-` reads stdin)
pub fn run(store: &mut Store, files: Vec<PathBuf>, format: Format) -> Result<()> {
    for path in files {
        let data = if path.as_os_str() == "-" {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        } else {
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?
        };

        let count = store
            .import(&data, format)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        debug!("imported {} urls from {}", count, path.display());
    }
    Ok(())
}
