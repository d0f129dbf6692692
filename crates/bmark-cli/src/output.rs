//! Stdout writing for query results
//!
//! A consumer closing the pipe early (`bmark list | head`) is normal
//! operation, not an error.

use std::io::{self, ErrorKind, Write};

use anyhow::Result;

/// Write encoded bytes to stdout, swallowing broken pipes
pub fn write_stdout(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match handle.write_all(bytes).and_then(|()| handle.flush()) {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other.map_err(Into::into),
    }
}
