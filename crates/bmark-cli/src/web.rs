//! Browser output
//!
//! Renders query results to a per-user file under the system temp
//! directory and opens it in the default browser. On unix the target
//! directory must belong to the current user; a foreign-owned directory
//! aborts the command rather than writing into it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Write the rendered page and open it in the default browser
pub fn show(page: &[u8]) -> Result<()> {
    let dir = user_dir();
    ensure_owned(&dir)?;

    let path = dir.join("bmark.html");
    fs::write(&path, page).with_context(|| format!("Failed to write {}", path.display()))?;
    open::that(&path)
        .with_context(|| format!("Failed to open {} in a browser", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn user_dir() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    std::env::temp_dir().join(format!("bmark-{}", uid))
}

#[cfg(not(unix))]
fn user_dir() -> PathBuf {
    std::env::temp_dir().join("bmark")
}

#[cfg(unix)]
fn ensure_owned(dir: &Path) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    use anyhow::bail;

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let meta = fs::metadata(dir)?;
    let uid = unsafe { libc::getuid() };
    if meta.uid() != uid {
        bail!(
            "Refusing to write to {}: owned by uid {}, not {}",
            dir.display(),
            meta.uid(),
            uid
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_owned(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_own_directory_accepted() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = temp_dir.path().join("bmark-test");
        ensure_owned(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
