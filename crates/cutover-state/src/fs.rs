//! Atomic file replacement.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{StateError, StateResult};

/// Replace `path` with `contents` via a temp file in the same directory and
/// a rename, so readers never observe a half-written file. Creates missing
/// parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StateResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StateError::io(parent, e))?;
    tmp.write_all(contents).map_err(|e| StateError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| StateError::io(path, e))?;
    tmp.persist(path).map_err(|e| StateError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/file.txt");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        // No temp files left behind.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
