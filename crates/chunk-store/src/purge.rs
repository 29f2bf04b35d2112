//! Removal of temp files left behind by crashed writers.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Result, StoreError};
use crate::writer::TEMP_PREFIX;

/// Temp files (`~<name>`) below `root`.
pub fn find_stale_temp_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory loop"));
            StoreError::io(path, io)
        })?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(TEMP_PREFIX))
        {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Delete stale temp files below `root`. Only safe while no writer is running
/// on that tree. Returns the number of files removed.
pub fn purge_stale_temp_files(root: &Path) -> Result<usize> {
    let mut removed = 0;
    for path in find_stale_temp_files(root)? {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                warn!(path = %path.display(), "Removed stale temp file");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(path, e)),
        }
    }
    info!(root = %root.display(), removed, "Temp file purge finished");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_only_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let var = dir.path().join("t2m");
        std::fs::create_dir_all(&var).unwrap();
        std::fs::write(var.join("chunk_1.om"), b"x").unwrap();
        std::fs::write(var.join("~chunk_2.om"), b"x").unwrap();
        std::fs::write(dir.path().join("~stray"), b"x").unwrap();

        let found = find_stale_temp_files(dir.path()).unwrap();
        assert_eq!(found.len(), 2);

        assert_eq!(purge_stale_temp_files(dir.path()).unwrap(), 2);
        assert!(var.join("chunk_1.om").exists());
        assert!(!var.join("~chunk_2.om").exists());
        assert_eq!(purge_stale_temp_files(dir.path()).unwrap(), 0);
    }
}
