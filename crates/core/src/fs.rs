//! Filesystem utilities

use std::fs;
use std::io;
use std::path::Path;

/// Create a directory and all parent directories if they don't exist
///
/// Returns true when the directory had to be created.
pub fn ensure_dir(path: &Path) -> io::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path)?;
    Ok(true)
}

/// Check if a path exists
pub fn path_exists(path: &Path) -> bool {
    path.exists()
}

/// True when the file exists and holds zero bytes
pub fn file_is_empty(path: &Path) -> io::Result<bool> {
    Ok(fs::metadata(path)?.len() == 0)
}
