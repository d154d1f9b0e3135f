use std::fs;
use std::path::Path;

use crate::core::errors::{AppError, AppResult};

/// File access used by sessions and by application code.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> AppResult<String>;

    /// Writes `contents`, creating missing parent directories.
    fn write(&self, path: &Path, contents: &str) -> AppResult<()>;

    fn remove(&self, path: &Path) -> AppResult<()>;
}

/// `std::fs` backed file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub const CLASS: &'static str = "app_kernel::components::LocalFileSystem";

    pub fn new() -> Self {
        Self
    }
}

fn fs_error(op: &str, path: &Path, err: std::io::Error) -> AppError {
    AppError::FileSystem(format!("{} {}: {}", op, path.display(), err))
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> AppResult<String> {
        fs::read_to_string(path).map_err(|e| fs_error("read", path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| fs_error("create", parent, e))?;
            }
        }
        fs::write(path, contents).map_err(|e| fs_error("write", path, e))
    }

    fn remove(&self, path: &Path) -> AppResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_error("remove", path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/file.txt");
        let files = LocalFileSystem::new();

        files.write(&path, "hello").unwrap();
        assert!(files.exists(&path));
        assert_eq!(files.read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempdir().unwrap();
        let files = LocalFileSystem::new();
        files.remove(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn test_read_missing_is_error() {
        let dir = tempdir().unwrap();
        let err = LocalFileSystem::new()
            .read_to_string(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, AppError::FileSystem(_)));
    }
}
