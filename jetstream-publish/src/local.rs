//! Local directory backend.
//!
//! Writes go through `<path>.jetstream.tmp` followed by a rename, so a
//! reader never observes a half-written artifact.

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{io_err, PublishError};
use crate::gate::StorageBackend;

/// Stores artifacts as files under `root`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open `root`, creating it (and any parents) if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PublishError> {
        let root = root.into();
        if !root.is_dir() {
            std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
            tracing::debug!(root = %root.display(), "created publish directory");
        }
        Ok(Self { root })
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl StorageBackend for LocalStore {
    fn location(&self, name: &str) -> String {
        self.path_of(name).display().to_string()
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PublishError> {
        let path = self.path_of(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(path, err)),
        }
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<(), PublishError> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let tmp = PathBuf::from(format!("{}.jetstream.tmp", path.display()));
        std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_root() {
        let dir = TempDir::new().expect("dir");
        let root = dir.path().join("nested").join("artifacts");
        LocalStore::new(&root).expect("store");
        assert!(root.is_dir());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().expect("dir");
        let store = LocalStore::new(dir.path()).expect("store");
        assert!(store.read("absent.template").expect("read").is_none());
    }

    #[test]
    fn write_then_read_leaves_no_tmp_file() {
        let dir = TempDir::new().expect("dir");
        let store = LocalStore::new(dir.path()).expect("store");
        store.write("s3.template", b"{}").expect("write");
        assert_eq!(store.read("s3.template").expect("read").as_deref(), Some(&b"{}"[..]));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn unreadable_location_is_an_error() {
        let dir = TempDir::new().expect("dir");
        let store = LocalStore::new(dir.path()).expect("store");
        std::fs::create_dir(dir.path().join("a_directory")).expect("mkdir");
        let err = store.read("a_directory").unwrap_err();
        assert!(matches!(err, PublishError::Io { .. }));
    }
}
