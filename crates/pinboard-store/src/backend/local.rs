use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs;
use tracing::debug;

use super::{check_relative, Backend};
use crate::error::{PinsError, PinsResult};

/// Folder on local disk.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    // Held so the directory lives as long as any board using it.
    _temp: Option<Arc<TempDir>>,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _temp: None,
        }
    }

    /// Backend over a fresh temporary directory, removed on drop.
    pub fn temp() -> PinsResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pinboard-")
            .tempdir()
            .map_err(|e| PinsError::io("temporary directory", e))?;

        Ok(Self {
            root: dir.path().to_path_buf(),
            _temp: Some(Arc::new(dir)),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PinsResult<PathBuf> {
        check_relative(path)?;
        if path.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(path))
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PinsError {
    if e.kind() == std::io::ErrorKind::NotFound {
        PinsError::NotFound {
            path: path.display().to_string(),
        }
    } else {
        PinsError::io(path.display().to_string(), e)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn protocol(&self) -> &str {
        "file"
    }

    fn root(&self) -> String {
        self.root.display().to_string()
    }

    async fn ls(&self, dir: &str) -> PinsResult<Vec<String>> {
        let full = self.resolve(dir)?;
        let mut entries = fs::read_dir(&full).await.map_err(|e| io_error(&full, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&full, e))? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, path: &str) -> PinsResult<bool> {
        let full = self.resolve(path)?;
        fs::try_exists(&full).await.map_err(|e| io_error(&full, e))
    }

    async fn read(&self, path: &str) -> PinsResult<Vec<u8>> {
        let full = self.resolve(path)?;
        debug!(path = %full.display(), "reading file");
        fs::read(&full).await.map_err(|e| io_error(&full, e))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> PinsResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        debug!(path = %full.display(), bytes = bytes.len(), "writing file");
        fs::write(&full, bytes).await.map_err(|e| io_error(&full, e))
    }

    async fn mkdir(&self, path: &str) -> PinsResult<()> {
        let full = self.resolve(path)?;
        // create_dir_all succeeds when another writer created it first
        fs::create_dir_all(&full)
            .await
            .map_err(|e| io_error(&full, e))
    }

    async fn rm(&self, path: &str) -> PinsResult<()> {
        let full = self.resolve(path)?;
        let metadata = fs::metadata(&full).await.map_err(|e| io_error(&full, e))?;

        debug!(path = %full.display(), "removing");
        let result = if metadata.is_dir() {
            fs::remove_dir_all(&full).await
        } else {
            fs::remove_file(&full).await
        };
        result.map_err(|e| io_error(&full, e))
    }

    async fn local_path(&self, path: &str) -> PinsResult<Option<PathBuf>> {
        Ok(Some(self.resolve(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_parents_and_lists_sorted() {
        let backend = LocalBackend::temp().unwrap();
        backend.write("pin/v2/data.txt", b"b").await.unwrap();
        backend.write("pin/v1/data.txt", b"a").await.unwrap();

        assert_eq!(backend.ls("pin").await.unwrap(), vec!["v1", "v2"]);
        assert_eq!(backend.read("pin/v1/data.txt").await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn temp_folder_outlives_clones_then_goes_away() {
        let backend = LocalBackend::temp().unwrap();
        let root = backend.root_path().to_path_buf();
        let clone = backend.clone();
        drop(backend);

        clone.write("x.txt", b"x").await.unwrap();
        assert!(root.join("x.txt").is_file());

        drop(clone);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn missing_paths_are_not_found() {
        let backend = LocalBackend::temp().unwrap();
        assert!(!backend.exists("nope").await.unwrap());
        assert!(backend.read("nope").await.unwrap_err().is_not_found());
        assert!(backend.ls("nope").await.unwrap_err().is_not_found());
        assert!(backend.rm("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn rm_removes_trees() {
        let backend = LocalBackend::temp().unwrap();
        backend.write("pin/v1/a.json", b"1").await.unwrap();
        backend.rm("pin").await.unwrap();
        assert!(!backend.exists("pin").await.unwrap());
    }

    #[test]
    fn temp_dir_is_removed_with_last_clone() {
        let backend = LocalBackend::temp().unwrap();
        let root = backend.root_path().to_path_buf();
        let clone = backend.clone();
        drop(backend);
        assert!(root.exists());
        drop(clone);
        assert!(!root.exists());
    }
}
