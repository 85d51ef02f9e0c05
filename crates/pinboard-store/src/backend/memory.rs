use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_relative, Backend};
use crate::error::{PinsError, PinsResult};

#[derive(Debug, Clone)]
enum Entry {
    Dir,
    File(Vec<u8>),
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// In-process store, mostly for tests and scratch boards.
///
/// Each instance is its own board, so its root is a per-process unique id.
#[derive(Debug)]
pub struct MemoryBackend {
    id: u64,
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            entries: RwLock::default(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &str) -> PinsError {
    PinsError::NotFound {
        path: path.to_string(),
    }
}

fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(i, _)| &path[..i])
}

fn insert_dirs(entries: &mut BTreeMap<String, Entry>, path: &str) {
    for dir in ancestors(path) {
        entries.entry(dir.to_string()).or_insert(Entry::Dir);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn protocol(&self) -> &str {
        "memory"
    }

    fn root(&self) -> String {
        format!("memory-{}-{}", std::process::id(), self.id)
    }

    async fn ls(&self, dir: &str) -> PinsResult<Vec<String>> {
        check_relative(dir)?;
        let entries = self.entries.read().await;

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            match entries.get(dir) {
                Some(Entry::Dir) => format!("{dir}/"),
                _ => return Err(not_found(dir)),
            }
        };

        Ok(entries
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(String::from)
            .collect())
    }

    async fn exists(&self, path: &str) -> PinsResult<bool> {
        check_relative(path)?;
        Ok(path.is_empty() || self.entries.read().await.contains_key(path))
    }

    async fn read(&self, path: &str) -> PinsResult<Vec<u8>> {
        check_relative(path)?;
        match self.entries.read().await.get(path) {
            Some(Entry::File(bytes)) => Ok(bytes.clone()),
            _ => Err(not_found(path)),
        }
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> PinsResult<()> {
        check_relative(path)?;
        let mut entries = self.entries.write().await;
        if let Some(Entry::Dir) = entries.get(path) {
            return Err(PinsError::InvalidArgument {
                message: format!("cannot overwrite directory {path} with a file"),
            });
        }
        insert_dirs(&mut entries, path);
        entries.insert(path.to_string(), Entry::File(bytes.to_vec()));
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> PinsResult<()> {
        check_relative(path)?;
        if path.is_empty() {
            return Ok(());
        }
        let mut entries = self.entries.write().await;
        insert_dirs(&mut entries, path);
        entries.entry(path.to_string()).or_insert(Entry::Dir);
        Ok(())
    }

    async fn rm(&self, path: &str) -> PinsResult<()> {
        check_relative(path)?;
        let mut entries = self.entries.write().await;
        if entries.remove(path).is_none() {
            return Err(not_found(path));
        }

        let prefix = format!("{path}/");
        entries.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn local_path(&self, _path: &str) -> PinsResult<Option<PathBuf>> {
        Ok(None)
    }
}
