//! Read-through disk cache for remote boards.
//!
//! # Cache Structure
//!
//! ```text
//! {cache root}/{protocol}_{sha256(board root)}/
//!   {pin}/{version}/
//!     data.txt         # access time marks last use
//!     {pin files}
//! ```
//!
//! Pin versions are immutable, so a cached file never goes stale; the only
//! eviction is pruning by last access.

use std::fs::FileTimes;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::backend::{check_relative, Backend};
use crate::config::inform;
use crate::digest::sha256_hex_bytes;
use crate::error::{PinsError, PinsResult};
use crate::meta::META_FILENAME;

/// Directory under `cache_root` holding the cache of one board.
pub fn board_cache_dir(cache_root: &Path, protocol: &str, board_root: &str) -> PathBuf {
    cache_root.join(format!(
        "{}_{}",
        protocol,
        sha256_hex_bytes(board_root.as_bytes())
    ))
}

fn cache_error(message: String) -> PinsError {
    PinsError::Cache { message }
}

/// Write `content` to `path` via a uniquely named temp file in the same directory.
async fn write_atomic(path: &Path, content: &[u8]) -> PinsResult<()> {
    let path = path.to_path_buf();
    let content = content.to_vec();

    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &content))
        .await
        .map_err(|e| cache_error(format!("cache write task failed: {}", e)))?
}

fn write_atomic_blocking(path: &Path, content: &[u8]) -> PinsResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| cache_error(format!("no parent directory for {}", path.display())))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".pinboard-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| cache_error(format!("failed to create temp file: {}", e)))?;
    temp.write_all(content)
        .map_err(|e| cache_error(format!("failed to write temp file: {}", e)))?;
    temp.persist(path)
        .map_err(|e| cache_error(format!("failed to rename temp file: {}", e.error)))?;

    Ok(())
}

/// Set the access time of `path` to now, keeping its modification time.
pub fn touch_access_time(path: &Path) -> PinsResult<()> {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .map_err(|e| PinsError::io(path.display().to_string(), e))?;
    file.set_times(FileTimes::new().set_accessed(SystemTime::now()))
        .map_err(|e| PinsError::io(path.display().to_string(), e))
}

/// Backend wrapper that keeps a local copy of every file it reads.
#[derive(Debug)]
pub struct CachedBackend<B> {
    inner: B,
    cache_dir: PathBuf,
}

impl<B: Backend> CachedBackend<B> {
    /// Cache `inner` under its board directory in `cache_root`.
    pub fn new(inner: B, cache_root: &Path) -> Self {
        let cache_dir = board_cache_dir(cache_root, inner.protocol(), &inner.root());
        Self { inner, cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn cached_path(&self, path: &str) -> PinsResult<PathBuf> {
        // absolute URLs on url boards have no board relative layout
        if path.contains("://") {
            let file_name = path
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .unwrap_or("file");
            return Ok(self
                .cache_dir
                .join(sha256_hex_bytes(path.as_bytes()))
                .join(file_name));
        }

        check_relative(path)?;
        Ok(self.cache_dir.join(path))
    }

    /// Fetch `path` into the cache if needed and return the cached file.
    async fn fetch(&self, path: &str) -> PinsResult<(PathBuf, Option<Vec<u8>>)> {
        let cached = self.cached_path(path)?;

        if fs::try_exists(&cached).await.unwrap_or(false) {
            debug!(path, cached = %cached.display(), "cache hit");
            if let Err(e) = touch_access_time(&cached) {
                warn!(error = %e, "failed to update cache access time");
            }
            return Ok((cached, None));
        }

        debug!(path, "cache miss");
        let bytes = self.inner.read(path).await?;

        if let Some(parent) = cached.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| cache_error(format!("failed to create cache directory: {}", e)))?;
        }
        write_atomic(&cached, &bytes).await?;
        info!(cached = %cached.display(), "cache file");

        Ok((cached, Some(bytes)))
    }
}

#[async_trait]
impl<B: Backend> Backend for CachedBackend<B> {
    fn protocol(&self) -> &str {
        self.inner.protocol()
    }

    fn root(&self) -> String {
        self.inner.root()
    }

    async fn ls(&self, dir: &str) -> PinsResult<Vec<String>> {
        self.inner.ls(dir).await
    }

    async fn exists(&self, path: &str) -> PinsResult<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &str) -> PinsResult<Vec<u8>> {
        match self.fetch(path).await? {
            (_, Some(bytes)) => Ok(bytes),
            (cached, None) => fs::read(&cached)
                .await
                .map_err(|e| PinsError::io(cached.display().to_string(), e)),
        }
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> PinsResult<()> {
        self.inner.write(path, bytes).await
    }

    async fn mkdir(&self, path: &str) -> PinsResult<()> {
        self.inner.mkdir(path).await
    }

    async fn rm(&self, path: &str) -> PinsResult<()> {
        self.inner.rm(path).await?;

        let cached = self.cached_path(path)?;
        if let Ok(metadata) = fs::metadata(&cached).await {
            let result = if metadata.is_dir() {
                fs::remove_dir_all(&cached).await
            } else {
                fs::remove_file(&cached).await
            };
            result.map_err(|e| cache_error(format!("failed to evict cache entry: {}", e)))?;
            debug!(path, "evicted from cache");
        }
        Ok(())
    }

    async fn local_path(&self, path: &str) -> PinsResult<Option<PathBuf>> {
        let (cached, _) = self.fetch(path).await?;
        Ok(Some(cached))
    }
}

/// Finds stale pin versions in one board cache directory.
///
/// Assumes the layout `<board cache>/<pin>/<version>/data.txt`.
#[derive(Debug, Clone)]
pub struct CachePruner {
    cache_dir: PathBuf,
}

impl CachePruner {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Cached version directories, i.e. those holding a `data.txt`.
    pub fn versions(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for pin in sorted_children(&self.cache_dir) {
            for version in sorted_children(&pin) {
                if version.is_dir() && version.join(META_FILENAME).exists() {
                    found.push(version);
                }
            }
        }
        found
    }

    /// Whether the version's `data.txt` was last accessed more than `days` ago.
    pub fn should_prune_version(&self, days: u64, path: &Path) -> PinsResult<bool> {
        let meta_path = path.join(META_FILENAME);
        let accessed = std::fs::metadata(&meta_path)
            .and_then(|m| m.accessed())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => cache_error(format!(
                    "no metadata file {} in cached version",
                    meta_path.display()
                )),
                _ => PinsError::io(meta_path.display().to_string(), e),
            })?;

        let expiry = Duration::from_secs(days.saturating_mul(24 * 60 * 60));
        let age = SystemTime::now()
            .duration_since(accessed)
            .unwrap_or(Duration::ZERO);

        Ok(age > expiry)
    }

    pub fn old_versions(&self, days: u64) -> PinsResult<Vec<PathBuf>> {
        let mut old = Vec::new();
        for version in self.versions() {
            if self.should_prune_version(days, &version)? {
                old.push(version);
            }
        }
        Ok(old)
    }
}

fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    children.sort();
    children
}

/// Total size in bytes of the files under `path`.
pub fn disk_usage(path: &Path) -> u64 {
    if path.is_file() {
        return std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    }
    sorted_children(path).iter().map(|p| disk_usage(p)).sum()
}

/// Human readable size in binary units, e.g. `1.5 KiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    match bytes {
        1 => "1 Byte".to_string(),
        b if b < 1024 => format!("{b} Bytes"),
        _ => {
            let mut size = bytes as f64 / 1024.0;
            let mut unit = 0;
            while size >= 1024.0 && unit < UNITS.len() - 1 {
                size /= 1024.0;
                unit += 1;
            }
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

/// Disk usage of one board cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCacheInfo {
    /// Directory name relative to the cache root.
    pub name: String,
    pub size: u64,
}

/// Disk usage of every board cache under `cache_root`.
pub fn cache_info(cache_root: &Path) -> Vec<BoardCacheInfo> {
    sorted_children(cache_root)
        .into_iter()
        .filter(|p| p.is_dir())
        .map(|p| BoardCacheInfo {
            name: p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: disk_usage(&p),
        })
        .collect()
}

/// Delete cached versions not accessed in `days` days, across all boards.
///
/// `confirm` receives the stale versions and their total size; nothing is
/// deleted unless it returns `true`. Returns the deleted directories.
pub fn cache_prune<F>(days: u64, cache_root: &Path, confirm: F) -> PinsResult<Vec<PathBuf>>
where
    F: FnOnce(&[PathBuf], u64) -> bool,
{
    let mut stale = Vec::new();
    for board in sorted_children(cache_root) {
        if board.is_dir() {
            stale.extend(CachePruner::new(board).old_versions(days)?);
        }
    }

    if stale.is_empty() {
        inform("No stale pins found");
        return Ok(stale);
    }

    let size: u64 = stale.iter().map(|p| disk_usage(p)).sum();
    if !confirm(&stale, size) {
        info!(count = stale.len(), "cache prune cancelled");
        return Ok(Vec::new());
    }

    for version in &stale {
        debug!(path = %version.display(), "deleting cached version");
        std::fs::remove_dir_all(version)
            .map_err(|e| PinsError::io(version.display().to_string(), e))?;
    }
    inform(&format!(
        "Deleted {} cached pin versions, freeing {}",
        stale.len(),
        format_size(size)
    ));

    Ok(stale)
}
