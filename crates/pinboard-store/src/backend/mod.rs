//! Storage backends.
//!
//! A backend is a small filesystem-like interface over one storage medium.
//! Paths are `/` separated and relative to the backend root; the empty
//! string is the root itself.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{PinsError, PinsResult};

mod auth;
mod http;
mod local;
mod memory;
mod remote;
mod url;

pub use auth::TokenProvider;
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use remote::RemoteBackend;
pub use url::UrlBackend;

pub(crate) use http::HttpTransport;

/// Filesystem-like access to a storage medium.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// Protocol name (`file`, `memory`, `remote`, `http`).
    fn protocol(&self) -> &str;

    /// Location of the backend root, as shown to users.
    fn root(&self) -> String;

    /// Names of the direct children of `dir`.
    async fn ls(&self, dir: &str) -> PinsResult<Vec<String>>;

    async fn exists(&self, path: &str) -> PinsResult<bool>;

    async fn read(&self, path: &str) -> PinsResult<Vec<u8>>;

    /// Write a file, creating parent directories.
    async fn write(&self, path: &str, bytes: &[u8]) -> PinsResult<()>;

    async fn mkdir(&self, path: &str) -> PinsResult<()>;

    /// Remove a file or a directory tree.
    async fn rm(&self, path: &str) -> PinsResult<()>;

    /// A readable path on local disk for `path`, when the backend has one.
    async fn local_path(&self, path: &str) -> PinsResult<Option<PathBuf>>;
}

/// Join path segments, skipping empty ones.
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject paths that would escape the backend root.
pub(crate) fn check_relative(path: &str) -> PinsResult<()> {
    if path.starts_with('/') || path.split('/').any(|part| part == ".." || part == ".") {
        return Err(PinsError::InvalidArgument {
            message: format!("path must be relative to the board root: {path}"),
        });
    }
    Ok(())
}
