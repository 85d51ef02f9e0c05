//! Board constructors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{Backend, LocalBackend, MemoryBackend, RemoteBackend, UrlBackend};
use crate::board::{Board, Origin};
use crate::cache::CachedBackend;
use crate::config::{cache_dir, data_dir, RemoteConfig};
use crate::error::{PinsError, PinsResult};

/// Storage protocol accepted by [`board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    File,
    Memory,
    Remote,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
            Self::Remote => "remote",
        }
    }
}

impl FromStr for Protocol {
    type Err = PinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "local" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            "remote" => Ok(Self::Remote),
            other => Err(PinsError::InvalidArgument {
                message: format!("unknown board protocol {other:?}; expected file, memory or remote"),
            }),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`board`].
#[derive(Debug, Clone)]
pub struct BoardOptions {
    /// Keep old versions on write.
    pub versioned: bool,

    /// Cache root for read-through caching. `None` picks the default:
    /// cached for remote boards, uncached for local ones.
    pub cache: Option<CacheSetting>,

    /// Connection settings for remote boards.
    pub remote: RemoteConfig,
}

/// Explicit cache choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSetting {
    Disabled,
    Dir(PathBuf),
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            versioned: true,
            cache: None,
            remote: RemoteConfig::from_env(),
        }
    }
}

/// General board constructor.
pub fn board(protocol: Protocol, path: &str, options: BoardOptions) -> PinsResult<Board> {
    let cache_root = match (&options.cache, protocol) {
        (Some(CacheSetting::Disabled), _) => None,
        (Some(CacheSetting::Dir(dir)), _) => Some(dir.clone()),
        (None, Protocol::Remote) => Some(cache_dir()?),
        (None, _) => None,
    };

    let (backend, origin): (Arc<dyn Backend>, Origin) = match protocol {
        Protocol::File => (
            maybe_cached(LocalBackend::new(path), cache_root.as_deref()),
            Origin::Folder(path.to_string()),
        ),
        Protocol::Memory => (
            maybe_cached(MemoryBackend::new(), cache_root.as_deref()),
            Origin::Memory,
        ),
        Protocol::Remote => {
            let backend = RemoteBackend::new(&options.remote, path)?;
            let origin = Origin::Remote {
                server_url: backend.server_url().to_string(),
                root: path.trim_matches('/').to_string(),
            };
            (maybe_cached(backend, cache_root.as_deref()), origin)
        }
    };

    debug!(protocol = %protocol, path, cached = cache_root.is_some(), "created board");
    Ok(Board::new(backend, options.versioned).with_origin(origin))
}

fn maybe_cached<B: Backend + 'static>(backend: B, cache_root: Option<&Path>) -> Arc<dyn Backend> {
    match cache_root {
        Some(root) => Arc::new(CachedBackend::new(backend, root)),
        None => Arc::new(backend),
    }
}

/// Board on a local folder.
pub fn board_folder(path: impl AsRef<Path>, versioned: bool) -> Board {
    let path = path.as_ref();
    Board::new(Arc::new(LocalBackend::new(path)), versioned)
        .with_origin(Origin::Folder(path.display().to_string()))
}

/// Board on a temporary directory, deleted when the last clone of the board drops.
pub fn board_temp(versioned: bool) -> PinsResult<Board> {
    Ok(Board::new(Arc::new(LocalBackend::temp()?), versioned).with_origin(Origin::Temp))
}

/// Folder board in the user data directory (see `PINBOARD_DATA_DIR`).
pub fn board_local(versioned: bool) -> PinsResult<Board> {
    Ok(board_folder(data_dir()?, versioned))
}

pub fn board_memory(versioned: bool) -> Board {
    Board::new(Arc::new(MemoryBackend::new()), versioned).with_origin(Origin::Memory)
}

/// Board on a publishing service, cached under the user cache directory.
pub fn board_remote(path: &str, config: RemoteConfig, versioned: bool) -> PinsResult<Board> {
    board(
        Protocol::Remote,
        path,
        BoardOptions {
            versioned,
            cache: None,
            remote: config,
        },
    )
}

/// Read-only board over pins published at fixed URLs under `base_url`.
///
/// Paths ending in `/` point at a version directory holding `data.txt`;
/// other paths are single files.
pub fn board_url(
    base_url: &str,
    pin_paths: BTreeMap<String, String>,
    cache_root: Option<&Path>,
) -> PinsResult<Board> {
    let cache_root = match cache_root {
        Some(root) => root.to_path_buf(),
        None => cache_dir()?,
    };

    let backend = CachedBackend::new(UrlBackend::new(base_url)?, &cache_root);
    Ok(Board::manual(Arc::new(backend), pin_paths).with_origin(Origin::Url(base_url.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn protocol_parsing() {
        assert_eq!("file".parse::<Protocol>().unwrap(), Protocol::File);
        assert_eq!("remote".parse::<Protocol>().unwrap(), Protocol::Remote);
        assert!("s3".parse::<Protocol>().is_err());
    }

    #[test]
    fn deparse_folder_and_memory() {
        assert_eq!(
            board_folder("a/b/c", true).deparse().unwrap(),
            "board_folder('a/b/c')"
        );
        assert_eq!(board_memory(true).deparse().unwrap(), "board_memory()");
    }

    #[test]
    fn deparse_remote_hides_api_key() {
        let config = RemoteConfig::default()
            .with_server_url("http://example.com")
            .with_api_key("xxx");
        let board = board(
            Protocol::Remote,
            "",
            BoardOptions {
                versioned: true,
                cache: Some(CacheSetting::Disabled),
                remote: config,
            },
        )
        .unwrap();

        let text = board.deparse().unwrap();
        assert_eq!(text, "board_remote(server_url='http://example.com')");
        assert!(!text.contains("xxx"));
    }

    #[test]
    fn deparse_url_board() {
        let temp = TempDir::new().unwrap();
        let mut paths = BTreeMap::new();
        paths.insert("df".to_string(), "df/20220214T163720Z-9bfad/".to_string());
        let board = board_url("https://example.com/pins", paths, Some(temp.path())).unwrap();

        assert_eq!(
            board.deparse().unwrap(),
            "board_url('https://example.com/pins', {'df': 'df/20220214T163720Z-9bfad/'})"
        );
    }

    #[test]
    fn remote_board_with_explicit_cache_dir() {
        let temp = TempDir::new().unwrap();
        let board = board(
            Protocol::Remote,
            "team",
            BoardOptions {
                versioned: true,
                cache: Some(CacheSetting::Dir(temp.path().to_path_buf())),
                remote: RemoteConfig::default(),
            },
        )
        .unwrap();
        assert_eq!(board.protocol(), "remote");
        assert_eq!(
            board.deparse().unwrap(),
            "board_remote('team', server_url='http://localhost:3939')"
        );
    }

    #[tokio::test]
    async fn temp_board_round_trip() {
        let board = board_temp(true).unwrap();
        board
            .pin_write(&"hello", crate::board::WriteOptions::new("greeting"))
            .await
            .unwrap();
        let value: String = board.pin_read("greeting", None, None).await.unwrap();
        assert_eq!(value, "hello");
        assert_eq!(board.deparse().unwrap(), "board_temp()");
    }
}
