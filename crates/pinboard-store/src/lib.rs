//! Versioned artifact boards.
//!
//! A board stores named, versioned pins on a storage backend:
//!
//! - Local folders, temporary directories and in-memory stores
//! - A remote publishing service over HTTP, with a read-through disk cache
//! - Read-only pins published at plain URLs
//!
//! Every version carries a `data.txt` metadata record with the content
//! hash of its files; reads verify it.
//!
//! # Quick Start
//!
//! ```no_run
//! use pinboard_store::{board_folder, WriteOptions};
//!
//! # async fn example() -> Result<(), pinboard_store::PinsError> {
//! let board = board_folder("/tmp/my-board", true);
//!
//! board
//!     .pin_write(&vec![1, 2, 3], WriteOptions::new("numbers").with_title("Some numbers"))
//!     .await?;
//!
//! let numbers: Vec<i32> = board.pin_read("numbers", None, None).await?;
//! assert_eq!(numbers, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `PINBOARD_DATA_DIR` | Folder used by `board_local` |
//! | `PINBOARD_CACHE_DIR` | Root of the read-through cache |
//! | `PINBOARD_CONFIG_DIR` | CLI state |
//! | `PINBOARD_QUIET` | `1` silences notices on stderr |
//! | `PINBOARD_SERVER_URL` | Publishing service base URL |
//! | `PINBOARD_API_KEY` | Publishing service api key |
//! | `PINBOARD_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `PINBOARD_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod backend;
pub mod board;
pub mod cache;
pub mod config;
pub mod constructors;
mod digest;
pub mod drivers;
pub mod error;
pub mod meta;
pub mod version;

// Re-export main types
pub use backend::{Backend, LocalBackend, MemoryBackend, RemoteBackend, TokenProvider, UrlBackend};
pub use board::{validate_pin_name, Board, Prune, SearchRow, WriteOptions};
pub use cache::{cache_info, cache_prune, format_size, BoardCacheInfo, CachePruner, CachedBackend};
pub use config::{inform, RemoteConfig};
pub use constructors::{
    board, board_folder, board_local, board_memory, board_remote, board_temp, board_url,
    BoardOptions, CacheSetting, Protocol,
};
pub use drivers::{PinFile, PinType};
pub use error::{PinsError, PinsResult};
pub use meta::{Meta, MetaRaw, MetaV0, PinMeta};
pub use version::{Version, VersionId, VersionInfo};
