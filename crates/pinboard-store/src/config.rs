//! Configuration from the environment.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `PINBOARD_DATA_DIR` | Folder used by `board_local` (default: user data dir) |
//! | `PINBOARD_CACHE_DIR` | Root of the read-through cache (default: user cache dir) |
//! | `PINBOARD_CONFIG_DIR` | CLI state such as the current board (default: user config dir) |
//! | `PINBOARD_QUIET` | `1` silences user notices on stderr |
//! | `PINBOARD_SERVER_URL` | Publishing service base URL |
//! | `PINBOARD_API_KEY` | Publishing service api key |
//! | `PINBOARD_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `PINBOARD_MAX_RETRIES` | Max retries for transient failures (default: 3) |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PinsError, PinsResult};

pub const PINBOARD_NAME: &str = "pinboard";
pub const ENV_DATA_DIR: &str = "PINBOARD_DATA_DIR";
pub const ENV_CACHE_DIR: &str = "PINBOARD_CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "PINBOARD_CONFIG_DIR";
pub const ENV_QUIET: &str = "PINBOARD_QUIET";
pub const ENV_SERVER_URL: &str = "PINBOARD_SERVER_URL";
pub const ENV_API_KEY: &str = "PINBOARD_API_KEY";
pub const ENV_TIMEOUT: &str = "PINBOARD_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "PINBOARD_MAX_RETRIES";

/// Read a `0`/`1` flag. Unset means `false`.
pub fn interpret_flag(var: &str) -> PinsResult<bool> {
    let raw = std::env::var(var).unwrap_or_else(|_| "0".to_string());
    match raw.trim().parse::<i64>() {
        Ok(value) => Ok(value != 0),
        Err(_) => Err(PinsError::Config {
            message: format!("{var} must be '0' or '1', but was set to {raw:?}."),
        }),
    }
}

fn dir_from_env(var: &str, fallback: Option<PathBuf>) -> PinsResult<PathBuf> {
    if let Ok(dir) = std::env::var(var) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    fallback
        .map(|base| base.join(PINBOARD_NAME))
        .ok_or_else(|| PinsError::Config {
            message: format!("could not determine a default directory; set {var}"),
        })
}

pub fn data_dir() -> PinsResult<PathBuf> {
    dir_from_env(ENV_DATA_DIR, dirs::data_dir().or_else(dirs::home_dir))
}

pub fn cache_dir() -> PinsResult<PathBuf> {
    dir_from_env(ENV_CACHE_DIR, dirs::cache_dir().or_else(dirs::home_dir))
}

pub fn config_dir() -> PinsResult<PathBuf> {
    dir_from_env(ENV_CONFIG_DIR, dirs::config_dir().or_else(dirs::home_dir))
}

/// Whether user notices are silenced. Invalid values count as not quiet.
pub fn quiet() -> bool {
    interpret_flag(ENV_QUIET).unwrap_or(false)
}

/// Log a user facing notice and echo it to stderr unless quiet.
pub fn inform(msg: &str) {
    info!("{}", msg);

    if !quiet() {
        eprintln!("{msg}");
    }
}

/// Publishing service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the service.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Api key, sent as a bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_server_url() -> String {
    "http://localhost:3939".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl RemoteConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var(ENV_SERVER_URL).unwrap_or_else(|_| default_server_url()),
            api_key: std::env::var(ENV_API_KEY).ok().filter(|k| !k.is_empty()),
            timeout_secs: std::env::var(ENV_TIMEOUT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var(ENV_MAX_RETRIES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
        }
    }

    /// Set the api key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}
