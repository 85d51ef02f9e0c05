//! Publishing service backend.
//!
//! Files live under `{server}/fs/{root}/{path}`; directory listings come
//! from `{server}/ls/{root}/{dir}` as `{"entries": [...]}`. Directories are
//! implicit: writing a file creates its parents.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use tracing::debug;

use super::{check_relative, join_path, Backend, HttpTransport, TokenProvider};
use crate::config::RemoteConfig;
use crate::error::{PinsError, PinsResult};

#[derive(Debug, Deserialize)]
struct Listing {
    entries: Vec<String>,
}

/// Board storage on a publishing service.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    http: HttpTransport,
    server_url: String,
    base: Url,
    root: String,
}

impl RemoteBackend {
    /// Connect to the server in `config`; `root` is the board path on the server.
    pub fn new(config: &RemoteConfig, root: &str) -> PinsResult<Self> {
        let token_provider = config
            .api_key
            .as_ref()
            .map(TokenProvider::static_token)
            .unwrap_or_else(TokenProvider::from_env);

        Self::with_token_provider(config, root, token_provider)
    }

    pub fn with_token_provider(
        config: &RemoteConfig,
        root: &str,
        token_provider: TokenProvider,
    ) -> PinsResult<Self> {
        check_relative(root.trim_start_matches('/'))?;

        let server_url = config.server_url.trim_end_matches('/').to_string();
        let base = Url::parse(&server_url).map_err(|e| PinsError::Config {
            message: format!("invalid server url {server_url:?}: {e}"),
        })?;
        if base.cannot_be_a_base() {
            return Err(PinsError::Config {
                message: format!("server url {server_url:?} cannot hold paths"),
            });
        }

        Ok(Self {
            http: HttpTransport::new(config.timeout_secs, config.max_retries, token_provider)?,
            server_url,
            base,
            root: root.trim_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// `{server}/{endpoint}/{root}/{path}`, one percent-encoded segment per path part.
    fn url(&self, endpoint: &str, path: &str) -> PinsResult<String> {
        check_relative(path)?;

        let full = join_path(&[&self.root, path]);
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| PinsError::Config {
                message: format!("server url {:?} cannot hold paths", self.server_url),
            })?
            .pop_if_empty()
            .push(endpoint)
            .extend(full.split('/').filter(|part| !part.is_empty()));

        Ok(url.into())
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    fn protocol(&self) -> &str {
        "remote"
    }

    fn root(&self) -> String {
        format!("{}/{}", self.server_url, self.root)
    }

    async fn ls(&self, dir: &str) -> PinsResult<Vec<String>> {
        let url = self.url("ls", dir)?;
        let response = self.http.request(Method::GET, &url, None).await?;
        let listing: Listing = response.json().await.map_err(|e| PinsError::Network {
            message: format!("invalid listing from {}: {}", url, e),
        })?;

        let mut entries = listing.entries;
        entries.sort();
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> PinsResult<bool> {
        let url = self.url("fs", path)?;
        match self.http.request(Method::HEAD, &url, None).await {
            Ok(_) => Ok(true),
            Err(PinsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &str) -> PinsResult<Vec<u8>> {
        let url = self.url("fs", path)?;
        self.http.get_bytes(&url).await
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> PinsResult<()> {
        let url = self.url("fs", path)?;
        self.http.request(Method::PUT, &url, Some(bytes)).await?;
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> PinsResult<()> {
        debug!(path, "directories are implicit on the publishing service");
        Ok(())
    }

    async fn rm(&self, path: &str) -> PinsResult<()> {
        let url = self.url("fs", path)?;
        self.http.request(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn local_path(&self, _path: &str) -> PinsResult<Option<PathBuf>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(server_url: &str, root: &str) -> RemoteBackend {
        let config = RemoteConfig::default().with_server_url(server_url);
        RemoteBackend::new(&config, root).unwrap()
    }

    #[test]
    fn url_encodes_each_segment() {
        let backend = backend("http://example.com/api/", "team");
        assert_eq!(
            backend.url("fs", "a#b/v 1/data?.txt").unwrap(),
            "http://example.com/api/fs/team/a%23b/v%201/data%3F.txt"
        );
        assert_eq!(backend.url("ls", "").unwrap(), "http://example.com/api/ls/team");
    }

    #[test]
    fn invalid_server_url_is_a_config_error() {
        let config = RemoteConfig::default().with_server_url("not a url");
        assert!(matches!(
            RemoteBackend::new(&config, "team"),
            Err(PinsError::Config { .. })
        ));
    }
}
