use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Method, Url};

use super::{Backend, HttpTransport, TokenProvider};
use crate::config::RemoteConfig;
use crate::error::{PinsError, PinsResult};

/// Read-only files served over plain HTTP under a base URL.
#[derive(Debug, Clone)]
pub struct UrlBackend {
    http: HttpTransport,
    base_url: String,
    base: Option<Url>,
}

impl UrlBackend {
    pub fn new(base_url: &str) -> PinsResult<Self> {
        let defaults = RemoteConfig::default();
        let base_url = base_url.trim_end_matches('/').to_string();
        // a trailing slash makes relative paths resolve under the base
        let base = if base_url.is_empty() {
            None
        } else {
            Some(Url::parse(&format!("{base_url}/")).map_err(|e| PinsError::InvalidArgument {
                message: format!("invalid board url {base_url:?}: {e}"),
            })?)
        };

        Ok(Self {
            http: HttpTransport::new(
                defaults.timeout_secs,
                defaults.max_retries,
                TokenProvider::None,
            )?,
            base_url,
            base,
        })
    }

    /// Resolve a pin path, which is a URL reference relative to the base.
    fn url(&self, path: &str) -> PinsResult<String> {
        let resolved = match &self.base {
            Some(base) => base.join(path.trim_start_matches('/')),
            None => Url::parse(path),
        };

        resolved
            .map(String::from)
            .map_err(|e| PinsError::InvalidArgument {
                message: format!("invalid pin url {path:?}: {e}"),
            })
    }

    fn read_only(&self) -> PinsError {
        PinsError::ReadOnly {
            protocol: self.protocol().to_string(),
        }
    }
}

#[async_trait]
impl Backend for UrlBackend {
    fn protocol(&self) -> &str {
        "http"
    }

    fn root(&self) -> String {
        self.base_url.clone()
    }

    async fn ls(&self, dir: &str) -> PinsResult<Vec<String>> {
        Err(PinsError::Unsupported {
            message: format!("cannot list {dir:?} under {} over plain http", self.base_url),
        })
    }

    async fn exists(&self, path: &str) -> PinsResult<bool> {
        match self.http.request(Method::HEAD, &self.url(path)?, None).await {
            Ok(_) => Ok(true),
            Err(PinsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &str) -> PinsResult<Vec<u8>> {
        self.http.get_bytes(&self.url(path)?).await
    }

    async fn write(&self, _path: &str, _bytes: &[u8]) -> PinsResult<()> {
        Err(self.read_only())
    }

    async fn mkdir(&self, _path: &str) -> PinsResult<()> {
        Err(self.read_only())
    }

    async fn rm(&self, _path: &str) -> PinsResult<()> {
        Err(self.read_only())
    }

    async fn local_path(&self, _path: &str) -> PinsResult<Option<PathBuf>> {
        Ok(None)
    }
}
