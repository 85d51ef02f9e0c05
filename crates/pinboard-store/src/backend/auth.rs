//! Api key authentication for the publishing service.

use crate::config::ENV_API_KEY;
use crate::error::PinsResult;

/// Token provider for publishing service requests.
#[derive(Clone, Default)]
pub enum TokenProvider {
    /// Static api key (from config or env).
    Static(String),

    /// No authentication.
    #[default]
    None,
}

impl TokenProvider {
    /// Create a static token provider.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Create from `PINBOARD_API_KEY`, falling back to no auth.
    pub fn from_env() -> Self {
        match std::env::var(ENV_API_KEY) {
            Ok(token) if !token.is_empty() => Self::Static(token),
            _ => Self::None,
        }
    }

    /// Get the current token.
    pub async fn get_token(&self) -> PinsResult<Option<String>> {
        match self {
            Self::Static(token) => Ok(Some(token.clone())),
            Self::None => Ok(None),
        }
    }

    /// Check if authentication is configured.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

// Keep keys out of logs and deparsed board expressions.
impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(***)"),
            Self::None => f.write_str("None"),
        }
    }
}
