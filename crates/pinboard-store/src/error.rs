//! Error types for boards and backends.

use std::time::Duration;

/// Board and backend errors.
#[derive(Debug, thiserror::Error)]
pub enum PinsError {
    /// Pin does not exist on the board.
    #[error("pin not found: {name}")]
    PinNotFound { name: String },

    /// Pin exists but the requested version does not.
    #[error("pin {name} either does not exist, or is missing version: {version}")]
    VersionNotFound { name: String, version: String },

    /// Pin directory exists but holds no versions.
    #[error("pin {name} has no versions")]
    NoVersions { name: String },

    /// Pin name failed validation.
    #[error("invalid pin name: {name} - {reason}")]
    InvalidName { name: String, reason: String },

    /// Version string could not be parsed.
    #[error("invalid version: {message}")]
    InvalidVersion { message: String },

    /// Argument out of range or missing.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Unversioned write requested on a pin that already has several versions.
    #[error(
        "pin {name} is versioned, but you have requested a write without versions. \
         To un-version a pin, you must delete it"
    )]
    VersionConflict { name: String },

    /// Target version directory already exists.
    #[error("attempting to write pin version to {path}, but that directory already exists")]
    VersionExists { path: String },

    /// Stored bytes or a caller supplied hash do not match the metadata.
    #[error("hash mismatch for {name}@{version}: expected {expected}, got {actual}")]
    HashMismatch {
        name: String,
        version: String,
        expected: String,
        actual: String,
    },

    /// Pin type has no reader/writer.
    #[error("unsupported pin type {pin_type}: {message}")]
    UnsupportedType { pin_type: String, message: String },

    /// Metadata api_version newer than this library understands.
    #[error("unsupported metadata api_version: {api_version}")]
    UnsupportedApiVersion { api_version: u64 },

    /// Operation is not available on this board.
    #[error("unsupported operation: {message}")]
    Unsupported { message: String },

    /// Backend does not accept writes.
    #[error("backend is read-only: {protocol}")]
    ReadOnly { protocol: String },

    /// Backend cannot provide local file paths.
    #[error("pin_download requires a cache for {protocol} boards")]
    CacheRequired { protocol: String },

    /// Single-file pin type stored with several files.
    #[error("cannot load {pin_type} data when pin has more than 1 file")]
    MultipleFiles { pin_type: String },

    /// Path missing on the backend.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Authentication failed or api key invalid.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Filesystem error.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Metadata file could not be read or written.
    #[error("metadata error: {message}")]
    Meta { message: String },

    /// Pin data could not be serialized or deserialized.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Cache error.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl PinsError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Missing things / bad input
            Self::PinNotFound { .. } => 1,
            Self::VersionNotFound { .. } => 1,
            Self::NoVersions { .. } => 1,
            Self::NotFound { .. } => 1,
            Self::InvalidName { .. } => 1,
            Self::InvalidVersion { .. } => 1,
            Self::InvalidArgument { .. } => 1,
            Self::Config { .. } => 1,

            // Auth issues
            Self::Unauthorized { .. } => 2,

            // Version bookkeeping
            Self::VersionConflict { .. } => 3,
            Self::VersionExists { .. } => 3,

            // Integrity
            Self::HashMismatch { .. } => 4,

            // Network/transient
            Self::RateLimited { .. } => 5,
            Self::Network { .. } => 5,

            // Capability gaps
            Self::UnsupportedType { .. } => 6,
            Self::UnsupportedApiVersion { .. } => 6,
            Self::Unsupported { .. } => 6,
            Self::ReadOnly { .. } => 6,
            Self::CacheRequired { .. } => 6,
            Self::MultipleFiles { .. } => 6,

            // Storage
            Self::Io { .. } => 7,
            Self::Meta { .. } => 7,
            Self::Serialization { .. } => 7,
            Self::Cache { .. } => 7,
        }
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }

    /// Whether the error means "nothing stored at this path".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for PinsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for board operations.
pub type PinsResult<T> = Result<T, PinsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors_are_transient_only() {
        assert!(PinsError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(PinsError::RateLimited { retry_after: None }.is_retryable());
        assert!(!PinsError::PinNotFound { name: "x".into() }.is_retryable());
    }

    #[test]
    fn io_not_found_counts_as_not_found() {
        let err = PinsError::io(
            "a/b",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn version_conflict_message_mentions_deletion() {
        let err = PinsError::VersionConflict { name: "mtcars".into() };
        assert!(err.to_string().contains("you must delete it"));
    }
}
