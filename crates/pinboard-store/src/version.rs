//! Version identifiers.
//!
//! A pin version is named `<created>-<hash prefix>`, e.g.
//! `20220209T220116Z-baf3f`. The timestamp prefix makes lexicographic order
//! equal creation order. Identifiers that do not follow this form (written
//! by other tools, or by publishing services that use bundle ids) are kept
//! as raw strings.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::pin_hash;
use crate::error::{PinsError, PinsResult};

/// strftime format of the version timestamp.
pub const VERSION_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Number of hash characters kept in a version id.
pub const VERSION_HASH_LEN: usize = 5;

/// A version created from pin contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Creation time (second precision once rendered).
    pub created: DateTime<Utc>,

    /// Content hash (full, or the short form when parsed from an id).
    pub hash: String,
}

impl Version {
    pub fn new(created: DateTime<Utc>, hash: impl Into<String>) -> Self {
        Self {
            created,
            hash: hash.into(),
        }
    }

    /// Render the version id.
    pub fn version(&self) -> String {
        let hash_part: String = self.hash.chars().take(VERSION_HASH_LEN).collect();
        format!("{}-{}", self.render_created(), hash_part)
    }

    pub fn render_created(&self) -> String {
        self.created.format(VERSION_TIME_FORMAT).to_string()
    }

    pub fn parse_created(value: &str) -> PinsResult<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(value, VERSION_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|_| PinsError::InvalidVersion {
                message: format!("Invalid date part of version: {value}"),
            })
    }

    /// Parse a version id of the form `<created>-<hash>`.
    pub fn parse(version: &str) -> PinsResult<Self> {
        let parts: Vec<&str> = version.split('-').collect();

        if parts.len() != 2 {
            return Err(PinsError::InvalidVersion {
                message: format!(
                    "version string can only have 1 '-', but contains {}",
                    parts.len() - 1
                ),
            });
        }

        let created = Self::parse_created(parts[0])?;
        let parsed = Self::new(created, parts[1]);

        if parsed.version() != version {
            return Err(PinsError::InvalidVersion {
                message: format!(
                    "version parsing failed. Received version string {version}, but output version is {}",
                    parsed.version()
                ),
            });
        }

        Ok(parsed)
    }

    /// Build a version from the contents of the files in a pin.
    pub fn from_files<B: AsRef<[u8]>>(files: &[B], created: Option<DateTime<Utc>>) -> Self {
        Self::new(created.unwrap_or_else(Utc::now), pin_hash(files))
    }
}

/// A version id as found on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionId {
    /// Follows the `<created>-<hash>` convention.
    Stamped(Version),

    /// Any other directory name.
    Raw(String),
}

impl VersionId {
    /// Parse as a stamped version, falling back to a raw id.
    pub fn guess(value: &str) -> Self {
        match Version::parse(value) {
            Ok(version) => Self::Stamped(version),
            Err(_) => Self::Raw(value.to_string()),
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Self::Stamped(v) => v.version(),
            Self::Raw(raw) => raw.clone(),
        }
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Stamped(v) => Some(v.created),
            Self::Raw(_) => None,
        }
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Stamped(v) => Some(&v.hash),
            Self::Raw(_) => None,
        }
    }

    pub fn info(&self) -> VersionInfo {
        VersionInfo {
            version: self.as_string(),
            created: self.created(),
            hash: self.hash().map(String::from),
        }
    }
}

impl From<Version> for VersionId {
    fn from(version: Version) -> Self {
        Self::Stamped(version)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_string().cmp(&other.as_string())
    }
}

/// Flat view of a version, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_hex_bytes;
    use chrono::TimeZone;

    fn example_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 2, 13, 58, 59).unwrap()
    }

    #[test]
    fn version_from_string() {
        let version = Version::parse("20220209T220116Z-baf3f").unwrap();
        assert_eq!(
            version.created,
            Utc.with_ymd_and_hms(2022, 2, 9, 22, 1, 16).unwrap()
        );
        assert_eq!(version.hash, "baf3f");
    }

    #[test]
    fn version_from_string_too_many_hyphens() {
        let err = Version::parse("20220209T220116Z-baf3f-").unwrap_err();
        assert!(err
            .to_string()
            .contains("version string can only have 1 '-', but contains 2"));
    }

    #[test]
    fn version_from_string_too_few_hyphens() {
        let err = Version::parse("20220209T220116Zbaf3f").unwrap_err();
        assert!(err
            .to_string()
            .contains("version string can only have 1 '-', but contains 0"));
    }

    #[test]
    fn version_from_string_baddate() {
        let err = Version::parse("bug-baf3f").unwrap_err();
        assert!(err.to_string().contains("Invalid date part of version: bug"));
    }

    #[test]
    fn version_from_string_rejects_long_hash() {
        assert!(Version::parse("20220209T220116Z-baf3f00").is_err());
    }

    #[test]
    fn version_from_files() {
        let v = Version::from_files(&[b"123"], Some(example_date()));
        assert_eq!(v.hash, sha256_hex_bytes(b"123"));
        assert_eq!(v.created, example_date());
        assert_eq!(v.version(), format!("20210102T135859Z-{}", &v.hash[..5]));
    }

    #[test]
    fn guess_falls_back_to_raw() {
        assert!(matches!(
            VersionId::guess("20220209T220116Z-baf3f"),
            VersionId::Stamped(_)
        ));
        assert_eq!(VersionId::guess("1234"), VersionId::Raw("1234".into()));
    }

    #[test]
    fn version_ids_sort_by_creation() {
        let mut ids = vec![
            VersionId::guess("20220209T220116Z-baf3f"),
            VersionId::guess("20210101T000000Z-aaaaa"),
            VersionId::guess("20230101T000000Z-00000"),
        ];
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(VersionId::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "20210101T000000Z-aaaaa",
                "20220209T220116Z-baf3f",
                "20230101T000000Z-00000"
            ]
        );
    }
}
