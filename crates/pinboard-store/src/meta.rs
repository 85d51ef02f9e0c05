//! Pin metadata.
//!
//! Every stored version carries a `data.txt` YAML file:
//!
//! ```text
//! title: 'mtcars: a pinned list of 32 items'
//! description: null
//! created: 20220214T163720Z
//! pin_hash: 9bfad...
//! file: mtcars.json
//! file_size: 1024
//! type: json
//! api_version: 1
//! user: {}
//! ```
//!
//! Files without `api_version` were written by the first generation of the
//! format and are read as [`MetaV0`]. Fields supplied by the board at read
//! time (`name`, `version`, `local`) are never written.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::drivers::{PinFile, PinType};
use crate::error::{PinsError, PinsResult};
use crate::version::{Version, VersionId};

/// Name of the metadata file inside a version directory.
pub const META_FILENAME: &str = "data.txt";

/// Metadata format version written by this library.
pub const DEFAULT_API_VERSION: u64 = 1;

/// A field that holds either one value or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item.clone()],
            Self::Many(items) => items.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_vec(mut items: Vec<T>) -> Self {
        if items.len() == 1 {
            Self::One(items.remove(0))
        } else {
            Self::Many(items)
        }
    }
}

/// Metadata for a pin version (api_version 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Creation time in version timestamp format.
    pub created: String,
    pub pin_hash: String,
    /// File(s) in the version, relative to the version directory.
    pub file: OneOrMany<String>,
    pub file_size: OneOrMany<u64>,
    pub pin_type: PinType,
    pub api_version: u64,
    pub tags: Option<Vec<String>>,
    pub name: Option<String>,
    /// Additional metadata supplied by the user.
    pub user: serde_yaml::Mapping,
    pub version: VersionId,
    /// Backend specific details added at read time.
    pub local: BTreeMap<String, String>,
    /// Keys found in storage that this library does not know about.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// On-disk shape of [`Meta`].
#[derive(Debug, Serialize, Deserialize)]
struct MetaRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    created: String,
    pin_hash: String,
    file: OneOrMany<String>,
    file_size: OneOrMany<u64>,
    #[serde(rename = "type")]
    pin_type: PinType,
    api_version: u64,
    // tags are read but not written yet
    #[serde(default, skip_serializing)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    user: serde_yaml::Mapping,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl Meta {
    /// Build metadata for freshly staged pin files.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        files: &[PinFile],
        pin_type: PinType,
        name: &str,
        title: String,
        description: Option<String>,
        created: Option<chrono::DateTime<chrono::Utc>>,
        user: Option<serde_yaml::Mapping>,
    ) -> PinsResult<Self> {
        if files.is_empty() {
            return Err(PinsError::InvalidArgument {
                message: "a pin needs at least one file".to_string(),
            });
        }

        let contents: Vec<&[u8]> = files.iter().map(|f| f.bytes.as_slice()).collect();
        let version = Version::from_files(&contents, created);

        Ok(Self {
            title: Some(title),
            description,
            created: version.render_created(),
            pin_hash: version.hash.clone(),
            file: OneOrMany::from_vec(files.iter().map(|f| f.name.clone()).collect()),
            file_size: OneOrMany::from_vec(files.iter().map(|f| f.bytes.len() as u64).collect()),
            pin_type,
            api_version: DEFAULT_API_VERSION,
            tags: None,
            name: Some(name.to_string()),
            user: user.unwrap_or_default(),
            version: VersionId::Stamped(version),
            local: BTreeMap::new(),
            extra: BTreeMap::new(),
        })
    }

    /// Render the stored form (`data.txt`).
    pub fn to_pin_yaml(&self) -> PinsResult<String> {
        let record = MetaRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            created: self.created.clone(),
            pin_hash: self.pin_hash.clone(),
            file: self.file.clone(),
            file_size: self.file_size.clone(),
            pin_type: self.pin_type.clone(),
            api_version: self.api_version,
            tags: None,
            user: self.user.clone(),
            extra: self.extra.clone(),
        };

        serde_yaml::to_string(&record).map_err(|e| PinsError::Meta {
            message: format!("failed to serialize metadata: {e}"),
        })
    }

    /// Stored fields as a generic value (what `to_pin_yaml` writes).
    pub fn to_pin_value(&self) -> PinsResult<serde_yaml::Value> {
        serde_yaml::from_str(&self.to_pin_yaml()?).map_err(|e| PinsError::Meta {
            message: format!("failed to convert metadata: {e}"),
        })
    }

    fn from_record(
        record: MetaRecord,
        name: &str,
        version: VersionId,
        local: BTreeMap<String, String>,
    ) -> Self {
        Self {
            title: record.title,
            description: record.description,
            created: record.created,
            pin_hash: record.pin_hash,
            file: record.file,
            file_size: record.file_size,
            pin_type: record.pin_type,
            api_version: record.api_version,
            tags: record.tags,
            name: Some(name.to_string()),
            user: record.user,
            version,
            local,
            extra: record.extra,
        }
    }

    pub fn total_file_size(&self) -> u64 {
        self.file_size.to_vec().iter().sum()
    }
}

/// Metadata written before `api_version` existed. Read only.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaV0 {
    pub file: OneOrMany<String>,
    pub pin_type: PinType,
    pub description: Option<String>,
    pub name: String,
    pub version: VersionId,
    /// Raw `data.txt` contents.
    pub original_fields: serde_yaml::Mapping,
    pub local: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MetaV0Record {
    path: OneOrMany<String>,
    #[serde(rename = "type", default)]
    pin_type: Option<PinType>,
    #[serde(default)]
    description: Option<String>,
}

/// Bare description of a file that has no metadata (e.g. a plain URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRaw {
    pub file: String,
    pub pin_type: PinType,
    pub name: String,
}

/// Metadata of any generation.
#[derive(Debug, Clone, PartialEq)]
pub enum PinMeta {
    Current(Meta),
    Legacy(MetaV0),
    Raw(MetaRaw),
}

impl PinMeta {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Current(m) => m.name.as_deref(),
            Self::Legacy(m) => Some(&m.name),
            Self::Raw(m) => Some(&m.name),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Current(m) => m.title.as_deref(),
            Self::Legacy(_) | Self::Raw(_) => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Current(m) => m.description.as_deref(),
            Self::Legacy(m) => m.description.as_deref(),
            Self::Raw(_) => None,
        }
    }

    pub fn pin_type(&self) -> &PinType {
        match self {
            Self::Current(m) => &m.pin_type,
            Self::Legacy(m) => &m.pin_type,
            Self::Raw(m) => &m.pin_type,
        }
    }

    pub fn files(&self) -> Vec<String> {
        match self {
            Self::Current(m) => m.file.to_vec(),
            Self::Legacy(m) => m.file.to_vec(),
            Self::Raw(m) => vec![m.file.clone()],
        }
    }

    pub fn version(&self) -> Option<&VersionId> {
        match self {
            Self::Current(m) => Some(&m.version),
            Self::Legacy(m) => Some(&m.version),
            Self::Raw(_) => None,
        }
    }

    pub fn created(&self) -> Option<&str> {
        match self {
            Self::Current(m) => Some(&m.created),
            Self::Legacy(_) | Self::Raw(_) => None,
        }
    }

    pub fn pin_hash(&self) -> Option<&str> {
        match self {
            Self::Current(m) => Some(&m.pin_hash),
            Self::Legacy(_) | Self::Raw(_) => None,
        }
    }

    pub fn file_size(&self) -> Option<u64> {
        match self {
            Self::Current(m) => Some(m.total_file_size()),
            Self::Legacy(_) | Self::Raw(_) => None,
        }
    }

    /// The stored fields, for display.
    pub fn to_pin_value(&self) -> PinsResult<serde_yaml::Value> {
        match self {
            Self::Current(m) => m.to_pin_value(),
            Self::Legacy(m) => Ok(serde_yaml::Value::Mapping(m.original_fields.clone())),
            Self::Raw(m) => {
                let mut map = serde_yaml::Mapping::new();
                map.insert("file".into(), m.file.clone().into());
                map.insert("type".into(), m.pin_type.as_str().into());
                Ok(serde_yaml::Value::Mapping(map))
            }
        }
    }

    /// Render in stored form. Only current metadata can be written.
    pub fn to_pin_yaml(&self) -> PinsResult<String> {
        match self {
            Self::Current(m) => m.to_pin_yaml(),
            Self::Legacy(_) => Err(PinsError::Unsupported {
                message: "v0 pins metadata are read only".to_string(),
            }),
            Self::Raw(_) => Err(PinsError::Unsupported {
                message: "raw pins have no metadata file".to_string(),
            }),
        }
    }

    pub fn as_current(&self) -> Option<&Meta> {
        match self {
            Self::Current(m) => Some(m),
            _ => None,
        }
    }
}

/// Parse a `data.txt` file, choosing the metadata generation from `api_version`.
pub fn read_pin_yaml(
    content: &[u8],
    pin_name: &str,
    version: VersionId,
    local: BTreeMap<String, String>,
) -> PinsResult<PinMeta> {
    let data: serde_yaml::Value = serde_yaml::from_slice(content).map_err(|e| PinsError::Meta {
        message: format!("failed to parse metadata for {pin_name}: {e}"),
    })?;

    let api_version = data
        .get("api_version")
        .and_then(serde_yaml::Value::as_u64)
        .unwrap_or(0);

    match api_version {
        0 => {
            let record: MetaV0Record =
                serde_yaml::from_value(data.clone()).map_err(|e| PinsError::Meta {
                    message: format!("invalid v0 metadata for {pin_name}: {e}"),
                })?;
            let original_fields = match data {
                serde_yaml::Value::Mapping(map) => map,
                _ => serde_yaml::Mapping::new(),
            };
            Ok(PinMeta::Legacy(MetaV0 {
                file: record.path,
                pin_type: record.pin_type.unwrap_or(PinType::File),
                description: record.description,
                name: pin_name.to_string(),
                version,
                original_fields,
                local,
            }))
        }
        1 => {
            let record: MetaRecord = serde_yaml::from_value(data).map_err(|e| PinsError::Meta {
                message: format!("invalid metadata for {pin_name}: {e}"),
            })?;
            Ok(PinMeta::Current(Meta::from_record(
                record, pin_name, version, local,
            )))
        }
        other => Err(PinsError::UnsupportedApiVersion { api_version: other }),
    }
}
