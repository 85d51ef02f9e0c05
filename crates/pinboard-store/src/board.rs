//! Boards: named, versioned pins on top of a storage backend.
//!
//! # Layout
//!
//! ```text
//! {board root}/
//!   {pin name}/
//!     {version}/        # e.g. 20220209T220116Z-baf3f
//!       data.txt        # metadata (YAML)
//!       {pin files}
//! ```
//!
//! Url boards instead map each pin name to a path under a base URL. A path
//! ending in `/` points at a version directory; anything else is a single
//! file without metadata.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{join_path, Backend};
use crate::config::inform;
use crate::digest::pin_hash;
use crate::drivers::{check_writable, default_title, load_data, save_data, PinFile, PinType};
use crate::error::{PinsError, PinsResult};
use crate::meta::{read_pin_yaml, Meta, MetaRaw, PinMeta, META_FILENAME};
use crate::version::{VersionId, VERSION_HASH_LEN};

/// Names that can never be used for pins.
pub const RESERVED_PIN_NAMES: &[&str] = &["_pins.yaml"];

/// Check that `name` can be used as a pin name.
pub fn validate_pin_name(name: &str) -> PinsResult<()> {
    let reason = if name.trim().is_empty() {
        "pin names cannot be empty"
    } else if name.contains('/') {
        "pin names cannot contain '/'"
    } else if name == "." || name == ".." {
        "pin names cannot be '.' or '..'"
    } else if RESERVED_PIN_NAMES.contains(&name) {
        "this name is reserved"
    } else {
        return Ok(());
    };

    Err(PinsError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Check that `version` names a single version directory.
fn validate_version_name(version: &str) -> PinsResult<()> {
    if version.trim().is_empty() || version == "." || version == ".." || version.contains('/') {
        return Err(PinsError::InvalidVersion {
            message: format!("{version:?} is not a version name"),
        });
    }
    Ok(())
}

/// Options for [`Board::pin_write`] and [`Board::pin_upload`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub name: String,

    /// Storage format. Ignored by `pin_upload`, which always stores `file`.
    pub pin_type: PinType,

    /// Defaults to a short description of the pinned value.
    pub title: Option<String>,
    pub description: Option<String>,

    /// User metadata, stored under `user`.
    pub metadata: Option<serde_yaml::Mapping>,

    /// Overrides the board default.
    pub versioned: Option<bool>,

    /// Creation time; defaults to now.
    pub created: Option<DateTime<Utc>>,

    /// Write even when the content hash matches the newest version.
    pub force_identical_write: bool,
}

impl WriteOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pin_type: PinType::Json,
            title: None,
            description: None,
            metadata: None,
            versioned: None,
            created: None,
            force_identical_write: false,
        }
    }

    pub fn with_type(mut self, pin_type: impl Into<PinType>) -> Self {
        self.pin_type = pin_type.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_yaml::Mapping) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_versioned(mut self, versioned: bool) -> Self {
        self.versioned = Some(versioned);
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn force_identical_write(mut self) -> Self {
        self.force_identical_write = true;
        self
    }
}

/// How many versions [`Board::pin_versions_prune`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prune {
    /// Keep the newest `n` versions.
    Keep(u32),

    /// Keep versions created in the last `days` days.
    Days(u32),
}

/// Selected fields of a pin, as listed by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRow {
    pub name: String,
    #[serde(rename = "type")]
    pub pin_type: String,
    pub title: Option<String>,
    pub created: Option<String>,
    pub file_size: Option<u64>,
}

impl From<&PinMeta> for SearchRow {
    fn from(meta: &PinMeta) -> Self {
        Self {
            name: meta.name().unwrap_or_default().to_string(),
            pin_type: meta.pin_type().to_string(),
            title: meta.title().map(String::from),
            created: meta.created().map(String::from),
            file_size: meta.file_size(),
        }
    }
}

/// How pin paths are resolved.
#[derive(Debug, Clone)]
enum Layout {
    /// `{pin}/{version}/...` under the backend root.
    Standard,

    /// Fixed map of pin name to path.
    Manual(BTreeMap<String, String>),
}

/// Where a board came from, for [`Board::deparse`].
#[derive(Debug, Clone)]
pub(crate) enum Origin {
    Folder(String),
    Temp,
    Memory,
    Remote { server_url: String, root: String },
    Url(String),
    Custom,
}

/// A set of pins on one backend.
#[derive(Debug, Clone)]
pub struct Board {
    backend: Arc<dyn Backend>,
    versioned: bool,
    layout: Layout,
    origin: Origin,
}

impl Board {
    /// Standard board over any backend.
    pub fn new(backend: Arc<dyn Backend>, versioned: bool) -> Self {
        Self {
            backend,
            versioned,
            layout: Layout::Standard,
            origin: Origin::Custom,
        }
    }

    /// Read-only board over a fixed map of pin name to path.
    pub fn manual(backend: Arc<dyn Backend>, pin_paths: BTreeMap<String, String>) -> Self {
        Self {
            backend,
            versioned: false,
            layout: Layout::Manual(pin_paths),
            origin: Origin::Custom,
        }
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn protocol(&self) -> &str {
        self.backend.protocol()
    }

    /// Default for writes that do not choose.
    pub fn versioned(&self) -> bool {
        self.versioned
    }

    fn pin_paths(&self) -> Option<&BTreeMap<String, String>> {
        match &self.layout {
            Layout::Standard => None,
            Layout::Manual(paths) => Some(paths),
        }
    }

    fn manual_path(&self, name: &str) -> PinsResult<Option<&str>> {
        match self.pin_paths() {
            None => Ok(None),
            Some(paths) => paths
                .get(name)
                .map(|p| Some(p.as_str()))
                .ok_or_else(|| PinsError::PinNotFound {
                    name: name.to_string(),
                }),
        }
    }

    fn unsupported_on_manual(&self, operation: &str) -> PinsResult<()> {
        if self.pin_paths().is_some() {
            return Err(PinsError::Unsupported {
                message: format!("this board does not support {operation}"),
            });
        }
        Ok(())
    }

    /// Directory holding the files of `meta`.
    fn version_dir(&self, name: &str, meta: &PinMeta) -> PinsResult<String> {
        if let Some(pin_path) = self.manual_path(name)? {
            return Ok(pin_path.trim_end_matches('/').to_string());
        }

        let version = meta.version().ok_or_else(|| PinsError::Meta {
            message: format!("metadata for {name} has no version"),
        })?;
        Ok(join_path(&[name, &version.as_string()]))
    }

    // ---------------------------------------------------------------------
    // Discovery
    // ---------------------------------------------------------------------

    pub async fn pin_exists(&self, name: &str) -> PinsResult<bool> {
        validate_pin_name(name)?;

        match self.pin_paths() {
            Some(paths) => Ok(paths.contains_key(name)),
            None => self.backend.exists(name).await,
        }
    }

    /// Versions of a pin, oldest first.
    pub async fn pin_versions(&self, name: &str) -> PinsResult<Vec<VersionId>> {
        self.unsupported_on_manual("pin_versions")?;

        if !self.pin_exists(name).await? {
            return Err(PinsError::PinNotFound {
                name: name.to_string(),
            });
        }

        let mut versions: Vec<VersionId> = self
            .backend
            .ls(name)
            .await?
            .iter()
            .map(|v| VersionId::guess(v))
            .collect();
        versions.sort();

        Ok(versions)
    }

    /// Names of all pins on the board.
    pub async fn pin_list(&self) -> PinsResult<Vec<String>> {
        if let Some(paths) = self.pin_paths() {
            return Ok(paths.keys().cloned().collect());
        }

        let entries = match self.backend.ls("").await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(entries
            .into_iter()
            .filter(|name| !RESERVED_PIN_NAMES.contains(&name.as_str()))
            .collect())
    }

    /// Metadata of a pin version; the newest one when `version` is `None`.
    pub async fn pin_meta(&self, name: &str, version: Option<&str>) -> PinsResult<PinMeta> {
        validate_pin_name(name)?;

        if let Some(pin_path) = self.manual_path(name)? {
            return self.manual_pin_meta(name, pin_path, version).await;
        }

        let mut versions = self.pin_versions(name).await?;
        let selected = match version {
            Some(wanted) => versions
                .into_iter()
                .find(|v| v.as_string() == wanted)
                .ok_or_else(|| PinsError::VersionNotFound {
                    name: name.to_string(),
                    version: wanted.to_string(),
                })?,
            None => versions.pop().ok_or_else(|| PinsError::NoVersions {
                name: name.to_string(),
            })?,
        };

        let meta_path = join_path(&[name, &selected.as_string(), META_FILENAME]);
        let content = self.backend.read(&meta_path).await?;
        debug!(name, version = %selected, "read pin metadata");

        read_pin_yaml(&content, name, selected, BTreeMap::new())
    }

    async fn manual_pin_meta(
        &self,
        name: &str,
        pin_path: &str,
        version: Option<&str>,
    ) -> PinsResult<PinMeta> {
        if version.is_some() {
            return Err(PinsError::Unsupported {
                message: "this board does not support selecting pin versions".to_string(),
            });
        }

        // a plain url to a file has no metadata to read
        if self.protocol() == "http" && !pin_path.trim_end().ends_with('/') {
            return Ok(PinMeta::Raw(MetaRaw {
                file: pin_path.to_string(),
                pin_type: PinType::File,
                name: name.to_string(),
            }));
        }

        let meta_path = format!("{}/{}", pin_path.trim_end_matches('/'), META_FILENAME);
        let content = self.backend.read(&meta_path).await?;

        let mut local = BTreeMap::new();
        local.insert("path".to_string(), pin_path.to_string());

        read_pin_yaml(&content, name, VersionId::Raw(String::new()), local)
    }

    /// Same as [`Board::pin_meta`].
    pub async fn pin_fetch(&self, name: &str, version: Option<&str>) -> PinsResult<PinMeta> {
        self.pin_meta(name, version).await
    }

    /// Search pin names and titles with a regular expression. `None` returns all pins.
    pub async fn pin_search(&self, query: Option<&str>) -> PinsResult<Vec<PinMeta>> {
        let regex = query
            .map(|q| {
                Regex::new(q).map_err(|e| PinsError::InvalidArgument {
                    message: format!("invalid search pattern {q:?}: {e}"),
                })
            })
            .transpose()?;

        let mut found = Vec::new();
        for name in self.pin_list().await? {
            let meta = self.pin_meta(&name, None).await?;

            let keep = match &regex {
                None => true,
                Some(re) => re.is_match(&name) || meta.title().is_some_and(|t| re.is_match(t)),
            };
            if keep {
                found.push(meta);
            }
        }

        Ok(found)
    }

    pub async fn pin_browse(&self, _name: &str) -> PinsResult<()> {
        Err(PinsError::Unsupported {
            message: "pin_browse is not supported".to_string(),
        })
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    async fn read_pin_files(&self, name: &str, meta: &PinMeta) -> PinsResult<Vec<PinFile>> {
        let dir = self.version_dir(name, meta)?;

        let mut files = Vec::new();
        for file in meta.files() {
            let bytes = self.backend.read(&join_path(&[&dir, &file])).await?;
            files.push(PinFile::new(file, bytes));
        }
        Ok(files)
    }

    /// Check stored bytes against the metadata hash and an optional caller hash.
    fn verify_hash<B: AsRef<[u8]>>(
        &self,
        name: &str,
        meta: &PinMeta,
        contents: &[B],
        expected: Option<&str>,
    ) -> PinsResult<()> {
        let actual = pin_hash(contents);
        let version = meta.version().map(VersionId::as_string).unwrap_or_default();

        if let Some(stored) = meta.pin_hash() {
            if stored != actual {
                warn!(name, version = %version, "pin contents do not match stored hash");
                return Err(PinsError::HashMismatch {
                    name: name.to_string(),
                    version,
                    expected: stored.to_string(),
                    actual,
                });
            }
        }

        if let Some(wanted) = expected {
            let short = wanted.len() == VERSION_HASH_LEN && actual.starts_with(wanted);
            if wanted != actual && !short {
                return Err(PinsError::HashMismatch {
                    name: name.to_string(),
                    version,
                    expected: wanted.to_string(),
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Load the value stored in a pin.
    pub async fn pin_read<T: DeserializeOwned>(
        &self,
        name: &str,
        version: Option<&str>,
        hash: Option<&str>,
    ) -> PinsResult<T> {
        let meta = self.pin_fetch(name, version).await?;

        if let PinMeta::Raw(raw) = &meta {
            return Err(PinsError::UnsupportedType {
                pin_type: raw.pin_type.to_string(),
                message: format!(
                    "pin {name} points at a single file with no metadata; use pin_download() instead"
                ),
            });
        }

        let files = self.read_pin_files(name, &meta).await?;
        let contents: Vec<&[u8]> = files.iter().map(|f| f.bytes.as_slice()).collect();
        self.verify_hash(name, &meta, &contents, hash)?;

        load_data(meta.pin_type(), &files)
    }

    /// Local paths to the files of a pin.
    pub async fn pin_download(
        &self,
        name: &str,
        version: Option<&str>,
        hash: Option<&str>,
    ) -> PinsResult<Vec<PathBuf>> {
        let meta = self.pin_fetch(name, version).await?;

        if let PinMeta::Raw(raw) = &meta {
            let local = self.local_path(&raw.file).await?;
            return Ok(vec![local]);
        }

        let files = meta.files();
        if files.len() > 1 && meta.pin_type().requires_single_file() {
            return Err(PinsError::MultipleFiles {
                pin_type: meta.pin_type().to_string(),
            });
        }

        let dir = self.version_dir(name, &meta)?;
        let mut paths = Vec::new();
        let mut contents = Vec::new();
        for file in &files {
            let local = self.local_path(&join_path(&[&dir, file])).await?;
            let bytes = tokio::fs::read(&local)
                .await
                .map_err(|e| PinsError::io(local.display().to_string(), e))?;
            contents.push(bytes);
            paths.push(local);
        }
        self.verify_hash(name, &meta, &contents, hash)?;

        Ok(paths)
    }

    async fn local_path(&self, path: &str) -> PinsResult<PathBuf> {
        self.backend
            .local_path(path)
            .await?
            .ok_or_else(|| PinsError::CacheRequired {
                protocol: self.protocol().to_string(),
            })
    }

    // ---------------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------------

    /// Serialize `value` into a new pin version.
    pub async fn pin_write<T: Serialize + ?Sized>(
        &self,
        value: &T,
        options: WriteOptions,
    ) -> PinsResult<PinMeta> {
        validate_pin_name(&options.name)?;

        check_writable(&options.pin_type)?;

        let files = save_data(value, &options.name, &options.pin_type)?;
        let title = options
            .title
            .clone()
            .unwrap_or_else(|| default_title(&options.name, value));

        let meta = Meta::create(
            &files,
            options.pin_type.clone(),
            &options.name,
            title,
            options.description.clone(),
            options.created,
            options.metadata.clone(),
        )?;

        self.store(files, meta, &options).await
    }

    /// Store local files as a `file` pin, under their own file names.
    pub async fn pin_upload<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: WriteOptions,
    ) -> PinsResult<PinMeta> {
        validate_pin_name(&options.name)?;

        let mut files: Vec<PinFile> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let is_file = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(PinsError::InvalidArgument {
                    message: format!("Path is not a valid file: {}", path.display()),
                });
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| PinsError::InvalidArgument {
                    message: format!("Path has no file name: {}", path.display()),
                })?;
            if file_name == META_FILENAME || files.iter().any(|f| f.name == file_name) {
                return Err(PinsError::InvalidArgument {
                    message: format!("cannot upload two files named {file_name}"),
                });
            }

            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| PinsError::io(path.display().to_string(), e))?;
            files.push(PinFile::new(file_name, bytes));
        }

        let title = options.title.clone().unwrap_or_else(|| match files.len() {
            1 => format!("{}: a pinned file", options.name),
            n => format!("{}: a pinned set of {n} files", options.name),
        });

        let meta = Meta::create(
            &files,
            PinType::File,
            &options.name,
            title,
            options.description.clone(),
            options.created,
            options.metadata.clone(),
        )?;

        self.store(files, meta, &options).await
    }

    /// Decide whether a write keeps previous versions.
    fn version_setup(
        &self,
        name: &str,
        versions: &[VersionId],
        versioned: Option<bool>,
    ) -> PinsResult<bool> {
        let versioned = match versioned {
            Some(v) => v,
            None if versions.len() > 1 => true,
            None => self.versioned,
        };

        if !versioned && versions.len() > 1 {
            return Err(PinsError::VersionConflict {
                name: name.to_string(),
            });
        }

        Ok(versioned)
    }

    async fn store(
        &self,
        files: Vec<PinFile>,
        meta: Meta,
        options: &WriteOptions,
    ) -> PinsResult<PinMeta> {
        if self.pin_paths().is_some() {
            return Err(PinsError::ReadOnly {
                protocol: self.protocol().to_string(),
            });
        }

        let name = options.name.as_str();
        let versions = if self.pin_exists(name).await? {
            self.pin_versions(name).await?
        } else {
            Vec::new()
        };

        if !options.force_identical_write && !versions.is_empty() {
            let last_meta = self.pin_meta(name, None).await?;
            if last_meta.pin_hash() == Some(meta.pin_hash.as_str()) {
                inform(&format!(
                    "The hash of pin {name:?} has not changed. Your pin will not be stored."
                ));
                return Ok(last_meta);
            }
        }

        let versioned = self.version_setup(name, &versions, options.versioned)?;

        let version = meta.version.as_string();
        let version_dir = join_path(&[name, &version]);
        if self.backend.exists(&version_dir).await? {
            return Err(PinsError::VersionExists { path: version_dir });
        }

        inform(&format!("Writing pin:\nName: {name:?}\nVersion: {version}"));

        self.backend.mkdir(&version_dir).await?;
        for file in &files {
            self.backend
                .write(&join_path(&[&version_dir, &file.name]), &file.bytes)
                .await?;
        }
        // metadata last, so a version without data.txt is an incomplete write
        let meta_yaml = meta.to_pin_yaml()?;
        self.backend
            .write(&join_path(&[&version_dir, META_FILENAME]), meta_yaml.as_bytes())
            .await?;
        info!(name, version = %version, "created pin version");

        if !versioned {
            if let Some(previous) = versions.first() {
                info!(name, version = %previous, "replacing unversioned pin");
                self.backend
                    .rm(&join_path(&[name, &previous.as_string()]))
                    .await?;
            }
        }

        Ok(PinMeta::Current(meta))
    }

    // ---------------------------------------------------------------------
    // Deleting
    // ---------------------------------------------------------------------

    pub async fn pin_version_delete(&self, name: &str, version: &str) -> PinsResult<()> {
        self.unsupported_on_manual("pin_version_delete")?;
        validate_pin_name(name)?;

        validate_version_name(version)?;
        let version_dir = join_path(&[name, version]);
        if !self.backend.exists(&version_dir).await? {
            return Err(PinsError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        self.backend.rm(&version_dir).await?;
        info!(name, version, "deleted pin version");
        Ok(())
    }

    /// Delete old versions; the newest version is always kept.
    pub async fn pin_versions_prune(&self, name: &str, prune: Prune) -> PinsResult<Vec<VersionId>> {
        let versions = self.pin_versions(name).await?;

        let to_delete: Vec<VersionId> = match prune {
            Prune::Keep(0) => {
                return Err(PinsError::InvalidArgument {
                    message: "Argument n is 0, but must be greater than 0.".to_string(),
                })
            }
            Prune::Days(0) => {
                return Err(PinsError::InvalidArgument {
                    message: "Argument days is 0, but must be greater than 0.".to_string(),
                })
            }
            Prune::Keep(n) => {
                let keep_from = versions.len().saturating_sub(n as usize);
                versions[..keep_from].to_vec()
            }
            Prune::Days(days) => {
                let cutoff = Utc::now() - Duration::days(i64::from(days));
                let older = &versions[..versions.len().saturating_sub(1)];
                older
                    .iter()
                    .filter(|v| v.created().is_some_and(|created| created < cutoff))
                    .cloned()
                    .collect()
            }
        };

        if to_delete.is_empty() {
            inform("No old versions to delete");
        } else {
            let listed: Vec<String> = to_delete.iter().map(VersionId::as_string).collect();
            inform(&format!("Deleting versions: {}.", listed.join(", ")));
        }

        for version in &to_delete {
            self.pin_version_delete(name, &version.as_string()).await?;
        }

        Ok(to_delete)
    }

    /// Delete pins and all their versions.
    pub async fn pin_delete(&self, names: &[&str]) -> PinsResult<()> {
        self.unsupported_on_manual("pin_delete")?;

        for name in names {
            if !self.pin_exists(name).await? {
                return Err(PinsError::PinNotFound {
                    name: name.to_string(),
                });
            }

            self.backend.rm(name).await?;
            info!(name, "deleted pin");
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Description
    // ---------------------------------------------------------------------

    /// Expression that reconstructs this board. Credentials are never included.
    pub fn deparse(&self) -> PinsResult<String> {
        match &self.origin {
            Origin::Folder(path) => Ok(format!("board_folder({})", quote(path))),
            Origin::Temp => Ok("board_temp()".to_string()),
            Origin::Memory => Ok("board_memory()".to_string()),
            Origin::Remote { server_url, root } if root.is_empty() => {
                Ok(format!("board_remote(server_url={})", quote(server_url)))
            }
            Origin::Remote { server_url, root } => Ok(format!(
                "board_remote({}, server_url={})",
                quote(root),
                quote(server_url)
            )),
            Origin::Url(base) => {
                let entries: Vec<String> = self
                    .pin_paths()
                    .into_iter()
                    .flatten()
                    .map(|(name, path)| format!("{}: {}", quote(name), quote(path)))
                    .collect();
                Ok(format!(
                    "board_url({}, {{{}}})",
                    quote(base),
                    entries.join(", ")
                ))
            }
            Origin::Custom => Err(PinsError::Unsupported {
                message: format!(
                    "cannot deparse a board built directly on a {} backend",
                    self.protocol()
                ),
            }),
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
