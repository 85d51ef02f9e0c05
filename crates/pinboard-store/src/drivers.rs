//! Pin types and the drivers that turn values into pin files and back.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PinsError, PinsResult};

mod delimited;

/// Format of the data stored in a pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PinType {
    Json,
    Yaml,
    /// Opaque file(s), stored under their original names.
    File,
    Csv,
    Arrow,
    Parquet,
    Feather,
    Joblib,
    Rds,
    Table,
    Other(String),
}

impl PinType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::File => "file",
            Self::Csv => "csv",
            Self::Arrow => "arrow",
            Self::Parquet => "parquet",
            Self::Feather => "feather",
            Self::Joblib => "joblib",
            Self::Rds => "rds",
            Self::Table => "table",
            Self::Other(other) => other,
        }
    }

    /// Whether `pin_write` can produce this type.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Json | Self::Yaml | Self::Csv)
    }

    /// Types that must be stored as exactly one file.
    pub fn requires_single_file(&self) -> bool {
        matches!(self, Self::Csv | Self::Joblib | Self::Json | Self::Yaml)
    }

    fn extension(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for PinType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "json" => Self::Json,
            "yaml" => Self::Yaml,
            "file" => Self::File,
            "csv" => Self::Csv,
            "arrow" => Self::Arrow,
            "parquet" => Self::Parquet,
            "feather" => Self::Feather,
            "joblib" => Self::Joblib,
            "rds" => Self::Rds,
            "table" => Self::Table,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for PinType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<PinType> for String {
    fn from(value: PinType) -> Self {
        value.as_str().to_string()
    }
}

impl std::str::FromStr for PinType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file of a pin version, staged in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinFile {
    /// File name inside the version directory.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PinFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Fail unless `pin_write` can produce `pin_type`.
pub fn check_writable(pin_type: &PinType) -> PinsResult<()> {
    if pin_type.is_writable() {
        Ok(())
    } else {
        Err(not_writable(pin_type))
    }
}

fn not_writable(pin_type: &PinType) -> PinsError {
    let message = match pin_type {
        PinType::File => {
            "pin_write() does not support type 'file'. Use pin_upload() to save a file as a pin"
        }
        PinType::Feather => "saving data as type \"feather\" is no longer supported",
        _ => "cannot save this type",
    };
    PinsError::UnsupportedType {
        pin_type: pin_type.to_string(),
        message: message.to_string(),
    }
}

fn write_error(name: &str, pin_type: &PinType, e: impl fmt::Display) -> PinsError {
    PinsError::Serialization {
        message: format!("failed to write {name} as {pin_type}: {e}"),
    }
}

fn read_error(file: &PinFile, pin_type: &PinType, e: impl fmt::Display) -> PinsError {
    PinsError::Serialization {
        message: format!("failed to read {} as {pin_type}: {e}", file.name),
    }
}

/// Serialize `value` into the file(s) of a `pin_type` pin named `name`.
pub fn save_data<T: Serialize + ?Sized>(
    value: &T,
    name: &str,
    pin_type: &PinType,
) -> PinsResult<Vec<PinFile>> {
    let bytes = match pin_type {
        PinType::Json => {
            serde_json::to_vec_pretty(value).map_err(|e| write_error(name, pin_type, e))?
        }
        PinType::Yaml => serde_yaml::to_string(value)
            .map_err(|e| write_error(name, pin_type, e))?
            .into_bytes(),
        PinType::Csv => delimited::write(value).map_err(|e| write_error(name, pin_type, e))?,
        other => return Err(not_writable(other)),
    };

    Ok(vec![PinFile::new(
        format!("{name}.{}", pin_type.extension()),
        bytes,
    )])
}

/// Deserialize the file(s) of a pin.
pub fn load_data<T: DeserializeOwned>(pin_type: &PinType, files: &[PinFile]) -> PinsResult<T> {
    if files.len() > 1 && pin_type.requires_single_file() {
        return Err(PinsError::MultipleFiles {
            pin_type: pin_type.to_string(),
        });
    }

    let file = files.first().ok_or_else(|| PinsError::Meta {
        message: "pin metadata lists no files".to_string(),
    })?;

    match pin_type {
        PinType::Json => {
            serde_json::from_slice(&file.bytes).map_err(|e| read_error(file, pin_type, e))
        }
        PinType::Yaml => {
            serde_yaml::from_slice(&file.bytes).map_err(|e| read_error(file, pin_type, e))
        }
        PinType::Csv => delimited::read(&file.bytes).map_err(|e| read_error(file, pin_type, e)),
        PinType::File => Err(PinsError::UnsupportedType {
            pin_type: pin_type.to_string(),
            message: "methods like pin_read() are not able to read 'file' type pins. \
                      Use pin_download() to download the file"
                .to_string(),
        }),
        other => Err(PinsError::UnsupportedType {
            pin_type: other.to_string(),
            message: "no reader for this type; use pin_download() to fetch the files".to_string(),
        }),
    }
}

/// Default title for a pin, describing the shape of the pinned value.
pub fn default_title<T: Serialize + ?Sized>(name: &str, value: &T) -> String {
    let kind = match serde_json::to_value(value) {
        Ok(serde_json::Value::Array(items)) => format!("list of {} items", items.len()),
        Ok(serde_json::Value::Object(fields)) => format!("mapping of {} fields", fields.len()),
        Ok(serde_json::Value::String(_)) => "string".to_string(),
        Ok(serde_json::Value::Number(_)) => "number".to_string(),
        Ok(serde_json::Value::Bool(_)) => "bool".to_string(),
        Ok(serde_json::Value::Null) => "null value".to_string(),
        Err(_) => format!("{} object", short_type_name::<T>()),
    };

    format!("{name}: a pinned {kind}")
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
