//! Loading datasets from configuration files

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codec;
use crate::dataset::{convert, Dataset};
use crate::error::DatasetError;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{format} parse error in {origin}: {message}")]
    Parse {
        format: &'static str,
        origin: String,
        message: String,
    },

    #[error("invalid canonical dataset in {}: {source}", path.display())]
    Dataset {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },

    #[error("unsupported configuration file type: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("invalid configuration name \"{0}\"")]
    InvalidName(String),

    #[error("no configuration named \"{0}\" in the search path")]
    NotFound(String),
}

/// On-disk format, chosen by file extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Toml,
    Json,
    /// The canonical length-prefixed encoding
    Fiz,
}

impl ConfigFormat {
    /// Every format, in the order a search directory is probed
    pub const ALL: [ConfigFormat; 3] = [Self::Toml, Self::Json, Self::Fiz];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
            Self::Fiz => "fiz",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

/// Where a loaded dataset came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub format: ConfigFormat,
    /// SHA-256 digest of the raw file bytes
    pub digest: String,
}

/// Load and parse one file, returning the dataset and its provenance.
pub fn load_file(path: &Path) -> Result<(Dataset, ConfigSource), ConfigError> {
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| ConfigError::UnsupportedExtension(path.to_path_buf()))?;
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let origin = path.display().to_string();
    let dataset = match format {
        ConfigFormat::Toml | ConfigFormat::Json => {
            let text = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
                format: if format == ConfigFormat::Toml { "TOML" } else { "JSON" },
                origin: origin.clone(),
                message: format!("invalid UTF-8: {}", e),
            })?;
            if format == ConfigFormat::Toml {
                convert::parse_toml(&text, &origin)?
            } else {
                convert::parse_json(&text, &origin)?
            }
        }
        ConfigFormat::Fiz => codec::deserialize(&bytes).map_err(|source| ConfigError::Dataset {
            path: path.to_path_buf(),
            source,
        })?,
    };

    debug!(path = %origin, ?format, %digest, keys = dataset.len(), "loaded configuration file");
    Ok((
        dataset,
        ConfigSource {
            path: path.to_path_buf(),
            format,
            digest,
        },
    ))
}

impl Dataset {
    /// Load a `.toml`, `.json` or `.fiz` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_file(path.as_ref()).map(|(dataset, _)| dataset)
    }
}
