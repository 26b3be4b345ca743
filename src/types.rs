use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Logical band or asset name mapped to the file that holds it
pub type AssetMap = HashMap<String, PathBuf>;

/// Version of a collection as recorded by the catalog
///
/// The catalog stores versions either as numbers or as strings, and the
/// on-disk folder name depends on which one it is (see `entry_version`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionVersion {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for CollectionVersion {
    fn from(value: i64) -> Self {
        CollectionVersion::Integer(value)
    }
}

impl From<i32> for CollectionVersion {
    fn from(value: i32) -> Self {
        CollectionVersion::Integer(value as i64)
    }
}

impl From<f64> for CollectionVersion {
    fn from(value: f64) -> Self {
        CollectionVersion::Float(value)
    }
}

impl From<&str> for CollectionVersion {
    fn from(value: &str) -> Self {
        CollectionVersion::Text(value.to_string())
    }
}

impl From<String> for CollectionVersion {
    fn from(value: String) -> Self {
        CollectionVersion::Text(value)
    }
}

impl std::fmt::Display for CollectionVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionVersion::Integer(v) => write!(f, "{}", v),
            // Whole floats keep their decimal point: 4.0 stays "4.0", not "4"
            CollectionVersion::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            CollectionVersion::Float(v) => write!(f, "{}", v),
            CollectionVersion::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Processing software that generated a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorInfo {
    pub name: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Free-form collection metadata from the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(default)]
    pub processors: Vec<ProcessorInfo>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Catalog collection record (read-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub version: CollectionVersion,
    #[serde(default)]
    pub metadata: Option<CollectionMetadata>,
}

impl Collection {
    /// Create a collection record without metadata
    pub fn new(name: impl Into<String>, version: impl Into<CollectionVersion>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            metadata: None,
        }
    }

    /// Attach processor records to the collection metadata
    pub fn with_processors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let metadata = self.metadata.get_or_insert_with(CollectionMetadata::default);
        metadata.processors.extend(names.into_iter().map(|name| ProcessorInfo {
            name: name.into(),
            extra: HashMap::new(),
        }));
        self
    }

    /// Check whether any processor of this collection has the given name (case-insensitive)
    pub fn has_processor(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.metadata
            .as_ref()
            .map(|m| m.processors.iter().any(|p| p.name.to_lowercase() == wanted))
            .unwrap_or(false)
    }
}

/// Error types for scene resolution and download
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid sentinel scene {0}")]
    InvalidIdentifier(String),

    #[error("Invalid date '{fragment}' in scene {scene_id}: {source}")]
    DateParse {
        scene_id: String,
        fragment: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Tile id '{0}' is too short to build a storage path")]
    InvalidTile(String),

    #[error("Invalid collection version: {0}")]
    InvalidVersion(String),

    #[error("Download file is corrupt. Expected {expected} bytes, got {actual}")]
    Download { expected: u64, actual: u64 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SceneError {
    fn from(e: reqwest::Error) -> Self {
        SceneError::Http(e.to_string())
    }
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
