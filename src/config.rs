//! Runtime settings for storage layout and downloads

use crate::io::download::DownloadOptions;
use crate::types::{SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the base data directory
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Source of the base data directory used when no explicit prefix is given
pub trait DataDirProvider {
    fn data_dir(&self) -> Option<PathBuf>;
}

impl DataDirProvider for PathBuf {
    fn data_dir(&self) -> Option<PathBuf> {
        Some(self.clone())
    }
}

impl DataDirProvider for Option<PathBuf> {
    fn data_dir(&self) -> Option<PathBuf> {
        self.clone()
    }
}

impl<T: DataDirProvider + ?Sized> DataDirProvider for &T {
    fn data_dir(&self) -> Option<PathBuf> {
        (**self).data_dir()
    }
}

/// Settings shared by the resolver, locator and downloader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the data-cube storage tree
    pub data_dir: Option<PathBuf>,
    pub chunk_size: usize,
    pub progress: bool,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            chunk_size: DownloadOptions::DEFAULT_CHUNK_SIZE,
            progress: false,
            timeout_secs: 300,
        }
    }
}

impl Settings {
    /// Default settings with the data directory taken from `DATA_DIR`
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        if data_dir.is_none() {
            log::debug!("{} is not set, storage paths will be relative", DATA_DIR_ENV);
        }

        Self {
            data_dir,
            ..Self::default()
        }
    }

    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> SceneResult<Self> {
        let path = path.as_ref();
        log::info!("Loading settings from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SceneError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// `<config dir>/scenedir/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scenedir").join("settings.json"))
    }

    /// Download options seeded from these settings
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            chunk_size: self.chunk_size,
            progress: self.progress,
            ..DownloadOptions::default()
        }
    }
}

impl DataDirProvider for Settings {
    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone()
    }
}
