//! scenedir: Sentinel scene identifiers mapped onto a data-cube storage tree
//!
//! Parses Sentinel-1/Sentinel-2 product names, derives the versioned and tiled
//! directory where a scene lives, discovers its band and ancillary files, and
//! downloads product archives into that tree with size verification.

pub mod types;
pub mod config;
pub mod core;
pub mod io;

// Re-export main types and functions for easier access
pub use types::{
    AssetMap, Collection, CollectionMetadata, CollectionVersion, ProcessorInfo, SceneError, SceneResult,
};

pub use config::{DataDirProvider, Settings};
pub use crate::core::{entry_version, PathResolver, SceneId, SceneParser, Sentinel1Scene, Sentinel2Scene};
pub use io::{download_stream, download_stream_with_bar, AssetLocator, DownloadOptions, Downloader, InMemoryTree, LocalFs};
