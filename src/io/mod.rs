//! I/O modules for discovering scene files and downloading products

pub mod listing;
pub mod assets;
pub mod download;

pub use listing::{DirectoryListing, InMemoryTree, LocalFs, PathPattern};
pub use assets::AssetLocator;
pub use download::{download_stream, download_stream_with_bar, DownloadOptions, Downloader, ResponseStream};
