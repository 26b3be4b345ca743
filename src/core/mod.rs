//! Core scene logic: product name parsing and storage layout

pub mod scene;
pub mod layout;

// Re-export main types
pub use scene::{SceneId, SceneParser, Sentinel1Scene, Sentinel2Scene, SCENE_DATE_FORMAT};
pub use layout::{entry_version, tile_segments, PathResolver};
