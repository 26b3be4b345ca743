use crate::config::DataDirProvider;
use crate::core::scene::SceneParser;
use crate::types::{Collection, CollectionVersion, SceneError, SceneResult};
use chrono::Datelike;
use std::path::{Path, PathBuf};

/// Folder name of a collection version
///
/// Dotted versions are kept as they are (`4.1` -> `v4.1`), whole numbers are
/// zero-padded to three digits (`4` -> `v004`).
pub fn entry_version(version: &CollectionVersion) -> SceneResult<String> {
    match version {
        CollectionVersion::Text(text) if text.contains('.') => Ok(format!("v{}", text)),
        CollectionVersion::Float(_) => Ok(format!("v{}", version)),
        CollectionVersion::Integer(value) => Ok(format!("v{:03}", value)),
        CollectionVersion::Text(text) => {
            let value: i64 = text
                .trim()
                .parse()
                .map_err(|_| SceneError::InvalidVersion(text.clone()))?;
            Ok(format!("v{:03}", value))
        }
    }
}

/// Split a tile id into its three directory levels: `22KGA` -> `22`, `K`, `GA`
pub fn tile_segments(tile: &str) -> SceneResult<[&str; 3]> {
    let mut bounds = tile.char_indices().map(|(i, _)| i);
    let (second, third) = match (bounds.nth(2), bounds.next()) {
        (Some(second), Some(third)) => (second, third),
        (Some(second), None) => (second, tile.len()),
        _ => return Err(SceneError::InvalidTile(tile.to_string())),
    };

    Ok([&tile[..second], &tile[second..third], &tile[third..]])
}

/// Maps parsed scenes onto the data-cube directory tree
///
/// `<prefix>/<collection>/<version>/<tile[0:2]>/<tile[2]>/<tile[3:]>/<year>[/<month>]/<scene_id>`
#[derive(Debug, Clone)]
pub struct PathResolver<D> {
    data_dir: D,
}

impl<D: DataDirProvider> PathResolver<D> {
    pub fn new(data_dir: D) -> Self {
        Self { data_dir }
    }

    pub fn data_dir_provider(&self) -> &D {
        &self.data_dir
    }

    /// Scene directory relative to the storage root
    pub fn relative_path<S: SceneParser + ?Sized>(
        &self,
        collection: &Collection,
        scene: &S,
        include_month: bool,
    ) -> SceneResult<PathBuf> {
        let version = entry_version(&collection.version)?;
        let [zone, band, square] = tile_segments(scene.tile_id())?;
        let sensing = scene.sensing_date();

        let mut relative = PathBuf::from(&collection.name);
        relative.push(version);
        relative.push(zone);
        relative.push(band);
        relative.push(square);
        relative.push(sensing.year().to_string());
        if include_month {
            // Month folders are not zero-padded
            relative.push(sensing.month().to_string());
        }
        relative.push(scene.scene_id());

        Ok(relative)
    }

    /// Absolute scene directory; the configured data directory is used when `prefix` is `None`
    pub fn scene_path<S: SceneParser + ?Sized>(
        &self,
        collection: &Collection,
        scene: &S,
        prefix: Option<&Path>,
        include_month: bool,
    ) -> SceneResult<PathBuf> {
        let relative = self.relative_path(collection, scene, include_month)?;
        let prefix = match prefix {
            Some(prefix) => prefix.to_path_buf(),
            None => self.data_dir.data_dir().unwrap_or_default(),
        };

        let scene_path = prefix.join(relative);
        log::debug!("Resolved {} to {}", scene.scene_id(), scene_path.display());
        Ok(scene_path)
    }

    /// Location of the compressed scene, `<scene_path>/<scene_id>.zip`
    pub fn archive_path<S: SceneParser + ?Sized>(
        &self,
        collection: &Collection,
        scene: &S,
        prefix: Option<&Path>,
        include_month: bool,
    ) -> SceneResult<PathBuf> {
        let scene_path = self.scene_path(collection, scene, prefix, include_month)?;
        Ok(scene_path.join(format!("{}.zip", scene.scene_id())))
    }
}
