use crate::config::DataDirProvider;
use crate::core::layout::PathResolver;
use crate::core::scene::SceneParser;
use crate::io::listing::{glob_dir, glob_tree, DirectoryListing, LocalFs, PathPattern};
use crate::types::{AssetMap, Collection, SceneError, SceneResult};
use std::path::{Path, PathBuf};

/// Processor whose output uses the nested GRANULE/IMG_DATA layout
pub const SEN2COR_PROCESSOR: &str = "sen2cor";

/// Sen2cor rasters that are ancillary products rather than bands
const SEN2COR_SKIPPED_BANDS: [&str; 2] = ["AOT", "WVP"];

/// Fixed ancillary assets looked up by `named_assets`, with their map key.
/// `None` keys the entry by the matched file stem.
const NAMED_ASSETS: [(&str, bool, Option<&str>); 6] = [
    ("MTD_MSIL*.xml", false, None),
    ("MTD_TL.xml", true, Some("MTD_TL")),
    ("IMG_DATA/R10m/*WVP*.jp2", true, Some("WVP")),
    ("IMG_DATA/R10m/*AOT*.jp2", true, Some("AOT")),
    ("IMG_DATA/R10m/*TCI*.jp2", true, Some("TCI")),
    ("*_sr_aerosol.tif", true, Some("sr_aerosol")),
];

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn compile(pattern: &str, recursive: bool) -> SceneResult<PathPattern> {
    let compiled = if recursive {
        PathPattern::recursive(pattern)
    } else {
        PathPattern::new(pattern)
    };
    compiled.map_err(|e| SceneError::Config(format!("Invalid pattern '{}': {}", pattern, e)))
}

/// Finds band rasters and ancillary files of a scene on disk
#[derive(Debug, Clone)]
pub struct AssetLocator<L, D> {
    listing: L,
    resolver: PathResolver<D>,
}

impl<D: DataDirProvider> AssetLocator<LocalFs, D> {
    /// Locator scanning the local filesystem
    pub fn local(data_dir: D) -> Self {
        Self::new(LocalFs, PathResolver::new(data_dir))
    }
}

impl<L: DirectoryListing, D: DataDirProvider> AssetLocator<L, D> {
    pub fn new(listing: L, resolver: PathResolver<D>) -> Self {
        Self { listing, resolver }
    }

    pub fn resolver(&self) -> &PathResolver<D> {
        &self.resolver
    }

    fn scan_root<S: SceneParser + ?Sized>(
        &self,
        collection: &Collection,
        scene: &S,
        path: Option<&Path>,
        prefix: Option<&Path>,
    ) -> SceneResult<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => self.resolver.scene_path(collection, scene, prefix, false),
        }
    }

    /// Map band names to raster files of a scene
    ///
    /// Sen2cor collections are scanned recursively under `IMG_DATA`; every other
    /// collection keeps its bands flat in the scene directory as
    /// `<scene id>_<band>.<ext>`, with any processing date accepted.
    pub fn band_files<S: SceneParser + ?Sized>(
        &self,
        collection: &Collection,
        scene: &S,
        path: Option<&Path>,
        prefix: Option<&Path>,
    ) -> SceneResult<AssetMap> {
        let root = self.scan_root(collection, scene, path, prefix)?;

        if collection.has_processor(SEN2COR_PROCESSOR) {
            log::debug!("Scanning Sen2cor layout under {}", root.display());
            return self.sen2cor_band_files(&root);
        }

        log::debug!("Scanning flat layout under {}", root.display());
        let fragments = scene.fragments();
        let scene_id_relative = fragments[..fragments.len().saturating_sub(1)].join("_");
        let mut output = AssetMap::new();

        for entry in self.listing.list(&root)? {
            let stem = match file_stem(&entry) {
                Some(stem) => stem,
                None => continue,
            };
            let is_png = entry.extension().map(|ext| ext == "png").unwrap_or(false);

            if !stem.contains(&scene_id_relative) || is_png || stem.ends_with("aerosol") {
                continue;
            }

            let band_name = stem.split('_').skip(fragments.len()).collect::<Vec<_>>().join("_");
            output.insert(band_name, entry);
        }

        log::info!("Found {} band file(s) for {}", output.len(), scene.scene_id());
        Ok(output)
    }

    fn sen2cor_band_files(&self, root: &Path) -> SceneResult<AssetMap> {
        let mut output = AssetMap::new();

        let mut jp2_files = glob_tree(&self.listing, root, &compile("IMG_DATA/**/*.jp2", true)?)?;
        jp2_files.sort();

        for jp2 in jp2_files {
            let stem = match file_stem(&jp2) {
                Some(stem) => stem,
                None => continue,
            };
            let tokens: Vec<&str> = stem.split('_').collect();
            if tokens.len() < 2 {
                log::warn!("Skipping {}: no band token in file name", jp2.display());
                continue;
            }
            let band_name = tokens[tokens.len() - 2];

            if SEN2COR_SKIPPED_BANDS.contains(&band_name) {
                continue;
            }
            // First file per band wins
            output.entry(band_name.to_string()).or_insert(jp2);
        }

        // Fmask4 masks sit directly in IMG_DATA; later files replace earlier ones
        for tif in glob_tree(&self.listing, root, &compile("IMG_DATA/*.tif", true)?)? {
            if let Some(band_name) = file_stem(&tif).and_then(|s| s.rsplit('_').next().map(str::to_string)) {
                output.insert(band_name, tif);
            }
        }

        log::info!("Found {} Sen2cor band file(s) under {}", output.len(), root.display());
        Ok(output)
    }

    /// Map ancillary assets (metadata XML, WVP, AOT, TCI, aerosol) of a scene
    ///
    /// Only the first match of each pattern is kept; absent assets have no key.
    pub fn named_assets<S: SceneParser + ?Sized>(
        &self,
        collection: &Collection,
        scene: &S,
        path: Option<&Path>,
        prefix: Option<&Path>,
    ) -> SceneResult<AssetMap> {
        let root = self.scan_root(collection, scene, path, prefix)?;
        let mut output = AssetMap::new();

        for (pattern, recursive, key) in NAMED_ASSETS {
            let compiled = compile(pattern, recursive)?;
            let matches = if recursive {
                glob_tree(&self.listing, &root, &compiled)?
            } else {
                glob_dir(&self.listing, &root, &compiled)?
            };

            let first = match matches.into_iter().next() {
                Some(first) => first,
                None => continue,
            };
            let key = match key {
                Some(key) => key.to_string(),
                None => match file_stem(&first) {
                    Some(stem) => stem,
                    None => continue,
                },
            };
            output.insert(key, first);
        }

        log::debug!("Found {} named asset(s) under {}", output.len(), root.display());
        Ok(output)
    }
}
