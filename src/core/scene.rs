use crate::types::{SceneError, SceneResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timestamp layout embedded in Sentinel product names
pub const SCENE_DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Common accessors shared by every Sentinel product name grammar
pub trait SceneParser {
    /// The product name as given
    fn scene_id(&self) -> &str;

    /// The product name split on `_`
    fn fragments(&self) -> &[String];

    /// Tile (or orbit) identifier used for the storage layout
    fn tile_id(&self) -> &str;

    fn sensing_date(&self) -> NaiveDateTime;

    fn processing_date(&self) -> NaiveDateTime;

    /// Satellite unit, e.g. "2A" or "1B"
    fn satellite(&self) -> &str {
        let source = self.source();
        &source[source.len().saturating_sub(2)..]
    }

    /// First fragment of the product name, e.g. "S2A"
    fn source(&self) -> &str {
        &self.fragments()[0]
    }
}

fn split_fragments(scene_id: &str) -> Vec<String> {
    scene_id.split('_').map(str::to_string).collect()
}

fn parse_scene_date(scene_id: &str, fragment: &str) -> SceneResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(fragment, SCENE_DATE_FORMAT).map_err(|source| SceneError::DateParse {
        scene_id: scene_id.to_string(),
        fragment: fragment.to_string(),
        source,
    })
}

/// Sentinel-2 product name
///
/// `S2A_MSIL1C_20200101T120000_N0209_R000_T22KGA_20200101T150000`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel2Scene {
    scene_id: String,
    fragments: Vec<String>,
    sensing: NaiveDateTime,
    processing: NaiveDateTime,
}

impl Sentinel2Scene {
    pub const FRAGMENT_COUNT: usize = 7;
    pub const SOURCES: [&'static str; 2] = ["S2A", "S2B"];

    pub fn new(scene_id: &str) -> SceneResult<Self> {
        let fragments = split_fragments(scene_id);

        if fragments.len() != Self::FRAGMENT_COUNT || !Self::SOURCES.contains(&fragments[0].as_str()) {
            return Err(SceneError::InvalidIdentifier(scene_id.to_string()));
        }

        let sensing = parse_scene_date(scene_id, &fragments[2])?;
        let processing = parse_scene_date(scene_id, &fragments[Self::FRAGMENT_COUNT - 1])?;

        Ok(Self {
            scene_id: scene_id.to_string(),
            fragments,
            sensing,
            processing,
        })
    }
}

impl SceneParser for Sentinel2Scene {
    fn scene_id(&self) -> &str {
        &self.scene_id
    }

    fn fragments(&self) -> &[String] {
        &self.fragments
    }

    fn tile_id(&self) -> &str {
        // Drop the leading 'T' of the MGRS tile fragment
        let tile = &self.fragments[5];
        tile.char_indices().nth(1).map(|(i, _)| &tile[i..]).unwrap_or("")
    }

    fn sensing_date(&self) -> NaiveDateTime {
        self.sensing
    }

    fn processing_date(&self) -> NaiveDateTime {
        self.processing
    }
}

/// Sentinel-1 product name
///
/// `S1A_IW_GRDH_1SDV_20200103T170815_20200103T170842_030639_0382D5_DADE`
///
/// The absolute orbit number (seventh fragment) plays the role of the tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel1Scene {
    scene_id: String,
    fragments: Vec<String>,
    sensing: NaiveDateTime,
    processing: NaiveDateTime,
}

impl Sentinel1Scene {
    pub const FRAGMENT_COUNT: usize = 9;
    pub const SOURCES: [&'static str; 2] = ["S1A", "S1B"];

    pub fn new(scene_id: &str) -> SceneResult<Self> {
        let fragments = split_fragments(scene_id);

        if fragments.len() != Self::FRAGMENT_COUNT || !Self::SOURCES.contains(&fragments[0].as_str()) {
            return Err(SceneError::InvalidIdentifier(scene_id.to_string()));
        }

        let sensing = parse_scene_date(scene_id, &fragments[4])?;
        let processing = parse_scene_date(scene_id, &fragments[5])?;

        Ok(Self {
            scene_id: scene_id.to_string(),
            fragments,
            sensing,
            processing,
        })
    }
}

impl SceneParser for Sentinel1Scene {
    fn scene_id(&self) -> &str {
        &self.scene_id
    }

    fn fragments(&self) -> &[String] {
        &self.fragments
    }

    fn tile_id(&self) -> &str {
        &self.fragments[6]
    }

    fn sensing_date(&self) -> NaiveDateTime {
        self.sensing
    }

    fn processing_date(&self) -> NaiveDateTime {
        self.processing
    }
}

/// Any supported Sentinel product name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SceneId {
    Sentinel1(Sentinel1Scene),
    Sentinel2(Sentinel2Scene),
}

impl SceneId {
    /// Parse a product name, picking the grammar from its mission prefix
    pub fn parse(scene_id: &str) -> SceneResult<Self> {
        let head = scene_id.split('_').next().unwrap_or("");

        if head.starts_with("S1") {
            Sentinel1Scene::new(scene_id).map(SceneId::Sentinel1)
        } else if head.starts_with("S2") {
            Sentinel2Scene::new(scene_id).map(SceneId::Sentinel2)
        } else {
            log::debug!("Unknown mission prefix '{}' in {}", head, scene_id);
            Err(SceneError::InvalidIdentifier(scene_id.to_string()))
        }
    }

    fn inner(&self) -> &dyn SceneParser {
        match self {
            SceneId::Sentinel1(scene) => scene,
            SceneId::Sentinel2(scene) => scene,
        }
    }
}

impl SceneParser for SceneId {
    fn scene_id(&self) -> &str {
        self.inner().scene_id()
    }

    fn fragments(&self) -> &[String] {
        self.inner().fragments()
    }

    fn tile_id(&self) -> &str {
        self.inner().tile_id()
    }

    fn sensing_date(&self) -> NaiveDateTime {
        self.inner().sensing_date()
    }

    fn processing_date(&self) -> NaiveDateTime {
        self.inner().processing_date()
    }
}

impl FromStr for SceneId {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SceneId::parse(s)
    }
}

impl TryFrom<String> for SceneId {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SceneId::parse(&value)
    }
}

impl From<SceneId> for String {
    fn from(value: SceneId) -> Self {
        value.scene_id().to_string()
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scene_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satellite_from_source() {
        let scene = Sentinel2Scene::new("S2B_MSIL2A_20210315T133219_N0300_R081_T22KGA_20210315T160413").unwrap();
        assert_eq!(scene.source(), "S2B");
        assert_eq!(scene.satellite(), "2B");
    }

    #[test]
    fn test_empty_tile_fragment() {
        let scene = Sentinel2Scene::new("S2A_MSIL1C_20200101T120000_N0209_R000__20200101T150000").unwrap();
        assert_eq!(scene.tile_id(), "");
    }
}
