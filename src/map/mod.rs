//! Map documents as far as thumbnails need them
//!
//! Only what the minimap renderer draws is modelled: tile layers, object
//! groups and image layers of orthogonal maps, with image-based tilesets.
//! The JSON layout follows the common tile map editor export format.

mod minimap;
mod object;

pub use minimap::{MapRenderer, MiniMapRenderer, RenderFlags};
pub use object::{MapObject, Property, FLIP_FLAGS_MASK};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use object::default_visible;

/// Largest map, in pixels at natural size, that is read at all
pub const MAX_MAP_PIXELS: u64 = 1 << 26;

/// Error reading a map document
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid map JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported map orientation '{0}'")]
    UnsupportedOrientation(String),
    #[error("invalid map: {0}")]
    Invalid(String),
}

/// Reads map documents from disk.
pub trait MapReader {
    fn read_map(&self, path: &Path) -> Result<Map, MapError>;
}

/// An image-based tileset embedded in a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapTileset {
    #[serde(rename = "firstgid")]
    pub first_gid: u32,
    /// Sheet image, relative to the map file
    pub image: String,
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
    #[serde(rename = "transparentcolor", default, skip_serializing_if = "Option::is_none")]
    pub transparent_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    #[serde(default)]
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Global tile IDs, row-major, 0 for empty cells
    #[serde(default)]
    pub data: Vec<u32>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(rename = "offsetx", default)]
    pub offset_x: i64,
    #[serde(rename = "offsety", default)]
    pub offset_y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<MapObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLayer {
    #[serde(default)]
    pub name: String,
    /// Image file, relative to the map file
    pub image: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(rename = "offsetx", default)]
    pub offset_x: i64,
    #[serde(rename = "offsety", default)]
    pub offset_y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    TileLayer(TileLayer),
    ObjectGroup(ObjectGroup),
    ImageLayer(ImageLayer),
}

impl Layer {
    pub fn is_visible(&self) -> bool {
        match self {
            Layer::TileLayer(l) => l.visible,
            Layer::ObjectGroup(l) => l.visible,
            Layer::ImageLayer(l) => l.visible,
        }
    }
}

fn default_orientation() -> String {
    "orthogonal".to_string()
}

/// A map document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    #[serde(default = "default_orientation")]
    pub orientation: String,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(rename = "backgroundcolor", default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default)]
    pub tilesets: Vec<MapTileset>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Directory relative references are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Map {
    /// Resolve a file reference stored in the map.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.base_dir.join(reference)
    }

    /// The tileset a global tile ID belongs to
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&MapTileset> {
        self.tilesets.iter().filter(|t| t.first_gid <= gid).max_by_key(|t| t.first_gid)
    }

    fn validate(&self) -> Result<(), MapError> {
        if self.orientation != "orthogonal" {
            return Err(MapError::UnsupportedOrientation(self.orientation.clone()));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(MapError::Invalid("tile size must be positive".to_string()));
        }
        let pixels = u64::from(self.width)
            .checked_mul(u64::from(self.tile_width))
            .zip(u64::from(self.height).checked_mul(u64::from(self.tile_height)))
            .and_then(|(w, h)| w.checked_mul(h));
        match pixels {
            Some(pixels) if pixels <= MAX_MAP_PIXELS => {}
            _ => {
                return Err(MapError::Invalid(format!(
                    "map of {}x{} tiles of {}x{} pixels is too large",
                    self.width, self.height, self.tile_width, self.tile_height
                )))
            }
        }
        if let Some(t) = self.tilesets.iter().find(|t| t.tile_width == 0 || t.tile_height == 0) {
            return Err(MapError::Invalid(format!(
                "tileset '{}' has a zero tile size",
                t.image
            )));
        }
        Ok(())
    }
}

/// Reads `.json` / `.tmj` map files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapFormat;

impl JsonMapFormat {
    /// Parse a map from JSON text; references resolve against `base_dir`.
    pub fn parse(contents: &str, base_dir: &Path) -> Result<Map, MapError> {
        let mut map: Map = serde_json::from_str(contents)?;
        map.validate()?;
        map.base_dir = base_dir.to_path_buf();
        Ok(map)
    }
}

impl MapReader for JsonMapFormat {
    fn read_map(&self, path: &Path) -> Result<Map, MapError> {
        let contents = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&contents, base_dir)
    }
}
