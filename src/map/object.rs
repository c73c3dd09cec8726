//! Map objects, shared by object groups and templates

use serde::{Deserialize, Serialize};

/// Bits of a global tile ID that hold flip flags rather than the tile index
pub const FLIP_FLAGS_MASK: u32 = 0xF000_0000;

/// A custom property attached to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type", default = "default_property_type")]
    pub kind: String,
    pub value: serde_json::Value,
}

fn default_property_type() -> String {
    "string".to_string()
}

/// An object placed on an object layer, or the prototype held by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// User-defined class (called `type` in older files)
    #[serde(default, alias = "type", skip_serializing_if = "String::is_empty")]
    pub class: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Global tile ID for tile objects, including flip flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

pub(crate) fn default_visible() -> bool {
    true
}

impl MapObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            class: String::new(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            visible: true,
            gid: None,
            properties: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    /// Tile ID with flip flags cleared
    pub fn tile_gid(&self) -> Option<u32> {
        self.gid.map(|gid| gid & !FLIP_FLAGS_MASK).filter(|&gid| gid != 0)
    }
}
