//! Serde mirror of the subset of the Tiled JSON map format the game reads.

use serde::Deserialize;
use serde_json::Value;

/// Flip and rotation flags stored in the top bits of every gid.
pub const GID_FLAGS_MASK: u32 = 0xE000_0000;

/// Strip the flip flags from a raw gid.
pub fn strip_gid_flags(gid: u32) -> u32 {
    gid & !GID_FLAGS_MASK
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledMap {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
}

impl TiledMap {
    pub fn layer(&self, name: &str) -> Option<&TiledLayer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn tileset(&self, name: &str) -> Option<&TiledTileset> {
        self.tilesets.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TiledLayer {
    #[serde(rename = "tilelayer")]
    Tiles(TileLayer),
    #[serde(rename = "objectgroup")]
    Objects(ObjectGroup),
    #[serde(other)]
    Other,
}

impl TiledLayer {
    pub fn name(&self) -> &str {
        match self {
            Self::Tiles(l) => &l.name,
            Self::Objects(g) => &g.name,
            Self::Other => "",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tiles(_) => "tile layer",
            Self::Objects(_) => "object group",
            Self::Other => "unsupported layer",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major gids. Absent when the layer uses a compressed encoding.
    #[serde(default)]
    pub data: Option<Vec<u32>>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectGroup {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<TiledObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledObject {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Degrees.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub gid: Option<u32>,
    #[serde(default)]
    pub polyline: Option<Vec<TiledPoint>>,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

impl TiledObject {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TiledPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTileset {
    #[serde(rename = "firstgid")]
    pub first_gid: u32,
    #[serde(default)]
    pub name: String,
    /// Set for tilesets stored in a separate file.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "imagewidth", default)]
    pub image_width: u32,
    #[serde(rename = "imageheight", default)]
    pub image_height: u32,
    #[serde(rename = "tilewidth", default)]
    pub tile_width: u32,
    #[serde(rename = "tileheight", default)]
    pub tile_height: u32,
    #[serde(rename = "tilecount", default)]
    pub tile_count: u32,
    #[serde(default)]
    pub columns: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_flags_are_stripped() {
        assert_eq!(strip_gid_flags(0x8000_0005), 5);
        assert_eq!(strip_gid_flags(0x4000_0005), 5);
        assert_eq!(strip_gid_flags(0x2000_0005), 5);
        assert_eq!(strip_gid_flags(0xE000_0005), 5);
        assert_eq!(strip_gid_flags(12), 12);
    }

    #[test]
    fn layers_dispatch_on_type() {
        let json = r#"{
            "width": 2, "height": 1, "tilewidth": 16, "tileheight": 16,
            "layers": [
                {"type": "tilelayer", "name": "Base", "width": 2, "height": 1, "data": [1, 0]},
                {"type": "objectgroup", "name": "Paths", "objects": []},
                {"type": "imagelayer", "name": "Sky"}
            ],
            "tilesets": []
        }"#;
        let map: TiledMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.layers.len(), 3);
        assert!(matches!(map.layer("Base"), Some(TiledLayer::Tiles(_))));
        assert!(matches!(map.layer("Paths"), Some(TiledLayer::Objects(_))));
        assert!(map.layer("Sky").is_none());
    }
}
