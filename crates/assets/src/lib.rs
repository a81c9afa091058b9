//! Map loading for the tower-defense demo.
//!
//! Maps are authored in Tiled and saved as JSON. A map must provide:
//! - tile layers `Base` and `Props`,
//! - an object group `Paths` holding at least one polyline (the enemy route)
//!   with a `Color` property,
//! - an object group `EnemyTypes` holding one tile object per enemy kind with
//!   `Health`, `Speed` and `UnitsPerSpawn` properties,
//! - an embedded tileset named `tower_defense`.
//!
//! One tile is one world unit. Tiled's Y axis points down; world Y points up.
//!
//! [`TuningFile`] loads flocking and clock settings from JSON.

pub mod tiled;
pub mod tuning;

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec4};
use serde_json::Value;
use thiserror::Error;
use towerdef_common::TileId;
use towerdef_kernel::{EnemyPath, EnemyType, MapData};
use towerdef_render::{StaticTileGrid, TileSetLayout};

use crate::tiled::{ObjectGroup, TileLayer, TiledLayer, TiledMap, TiledObject, TiledTileset};

pub use tuning::{TuningError, TuningFile};

pub const TILESET_NAME: &str = "tower_defense";
pub const TILE_LAYERS: [&str; 2] = ["Base", "Props"];
pub const PATHS_LAYER: &str = "Paths";
pub const ENEMY_TYPES_LAYER: &str = "EnemyTypes";

#[derive(Debug, Error)]
pub enum MapError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layer `{0}` not found")]
    MissingLayer(String),
    #[error("layer `{name}` is a {found}, expected a {expected}")]
    WrongLayerKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("tile layer `{0}` has no inline CSV data (encoding {1:?})")]
    UnsupportedEncoding(String, Option<String>),
    #[error("tile layer `{name}` is {width}x{height} but has {cells} cells")]
    LayerSizeMismatch {
        name: String,
        width: u32,
        height: u32,
        cells: usize,
    },
    #[error("tileset `{0}` not found")]
    MissingTileset(String),
    #[error("tileset `{0}` is external, only embedded tilesets are supported")]
    ExternalTileset(String),
    #[error("tileset `{0}` has no image")]
    MissingTilesetImage(String),
    #[error("object group `{0}` contains no polyline")]
    MissingPath(String),
    #[error("object `{object}` is missing property `{property}`")]
    MissingProperty { object: String, property: String },
    #[error("object `{object}` property `{property}` has an invalid value: {value}")]
    InvalidProperty {
        object: String,
        property: String,
        value: String,
    },
    #[error("enemy type object `{0}` has no tile gid")]
    MissingGid(String),
    #[error("gid {gid} of `{object}` is outside tileset `{tileset}`")]
    GidOutOfRange {
        object: String,
        tileset: String,
        gid: u32,
    },
}

/// Everything the game needs from a map file.
#[derive(Debug, Clone)]
pub struct LoadedMap {
    pub map_data: MapData,
    pub tileset_layout: TileSetLayout,
    /// Tileset image, resolved against the map file's directory.
    pub tileset_image: PathBuf,
    /// Tile layers in draw order.
    pub layers: Vec<StaticTileGrid>,
    pub width: u32,
    pub height: u32,
}

/// Read and convert a Tiled JSON map.
pub fn load_map(path: impl AsRef<Path>) -> Result<LoadedMap, MapError> {
    let path = path.as_ref();
    let _span = tracing::info_span!("load_map", path = %path.display()).entered();
    let text = std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or(Path::new(""));
    parse_map(&text, base_dir)
}

/// Convert a Tiled JSON document. Relative image paths resolve against `base_dir`.
pub fn parse_map(json: &str, base_dir: &Path) -> Result<LoadedMap, MapError> {
    let map: TiledMap = serde_json::from_str(json)?;
    tracing::debug!(
        width = map.width,
        height = map.height,
        layers = map.layers.len(),
        tilesets = map.tilesets.len(),
        "map parsed"
    );

    let tileset = map
        .tileset(TILESET_NAME)
        .ok_or_else(|| MapError::MissingTileset(TILESET_NAME.into()))?;
    if tileset.source.is_some() {
        return Err(MapError::ExternalTileset(tileset.name.clone()));
    }
    let image = tileset
        .image
        .as_deref()
        .ok_or_else(|| MapError::MissingTilesetImage(tileset.name.clone()))?;
    let tileset_layout = tileset_layout(tileset);

    let layers = TILE_LAYERS
        .iter()
        .map(|name| {
            let layer = tile_layer(&map, name)?;
            convert_tile_layer(layer, tileset)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let path = convert_path(&map, object_group(&map, PATHS_LAYER)?)?;
    let enemy_types = object_group(&map, ENEMY_TYPES_LAYER)?
        .objects
        .iter()
        .map(|object| convert_enemy_type(object, tileset))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        path = %path.name,
        waypoints = path.waypoints.len(),
        enemy_types = enemy_types.len(),
        "map converted"
    );

    Ok(LoadedMap {
        map_data: MapData::new(path, enemy_types),
        tileset_layout,
        tileset_image: base_dir.join(image),
        layers,
        width: map.width,
        height: map.height,
    })
}

fn tileset_layout(tileset: &TiledTileset) -> TileSetLayout {
    TileSetLayout {
        columns: tileset.columns,
        tile_count: tileset.tile_count,
        tile_width: tileset.tile_width,
        tile_height: tileset.tile_height,
        image_width: tileset.image_width,
        image_height: tileset.image_height,
        margin: tileset.margin,
        spacing: tileset.spacing,
    }
}

fn tile_layer<'a>(map: &'a TiledMap, name: &str) -> Result<&'a TileLayer, MapError> {
    match map.layer(name) {
        Some(TiledLayer::Tiles(layer)) => Ok(layer),
        Some(other) => Err(MapError::WrongLayerKind {
            name: name.into(),
            expected: "tile layer",
            found: other.kind(),
        }),
        None => Err(MapError::MissingLayer(name.into())),
    }
}

fn object_group<'a>(map: &'a TiledMap, name: &str) -> Result<&'a ObjectGroup, MapError> {
    match map.layer(name) {
        Some(TiledLayer::Objects(group)) => Ok(group),
        Some(other) => Err(MapError::WrongLayerKind {
            name: name.into(),
            expected: "object group",
            found: other.kind(),
        }),
        None => Err(MapError::MissingLayer(name.into())),
    }
}

/// Tile id of `gid` inside `tileset`, or `None` for empty cells and gids
/// belonging to other tilesets.
fn tile_id(gid: u32, tileset: &TiledTileset) -> Option<TileId> {
    let gid = tiled::strip_gid_flags(gid);
    if gid == 0 || gid < tileset.first_gid {
        return None;
    }
    let local = gid - tileset.first_gid;
    (local < tileset.tile_count).then_some(TileId(local))
}

fn convert_tile_layer(layer: &TileLayer, tileset: &TiledTileset) -> Result<StaticTileGrid, MapError> {
    let data = layer
        .data
        .as_ref()
        .ok_or_else(|| MapError::UnsupportedEncoding(layer.name.clone(), layer.encoding.clone()))?;
    let expected = u64::from(layer.width) * u64::from(layer.height);
    if data.len() as u64 != expected {
        return Err(MapError::LayerSizeMismatch {
            name: layer.name.clone(),
            width: layer.width,
            height: layer.height,
            cells: data.len(),
        });
    }
    let tiles = data.iter().map(|&gid| tile_id(gid, tileset)).collect();
    let grid = StaticTileGrid::new(layer.name.clone(), layer.width, layer.height, tiles);
    tracing::debug!(layer = %layer.name, occupied = grid.occupied(), "tile layer loaded");
    Ok(grid)
}

fn convert_path(map: &TiledMap, group: &ObjectGroup) -> Result<EnemyPath, MapError> {
    let (object, points) = group
        .objects
        .iter()
        .find_map(|o| o.polyline.as_ref().map(|p| (o, p)))
        .ok_or_else(|| MapError::MissingPath(group.name.clone()))?;

    let tile = Vec2::new(map.tile_width.max(1) as f32, map.tile_height.max(1) as f32);
    let base = Vec2::new(object.x / tile.x - 0.5, -object.y / tile.y + 0.5);
    let rotation = Vec2::from_angle(object.rotation.to_radians());
    let waypoints = points
        .iter()
        .map(|p| base + rotation.rotate(Vec2::new(p.x / tile.x, -p.y / tile.y)))
        .collect();

    let color = match object.property("Color") {
        Some(value) => parse_color(value).ok_or_else(|| invalid(object, "Color", value))?,
        None => return Err(missing(object, "Color")),
    };

    Ok(EnemyPath {
        name: object.name.clone(),
        color,
        waypoints,
    })
}

fn convert_enemy_type(object: &TiledObject, tileset: &TiledTileset) -> Result<EnemyType, MapError> {
    let gid = object
        .gid
        .ok_or_else(|| MapError::MissingGid(object.name.clone()))?;
    let tile = tile_id(gid, tileset).ok_or_else(|| MapError::GidOutOfRange {
        object: object.name.clone(),
        tileset: tileset.name.clone(),
        gid,
    })?;

    let max_health = float_property(object, "Health")?;
    let speed = float_property(object, "Speed")?;
    let units_per_spawn = match object.property("UnitsPerSpawn") {
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(object, "UnitsPerSpawn", value))?,
        None => return Err(missing(object, "UnitsPerSpawn")),
    };

    Ok(EnemyType {
        name: object.name.clone(),
        max_health,
        speed,
        units_per_spawn,
        tile,
    })
}

fn float_property(object: &TiledObject, name: &str) -> Result<f32, MapError> {
    let value = object.property(name).ok_or_else(|| missing(object, name))?;
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| invalid(object, name, value))
}

/// Parse a Tiled color string, `#AARRGGBB` or `#RRGGBB`, into RGBA 0..1.
pub fn parse_color(value: &Value) -> Option<Vec4> {
    let hex = value.as_str()?.strip_prefix('#')?;
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|c| c as f32 / 255.0)
    };
    match hex.len() {
        8 => Some(Vec4::new(channel(2)?, channel(4)?, channel(6)?, channel(0)?)),
        6 => Some(Vec4::new(channel(0)?, channel(2)?, channel(4)?, 1.0)),
        _ => None,
    }
}

fn missing(object: &TiledObject, property: &str) -> MapError {
    MapError::MissingProperty {
        object: object.name.clone(),
        property: property.into(),
    }
}

fn invalid(object: &TiledObject, property: &str, value: &Value) -> MapError {
    MapError::InvalidProperty {
        object: object.name.clone(),
        property: property.into(),
        value: value.to_string(),
    }
}
