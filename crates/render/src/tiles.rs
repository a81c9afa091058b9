use glam::Vec2;
use towerdef_common::TileId;

use crate::queue::{RenderQueue, SpriteDrawRequest, TextureHandle};

/// Geometry of a tile atlas image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSetLayout {
    pub columns: u32,
    pub tile_count: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub margin: u32,
    pub spacing: u32,
}

/// Texture-space rectangle of a single tile; `min` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileUv {
    pub min: Vec2,
    pub max: Vec2,
}

/// An atlas texture plus the UV rectangle of every tile in it.
#[derive(Debug, Clone)]
pub struct TileSet {
    texture: TextureHandle,
    uvs: Vec<TileUv>,
}

impl TileSet {
    pub fn new(layout: &TileSetLayout, texture: TextureHandle) -> Self {
        let columns = layout.columns.max(1);
        let image = Vec2::new(
            layout.image_width.max(1) as f32,
            layout.image_height.max(1) as f32,
        );
        let tile = Vec2::new(layout.tile_width as f32, layout.tile_height as f32);
        let stride = tile + Vec2::splat(layout.spacing as f32);
        let margin = Vec2::splat(layout.margin as f32);

        let uvs = (0..layout.tile_count)
            .map(|i| {
                let cell = Vec2::new((i % columns) as f32, (i / columns) as f32);
                let origin = margin + cell * stride;
                TileUv {
                    min: origin / image,
                    max: (origin + tile) / image,
                }
            })
            .collect();

        Self { texture, uvs }
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn uv(&self, tile: TileId) -> Option<TileUv> {
        self.uvs.get(tile.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.uvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uvs.is_empty()
    }
}

/// One non-scrolling layer of tiles, one world unit per tile.
///
/// Row 0 sits at world y = 0 and rows grow toward negative y.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTileGrid {
    pub name: String,
    width: u32,
    height: u32,
    tiles: Vec<Option<TileId>>,
}

impl StaticTileGrid {
    /// `tiles` is row-major; missing cells are padded with `None`.
    pub fn new(name: impl Into<String>, width: u32, height: u32, mut tiles: Vec<Option<TileId>>) -> Self {
        tiles.resize(width as usize * height as usize, None);
        Self {
            name: name.into(),
            width,
            height,
            tiles,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile(&self, x: u32, y: u32) -> Option<TileId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles[(y * self.width + x) as usize]
    }

    pub fn world_position(x: u32, y: u32) -> Vec2 {
        Vec2::new(x as f32, -(y as f32))
    }

    /// Number of non-empty cells.
    pub fn occupied(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// Push one sprite per non-empty cell. Tiles the set doesn't know are
    /// skipped. Returns the number of sprites pushed.
    pub fn queue_sprites(&self, queue: &mut RenderQueue, tileset: &TileSet) -> usize {
        let mut pushed = 0;
        for (i, cell) in self.tiles.iter().enumerate() {
            let Some(uv) = cell.and_then(|t| tileset.uv(t)) else {
                continue;
            };
            let i = i as u32;
            queue.push(SpriteDrawRequest {
                texture: tileset.texture(),
                uv_min: uv.min,
                uv_max: uv.max,
                position: Self::world_position(i % self.width, i / self.width),
                rotation: 0.0,
            });
            pushed += 1;
        }
        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TileSetLayout {
        TileSetLayout {
            columns: 4,
            tile_count: 8,
            tile_width: 16,
            tile_height: 16,
            image_width: 64,
            image_height: 32,
            margin: 0,
            spacing: 0,
        }
    }

    #[test]
    fn uvs_follow_columns() {
        let set = TileSet::new(&layout(), TextureHandle(3));
        assert_eq!(set.len(), 8);
        let first = set.uv(TileId(0)).unwrap();
        assert_eq!(first.min, Vec2::ZERO);
        assert_eq!(first.max, Vec2::new(0.25, 0.5));

        let fifth = set.uv(TileId(5)).unwrap();
        assert_eq!(fifth.min, Vec2::new(0.25, 0.5));
        assert_eq!(fifth.max, Vec2::new(0.5, 1.0));
        assert!(set.uv(TileId(8)).is_none());
    }

    #[test]
    fn margin_and_spacing_offset_tiles() {
        let layout = TileSetLayout {
            columns: 2,
            tile_count: 2,
            tile_width: 10,
            tile_height: 10,
            image_width: 25,
            image_height: 12,
            margin: 1,
            spacing: 3,
        };
        let set = TileSet::new(&layout, TextureHandle(0));
        let second = set.uv(TileId(1)).unwrap();
        assert_eq!(second.min * Vec2::new(25.0, 12.0), Vec2::new(14.0, 1.0));
        assert_eq!(second.max * Vec2::new(25.0, 12.0), Vec2::new(24.0, 11.0));
    }

    #[test]
    fn grid_lookup_and_bounds() {
        let grid = StaticTileGrid::new("Base", 2, 2, vec![Some(TileId(1)), None, Some(TileId(2))]);
        assert_eq!(grid.tile(0, 0), Some(TileId(1)));
        assert_eq!(grid.tile(1, 0), None);
        assert_eq!(grid.tile(0, 1), Some(TileId(2)));
        assert_eq!(grid.tile(1, 1), None);
        assert_eq!(grid.tile(2, 0), None);
        assert_eq!(grid.occupied(), 2);
    }

    #[test]
    fn queue_sprites_flips_rows_and_skips_gaps() {
        let set = TileSet::new(&layout(), TextureHandle(7));
        let grid = StaticTileGrid::new(
            "Props",
            3,
            2,
            vec![Some(TileId(0)), None, Some(TileId(1)), None, Some(TileId(99)), Some(TileId(2))],
        );
        let mut queue = RenderQueue::new();
        let pushed = grid.queue_sprites(&mut queue, &set);

        assert_eq!(pushed, 3);
        let positions: Vec<Vec2> = queue.sprites.iter().map(|s| s.position).collect();
        assert_eq!(
            positions,
            vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, -1.0)]
        );
        assert!(queue.sprites.iter().all(|s| s.texture == TextureHandle(7)));
    }
}
