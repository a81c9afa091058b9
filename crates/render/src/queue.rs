use glam::{Vec2, Vec4};
use std::ops::AddAssign;

/// Backend-issued handle of a loaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureHandle(pub u32);

/// Clear color restored by `RenderQueue::reset`.
pub const DEFAULT_CLEAR_COLOR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// One textured unit quad for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDrawRequest {
    pub texture: TextureHandle,
    /// Top-left corner in texture space.
    pub uv_min: Vec2,
    /// Bottom-right corner in texture space.
    pub uv_max: Vec2,
    /// Quad center in world units.
    pub position: Vec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
}

/// Everything to draw in one frame.
#[derive(Debug, Clone)]
pub struct RenderQueue {
    pub sprites: Vec<SpriteDrawRequest>,
    pub clear_color: Vec4,
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self {
            sprites: Vec::new(),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame. Keeps the sprite storage allocated.
    pub fn reset(&mut self) {
        self.sprites.clear();
        self.clear_color = DEFAULT_CLEAR_COLOR;
    }

    pub fn push(&mut self, sprite: SpriteDrawRequest) {
        self.sprites.push(sprite);
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Counters for the most recently submitted queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub sprite_count: u32,
    pub draw_call_count: u32,
}

impl RenderStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.sprite_count += other.sprite_count;
        self.draw_call_count += other.draw_call_count;
    }
}
