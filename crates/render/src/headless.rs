use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec4};

use crate::batch::Batcher;
use crate::camera::Camera;
use crate::context::{RenderContext, RenderError};
use crate::queue::{DEFAULT_CLEAR_COLOR, RenderQueue, RenderStats, TextureHandle};

/// Render context that batches and counts without a GPU.
///
/// Textures are registered by path and never read from disk. Useful for the
/// CLI, logging, and testing the frame loop. Sort keys default to
/// registration order and can be overridden per texture, the way a GPU
/// backend would key by its own object ids.
#[derive(Debug)]
pub struct HeadlessRenderContext {
    textures: Vec<PathBuf>,
    sort_keys: Vec<usize>,
    by_path: HashMap<PathBuf, TextureHandle>,
    batcher: Batcher,
    clear_color: Vec4,
    last_stats: RenderStats,
    frame_stats: RenderStats,
    last_view_projection: Mat4,
    frames_presented: u64,
}

impl Default for HeadlessRenderContext {
    fn default() -> Self {
        Self {
            textures: Vec::new(),
            sort_keys: Vec::new(),
            by_path: HashMap::new(),
            batcher: Batcher::new(),
            clear_color: DEFAULT_CLEAR_COLOR,
            last_stats: RenderStats::default(),
            frame_stats: RenderStats::default(),
            last_view_projection: Mat4::IDENTITY,
            frames_presented: 0,
        }
    }
}

impl HeadlessRenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture_path(&self, texture: TextureHandle) -> Option<&Path> {
        self.textures.get(texture.0 as usize).map(PathBuf::as_path)
    }

    /// Override the key `texture` is ordered by when sorting.
    pub fn set_texture_sort_key(
        &mut self,
        texture: TextureHandle,
        key: usize,
    ) -> Result<(), RenderError> {
        let slot = self
            .sort_keys
            .get_mut(texture.0 as usize)
            .ok_or(RenderError::UnknownTexture(texture))?;
        *slot = key;
        Ok(())
    }

    /// Stats of the most recent `submit`.
    pub fn last_stats(&self) -> RenderStats {
        self.last_stats
    }

    /// Stats accumulated over all submits of the last presented frame.
    pub fn frame_stats(&self) -> RenderStats {
        self.frame_stats
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn last_view_projection(&self) -> Mat4 {
        self.last_view_projection
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Human-readable summary of the last submit.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame {} ({}) ===",
            self.frames_presented,
            self.name()
        );
        let _ = writeln!(
            out,
            "Sprites: {}  Draw calls: {}",
            self.last_stats.sprite_count, self.last_stats.draw_call_count
        );
        let c = self.clear_color;
        let _ = writeln!(
            out,
            "Clear: ({:.2}, {:.2}, {:.2}, {:.2})",
            c.x, c.y, c.z, c.w
        );
        for batch in self.batcher.batches() {
            let path = self
                .texture_path(batch.texture)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".into());
            let _ = writeln!(
                out,
                "  texture {} [{}]: {} sprites",
                batch.texture.0,
                path,
                batch.range.len()
            );
        }
        out
    }
}

impl RenderContext for HeadlessRenderContext {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, RenderError> {
        if let Some(&handle) = self.by_path.get(path) {
            return Ok(handle);
        }
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(path.to_path_buf());
        self.sort_keys.push(handle.0 as usize);
        self.by_path.insert(path.to_path_buf(), handle);
        tracing::debug!(path = %path.display(), handle = handle.0, "texture registered");
        Ok(handle)
    }

    fn texture_sort_key(&self, texture: TextureHandle) -> usize {
        // Unregistered handles sort last.
        self.sort_keys
            .get(texture.0 as usize)
            .copied()
            .unwrap_or(usize::MAX)
    }

    fn clear(&mut self, color: Vec4) {
        self.clear_color = color;
        self.frame_stats.reset();
    }

    fn submit(
        &mut self,
        queue: &mut RenderQueue,
        camera: &dyn Camera,
        sort: bool,
    ) -> RenderStats {
        self.last_view_projection = camera.view_projection();
        let mut batcher = std::mem::take(&mut self.batcher);
        let stats = batcher.prepare(queue, |t| self.texture_sort_key(t), sort);
        self.batcher = batcher;
        self.last_stats = stats;
        self.frame_stats += stats;
        stats
    }

    fn present(&mut self) {
        self.frames_presented += 1;
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrthoCamera;
    use crate::queue::SpriteDrawRequest;
    use glam::Vec2;

    fn sprite(texture: TextureHandle) -> SpriteDrawRequest {
        SpriteDrawRequest {
            texture,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            position: Vec2::ZERO,
            rotation: 0.0,
        }
    }

    #[test]
    fn same_path_returns_same_handle() {
        let mut ctx = HeadlessRenderContext::new();
        let a = ctx.load_texture(Path::new("tiles.png")).unwrap();
        let b = ctx.load_texture(Path::new("units.png")).unwrap();
        let c = ctx.load_texture(Path::new("tiles.png")).unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(ctx.texture_count(), 2);
    }

    #[test]
    fn frame_cycle_reports_stats() {
        let mut ctx = HeadlessRenderContext::new();
        let tiles = ctx.load_texture(Path::new("tiles.png")).unwrap();
        let units = ctx.load_texture(Path::new("units.png")).unwrap();
        let camera = OrthoCamera::new(800, 600);

        let mut queue = RenderQueue::new();
        for t in [tiles, units, tiles, units] {
            queue.push(sprite(t));
        }

        ctx.clear(Vec4::new(0.5, 0.5, 0.5, 1.0));
        let stats = ctx.submit(&mut queue, &camera, true);
        ctx.present();

        assert_eq!(stats.sprite_count, 4);
        assert_eq!(stats.draw_call_count, 2);
        assert_eq!(ctx.frames_presented(), 1);
        assert_eq!(ctx.last_view_projection(), camera.view_projection());

        let text = ctx.describe();
        assert!(text.contains("Draw calls: 2"));
        assert!(text.contains("tiles.png"));
    }

    #[test]
    fn submit_orders_batches_by_backend_sort_key() {
        let mut ctx = HeadlessRenderContext::new();
        let tiles = ctx.load_texture(Path::new("tiles.png")).unwrap();
        let units = ctx.load_texture(Path::new("units.png")).unwrap();
        ctx.set_texture_sort_key(tiles, 10).unwrap();
        ctx.set_texture_sort_key(units, 2).unwrap();
        assert!(ctx.texture_sort_key(units) < ctx.texture_sort_key(tiles));

        let mut queue = RenderQueue::new();
        for t in [tiles, units, tiles, units] {
            queue.push(sprite(t));
        }
        let stats = ctx.submit(&mut queue, &OrthoCamera::new(800, 600), true);

        assert_eq!(stats.draw_call_count, 2);
        let order: Vec<_> = queue.sprites.iter().map(|s| s.texture).collect();
        assert_eq!(order, vec![units, units, tiles, tiles]);
        let text = ctx.describe();
        let units_at = text.find("units.png").unwrap();
        let tiles_at = text.find("tiles.png").unwrap();
        assert!(units_at < tiles_at);
    }

    #[test]
    fn sort_key_of_unknown_texture_is_rejected() {
        let mut ctx = HeadlessRenderContext::new();
        let err = ctx.set_texture_sort_key(TextureHandle(3), 1).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTexture(TextureHandle(3))));
        assert_eq!(ctx.texture_sort_key(TextureHandle(3)), usize::MAX);
    }

    #[test]
    fn frame_stats_sum_multiple_submits() {
        let mut ctx = HeadlessRenderContext::new();
        let tex = ctx.load_texture(Path::new("tiles.png")).unwrap();
        let camera = OrthoCamera::new(800, 600);

        ctx.clear(DEFAULT_CLEAR_COLOR);
        for _ in 0..3 {
            let mut queue = RenderQueue::new();
            queue.push(sprite(tex));
            queue.push(sprite(tex));
            ctx.submit(&mut queue, &camera, true);
        }
        assert_eq!(ctx.frame_stats().sprite_count, 6);
        assert_eq!(ctx.frame_stats().draw_call_count, 3);
        assert_eq!(ctx.last_stats().sprite_count, 2);

        ctx.clear(DEFAULT_CLEAR_COLOR);
        assert_eq!(ctx.frame_stats(), RenderStats::default());
    }
}
