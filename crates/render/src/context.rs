use std::path::{Path, PathBuf};

use glam::Vec4;
use thiserror::Error;

use crate::camera::Camera;
use crate::queue::{RenderQueue, RenderStats, TextureHandle};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode texture {path}: {reason}")]
    TextureDecode { path: PathBuf, reason: String },
    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("gpu backend error: {0}")]
    Backend(String),
}

/// Backend seam between the frame loop and whatever draws sprites.
///
/// A frame is `clear`, then one `submit` per queue, then `present`.
pub trait RenderContext {
    /// Load an image from disk and return its handle.
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, RenderError>;

    /// Stable key grouping sprites that can share a draw call.
    fn texture_sort_key(&self, texture: TextureHandle) -> usize;

    /// Set the color the next frame clears to.
    fn clear(&mut self, color: Vec4);

    /// Draw `queue` with `camera`. When `sort` is set the queue is reordered
    /// by texture first so each texture costs one draw call.
    fn submit(&mut self, queue: &mut RenderQueue, camera: &dyn Camera, sort: bool)
    -> RenderStats;

    /// Finish the frame.
    fn present(&mut self);

    fn name(&self) -> &'static str;
}
