//! Rendering adapter: frame queue, batching and camera, independent of any GPU API.
//!
//! # Invariants
//! - The renderer never mutates simulation state; queues are rebuilt every
//!   frame from the interpolated state and static tile layers.
//! - Batching groups by texture only. Sprite order within a texture is the
//!   submission order.
//! - `RenderContext` is the only seam to a backend; the headless backend and
//!   the wgpu backend share the batcher.

mod batch;
mod camera;
mod context;
mod headless;
mod queue;
mod scene;
mod tiles;

pub use batch::{Batcher, SpriteBatch};
pub use camera::{Camera, OrthoCamera};
pub use context::{RenderContext, RenderError};
pub use headless::HeadlessRenderContext;
pub use queue::{DEFAULT_CLEAR_COLOR, RenderQueue, RenderStats, SpriteDrawRequest, TextureHandle};
pub use scene::queue_enemies;
pub use tiles::{StaticTileGrid, TileSet, TileSetLayout, TileUv};
