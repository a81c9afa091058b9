//! wgpu render backend: instanced textured sprites drawn into a window surface.
//!
//! # Invariants
//! - Each sprite batch is exactly one draw call.
//! - The surface texture is held from the first submit of a frame until
//!   `present`; overlays draw into it through `overlay_target`.
//! - Surface loss is recovered by reconfiguring; the affected frame is skipped.

mod gpu;
mod shaders;
mod texture;

pub use gpu::{OverlayTarget, SpriteInstance, WgpuRenderContext, grown_capacity};
