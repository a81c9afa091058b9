//! Shared types and 2D geometry helpers used by the simulation and renderer.

pub mod math;
pub mod types;

pub use types::{EnemyTypeId, TileId};
