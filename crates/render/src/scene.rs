use towerdef_common::math::vector_angle;
use towerdef_kernel::{EnemyType, SimulationState};

use crate::queue::{RenderQueue, SpriteDrawRequest};
use crate::tiles::TileSet;

/// Push one sprite per enemy, turned to face its direction.
///
/// Enemies whose type or tile is unknown are skipped. Returns the number of
/// sprites pushed.
pub fn queue_enemies(
    queue: &mut RenderQueue,
    state: &SimulationState,
    enemy_types: &[EnemyType],
    tileset: &TileSet,
) -> usize {
    let mut pushed = 0;
    for enemy in &state.enemies {
        let Some(uv) = enemy_types
            .get(enemy.type_id.index())
            .and_then(|ty| tileset.uv(ty.tile))
        else {
            continue;
        };
        queue.push(SpriteDrawRequest {
            texture: tileset.texture(),
            uv_min: uv.min,
            uv_max: uv.max,
            position: enemy.position,
            rotation: vector_angle(enemy.direction),
        });
        pushed += 1;
    }
    pushed
}
