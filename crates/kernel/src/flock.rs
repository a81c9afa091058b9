use glam::Vec2;
use serde::{Deserialize, Serialize};
use towerdef_common::math::{closest_point_on_segment, smoothstep};

use crate::enemy::MapData;
use crate::state::SimulationState;

/// Distance from the segment end below which the next waypoint is targeted.
pub const WAYPOINT_REACHED_DISTANCE: f32 = 0.1;

/// Runtime-tunable flocking weights and radii.
///
/// Passed into every `step` so the stepper stays a pure function of its
/// inputs; two steps with the same snapshot give identical results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    /// Neighbors further than this are ignored.
    pub sight_range: f32,
    /// Neighbors closer than this push the enemy away.
    pub desired_spacing: f32,
    /// Distance from the path segment beyond which path readjustment kicks in.
    pub max_path_distance: f32,
    pub waypoint_factor: f32,
    /// Weight of the neighbors' common heading.
    pub alignment_factor: f32,
    pub path_readjust_factor: f32,
    pub pushback_factor: f32,
    pub centering_factor: f32,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            sight_range: 3.0,
            desired_spacing: 0.3,
            max_path_distance: 0.8,
            waypoint_factor: 1.0,
            alignment_factor: 0.2,
            path_readjust_factor: 0.0,
            pushback_factor: 1.0,
            centering_factor: 0.3,
        }
    }
}

/// Neighbor sums gathered for one enemy.
#[derive(Debug, Default)]
struct Neighborhood {
    count: u32,
    position_sum: Vec2,
    direction_sum: Vec2,
    pushback: Vec2,
}

/// Advance `prev` by one fixed step of `h` seconds into `next`.
///
/// `next` is overwritten with a structural copy of `prev` (reusing its
/// allocation) and then mutated; all neighbor reads go to `prev`, so the
/// result does not depend on iteration order.
pub fn step(
    map: &MapData,
    params: &FlockParams,
    prev: &SimulationState,
    next: &mut SimulationState,
    h: f32,
) {
    next.enemies.clone_from(&prev.enemies);

    let waypoints = &map.path.waypoints;
    let sight_sqr = params.sight_range * params.sight_range;
    let spacing_sqr = params.desired_spacing * params.desired_spacing;

    for (i, enemy) in next.enemies.iter_mut().enumerate() {
        // Index 0 is the spawn point; the first target is always waypoint 1.
        enemy.target_waypoint = enemy.target_waypoint.max(1);
        let idx = enemy.target_waypoint as usize;
        if idx >= waypoints.len() {
            continue;
        }

        let position = enemy.position;
        let a = waypoints[idx - 1];
        let b = waypoints[idx];

        let closest = closest_point_on_segment(position, a, b);
        if closest.distance(b) < WAYPOINT_REACHED_DISTANCE {
            enemy.target_waypoint += 1;
        }

        let mut near = Neighborhood::default();
        for (j, other) in prev.enemies.iter().enumerate() {
            if i == j {
                continue;
            }

            let from_other = position - other.position;
            let dist_sqr = from_other.length_squared();
            if dist_sqr > sight_sqr {
                continue;
            }

            near.count += 1;
            near.position_sum += other.position;
            near.direction_sum += other.direction;

            if dist_sqr < spacing_sqr {
                let dist = dist_sqr.sqrt();
                // Coincident enemies have no separating axis.
                if dist > 0.0 {
                    let strength = 1.0 - smoothstep(0.0, params.desired_spacing, dist);
                    near.pushback += from_other / dist * strength;
                }
            }
        }

        let mut delta = (b - position).normalize_or_zero() * params.waypoint_factor;
        if near.count > 0 {
            let average = near.position_sum / near.count as f32;
            delta += (average - position).normalize_or_zero() * params.centering_factor;
            delta += near.direction_sum.normalize_or_zero() * params.alignment_factor;
            delta += near.pushback * params.pushback_factor;
        }

        let off_path = closest - position;
        if off_path.length_squared() > params.max_path_distance * params.max_path_distance {
            delta += off_path.normalize_or_zero() * params.path_readjust_factor;
        }

        enemy.direction = (enemy.direction + delta)
            .try_normalize()
            .unwrap_or(enemy.direction);

        // Type ids are validated at spawn; an unknown type stands still.
        let speed = map.enemy_type(enemy.type_id).map_or(0.0, |t| t.speed);
        enemy.position += enemy.direction * speed * h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::{Enemy, EnemyPath, EnemyType};
    use proptest::prelude::*;
    use towerdef_common::{EnemyTypeId, TileId};

    const H: f32 = 1.0 / 60.0;

    fn straight_map() -> MapData {
        MapData::new(
            EnemyPath::new("straight", vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)]),
            vec![EnemyType {
                name: "Runner".into(),
                max_health: 3.0,
                speed: 2.0,
                units_per_spawn: 5,
                tile: TileId(0),
            }],
        )
    }

    fn enemy(position: Vec2, direction: Vec2, target: u32) -> Enemy {
        Enemy {
            position,
            direction,
            type_id: EnemyTypeId(0),
            remaining_health: 3.0,
            target_waypoint: target,
        }
    }

    fn run(map: &MapData, params: &FlockParams, prev: &SimulationState) -> SimulationState {
        let mut next = SimulationState::new();
        step(map, params, prev, &mut next, H);
        next
    }

    #[test]
    fn defaults_apply_pushback_unweighted_without_readjust() {
        let params = FlockParams::default();
        assert_eq!(params.sight_range, 3.0);
        assert_eq!(params.desired_spacing, 0.3);
        assert_eq!(params.max_path_distance, 0.8);
        assert_eq!(params.waypoint_factor, 1.0);
        assert_eq!(params.alignment_factor, 0.2);
        assert_eq!(params.path_readjust_factor, 0.0);
        assert_eq!(params.pushback_factor, 1.0);
        assert_eq!(params.centering_factor, 0.3);
    }

    #[test]
    fn lone_enemy_walks_towards_waypoint() {
        let map = straight_map();
        let prev = SimulationState::with_enemies(vec![enemy(Vec2::ZERO, Vec2::X, 1)]);
        let next = run(&map, &FlockParams::default(), &prev);
        let moved = next.enemies[0].position;
        assert!((moved.x - 2.0 * H).abs() < 1e-6);
        assert_eq!(moved.y, 0.0);
    }

    #[test]
    fn next_buffer_is_overwritten() {
        let map = straight_map();
        let prev = SimulationState::with_enemies(vec![enemy(Vec2::ZERO, Vec2::X, 1)]);
        let mut next = SimulationState::with_enemies(vec![enemy(Vec2::ONE, Vec2::Y, 2); 5]);
        step(&map, &FlockParams::default(), &prev, &mut next, H);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn step_is_deterministic() {
        let map = straight_map();
        let prev = SimulationState::with_enemies(vec![
            enemy(Vec2::new(0.0, 0.1), Vec2::X, 1),
            enemy(Vec2::new(0.1, -0.1), Vec2::X, 1),
            enemy(Vec2::new(0.5, 0.3), Vec2::Y, 1),
        ]);
        let params = FlockParams::default();
        let a = run(&map, &params, &prev);
        let b = run(&map, &params, &prev);
        assert_eq!(a, b);
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn advances_at_most_one_waypoint_per_step() {
        let map = straight_map();
        // Standing on waypoint 1, which is also within reach of waypoint 2's segment start.
        let prev = SimulationState::with_enemies(vec![enemy(Vec2::new(10.0, 0.0), Vec2::X, 1)]);
        let next = run(&map, &FlockParams::default(), &prev);
        assert_eq!(next.enemies[0].target_waypoint, 2);
    }

    #[test]
    fn enemy_at_final_waypoint_stops_advancing() {
        let map = straight_map();
        let last = map.path.waypoint_count() as u32;
        let end = Vec2::new(10.0, 10.0);
        let prev = SimulationState::with_enemies(vec![enemy(end, Vec2::Y, last - 1)]);

        let once = run(&map, &FlockParams::default(), &prev);
        assert_eq!(once.enemies[0].target_waypoint, last);

        let twice = run(&map, &FlockParams::default(), &once);
        assert_eq!(twice.enemies[0].target_waypoint, last);
        assert_eq!(twice.enemies[0].position, once.enemies[0].position);
        assert_eq!(twice.enemies[0].direction, once.enemies[0].direction);
    }

    #[test]
    fn zero_target_index_is_treated_as_first_segment() {
        let map = straight_map();
        let prev = SimulationState::with_enemies(vec![enemy(Vec2::ZERO, Vec2::X, 0)]);
        let next = run(&map, &FlockParams::default(), &prev);
        assert_eq!(next.enemies[0].target_waypoint, 1);
        assert!(next.enemies[0].position.x > 0.0);
    }

    #[test]
    fn close_pair_separates_without_centering() {
        // A distant first waypoint keeps the path pull nearly parallel for both.
        let mut map = straight_map();
        map.path.waypoints = vec![Vec2::ZERO, Vec2::new(1000.0, 0.0)];
        let params = FlockParams {
            desired_spacing: 0.3,
            sight_range: 3.0,
            centering_factor: 0.0,
            ..FlockParams::default()
        };
        for gap in [0.02_f32, 0.1, 0.2, 0.28] {
            let prev = SimulationState::with_enemies(vec![
                enemy(Vec2::new(0.0, gap * 0.5), Vec2::X, 1),
                enemy(Vec2::new(0.0, -gap * 0.5), Vec2::X, 1),
            ]);
            let next = run(&map, &params, &prev);
            let before = prev.enemies[0].position.distance(prev.enemies[1].position);
            let after = next.enemies[0].position.distance(next.enemies[1].position);
            assert!(after >= before, "gap {gap}: {after} < {before}");
        }
    }

    #[test]
    fn very_close_pair_separates_with_default_weights() {
        let map = straight_map();
        let prev = SimulationState::with_enemies(vec![
            enemy(Vec2::new(0.0, 0.025), Vec2::X, 1),
            enemy(Vec2::new(0.0, -0.025), Vec2::X, 1),
        ]);
        let next = run(&map, &FlockParams::default(), &prev);
        let before = prev.enemies[0].position.distance(prev.enemies[1].position);
        let after = next.enemies[0].position.distance(next.enemies[1].position);
        assert!(after >= before);
    }

    #[test]
    fn neighbors_out_of_sight_have_no_influence() {
        let map = straight_map();
        let solo = SimulationState::with_enemies(vec![enemy(Vec2::ZERO, Vec2::X, 1)]);
        let with_far = SimulationState::with_enemies(vec![
            enemy(Vec2::ZERO, Vec2::X, 1),
            enemy(Vec2::new(0.0, 50.0), Vec2::Y, 1),
        ]);
        let params = FlockParams::default();
        let a = run(&map, &params, &solo);
        let b = run(&map, &params, &with_far);
        assert_eq!(a.enemies[0], b.enemies[0]);
    }

    #[test]
    fn path_readjust_steers_back_towards_segment() {
        let map = straight_map();
        let far_off = SimulationState::with_enemies(vec![enemy(Vec2::new(2.0, 3.0), Vec2::X, 1)]);
        let plain = run(&map, &FlockParams::default(), &far_off);
        let readjusted = run(
            &map,
            &FlockParams {
                path_readjust_factor: 0.4,
                ..FlockParams::default()
            },
            &far_off,
        );
        assert!(readjusted.enemies[0].direction.y < plain.enemies[0].direction.y);
    }

    #[test]
    fn degenerate_blend_keeps_previous_direction() {
        let map = straight_map();
        // Facing exactly away from the waypoint with a unit waypoint weight.
        let prev = SimulationState::with_enemies(vec![enemy(Vec2::new(5.0, 0.0), -Vec2::X, 1)]);
        let next = run(&map, &FlockParams::default(), &prev);
        assert_eq!(next.enemies[0].direction, -Vec2::X);
    }

    fn arb_enemy() -> impl Strategy<Value = Enemy> {
        (-2.0f32..12.0, -2.0f32..12.0, 0.0f32..std::f32::consts::TAU, 1u32..4).prop_map(
            |(x, y, angle, target)| enemy(Vec2::new(x, y), Vec2::from_angle(angle), target),
        )
    }

    proptest! {
        #[test]
        fn prop_step_is_bitwise_deterministic(enemies in prop::collection::vec(arb_enemy(), 0..24)) {
            let map = straight_map();
            let prev = SimulationState::with_enemies(enemies);
            let params = FlockParams::default();
            let a = run(&map, &params, &prev);
            let b = run(&map, &params, &prev);
            prop_assert_eq!(a.state_hash(), b.state_hash());
        }

        #[test]
        fn prop_directions_stay_unit_length(enemies in prop::collection::vec(arb_enemy(), 1..24)) {
            let map = straight_map();
            let next = run(&map, &FlockParams::default(), &SimulationState::with_enemies(enemies));
            for e in &next.enemies {
                prop_assert!((e.direction.length() - 1.0).abs() < 1e-5);
            }
        }

        #[test]
        fn prop_waypoint_index_is_monotonic_and_bounded(
            enemies in prop::collection::vec(arb_enemy(), 1..12),
            steps in 1usize..40,
        ) {
            let map = straight_map();
            let params = FlockParams::default();
            let bound = map.path.waypoint_count() as u32;
            let mut state = SimulationState::with_enemies(enemies);
            let mut next = SimulationState::new();
            for _ in 0..steps {
                step(&map, &params, &state, &mut next, H);
                for (before, after) in state.enemies.iter().zip(&next.enemies) {
                    prop_assert!(after.target_waypoint >= before.target_waypoint);
                    prop_assert!(after.target_waypoint <= bound);
                }
                std::mem::swap(&mut state, &mut next);
            }
        }
    }
}
