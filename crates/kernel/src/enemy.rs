use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};
use towerdef_common::{EnemyTypeId, TileId};

/// Immutable description of an enemy kind, loaded once from the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyType {
    pub name: String,
    pub max_health: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Units created by a spawn request that does not give an explicit count.
    pub units_per_spawn: u32,
    /// Sprite tile inside the map's tile set.
    pub tile: TileId,
}

impl EnemyType {
    /// Create an enemy standing on the first waypoint, facing the second.
    pub fn create_enemy(&self, path: &EnemyPath, type_id: EnemyTypeId) -> Enemy {
        let a = path.waypoints.first().copied().unwrap_or(Vec2::ZERO);
        let b = path.waypoints.get(1).copied().unwrap_or(a);
        Enemy {
            position: a,
            direction: (b - a).normalize_or_zero(),
            type_id,
            remaining_health: self.max_health,
            target_waypoint: 1,
        }
    }
}

/// A single enemy instance. Plain data so buffers can be copied wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub position: Vec2,
    /// Unit facing direction. Zero only before the first normalization.
    pub direction: Vec2,
    pub type_id: EnemyTypeId,
    pub remaining_health: f32,
    /// 1-based index of the waypoint being walked towards. Equal to the
    /// waypoint count once the end of the path is reached.
    pub target_waypoint: u32,
}

impl Enemy {
    /// Whether the enemy has walked past the final waypoint of `path`.
    pub fn reached_end(&self, path: &EnemyPath) -> bool {
        self.target_waypoint as usize >= path.waypoints.len()
    }
}

/// Route the enemies follow, as a polyline of world-space waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyPath {
    pub name: String,
    /// Debug display color (RGBA, 0..1).
    pub color: Vec4,
    pub waypoints: Vec<Vec2>,
}

impl EnemyPath {
    pub fn new(name: impl Into<String>, waypoints: Vec<Vec2>) -> Self {
        Self {
            name: name.into(),
            color: Vec4::ONE,
            waypoints,
        }
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }
}

/// Static map data consumed by the stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub path: EnemyPath,
    pub enemy_types: Vec<EnemyType>,
}

impl MapData {
    pub fn new(path: EnemyPath, enemy_types: Vec<EnemyType>) -> Self {
        Self { path, enemy_types }
    }

    pub fn enemy_type(&self, id: EnemyTypeId) -> Option<&EnemyType> {
        self.enemy_types.get(id.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grunt() -> EnemyType {
        EnemyType {
            name: "Grunt".into(),
            max_health: 10.0,
            speed: 1.5,
            units_per_spawn: 4,
            tile: TileId(7),
        }
    }

    #[test]
    fn created_enemy_faces_second_waypoint() {
        let path = EnemyPath::new("main", vec![Vec2::new(1.0, 1.0), Vec2::new(1.0, 5.0)]);
        let enemy = grunt().create_enemy(&path, EnemyTypeId(0));
        assert_eq!(enemy.position, Vec2::new(1.0, 1.0));
        assert_eq!(enemy.direction, Vec2::Y);
        assert_eq!(enemy.target_waypoint, 1);
        assert_eq!(enemy.remaining_health, 10.0);
    }

    #[test]
    fn reached_end_at_waypoint_count() {
        let path = EnemyPath::new("main", vec![Vec2::ZERO, Vec2::X, Vec2::ONE]);
        let mut enemy = grunt().create_enemy(&path, EnemyTypeId(0));
        assert!(!enemy.reached_end(&path));
        enemy.target_waypoint = 3;
        assert!(enemy.reached_end(&path));
    }

    #[test]
    fn enemy_type_lookup_by_index() {
        let map = MapData::new(EnemyPath::new("p", vec![Vec2::ZERO, Vec2::X]), vec![grunt()]);
        assert!(map.enemy_type(EnemyTypeId(0)).is_some());
        assert!(map.enemy_type(EnemyTypeId(1)).is_none());
    }
}
