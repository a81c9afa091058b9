use crate::enemy::Enemy;

/// All dynamic entity data for one simulation instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    pub enemies: Vec<Enemy>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enemies(enemies: Vec<Enemy>) -> Self {
        Self { enemies }
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Deterministic hash over every enemy field, in buffer order.
    ///
    /// Float fields are hashed by bit pattern, so two states hash equal only
    /// if they are bit-for-bit identical.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &(self.enemies.len() as u64).to_le_bytes());
        for e in &self.enemies {
            mix(&mut h, &e.position.x.to_le_bytes());
            mix(&mut h, &e.position.y.to_le_bytes());
            mix(&mut h, &e.direction.x.to_le_bytes());
            mix(&mut h, &e.direction.y.to_le_bytes());
            mix(&mut h, &e.type_id.0.to_le_bytes());
            mix(&mut h, &e.remaining_health.to_le_bytes());
            mix(&mut h, &e.target_waypoint.to_le_bytes());
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use towerdef_common::EnemyTypeId;

    fn enemy_at(x: f32) -> Enemy {
        Enemy {
            position: Vec2::new(x, 0.0),
            direction: Vec2::X,
            type_id: EnemyTypeId(0),
            remaining_health: 5.0,
            target_waypoint: 1,
        }
    }

    #[test]
    fn empty_state() {
        let s = SimulationState::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn hash_matches_for_identical_states() {
        let a = SimulationState::with_enemies(vec![enemy_at(1.0), enemy_at(2.0)]);
        let b = a.clone();
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn hash_depends_on_order_and_content() {
        let a = SimulationState::with_enemies(vec![enemy_at(1.0), enemy_at(2.0)]);
        let b = SimulationState::with_enemies(vec![enemy_at(2.0), enemy_at(1.0)]);
        let c = SimulationState::with_enemies(vec![enemy_at(1.0), enemy_at(2.5)]);
        assert_ne!(a.state_hash(), b.state_hash());
        assert_ne!(a.state_hash(), c.state_hash());
    }
}
