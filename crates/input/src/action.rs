use glam::Vec2;
use towerdef_common::EnemyTypeId;

/// A high-level action produced by the host from window input or UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Stop after the current frame.
    Quit,
    /// Zoom by whole steps; positive zooms in.
    Zoom(i32),
    /// Pan direction for this frame, unit length or zero.
    MoveCamera(Vec2),
    /// Spawn `count` enemies of a type; zero means the type's default.
    Spawn { type_id: EnemyTypeId, count: u32 },
    /// Remove every enemy.
    DespawnAll,
    /// Select an entry of the time-scale table.
    SetTimeScale(usize),
}

/// Held state of the four pan keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementKeys {
    /// Normalized pan direction; opposite keys cancel out.
    pub fn direction(&self) -> Vec2 {
        let mut v = Vec2::ZERO;
        if self.down {
            v.y -= 1.0;
        }
        if self.up {
            v.y += 1.0;
        }
        if self.left {
            v.x -= 1.0;
        }
        if self.right {
            v.x += 1.0;
        }
        v.normalize_or_zero()
    }

    /// `MoveCamera` when any pan key produces motion.
    pub fn action(&self) -> Option<Action> {
        let dir = self.direction();
        (dir != Vec2::ZERO).then_some(Action::MoveCamera(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_no_motion() {
        assert_eq!(MovementKeys::default().direction(), Vec2::ZERO);
        assert_eq!(MovementKeys::default().action(), None);
    }

    #[test]
    fn diagonal_is_normalized() {
        let keys = MovementKeys {
            up: true,
            right: true,
            ..Default::default()
        };
        let dir = keys.direction();
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(dir.x > 0.0 && dir.y > 0.0);
    }

    #[test]
    fn opposite_keys_cancel() {
        let keys = MovementKeys {
            up: true,
            down: true,
            left: true,
            ..Default::default()
        };
        assert_eq!(keys.direction(), Vec2::new(-1.0, 0.0));
        assert_eq!(keys.action(), Some(Action::MoveCamera(Vec2::new(-1.0, 0.0))));
    }
}
