use serde::{Deserialize, Serialize};

/// Stable integer id of an enemy type: its index in the loaded type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EnemyTypeId(pub u32);

impl EnemyTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tile index inside a tile set (global id minus the tile set's first gid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl TileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_index_into_tables() {
        assert_eq!(EnemyTypeId(3).index(), 3);
        assert_eq!(TileId(17).index(), 17);
    }

    #[test]
    fn ids_order_by_value() {
        let mut ids = vec![EnemyTypeId(2), EnemyTypeId(0), EnemyTypeId(1)];
        ids.sort();
        assert_eq!(ids, vec![EnemyTypeId(0), EnemyTypeId(1), EnemyTypeId(2)]);
    }
}
