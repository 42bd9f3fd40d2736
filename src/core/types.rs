//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Unique identifier for agents, stable across save/load
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "agent#{}", _0)]
pub struct AgentId(pub u32);

/// Unique identifier for items owned by the inventory
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "item#{}", _0)]
pub struct ItemId(pub u32);

/// Weak reference into the job manager's job table.
///
/// The generation is bumped whenever a slot is reused, so a handle held by
/// an agent after its job was removed resolves to `None` instead of a
/// different job.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "job#{}.{}", index, generation)]
pub struct JobId {
    pub index: u32,
    pub generation: u32,
}

impl JobId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Grid coordinate in the tile world
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "{} {} {}", x, y, z)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance on the grid
    pub fn dist_square(&self, other: &Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Squared distance with the vertical axis scaled, so jobs on other
    /// levels rank behind jobs on the same level
    pub fn dist_square_weighted(&self, other: &Self, z_weight: i64) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64 * z_weight;
        dx * dx + dy * dy + dz * dz
    }

    pub fn north(&self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }

    pub fn south(&self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    pub fn east(&self) -> Self {
        Self::new(self.x + 1, self.y, self.z)
    }

    pub fn west(&self) -> Self {
        Self::new(self.x - 1, self.y, self.z)
    }

    pub fn above(&self) -> Self {
        Self::new(self.x, self.y, self.z + 1)
    }

    pub fn below(&self) -> Self {
        Self::new(self.x, self.y, self.z - 1)
    }

    /// North, east, south, west
    pub fn cardinal_neighbors(&self) -> [Self; 4] {
        [self.north(), self.east(), self.south(), self.west()]
    }

    /// Cardinal neighbors plus the tiles above and below
    pub fn all_neighbors(&self) -> [Self; 6] {
        [
            self.north(),
            self.east(),
            self.south(),
            self.west(),
            self.above(),
            self.below(),
        ]
    }

    pub fn offset(&self, offset: Offset) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.z + offset.z)
    }

    /// Facing index used by sprites and the save format
    /// (0 = east, 1 = south, 2 = west, 3 = north)
    pub fn facing_towards(&self, to: &Self) -> u8 {
        let dx = to.x - self.x;
        let dy = to.y - self.y;
        match (dx, dy) {
            (1, 0) | (1, 1) => 0,
            (0, 1) | (-1, 1) => 1,
            (-1, 0) | (-1, -1) => 2,
            (0, -1) | (1, -1) => 3,
            _ => 0,
        }
    }
}

/// Relative offset, used for job work positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Offset {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<[i32; 3]> for Offset {
    fn from(v: [i32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// What an agent's schedule asks for during a given hour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleActivity {
    #[default]
    None,
    Eat,
    Sleep,
    Training,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(3, 4, 0);
        assert_eq!(a.dist_square(&b), 25);
        assert_eq!(a.dist_square_weighted(&Position::new(0, 0, 1), 10), 100);
    }

    #[test]
    fn test_position_neighbors() {
        let p = Position::new(5, 5, 1);
        let n = p.cardinal_neighbors();
        assert!(n.contains(&Position::new(5, 4, 1)));
        assert!(n.contains(&Position::new(6, 5, 1)));
        assert_eq!(p.below(), Position::new(5, 5, 0));
        assert_eq!(p.offset(Offset::new(-1, 0, 0)), Position::new(4, 5, 1));
    }

    #[test]
    fn test_facing() {
        let p = Position::new(5, 5, 0);
        assert_eq!(p.facing_towards(&p.east()), 0);
        assert_eq!(p.facing_towards(&p.south()), 1);
        assert_eq!(p.facing_towards(&p.west()), 2);
        assert_eq!(p.facing_towards(&p.north()), 3);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(AgentId(7).to_string(), "agent#7");
        assert_eq!(ItemId(3).to_string(), "item#3");
        assert_eq!(JobId::new(2, 1).to_string(), "job#2.1");
    }

    #[test]
    fn test_job_id_hash() {
        use std::collections::HashMap;
        let mut map: HashMap<JobId, &str> = HashMap::new();
        map.insert(JobId::new(1, 0), "dig");
        assert_eq!(map.get(&JobId::new(1, 0)), Some(&"dig"));
        assert_eq!(map.get(&JobId::new(1, 1)), None);
    }
}
