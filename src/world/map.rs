//! Tile world and creature position index
//!
//! The world owns two things agents and jobs query every tick: the tile
//! grid (floors, walls, stairs, no-pass zones) and the position index of
//! creatures. The index mirrors every agent's `position`; agents update it
//! through `insert_creature_at_position` / `remove_creature_from_position`
//! whenever they move, and the whole index is rebuilt after a load.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::core::types::{AgentId, Position};
use crate::world::grid::Grid3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloorType {
    #[default]
    NoFloor,
    Floor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub floor: FloorType,
    pub wall: bool,
    /// Stairs lead to the tile above
    pub stairs: bool,
    /// Gnomes do not path through these tiles unless told to
    pub no_pass: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: AgentId,
    pub kind: AgentKind,
    /// Corpses stay indexed until they expire but block nothing
    #[serde(default)]
    pub dead: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    tiles: Grid3<Tile>,
    #[serde(skip)]
    creatures: AHashMap<Position, Vec<Occupant>>,
}

impl World {
    /// Empty world; only level 0 has ground to stand on
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        Self {
            tiles: Grid3::new(width, height, depth),
            creatures: AHashMap::new(),
        }
    }

    /// Single floored level of the given size
    pub fn flat(width: i32, height: i32) -> Self {
        let mut world = Self::new(width, height, 1);
        for y in 0..height {
            for x in 0..width {
                world.set_floor(Position::new(x, y, 0), FloorType::Floor);
            }
        }
        world
    }

    pub fn width(&self) -> i32 {
        self.tiles.width
    }

    pub fn height(&self) -> i32 {
        self.tiles.height
    }

    pub fn depth(&self) -> i32 {
        self.tiles.depth
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        self.tiles.contains(pos)
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.tiles.get(pos)
    }

    // === Tile queries ===

    /// Bedrock is below level 0, and the top of a staircase counts as floor
    pub fn floor_type(&self, pos: Position) -> FloorType {
        let Some(tile) = self.tiles.get(pos) else {
            return FloorType::NoFloor;
        };
        if pos.z == 0 || tile.floor == FloorType::Floor {
            return FloorType::Floor;
        }
        match self.tiles.get(pos.below()) {
            Some(below) if below.stairs => FloorType::Floor,
            _ => FloorType::NoFloor,
        }
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        match self.tiles.get(pos) {
            Some(tile) => !tile.wall && self.floor_type(pos) == FloorType::Floor,
            None => false,
        }
    }

    pub fn is_walkable_gnome(&self, pos: Position) -> bool {
        self.is_walkable(pos) && self.tiles.get(pos).map_or(false, |t| !t.no_pass)
    }

    pub fn is_wall(&self, pos: Position) -> bool {
        self.tiles.get(pos).map_or(false, |t| t.wall)
    }

    /// Number of walkable cardinal neighbours
    pub fn walkable_neighbors(&self, pos: Position) -> usize {
        pos.cardinal_neighbors()
            .iter()
            .filter(|p| self.is_walkable(**p))
            .count()
    }

    /// Tiles reachable in one step: walkable cardinal neighbours plus
    /// stair transitions up and down
    pub fn connected_neighbors(&self, pos: Position, ignore_no_pass: bool) -> Vec<Position> {
        let passable = |p: Position| {
            if ignore_no_pass {
                self.is_walkable(p)
            } else {
                self.is_walkable_gnome(p)
            }
        };

        let mut out: Vec<Position> = pos
            .cardinal_neighbors()
            .into_iter()
            .filter(|p| passable(*p))
            .collect();

        if self.tiles.get(pos).map_or(false, |t| t.stairs) && passable(pos.above()) {
            out.push(pos.above());
        }
        let below = pos.below();
        if self.tiles.get(below).map_or(false, |t| t.stairs) && passable(below) {
            out.push(below);
        }
        out
    }

    // === Tile mutation ===

    pub fn set_floor(&mut self, pos: Position, floor: FloorType) -> bool {
        match self.tiles.get_mut(pos) {
            Some(tile) => {
                tile.floor = floor;
                true
            }
            None => false,
        }
    }

    pub fn set_wall(&mut self, pos: Position, wall: bool) -> bool {
        match self.tiles.get_mut(pos) {
            Some(tile) => {
                tile.wall = wall;
                if wall {
                    tile.floor = FloorType::Floor;
                }
                true
            }
            None => false,
        }
    }

    pub fn set_stairs(&mut self, pos: Position, stairs: bool) -> bool {
        match self.tiles.get_mut(pos) {
            Some(tile) => {
                tile.stairs = stairs;
                true
            }
            None => false,
        }
    }

    pub fn set_no_pass(&mut self, pos: Position, no_pass: bool) -> bool {
        match self.tiles.get_mut(pos) {
            Some(tile) => {
                tile.no_pass = no_pass;
                true
            }
            None => false,
        }
    }

    // === Creature position index ===

    pub fn insert_creature_at_position(&mut self, pos: Position, id: AgentId, kind: AgentKind) {
        let entry = self.creatures.entry(pos).or_default();
        if !entry.iter().any(|o| o.id == id) {
            entry.push(Occupant { id, kind, dead: false });
        }
    }

    /// Flag an indexed creature as a corpse; returns false if it is not at `pos`
    pub fn mark_creature_dead(&mut self, pos: Position, id: AgentId) -> bool {
        let occupant = self
            .creatures
            .get_mut(&pos)
            .and_then(|entry| entry.iter_mut().find(|o| o.id == id));
        match occupant {
            Some(o) => {
                o.dead = true;
                true
            }
            None => {
                tracing::warn!("{} not indexed at {}", id, pos);
                false
            }
        }
    }

    /// Returns false if the creature was not indexed at `pos`
    pub fn remove_creature_from_position(&mut self, pos: Position, id: AgentId) -> bool {
        let Some(entry) = self.creatures.get_mut(&pos) else {
            tracing::warn!("{} not indexed at {}", id, pos);
            return false;
        };
        let before = entry.len();
        entry.retain(|o| o.id != id);
        let removed = entry.len() != before;
        if entry.is_empty() {
            self.creatures.remove(&pos);
        }
        if !removed {
            tracing::warn!("{} not indexed at {}", id, pos);
        }
        removed
    }

    /// Update the index for a creature that stepped from `from` to `to`
    pub fn move_creature(&mut self, from: Position, to: Position, id: AgentId, kind: AgentKind) {
        if from != to {
            self.remove_creature_from_position(from, id);
            self.insert_creature_at_position(to, id, kind);
        }
    }

    pub fn creatures_at(&self, pos: Position) -> &[Occupant] {
        self.creatures.get(&pos).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Living creatures on a tile
    pub fn living_at(&self, pos: Position) -> impl Iterator<Item = &Occupant> + '_ {
        self.creatures_at(pos).iter().filter(|o| !o.dead)
    }

    pub fn has_living_creature(&self, pos: Position) -> bool {
        self.living_at(pos).next().is_some()
    }

    pub fn gnomes_at(&self, pos: Position) -> impl Iterator<Item = AgentId> + '_ {
        self.living_at(pos)
            .filter(|o| o.kind == AgentKind::Gnome)
            .map(|o| o.id)
    }

    pub fn monsters_at(&self, pos: Position) -> impl Iterator<Item = AgentId> + '_ {
        self.living_at(pos)
            .filter(|o| o.kind == AgentKind::Monster)
            .map(|o| o.id)
    }

    pub fn has_gnome(&self, pos: Position) -> bool {
        self.gnomes_at(pos).next().is_some()
    }

    pub fn has_monster(&self, pos: Position) -> bool {
        self.monsters_at(pos).next().is_some()
    }

    /// Number of index entries for `id`, across all positions
    pub fn index_count(&self, id: AgentId) -> usize {
        self.creatures
            .values()
            .map(|v| v.iter().filter(|o| o.id == id).count())
            .sum()
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.values().map(|v| v.len()).sum()
    }

    pub fn clear_creatures(&mut self) {
        self.creatures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_world_walkable() {
        let world = World::flat(5, 5);
        assert!(world.is_walkable(Position::new(2, 2, 0)));
        assert!(!world.is_walkable(Position::new(5, 2, 0)));
        assert_eq!(world.walkable_neighbors(Position::new(0, 0, 0)), 2);
        assert_eq!(world.walkable_neighbors(Position::new(2, 2, 0)), 4);
    }

    #[test]
    fn test_walls_and_no_pass() {
        let mut world = World::flat(5, 5);
        world.set_wall(Position::new(1, 0, 0), true);
        world.set_no_pass(Position::new(0, 1, 0), true);
        assert!(!world.is_walkable(Position::new(1, 0, 0)));
        assert!(world.is_walkable(Position::new(0, 1, 0)));
        assert!(!world.is_walkable_gnome(Position::new(0, 1, 0)));

        let origin = Position::new(0, 0, 0);
        assert!(world.connected_neighbors(origin, false).is_empty());
        assert_eq!(world.connected_neighbors(origin, true), vec![Position::new(0, 1, 0)]);
    }

    #[test]
    fn test_floor_and_stairs() {
        let mut world = World::new(3, 3, 2);
        let ground = Position::new(1, 1, 0);
        let upper = ground.above();
        assert_eq!(world.floor_type(ground), FloorType::Floor, "level 0 is on bedrock");
        assert_eq!(world.floor_type(upper), FloorType::NoFloor);

        world.set_stairs(ground, true);
        assert_eq!(world.floor_type(upper), FloorType::Floor);
        assert!(world.connected_neighbors(ground, false).contains(&upper));
        assert!(world.connected_neighbors(upper, false).contains(&ground));
    }

    #[test]
    fn test_creature_index() {
        let mut world = World::flat(4, 4);
        let a = Position::new(1, 1, 0);
        let b = Position::new(2, 1, 0);
        world.insert_creature_at_position(a, AgentId(1), AgentKind::Gnome);
        world.insert_creature_at_position(a, AgentId(1), AgentKind::Gnome);
        world.insert_creature_at_position(a, AgentId(2), AgentKind::Monster);
        assert_eq!(world.creatures_at(a).len(), 2, "duplicate insert is ignored");
        assert!(world.has_gnome(a));
        assert!(world.has_monster(a));

        world.move_creature(a, b, AgentId(1), AgentKind::Gnome);
        assert_eq!(world.index_count(AgentId(1)), 1);
        assert!(world.has_gnome(b));
        assert!(!world.has_gnome(a));

        assert!(!world.remove_creature_from_position(a, AgentId(1)));
        assert!(world.remove_creature_from_position(b, AgentId(1)));
        assert_eq!(world.creature_count(), 1);
    }

    #[test]
    fn test_corpses_stay_indexed_but_do_not_count_as_living() {
        let mut world = World::flat(4, 4);
        let pos = Position::new(2, 2, 0);
        world.insert_creature_at_position(pos, AgentId(3), AgentKind::Monster);
        world.insert_creature_at_position(pos, AgentId(4), AgentKind::Gnome);
        assert!(world.mark_creature_dead(pos, AgentId(3)));
        assert!(world.mark_creature_dead(pos, AgentId(4)));
        assert!(!world.mark_creature_dead(pos, AgentId(9)));

        assert_eq!(world.creatures_at(pos).len(), 2);
        assert_eq!(world.index_count(AgentId(3)), 1);
        assert!(!world.has_monster(pos));
        assert!(!world.has_gnome(pos));
        assert!(!world.has_living_creature(pos));
    }
}
