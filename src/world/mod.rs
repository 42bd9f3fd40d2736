//! Tile world and creature positions

pub mod grid;
pub mod map;

pub use grid::Grid3;
pub use map::{FloorType, Occupant, Tile, World};
