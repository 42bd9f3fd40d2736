//! Dense 3-D grid for per-tile data

use serde::{Deserialize, Serialize};

use crate::core::types::Position;

/// Generic grid indexed by `Position`, stored level by level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid3<T: Clone + Default> {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid3<T> {
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        let (w, h, d) = (width.max(0), height.max(0), depth.max(0));
        Self {
            width: w,
            height: h,
            depth: d,
            data: vec![T::default(); (w * h * d) as usize],
        }
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < self.width
            && pos.y < self.height
            && pos.z < self.depth
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(((pos.z * self.height + pos.y) * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index(pos).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index(pos).map(move |i| &mut self.data[i])
    }

    /// Out-of-bounds writes are ignored
    #[inline]
    pub fn set(&mut self, pos: Position, value: T) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
