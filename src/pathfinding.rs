//! Path queries over the tile world
//!
//! Agents only see the `Pathfinder` trait. The stock implementation is a
//! bounded A* over `World::connected_neighbors`; a threaded or cached
//! pathfinder can answer `Running` instead and the agent simply asks again
//! next tick.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::types::{AgentId, Position};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResult {
    NoConnection,
    /// Not finished yet, ask again next tick
    Running,
    /// Steps to walk, next step last; the start tile is not included
    FoundPath(Vec<Position>),
}

pub trait Pathfinder: fmt::Debug {
    fn get_path(
        &mut self,
        world: &World,
        agent: AgentId,
        from: Position,
        to: Position,
        ignore_no_pass: bool,
    ) -> PathResult;

    /// Whether any walkable route links the two tiles
    fn check_connected(&mut self, world: &World, a: Position, b: Position) -> bool;
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    pos: Position,
    f_cost: OrderedFloat<f32>,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && self.f_cost == other.f_cost
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap, position breaks ties deterministically
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Moving one level up or down costs as much as this many flat steps
const Z_STEP_COST: f32 = 2.0;

fn heuristic(a: Position, b: Position) -> f32 {
    let flat = (a.x - b.x).abs() + (a.y - b.y).abs();
    flat as f32 + (a.z - b.z).abs() as f32 * Z_STEP_COST
}

#[derive(Debug, Clone)]
pub struct GridPathfinder {
    /// Searches that expand more nodes than this give up with `NoConnection`
    pub max_expansions: usize,
}

impl Default for GridPathfinder {
    fn default() -> Self {
        Self {
            max_expansions: 20_000,
        }
    }
}

impl GridPathfinder {
    pub fn new(max_expansions: usize) -> Self {
        Self { max_expansions }
    }

    fn search(&self, world: &World, start: Position, goal: Position, ignore_no_pass: bool) -> Option<Vec<Position>> {
        if start == goal {
            return Some(Vec::new());
        }
        let goal_ok = if ignore_no_pass {
            world.is_walkable(goal)
        } else {
            world.is_walkable_gnome(goal)
        };
        if !goal_ok {
            return None;
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<Position, Position> = AHashMap::new();
        let mut g_scores: AHashMap<Position, f32> = AHashMap::new();
        let mut expansions = 0;

        g_scores.insert(start, 0.0);
        open_set.push(PathNode {
            pos: start,
            f_cost: OrderedFloat(heuristic(start, goal)),
        });

        while let Some(current) = open_set.pop() {
            if current.pos == goal {
                return Some(reconstruct_path(&came_from, start, goal));
            }
            expansions += 1;
            if expansions > self.max_expansions {
                tracing::debug!("Path search {} -> {} gave up after {} expansions", start, goal, expansions);
                return None;
            }

            let current_g = *g_scores.get(&current.pos).unwrap_or(&f32::INFINITY);

            for neighbor in world.connected_neighbors(current.pos, ignore_no_pass) {
                let step = if neighbor.z != current.pos.z { Z_STEP_COST } else { 1.0 };
                let tentative_g = current_g + step;
                let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.pos);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(PathNode {
                        pos: neighbor,
                        f_cost: OrderedFloat(tentative_g + heuristic(neighbor, goal)),
                    });
                }
            }
        }

        None
    }
}

/// Walk back from the goal; the result ends with the first step
fn reconstruct_path(came_from: &AHashMap<Position, Position>, start: Position, goal: Position) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path
}

impl Pathfinder for GridPathfinder {
    fn get_path(
        &mut self,
        world: &World,
        agent: AgentId,
        from: Position,
        to: Position,
        ignore_no_pass: bool,
    ) -> PathResult {
        match self.search(world, from, to, ignore_no_pass) {
            Some(path) => PathResult::FoundPath(path),
            None => {
                tracing::debug!("{}: no path {} -> {}", agent, from, to);
                PathResult::NoConnection
            }
        }
    }

    fn check_connected(&mut self, world: &World, a: Position, b: Position) -> bool {
        self.search(world, a, b, true).is_some()
    }
}
