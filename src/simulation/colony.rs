//! Shared simulation context handed to every behavior tree leaf
//!
//! Leaves get `&mut Colony` next to the agent's own state. Everything an
//! agent can observe or change outside itself goes through here: the clock,
//! the world, item claims, the job queue and the deterministic RNG.

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::clock::WorldClock;
use crate::core::config::SimulationConfig;
use crate::core::types::{Position, Tick};
use crate::inventory::Inventory;
use crate::jobs::{JobCatalog, JobManager};
use crate::pathfinding::{GridPathfinder, Pathfinder};
use crate::world::World;

/// Ranks the candidate tiles an agent may work a job from; lower is better
pub trait WorkPositionScorer: fmt::Debug {
    fn score(&self, world: &World, agent_pos: Position, candidate: Position, has_job: bool, may_trap: bool) -> i64;
}

/// `dist² + has_job * job_penalty`, plus `(open_base - walkable) * trap_weight`
/// for jobs that can box the worker in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapAwareScorer {
    pub trap_weight: i64,
    pub open_base: i64,
    pub job_penalty: i64,
}

impl Default for TrapAwareScorer {
    fn default() -> Self {
        Self {
            trap_weight: 100,
            open_base: 5,
            job_penalty: 10,
        }
    }
}

impl WorkPositionScorer for TrapAwareScorer {
    fn score(&self, world: &World, agent_pos: Position, candidate: Position, has_job: bool, may_trap: bool) -> i64 {
        let mut score = agent_pos.dist_square(&candidate);
        if has_job {
            score += self.job_penalty;
        }
        if may_trap {
            let open = world.walkable_neighbors(candidate) as i64;
            score += (self.open_base - open) * self.trap_weight;
        }
        score
    }
}

fn default_pathfinder() -> Box<dyn Pathfinder> {
    Box::new(GridPathfinder::default())
}

fn default_scorer() -> Box<dyn WorkPositionScorer> {
    Box::new(TrapAwareScorer::default())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Colony {
    pub clock: WorldClock,
    pub config: SimulationConfig,
    pub world: World,
    pub inventory: Inventory,
    pub jobs: JobManager,
    pub rng: ChaCha8Rng,
    #[serde(skip, default = "default_pathfinder")]
    pub pathfinder: Box<dyn Pathfinder>,
    #[serde(skip, default = "default_scorer")]
    pub scorer: Box<dyn WorkPositionScorer>,
}

impl Colony {
    pub fn new(config: SimulationConfig, world: World, catalog: JobCatalog) -> Self {
        Self {
            clock: WorldClock::new(&config),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            world,
            inventory: Inventory::new(),
            jobs: JobManager::new(catalog),
            pathfinder: default_pathfinder(),
            scorer: default_scorer(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.clock.tick()
    }

    /// Activity log stamp for the current time
    pub fn stamp(&self) -> String {
        self.clock.day_time()
    }

    pub fn with_pathfinder(mut self, pathfinder: Box<dyn Pathfinder>) -> Self {
        self.pathfinder = pathfinder;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn WorkPositionScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Rebuild every lookup table that is not saved
    ///
    /// The creature index is rebuilt separately from the agent list.
    pub fn rebuild_index(&mut self) {
        self.inventory.rebuild_index();
        self.jobs.rebuild_index();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_prefers_open_tiles_for_trapping_jobs() {
        let mut world = World::flat(6, 6);
        let agent = Position::new(0, 0, 0);
        // walled pocket around (4, 1)
        world.set_wall(Position::new(5, 1, 0), true);
        world.set_wall(Position::new(4, 0, 0), true);
        let scorer = TrapAwareScorer::default();
        let pocket = scorer.score(&world, agent, Position::new(4, 1, 0), false, true);
        let open = scorer.score(&world, agent, Position::new(2, 3, 0), false, true);
        assert!(open < pocket);

        // without the trap rule only distance counts
        let pocket = scorer.score(&world, agent, Position::new(4, 1, 0), false, false);
        let open = scorer.score(&world, agent, Position::new(2, 3, 0), false, false);
        assert_eq!(pocket, 17);
        assert_eq!(open, 13);
    }

    #[test]
    fn test_scorer_charges_tiles_with_a_job() {
        let world = World::flat(6, 6);
        let agent = Position::new(0, 0, 0);
        let tile = Position::new(2, 3, 0);
        let scorer = TrapAwareScorer::default();

        assert_eq!(scorer.score(&world, agent, tile, false, false), 13);
        assert_eq!(scorer.score(&world, agent, tile, true, false), 23);
        // open tile: (5 - 4) * 100
        assert_eq!(scorer.score(&world, agent, tile, false, true), 113);
        assert_eq!(scorer.score(&world, agent, tile, true, true), 123);
    }

    #[test]
    fn test_colony_serde_restores_helpers() {
        let colony = Colony::new(SimulationConfig::default(), World::flat(4, 4), JobCatalog::builtin().unwrap());
        let json = serde_json::to_string(&colony).unwrap();
        let mut loaded: Colony = serde_json::from_str(&json).unwrap();
        loaded.rebuild_index();
        assert_eq!(loaded.jobs.catalog().len(), colony.jobs.catalog().len());
        assert!(loaded.pathfinder.check_connected(&loaded.world, Position::new(0, 0, 0), Position::new(3, 3, 0)));
    }
}
