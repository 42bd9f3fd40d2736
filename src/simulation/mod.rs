//! Simulation driver
//!
//! One `Simulation::tick` advances the clock, lets the job manager requeue
//! returned jobs, then hands the tick to the agent manager. Saves are JSON:
//! the colony as-is, agents as snapshots whose trees are rebuilt on load.

pub mod colony;
pub mod manager;
pub mod scenario;

pub use colony::{Colony, TrapAwareScorer, WorkPositionScorer};
pub use manager::{AgentEvent, AgentManager, TickBudget};
pub use scenario::ScenarioBuilder;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentFactory, AgentKind, AgentSnapshot, IdAllocator, TickResult};
use crate::core::clock::TimeChanges;
use crate::core::config::SimulationConfig;
use crate::core::error::{ColonyError, Result};
use crate::core::types::{AgentId, Position, Tick};
use crate::jobs::JobCatalog;
use crate::world::World;

/// What happened during one simulation tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: Tick,
    pub changes: TimeChanges,
    pub results: Vec<(AgentId, TickResult)>,
    pub events: Vec<AgentEvent>,
}

#[derive(Debug, Serialize)]
struct SaveGameRef<'a> {
    colony: &'a Colony,
    agents: Vec<AgentSnapshot>,
    corpses: Vec<AgentSnapshot>,
    cursor: usize,
    ids: IdAllocator,
}

#[derive(Debug, Deserialize)]
struct SaveGame {
    colony: Colony,
    agents: Vec<AgentSnapshot>,
    #[serde(default)]
    corpses: Vec<AgentSnapshot>,
    #[serde(default)]
    cursor: usize,
    #[serde(default)]
    ids: IdAllocator,
}

#[derive(Debug)]
pub struct Simulation {
    pub colony: Colony,
    pub agents: AgentManager,
    factory: AgentFactory,
}

impl Simulation {
    pub fn new(config: SimulationConfig, world: World, catalog: JobCatalog) -> Result<Self> {
        config.validate().map_err(ColonyError::InvalidConfig)?;
        Ok(Self {
            colony: Colony::new(config, world, catalog),
            agents: AgentManager::new(),
            factory: AgentFactory::builtin()?,
        })
    }

    pub fn with_factory(mut self, factory: AgentFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn spawn(&mut self, kind: AgentKind, name: &str, position: Position) -> Result<AgentId> {
        let agent = self.factory.spawn(kind, name, position, &self.colony.config)?;
        Ok(self.agents.add_agent(agent, &mut self.colony))
    }

    pub fn tick(&mut self) -> TickReport {
        let changes = self.colony.clock.advance();
        self.colony.jobs.on_tick(&self.colony.world, &self.colony.inventory);
        let budget = TickBudget::from_config(&self.colony.config);
        let results = self.agents.on_tick(&mut self.colony, changes, budget);
        TickReport {
            tick: self.colony.tick(),
            changes,
            results,
            events: self.agents.drain_events(),
        }
    }

    pub fn run(&mut self, ticks: u64) -> Vec<TickReport> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    pub fn save_json(&self) -> Result<String> {
        let (agents, corpses, cursor) = self.agents.parts();
        let save = SaveGameRef {
            colony: &self.colony,
            agents: agents.iter().map(AgentSnapshot::capture).collect(),
            corpses: corpses.iter().map(AgentSnapshot::capture).collect(),
            cursor,
            ids: self.factory.ids(),
        };
        Ok(serde_json::to_string(&save)?)
    }

    pub fn load_json(json: &str) -> Result<Self> {
        Self::load_json_with(json, AgentFactory::builtin()?)
    }

    pub fn load_json_with(json: &str, mut factory: AgentFactory) -> Result<Self> {
        let save: SaveGame = serde_json::from_str(json)?;
        let mut colony = save.colony;
        colony.rebuild_index();
        colony.world.clear_creatures();

        factory.set_ids(save.ids);
        let agents = save
            .agents
            .into_iter()
            .map(|s| factory.restore(s))
            .collect::<Result<Vec<_>>>()?;
        let corpses = save
            .corpses
            .into_iter()
            .map(|s| factory.restore(s))
            .collect::<Result<Vec<_>>>()?;
        for agent in agents.iter().chain(corpses.iter()) {
            colony
                .world
                .insert_creature_at_position(agent.position(), agent.id(), agent.kind());
        }
        for corpse in &corpses {
            colony.world.mark_creature_dead(corpse.position(), corpse.id());
        }
        tracing::info!(
            "Loaded save at tick {} with {} agents and {} corpses",
            colony.tick(),
            agents.len(),
            corpses.len()
        );

        Ok(Self {
            colony,
            agents: AgentManager::from_parts(agents, corpses, save.cursor),
            factory,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.save_json()?)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_json(&std::fs::read_to_string(path)?)
    }
}
