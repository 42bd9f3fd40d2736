//! Agent manager: owns the living agents and corpses and ticks them
//!
//! Agents are updated round-robin. Each tick starts where the previous one
//! stopped, so when the time budget or the per-tick cap cuts a tick short
//! every agent still gets its turn before anyone goes twice.

use std::time::{Duration, Instant};

use crate::agent::{Agent, TickResult};
use crate::core::clock::TimeChanges;
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, Tick};
use crate::simulation::Colony;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEvent {
    JobChanged(AgentId),
    Died(AgentId),
    /// Removed from the simulation (destroyed, left the map, corpse expired)
    Removed(AgentId),
}

/// Limits for one manager tick; `None` means unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickBudget {
    pub time: Option<Duration>,
    pub max_agents: Option<usize>,
}

impl TickBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            time: (config.agent_tick_budget_ms > 0).then(|| Duration::from_millis(config.agent_tick_budget_ms)),
            max_agents: (config.max_agents_per_tick > 0).then_some(config.max_agents_per_tick),
        }
    }
}

#[derive(Debug, Default)]
pub struct AgentManager {
    agents: Vec<Agent>,
    corpses: Vec<Agent>,
    /// Index of the next agent to update
    cursor: usize,
    events: Vec<AgentEvent>,
}

impl AgentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(agents: Vec<Agent>, corpses: Vec<Agent>, cursor: usize) -> Self {
        let cursor = if cursor < agents.len() { cursor } else { 0 };
        Self {
            agents,
            corpses,
            cursor,
            events: Vec::new(),
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn corpses(&self) -> &[Agent] {
        &self.corpses
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id() == id)
    }

    pub fn corpse(&self, id: AgentId) -> Option<&Agent> {
        self.corpses.iter().find(|a| a.id() == id)
    }

    pub fn add_agent(&mut self, agent: Agent, colony: &mut Colony) -> AgentId {
        let id = agent.id();
        colony
            .world
            .insert_creature_at_position(agent.position(), id, agent.kind());
        self.agents.push(agent);
        id
    }

    /// Flag the job of an agent so it is given back on the agent's next tick
    pub fn set_job_aborted(&mut self, id: AgentId, colony: &mut Colony) -> bool {
        let Some(job) = self.agent(id).and_then(|a| a.core.job) else {
            return false;
        };
        colony.jobs.set_aborted(job, true);
        true
    }

    /// Mark an agent for removal on its next update
    pub fn destroy_agent(&mut self, id: AgentId) -> bool {
        match self.agent_mut(id) {
            Some(agent) => {
                agent.core.to_destroy = true;
                true
            }
            None => false,
        }
    }

    /// Events collected since the last drain
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn on_tick(&mut self, colony: &mut Colony, changes: TimeChanges, budget: TickBudget) -> Vec<(AgentId, TickResult)> {
        let mut results = Vec::new();
        let count = self.agents.len();
        if count > 0 {
            let started = Instant::now();
            let limit = budget.max_agents.unwrap_or(count).min(count);
            let mut index = self.cursor % count;
            let mut dead = Vec::new();
            let mut removed = Vec::new();

            for processed in 0..limit {
                if processed > 0 && budget.time.map_or(false, |t| started.elapsed() >= t) {
                    tracing::debug!("Agent tick budget spent after {} of {} agents", processed, count);
                    break;
                }
                let agent = &mut self.agents[index];
                let result = agent.on_tick(colony, changes);
                let id = agent.id();
                match result {
                    TickResult::Dead => dead.push(index),
                    TickResult::ToDestroy | TickResult::LeftMap => removed.push(index),
                    TickResult::JobChanged => self.events.push(AgentEvent::JobChanged(id)),
                    _ => {}
                }
                results.push((id, result));
                index = (index + 1) % count;
            }
            self.cursor = index;
            self.retire(colony, dead, removed);
        }
        self.sweep_corpses(colony);
        results
    }

    /// Move dead agents to the corpse list and drop removed ones
    fn retire(&mut self, colony: &mut Colony, dead: Vec<usize>, removed: Vec<usize>) {
        let mut doomed: Vec<(usize, bool)> = dead
            .into_iter()
            .map(|i| (i, true))
            .chain(removed.into_iter().map(|i| (i, false)))
            .collect();
        doomed.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        for (index, is_corpse) in doomed {
            let agent = self.agents.remove(index);
            if index < self.cursor {
                self.cursor -= 1;
            }
            if is_corpse {
                self.events.push(AgentEvent::Died(agent.id()));
                self.corpses.push(agent);
            } else {
                colony
                    .world
                    .remove_creature_from_position(agent.position(), agent.id());
                self.events.push(AgentEvent::Removed(agent.id()));
            }
        }
        if self.cursor >= self.agents.len() {
            self.cursor = 0;
        }
    }

    fn sweep_corpses(&mut self, colony: &mut Colony) {
        let now: Tick = colony.tick();
        let (expired, kept): (Vec<Agent>, Vec<Agent>) =
            std::mem::take(&mut self.corpses).into_iter().partition(|c| c.core.expires < now);
        self.corpses = kept;
        for corpse in expired {
            colony
                .world
                .remove_creature_from_position(corpse.position(), corpse.id());
            tracing::debug!("Corpse of {} removed", corpse.id());
            self.events.push(AgentEvent::Removed(corpse.id()));
        }
    }

    pub(crate) fn parts(&self) -> (&[Agent], &[Agent], usize) {
        (&self.agents, &self.corpses, self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentFactory, AgentKind};
    use crate::core::types::Position;
    use crate::jobs::JobCatalog;
    use crate::world::World;

    fn colony() -> Colony {
        Colony::new(SimulationConfig::default(), World::flat(10, 10), JobCatalog::builtin().unwrap())
    }

    fn populate(manager: &mut AgentManager, colony: &mut Colony, n: usize) -> Vec<AgentId> {
        let mut factory = AgentFactory::builtin().unwrap();
        (0..n)
            .map(|i| {
                let agent = factory
                    .spawn(AgentKind::Monster, "m", Position::new(i as i32, 0, 0), &colony.config)
                    .unwrap();
                manager.add_agent(agent, colony)
            })
            .collect()
    }

    #[test]
    fn test_capped_ticks_rotate_fairly() {
        let mut colony = colony();
        let mut manager = AgentManager::new();
        let ids = populate(&mut manager, &mut colony, 5);
        let budget = TickBudget {
            time: None,
            max_agents: Some(2),
        };

        let mut seen = Vec::new();
        for _ in 0..5 {
            let changes = colony.clock.advance();
            seen.extend(manager.on_tick(&mut colony, changes, budget).into_iter().map(|(id, _)| id));
        }
        let expected: Vec<AgentId> = ids.iter().cycle().take(10).copied().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_destroyed_agents_leave_the_world() {
        let mut colony = colony();
        let mut manager = AgentManager::new();
        let ids = populate(&mut manager, &mut colony, 3);
        manager.destroy_agent(ids[1]);

        let changes = colony.clock.advance();
        manager.on_tick(&mut colony, changes, TickBudget::unlimited());
        assert_eq!(manager.len(), 2);
        assert_eq!(colony.world.index_count(ids[1]), 0);
        assert!(manager.drain_events().contains(&AgentEvent::Removed(ids[1])));
    }

    #[test]
    fn test_corpses_expire() {
        let mut colony = colony();
        let mut manager = AgentManager::new();
        let ids = populate(&mut manager, &mut colony, 2);
        {
            let agent = manager.agent_mut(ids[0]).unwrap();
            agent.core.dead = true;
            agent.core.expires = 3;
        }

        let changes = colony.clock.advance();
        manager.on_tick(&mut colony, changes, TickBudget::unlimited());
        assert_eq!(manager.corpses().len(), 1);
        assert_eq!(colony.world.index_count(ids[0]), 1, "corpses stay on their tile");

        for _ in 0..3 {
            let changes = colony.clock.advance();
            manager.on_tick(&mut colony, changes, TickBudget::unlimited());
        }
        assert!(manager.corpses().is_empty());
        assert_eq!(colony.world.index_count(ids[0]), 0);
    }

    #[test]
    fn test_budget_from_config() {
        let mut config = SimulationConfig::default();
        config.agent_tick_budget_ms = 0;
        config.max_agents_per_tick = 0;
        assert_eq!(TickBudget::from_config(&config), TickBudget::unlimited());
        config.max_agents_per_tick = 7;
        assert_eq!(TickBudget::from_config(&config).max_agents, Some(7));
    }
}
