//! Per-agent update
//!
//! Order within one tick:
//! 1. destroyed agents release their job and items, then they and departed
//!    agents report and stop
//! 2. cooldowns run down by the ticks since the last update
//! 3. species upkeep (automaton fuel, trader departure)
//! 4. agents without floor fall one level and drop their job
//! 5. needs decay on minute boundaries; starving kills
//! 6. a job that was aborted, canceled or removed is cleaned up and the
//!    tree halted
//! 7. the behavior tree runs
//! 8. a position change is mirrored into the world's creature index

use serde::{Deserialize, Serialize};

use crate::agent::needs::NeedType;
use crate::agent::state::AgentKind;
use crate::agent::Agent;
use crate::core::clock::TimeChanges;
use crate::core::types::Position;
use crate::simulation::Colony;
use crate::world::FloorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickResult {
    Ok,
    /// Died this tick, or was already a corpse
    Dead,
    /// Took, finished or lost a job this tick
    JobChanged,
    ToDestroy,
    NoFloor,
    LeftMap,
    NoFuel,
    NoCore,
}

impl Agent {
    pub fn on_tick(&mut self, colony: &mut Colony, changes: TimeChanges) -> TickResult {
        if self.core.to_destroy {
            self.tree.halt(&mut self.core, colony);
            self.core.clean_up_job(colony, false);
            self.drop_everything(colony);
            return TickResult::ToDestroy;
        }
        if self.core.left_map {
            return TickResult::LeftMap;
        }
        if self.core.dead {
            return TickResult::Dead;
        }

        let now = colony.tick();
        self.core.process_cooldowns(now);
        self.core.last_tick = now;

        match self.core.kind {
            AgentKind::Automaton => {
                if let Some(tank) = self.core.fuel.as_mut() {
                    if !tank.has_core {
                        return TickResult::NoCore;
                    }
                    if tank.fuel == 0 {
                        return TickResult::NoFuel;
                    }
                    tank.fuel -= 1;
                }
            }
            AgentKind::Trader => {
                if self.core.leave_tick.map_or(false, |t| now > t) {
                    self.leave_map(colony);
                    return TickResult::LeftMap;
                }
            }
            _ => {}
        }

        if !self.check_floor(colony) {
            return TickResult::NoFloor;
        }

        if changes.minute && !self.core.on_mission {
            let starved = self
                .core
                .needs
                .as_mut()
                .and_then(|needs| needs.decay_minute(&colony.config));
            if let Some(need) = starved {
                let cause = match need {
                    NeedType::Thirst => "Died of thirst.",
                    _ => "Starved to death.",
                };
                self.die(colony, cause);
                return TickResult::Dead;
            }
        }

        if let Some(id) = self.core.job {
            let stale = colony
                .jobs
                .job(id)
                .map_or(true, |job| job.is_aborted() || job.is_canceled());
            if stale {
                tracing::debug!("{} drops {} after abort", self.core.id, id);
                self.core.clean_up_job(colony, false);
                self.tree.halt(&mut self.core, colony);
            }
        }

        self.core.enforce_carry_policy(&mut colony.inventory);

        let before = self.core.position;
        self.tree.tick(&mut self.core, colony);
        self.sync_position(colony, before);

        if std::mem::take(&mut self.core.job_changed) {
            TickResult::JobChanged
        } else {
            TickResult::Ok
        }
    }

    /// Fall one level when the tile has no floor
    fn check_floor(&mut self, colony: &mut Colony) -> bool {
        let pos = self.core.position;
        if colony.world.floor_type(pos) != FloorType::NoFloor || pos.z <= 0 {
            return true;
        }
        if self.core.job.is_some() {
            self.core.clean_up_job(colony, false);
        }
        self.tree.halt(&mut self.core, colony);
        self.core.position = pos.below();
        self.sync_position(colony, pos);
        let stamp = colony.stamp();
        self.core.log(&stamp, "I fell down.");
        false
    }

    /// Mirror a position change into the creature index and carried items
    pub(crate) fn sync_position(&mut self, colony: &mut Colony, before: Position) {
        let core = &self.core;
        if core.position == before {
            return;
        }
        colony.world.move_creature(before, core.position, core.id, core.kind);
        let held = core
            .carried_items
            .iter()
            .chain(core.inventory_items.iter())
            .copied()
            .chain(core.equipped_tool());
        for item in held {
            colony.inventory.move_item_to_pos(item, core.position);
        }
    }

    /// Drop everything and become a corpse
    pub fn die(&mut self, colony: &mut Colony, cause: &str) {
        if self.core.dead {
            return;
        }
        tracing::debug!("{} {}", self.core.id, cause);
        self.tree.halt(&mut self.core, colony);
        self.core.clean_up_job(colony, false);
        self.drop_everything(colony);
        self.core.dead = true;
        colony.world.mark_creature_dead(self.core.position, self.core.id);
        self.core.expires = colony.tick() + colony.config.corpse_expiry_ticks();
        let stamp = colony.stamp();
        self.core.log(&stamp, cause);
    }

    fn leave_map(&mut self, colony: &mut Colony) {
        self.tree.halt(&mut self.core, colony);
        self.core.clean_up_job(colony, false);
        self.drop_everything(colony);
        self.core.left_map = true;
    }

    fn drop_everything(&mut self, colony: &mut Colony) {
        let core = &mut self.core;
        core.unclaim_all(&mut colony.inventory);
        let position = core.position;
        for item in core.carried_items.drain(..).chain(core.inventory_items.drain(..)) {
            colony.inventory.put_down_item(item, position);
            colony.inventory.release_claim(item);
        }
        core.carried = Default::default();
        core.drop_equipped_item(&mut colony.inventory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentFactory;
    use crate::core::config::SimulationConfig;
    use crate::inventory::{ClaimOwner, NewItem};
    use crate::jobs::JobCatalog;
    use crate::world::World;

    fn setup(kind: AgentKind, pos: Position) -> (Agent, Colony) {
        let config = SimulationConfig::default();
        let mut factory = AgentFactory::builtin().unwrap();
        let agent = factory.spawn(kind, "Test", pos, &config).unwrap();
        let mut colony = Colony::new(config, World::new(8, 8, 2), JobCatalog::builtin().unwrap());
        for y in 0..8 {
            for x in 0..8 {
                colony.world.set_floor(Position::new(x, y, 0), FloorType::Floor);
            }
        }
        colony.world.insert_creature_at_position(pos, agent.core.id, kind);
        (agent, colony)
    }

    fn minute() -> TimeChanges {
        TimeChanges {
            minute: true,
            ..TimeChanges::default()
        }
    }

    #[test]
    fn test_starving_agent_dies_and_drops_claims() {
        let (mut agent, mut colony) = setup(AgentKind::Gnome, Position::new(2, 2, 0));
        let apple = colony
            .inventory
            .create_item(NewItem::new("Apple", "Apple", Position::new(5, 5, 0)).nutrition(10.0));
        agent
            .core
            .add_claimed_item(&mut colony.inventory, apple, ClaimOwner::Agent(agent.core.id))
            .unwrap();
        agent.core.needs.as_mut().unwrap().hunger = colony.config.starvation_threshold;

        assert_eq!(agent.on_tick(&mut colony, minute()), TickResult::Dead);
        assert!(agent.core.dead);
        assert_eq!(colony.inventory.is_in_job(apple), None);
        assert_eq!(agent.core.expires, colony.config.corpse_expiry_ticks());
        assert_eq!(agent.on_tick(&mut colony, minute()), TickResult::Dead);
    }

    #[test]
    fn test_agent_without_floor_falls() {
        let (mut agent, mut colony) = setup(AgentKind::Gnome, Position::new(3, 3, 1));
        assert_eq!(agent.on_tick(&mut colony, TimeChanges::default()), TickResult::NoFloor);
        assert_eq!(agent.core.position, Position::new(3, 3, 0));
        assert!(colony.world.has_gnome(Position::new(3, 3, 0)));
        assert_eq!(colony.world.index_count(agent.core.id), 1);
    }

    #[test]
    fn test_floor_check_runs_before_needs() {
        let (mut agent, mut colony) = setup(AgentKind::Gnome, Position::new(3, 3, 1));
        agent.core.needs.as_mut().unwrap().hunger = colony.config.starvation_threshold;
        assert_eq!(agent.on_tick(&mut colony, minute()), TickResult::NoFloor);
        assert!(!agent.core.dead);
        assert_eq!(agent.on_tick(&mut colony, minute()), TickResult::Dead);
    }

    #[test]
    fn test_corpse_stops_blocking_its_tile() {
        let pos = Position::new(2, 2, 0);
        let (mut agent, mut colony) = setup(AgentKind::Monster, pos);
        assert!(colony.world.has_monster(pos));
        agent.die(&mut colony, "Slain.");
        assert!(!colony.world.has_monster(pos));
        assert!(!colony.world.has_living_creature(pos));
        assert_eq!(colony.world.index_count(agent.core.id), 1);
    }

    #[test]
    fn test_automaton_burns_fuel() {
        let (mut agent, mut colony) = setup(AgentKind::Automaton, Position::new(1, 1, 0));
        agent.core.fuel.as_mut().unwrap().fuel = 1;
        assert_ne!(agent.on_tick(&mut colony, TimeChanges::default()), TickResult::NoFuel);
        assert_eq!(agent.on_tick(&mut colony, TimeChanges::default()), TickResult::NoFuel);

        agent.core.fuel.as_mut().unwrap().has_core = false;
        assert_eq!(agent.on_tick(&mut colony, TimeChanges::default()), TickResult::NoCore);
    }

    #[test]
    fn test_trader_leaves_after_deadline() {
        let (mut agent, mut colony) = setup(AgentKind::Trader, Position::new(1, 1, 0));
        agent.core.leave_tick = Some(0);
        colony.clock.advance();
        assert_eq!(agent.on_tick(&mut colony, TimeChanges::default()), TickResult::LeftMap);
        assert!(agent.core.left_map);
    }

    #[test]
    fn test_aborted_job_is_cleaned_up() {
        let (mut agent, mut colony) = setup(AgentKind::Gnome, Position::new(1, 1, 0));
        let job = colony.jobs.add_job("CraftBlock", Position::new(4, 4, 0), 5, false).unwrap();
        agent.core.job = Some(job);
        colony.jobs.set_job_being_worked(job, false);
        colony.jobs.set_aborted(job, true);

        let result = agent.on_tick(&mut colony, TimeChanges::default());
        assert_eq!(agent.core.job, None);
        assert_eq!(result, TickResult::JobChanged);
        assert!(!colony.jobs.job(job).unwrap().is_worked);
    }
}
