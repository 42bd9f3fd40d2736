//! Job task steps and what they change in the world

use crate::agent::state::AgentCore;
use crate::core::config::SimulationConfig;
use crate::core::types::JobId;
use crate::inventory::{ClaimOwner, NewItem, ANY_MATERIAL};
use crate::simulation::Colony;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Done,
    /// The task could not be completed, the job is aborted
    Failed,
    /// No such task; the job can never be finished
    Unknown,
}

/// Ticks a task takes; every skill level shaves off a twentieth
pub fn duration_ticks(minutes: u64, ticks_per_minute: u64, skill_level: f32, config: &SimulationConfig) -> u64 {
    let base = minutes * ticks_per_minute;
    let bonus = (base / 20) * skill_level.max(0.0) as u64;
    base.saturating_sub(bonus)
        .clamp(config.min_task_ticks, config.max_task_ticks.max(config.min_task_ticks))
}

pub fn run_task(task: &str, core: &mut AgentCore, colony: &mut Colony, job: JobId) -> TaskOutcome {
    match task {
        "Dig" => dig(colony, job),
        "BuildWall" => build_wall(core, colony, job),
        "Craft" => craft(core, colony, job),
        "Haul" => TaskOutcome::Done,
        _ => TaskOutcome::Unknown,
    }
}

fn dig(colony: &mut Colony, job: JobId) -> TaskOutcome {
    let Some(job) = colony.jobs.job(job) else {
        return TaskOutcome::Failed;
    };
    let pos = job.position;
    if !colony.world.is_wall(pos) {
        return TaskOutcome::Failed;
    }
    let product = job.product.clone();
    let material = job.material.clone();
    colony.world.set_wall(pos, false);
    if let Some(product) = product {
        let material = product
            .material_sid
            .or(material)
            .unwrap_or_else(|| ANY_MATERIAL.to_string());
        for _ in 0..product.count {
            colony
                .inventory
                .create_item(NewItem::new(&product.item_sid, &material, pos));
        }
    }
    TaskOutcome::Done
}

fn build_wall(core: &mut AgentCore, colony: &mut Colony, job: JobId) -> TaskOutcome {
    let Some(pos) = colony.jobs.job(job).map(|j| j.position) else {
        return TaskOutcome::Failed;
    };
    if colony.world.has_living_creature(pos) {
        return TaskOutcome::Failed;
    }
    core.destroy_claimed_items(&mut colony.inventory);
    colony.world.set_wall(pos, true);
    TaskOutcome::Done
}

fn craft(core: &mut AgentCore, colony: &mut Colony, job: JobId) -> TaskOutcome {
    let Some(job) = colony.jobs.job(job) else {
        return TaskOutcome::Failed;
    };
    let Some(product) = job.product.clone() else {
        return TaskOutcome::Failed;
    };
    let input_material = core
        .claimed_items
        .iter()
        .find(|item| matches!(colony.inventory.is_in_job(**item), Some(ClaimOwner::Job(_))))
        .and_then(|item| colony.inventory.material_sid(*item))
        .map(|m| m.to_string());
    let material = product
        .material_sid
        .clone()
        .or(input_material)
        .or_else(|| job.material.clone())
        .unwrap_or_else(|| ANY_MATERIAL.to_string());

    core.destroy_claimed_items(&mut colony.inventory);
    for _ in 0..product.count {
        colony.inventory.create_item(
            NewItem::new(&product.item_sid, &material, core.position).tool_level(product.tool_level),
        );
    }
    TaskOutcome::Done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::core::types::{AgentId, Position};
    use crate::jobs::JobCatalog;
    use crate::world::World;

    fn setup() -> (AgentCore, Colony) {
        let config = SimulationConfig::default();
        let core = AgentCore::new(AgentId(1), "Urist", AgentKind::Gnome, Position::new(2, 2, 0), &config);
        let colony = Colony::new(config, World::flat(8, 8), JobCatalog::builtin().unwrap());
        (core, colony)
    }

    #[test]
    fn test_duration_shrinks_with_skill_and_is_clamped() {
        let config = SimulationConfig::default();
        assert_eq!(duration_ticks(6, 10, 0.0, &config), 60);
        assert_eq!(duration_ticks(6, 10, 4.0, &config), 48);
        assert_eq!(duration_ticks(6, 10, 20.0, &config), config.min_task_ticks);
        assert_eq!(duration_ticks(500, 10, 0.0, &config), config.max_task_ticks);
    }

    #[test]
    fn test_dig_removes_wall_and_drops_product() {
        let (mut core, mut colony) = setup();
        let pos = Position::new(3, 2, 0);
        colony.world.set_wall(pos, true);
        let job = colony.jobs.add_job("Dig", pos, 5, false).unwrap();
        assert_eq!(run_task("Dig", &mut core, &mut colony, job), TaskOutcome::Done);
        assert!(!colony.world.is_wall(pos));
        assert_eq!(colony.inventory.item_count("RawStone", "Granite"), 1);
    }

    #[test]
    fn test_craft_takes_input_material() {
        let (mut core, mut colony) = setup();
        let job = colony.jobs.add_job("CraftBlock", core.position, 5, false).unwrap();
        let stone = colony
            .inventory
            .create_item(NewItem::new("RawStone", "Marble", core.position));
        core.add_claimed_item(&mut colony.inventory, stone, ClaimOwner::Job(job))
            .unwrap();
        assert_eq!(run_task("Craft", &mut core, &mut colony, job), TaskOutcome::Done);
        assert!(!colony.inventory.contains(stone));
        assert_eq!(colony.inventory.item_count("Block", "Marble"), 1);
    }

    #[test]
    fn test_build_wall_refuses_occupied_tile() {
        let (mut core, mut colony) = setup();
        let pos = Position::new(4, 4, 0);
        let job = colony.jobs.add_job("BuildWall", pos, 5, false).unwrap();
        colony.world.insert_creature_at_position(pos, AgentId(7), AgentKind::Animal);
        assert_eq!(run_task("BuildWall", &mut core, &mut colony, job), TaskOutcome::Failed);
        // a corpse does not stop the wall
        colony.world.mark_creature_dead(pos, AgentId(7));
        assert_eq!(run_task("BuildWall", &mut core, &mut colony, job), TaskOutcome::Done);
        assert!(colony.world.is_wall(pos));
    }

    #[test]
    fn test_unknown_task() {
        let (mut core, mut colony) = setup();
        let job = colony.jobs.add_job("Dig", Position::new(1, 1, 0), 5, false).unwrap();
        assert_eq!(run_task("Juggle", &mut core, &mut colony, job), TaskOutcome::Unknown);
    }
}
