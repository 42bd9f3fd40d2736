//! Condition leaves
//!
//! Conditions answer Success or Failure in the tick they run. A few of
//! them also point the agent at the next item to fetch so the action that
//! follows knows where to go.

use crate::agent::needs::NeedType;
use crate::agent::state::AgentCore;
use crate::behavior::NodeStatus;
use crate::core::types::{ItemId, ScheduleActivity};
use crate::inventory::ClaimOwner;
use crate::simulation::Colony;

fn need_condition(
    core: &mut AgentCore,
    colony: &Colony,
    need: NeedType,
    scheduled: ScheduleActivity,
    message: &str,
) -> NodeStatus {
    let config = &colony.config;
    let hour = colony.clock.hour();
    let Some(needs) = core.needs.as_ref() else {
        return NodeStatus::Failure;
    };
    if !needs.tracks(need) {
        return NodeStatus::Failure;
    }
    let value = needs.value(need);
    let due = core.schedule_at(hour) == scheduled && value < config.scheduled_meal_threshold;
    if !due && value >= config.need_threshold {
        return NodeStatus::Failure;
    }

    let already_logged = match need {
        NeedType::Hunger => needs.hungry_logged,
        NeedType::Thirst => needs.thirsty_logged,
        NeedType::Sleep => true,
    };
    if !already_logged && value < config.need_threshold {
        core.log(&colony.stamp(), message);
        if let Some(needs) = core.needs.as_mut() {
            match need {
                NeedType::Hunger => needs.hungry_logged = true,
                NeedType::Thirst => needs.thirsty_logged = true,
                NeedType::Sleep => {}
            }
        }
    }
    NodeStatus::Success
}

pub fn is_hungry(core: &mut AgentCore, colony: &mut Colony, _halt: bool) -> NodeStatus {
    need_condition(core, colony, NeedType::Hunger, ScheduleActivity::Eat, "I'm hungry.")
}

pub fn is_thirsty(core: &mut AgentCore, colony: &mut Colony, _halt: bool) -> NodeStatus {
    need_condition(core, colony, NeedType::Thirst, ScheduleActivity::Eat, "I'm thirsty.")
}

pub fn is_sleepy(core: &mut AgentCore, colony: &mut Colony, _halt: bool) -> NodeStatus {
    let Some(needs) = core.needs.as_ref() else {
        return NodeStatus::Failure;
    };
    if !needs.tracks(NeedType::Sleep) {
        return NodeStatus::Failure;
    }
    let scheduled = core.schedule_at(colony.clock.hour()) == ScheduleActivity::Sleep;
    NodeStatus::from_bool(scheduled || needs.sleep < colony.config.sleepy_threshold)
}

/// Items claimed for the current job, in claim order
fn job_items(core: &AgentCore, colony: &Colony) -> Vec<ItemId> {
    let Some(job) = core.job else {
        return Vec::new();
    };
    core.claimed_items
        .iter()
        .copied()
        .filter(|item| colony.inventory.is_in_job(*item) == Some(ClaimOwner::Job(job)))
        .collect()
}

/// Every job input lies at the job's input tile
///
/// Otherwise the first misplaced item becomes the next thing to pick up.
pub fn all_items_in_place_for_job(core: &mut AgentCore, colony: &mut Colony, _halt: bool) -> NodeStatus {
    let Some(input) = core.job.and_then(|id| colony.jobs.job(id)).and_then(|job| job.pos_item_input) else {
        return NodeStatus::Failure;
    };
    let tool = core.blackboard.item(crate::agent::claims::BB_CLAIMED_TOOL);
    for item in job_items(core, colony) {
        if Some(item) == tool {
            continue;
        }
        let in_place = !colony.inventory.is_picked_up(item) && colony.inventory.position(item) == Some(input);
        if !in_place {
            core.item_to_pick_up = Some(item);
            core.current_target = colony.inventory.position(item);
            return NodeStatus::Failure;
        }
    }
    NodeStatus::Success
}

/// Every item of a haul job is in this agent's hands
pub fn all_picked_up(core: &mut AgentCore, colony: &mut Colony, _halt: bool) -> NodeStatus {
    let items = job_items(core, colony);
    if items.is_empty() {
        return NodeStatus::Failure;
    }
    for item in items {
        if colony.inventory.held_by(item) != Some(core.id) {
            core.item_to_pick_up = Some(item);
            core.current_target = colony.inventory.position(item);
            return NodeStatus::Failure;
        }
    }
    NodeStatus::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{AgentId, Position};
    use crate::inventory::NewItem;
    use crate::jobs::JobCatalog;
    use crate::world::World;

    fn setup() -> (AgentCore, Colony) {
        let config = SimulationConfig::default();
        let core = AgentCore::new(AgentId(1), "Urist", AgentKind::Gnome, Position::new(1, 1, 0), &config);
        let colony = Colony::new(config, World::flat(8, 8), JobCatalog::builtin().unwrap());
        (core, colony)
    }

    #[test]
    fn test_hunger_threshold_and_schedule() {
        let (mut core, mut colony) = setup();
        assert_eq!(is_hungry(&mut core, &mut colony, false), NodeStatus::Failure);

        core.needs.as_mut().unwrap().hunger = 80.0;
        core.schedule = [ScheduleActivity::Eat; 24];
        assert_eq!(is_hungry(&mut core, &mut colony, false), NodeStatus::Success);
        assert!(core.log.is_empty(), "a scheduled meal is not worth a complaint");

        core.schedule = [ScheduleActivity::None; 24];
        core.needs.as_mut().unwrap().hunger = 10.0;
        assert_eq!(is_hungry(&mut core, &mut colony, false), NodeStatus::Success);
        assert_eq!(is_hungry(&mut core, &mut colony, false), NodeStatus::Success);
        assert_eq!(core.log.len(), 1);
        assert!(core.needs.as_ref().unwrap().hungry_logged);
    }

    #[test]
    fn test_monsters_have_no_needs() {
        let config = SimulationConfig::default();
        let mut monster = AgentCore::new(AgentId(9), "Grr", AgentKind::Monster, Position::default(), &config);
        let (_, mut colony) = setup();
        assert_eq!(is_hungry(&mut monster, &mut colony, false), NodeStatus::Failure);
        assert_eq!(is_sleepy(&mut monster, &mut colony, false), NodeStatus::Failure);
    }

    #[test]
    fn test_items_in_place_points_at_misplaced_input() {
        let (mut core, mut colony) = setup();
        let job = colony.jobs.add_job("CraftBlock", Position::new(5, 5, 0), 5, false).unwrap();
        colony.jobs.job_mut(job).unwrap().pos_item_input = Some(Position::new(5, 5, 0));
        let stone = colony.inventory.create_item(NewItem::new("RawStone", "Granite", Position::new(2, 2, 0)));
        core.job = Some(job);
        core.add_claimed_item(&mut colony.inventory, stone, ClaimOwner::Job(job))
            .unwrap();

        assert_eq!(all_items_in_place_for_job(&mut core, &mut colony, false), NodeStatus::Failure);
        assert_eq!(core.item_to_pick_up, Some(stone));
        assert_eq!(core.current_target, Some(Position::new(2, 2, 0)));

        colony.inventory.move_item_to_pos(stone, Position::new(5, 5, 0));
        assert_eq!(all_items_in_place_for_job(&mut core, &mut colony, false), NodeStatus::Success);
    }
}
