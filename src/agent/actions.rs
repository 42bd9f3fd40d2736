//! Action leaves
//!
//! Every action has the leaf signature `(agent, colony, halt)`. With
//! `halt == true` the action is being cancelled: it undoes whatever it
//! started (claims, an unfinished meal, a half-walked path) and returns.

use rand::Rng;

use crate::agent::claims::{BB_BED, BB_CLAIMED_INVENTORY_ITEM, BB_CLAIMED_TOOL, BB_JOB_FLOW, BB_JOB_TYPE, BB_MEAL};
use crate::agent::needs::NeedType;
use crate::agent::state::{Activity, AgentCore, AgentKind};
use crate::agent::tasks::{self, TaskOutcome};
use crate::behavior::NodeStatus;
use crate::core::types::{ItemId, JobId, Position, ScheduleActivity};
use crate::inventory::ClaimOwner;
use crate::jobs::JobFlow;
use crate::pathfinding::PathResult;
use crate::simulation::Colony;
use crate::world::World;

fn log(core: &mut AgentCore, colony: &Colony, text: &str) {
    let stamp = colony.stamp();
    core.log(&stamp, text);
}

// === Jobs ===

pub fn get_job(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    if let Some(id) = core.job {
        return NodeStatus::from_bool(colony.jobs.job(id).is_some());
    }
    if core.cooldowns.job_search > 0 || core.skill_priorities.is_empty() {
        return NodeStatus::Failure;
    }

    let Colony {
        jobs,
        world,
        inventory,
        pathfinder,
        scorer,
        config,
        ..
    } = colony;
    let Some(id) = jobs.get_job(&core.skill_priorities, core.id, core.position, world, inventory, &mut **pathfinder)
    else {
        core.cooldowns.job_search = config.job_search_cooldown;
        return NodeStatus::Failure;
    };
    let Some(job) = jobs.job(id) else {
        return NodeStatus::Failure;
    };

    core.job = Some(id);
    core.job_changed = true;
    core.blackboard.insert(BB_JOB_TYPE, job.job_type.clone());
    core.blackboard.insert(BB_JOB_FLOW, job.flow.as_str());
    core.work.work_positions.clear();
    for candidate in job.possible_work_positions() {
        let score = scorer.score(world, core.position, *candidate, jobs.has_job_at(*candidate), job.may_trap);
        core.work.work_positions.put(*candidate, score);
    }
    let text = format!("Starting job {}.", job.job_type);
    log(core, colony, &text);
    NodeStatus::Success
}

/// Pick a reachable work position and mark the job as being worked
pub fn init_job(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(id) = core.job else {
        return NodeStatus::Failure;
    };
    if colony.jobs.job(id).is_none() {
        return NodeStatus::Failure;
    }

    let work_pos = loop {
        let Some(candidate) = core.work.work_positions.get() else {
            log(core, colony, "Can't reach the job.");
            return NodeStatus::Failure;
        };
        if colony.pathfinder.check_connected(&colony.world, core.position, candidate) {
            break candidate;
        }
    };

    let ready = match colony.jobs.job_mut(id) {
        Some(job) => {
            job.set_work_pos(work_pos);
            if job.pos_item_input.is_none() {
                job.pos_item_input = Some(work_pos);
            }
            job.required_items.is_empty() && job.items_to_haul.is_empty()
        }
        None => return NodeStatus::Failure,
    };
    colony.jobs.set_job_being_worked(id, ready);
    NodeStatus::Success
}

/// Claim the inputs a job needs, or the items a haul job moves
pub fn claim_items(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(id) = core.job else {
        return NodeStatus::Failure;
    };
    let Some(job) = colony.jobs.job(id) else {
        return NodeStatus::Failure;
    };
    let flow = job.flow;
    let search_from = job.position;
    let items_to_haul = job.items_to_haul.clone();
    let required = job.required_items.clone();
    let tool_needed = job.required_tool.is_some() && core.kind != AgentKind::Automaton;

    // stale claims from an earlier attempt that are not in hand
    let inventory = &mut colony.inventory;
    let stale: Vec<ItemId> = core
        .claimed_items
        .iter()
        .copied()
        .filter(|item| inventory.is_in_job(*item) == Some(ClaimOwner::Job(id)) && !inventory.is_picked_up(*item))
        .collect();
    for item in stale {
        inventory.release_claim(item);
        core.claimed_items.retain(|i| *i != item);
    }

    let picks: Vec<ItemId> = match flow {
        JobFlow::Haul => items_to_haul,
        JobFlow::Standard => match colony.inventory.pick_for_requirements(search_from, &required) {
            Some(picks) => picks,
            None => {
                log(core, colony, "Can't find the items for my job.");
                return NodeStatus::Failure;
            }
        },
    };

    for item in picks {
        if core
            .add_claimed_item(&mut colony.inventory, item, ClaimOwner::Job(id))
            .is_err()
        {
            return NodeStatus::Failure;
        }
    }
    colony.jobs.mark_items_claimed(id);
    colony.jobs.set_job_being_worked(id, !tool_needed);
    NodeStatus::Success
}

pub fn find_tool(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(id) = core.job else {
        return NodeStatus::Failure;
    };
    let Some(job) = colony.jobs.job(id) else {
        return NodeStatus::Failure;
    };
    let Some(tool) = job.required_tool.clone() else {
        core.current_target = Some(core.position);
        return NodeStatus::Success;
    };
    if core.kind == AgentKind::Automaton {
        core.current_target = Some(core.position);
        return NodeStatus::Success;
    }

    if let Some(equipped) = core.equipped_tool() {
        let fits = colony.inventory.item_sid(equipped) == Some(tool.item_sid.as_str())
            && colony.inventory.tool_level(equipped) >= tool.level;
        if fits {
            core.current_target = Some(core.position);
            return NodeStatus::Success;
        }
        core.drop_equipped_item(&mut colony.inventory);
    }

    let Some(found) = colony
        .inventory
        .get_closest_tool(core.position, &tool.item_sid, tool.level)
    else {
        let text = format!("I need a {} for this job.", tool.item_sid);
        log(core, colony, &text);
        return NodeStatus::Failure;
    };
    if core
        .add_claimed_item(&mut colony.inventory, found, ClaimOwner::Job(id))
        .is_err()
    {
        return NodeStatus::Failure;
    }
    core.blackboard.insert(BB_CLAIMED_TOOL, found);
    core.current_target = colony.inventory.position(found);
    if let Some(job) = colony.jobs.job_mut(id) {
        job.tool_pos = core.current_target;
    }
    NodeStatus::Success
}

pub fn equip_tool(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(tool) = core.blackboard.item(BB_CLAIMED_TOOL) else {
        return NodeStatus::Success;
    };
    if core.equipped_tool() == Some(tool) {
        return NodeStatus::Success;
    }
    if colony.inventory.position(tool) != Some(core.position) || colony.inventory.is_picked_up(tool) {
        return NodeStatus::Failure;
    }
    let Some(equipment) = core.equipment.as_mut() else {
        return NodeStatus::Failure;
    };
    colony.inventory.pick_up_item(tool, core.id);
    equipment.right_hand = Some(tool);
    core.claimed_items.retain(|i| *i != tool);
    if let Some(id) = core.job {
        colony.jobs.set_job_being_worked(id, true);
    }
    NodeStatus::Success
}

pub fn get_work_position(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(job) = core.job.and_then(|id| colony.jobs.job(id)) else {
        return NodeStatus::Failure;
    };
    let Some(work_pos) = job.work_pos else {
        return NodeStatus::Failure;
    };
    core.current_target = Some(work_pos);
    core.movement.facing_after_move = Some(work_pos.facing_towards(&job.position));
    NodeStatus::Success
}

pub fn get_item_drop_position(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(input) = core.job.and_then(|id| colony.jobs.job(id)).and_then(|job| job.pos_item_input) else {
        return NodeStatus::Failure;
    };
    core.current_target = Some(input);
    NodeStatus::Success
}

/// Put down the first carried item; it stays claimed for the job
pub fn drop_item(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    if core.carried_items.is_empty() {
        return NodeStatus::Failure;
    }
    let item = core.carried_items.remove(0);
    colony.inventory.put_down_item(item, core.position);
    NodeStatus::Success
}

/// Put down everything carried; haul deliveries end up in the stockpile
pub fn drop_all_items(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let haul = core.blackboard.matches(BB_JOB_FLOW, JobFlow::Haul.as_str());
    for item in std::mem::take(&mut core.carried_items) {
        colony.inventory.put_down_item(item, core.position);
        if haul {
            colony.inventory.set_in_stockpile(item, true);
            colony.inventory.release_claim(item);
            core.claimed_items.retain(|i| *i != item);
        }
    }
    NodeStatus::Success
}

/// Run the job's task steps one after the other
pub fn work(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        core.work.current_task = None;
        core.work.activity = Activity::Idle;
        return NodeStatus::Idle;
    }
    let Some(id) = core.job else {
        return NodeStatus::Failure;
    };
    let Some(job) = colony.jobs.job(id) else {
        return NodeStatus::Failure;
    };
    if job.is_canceled() || job.is_aborted() {
        return NodeStatus::Failure;
    }

    if core.work.activity != Activity::Working {
        core.work.activity = Activity::Working;
        core.work.remaining_tasks = job.tasks.iter().cloned().collect();
        core.work.current_task = None;
        core.facing = core.position.facing_towards(&job.position);
        return start_next_task(core, colony, id);
    }

    if colony.tick() < core.work.task_finish_tick {
        return NodeStatus::Running;
    }
    let Some(step) = core.work.current_task.take() else {
        return start_next_task(core, colony, id);
    };
    match tasks::run_task(&step.task, core, colony, id) {
        TaskOutcome::Done => start_next_task(core, colony, id),
        TaskOutcome::Failed => {
            let text = format!("I couldn't finish {}.", step.task);
            log(core, colony, &text);
            NodeStatus::Failure
        }
        TaskOutcome::Unknown => {
            tracing::warn!("{} has unknown task '{}', canceling {}", core.id, step.task, id);
            if let Some(job) = colony.jobs.job_mut(id) {
                job.canceled = true;
            }
            NodeStatus::Failure
        }
    }
}

fn start_next_task(core: &mut AgentCore, colony: &mut Colony, job: JobId) -> NodeStatus {
    let Some(step) = core.work.remaining_tasks.pop_front() else {
        core.work.activity = Activity::Job;
        return NodeStatus::Success;
    };
    let skill = colony.jobs.job(job).map(|j| j.skill.clone()).unwrap_or_default();
    let duration = tasks::duration_ticks(
        step.minutes,
        colony.clock.ticks_per_minute(),
        core.skill_level(&skill),
        &colony.config,
    );
    core.work.task_finish_tick = colony.tick() + duration;
    core.work.total_ticks += duration;
    core.work.current_task = Some(step);
    NodeStatus::Running
}

pub fn finish_job(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(job_type) = core.blackboard.text(BB_JOB_TYPE).map(|s| s.to_string()) else {
        return NodeStatus::Failure;
    };
    core.clean_up_job(colony, true);
    let text = format!("Finished job {}.", job_type);
    log(core, colony, &text);
    NodeStatus::Success
}

pub fn abort_job(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    if core.job.is_some() {
        log(core, colony, "Abandoned my job.");
    }
    core.clean_up_job(colony, false);
    NodeStatus::Success
}

// === Movement ===

pub fn move_to_target(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        core.movement.path.clear();
        return NodeStatus::Idle;
    }
    if !core.movement.path.is_empty() {
        return move_on_path(core, colony);
    }
    let Some(target) = core.current_target else {
        return NodeStatus::Failure;
    };
    if core.position == target {
        if let Some(facing) = core.movement.facing_after_move.take() {
            core.facing = facing;
        }
        return NodeStatus::Success;
    }
    match colony.pathfinder.get_path(
        &colony.world,
        core.id,
        core.position,
        target,
        core.movement.ignore_no_pass,
    ) {
        PathResult::FoundPath(path) => {
            core.movement.path = path;
            NodeStatus::Running
        }
        PathResult::Running => NodeStatus::Running,
        PathResult::NoConnection => {
            tracing::debug!("{} has no path from {} to {}", core.id, core.position, target);
            NodeStatus::Failure
        }
    }
}

/// Take the next step once the movement cooldown has run out
fn move_on_path(core: &mut AgentCore, colony: &mut Colony) -> NodeStatus {
    if core.movement.cooldown > 0.0 {
        return NodeStatus::Running;
    }
    let Some(next) = core.movement.path.last().copied() else {
        return NodeStatus::Success;
    };
    let passable = if core.kind.is_gnome_like() && !core.movement.ignore_no_pass {
        colony.world.is_walkable_gnome(next)
    } else {
        colony.world.is_walkable(next)
    };
    if !passable {
        core.movement.path.clear();
        return NodeStatus::Failure;
    }
    if blocked_by_occupant(core.kind, &colony.world, next) {
        return NodeStatus::Running;
    }

    core.facing = core.position.facing_towards(&next);
    core.position = next;
    core.movement.path.pop();
    core.movement.cooldown = core.movement.delay;

    if core.movement.path.is_empty() && Some(core.position) == core.current_target {
        if let Some(facing) = core.movement.facing_after_move.take() {
            core.facing = facing;
        }
        return NodeStatus::Success;
    }
    NodeStatus::Running
}

/// Gnomes wait for monsters to clear a tile; monsters do not enter gnome tiles
fn blocked_by_occupant(kind: AgentKind, world: &World, pos: Position) -> bool {
    match kind {
        AgentKind::Gnome | AgentKind::Trader | AgentKind::Automaton => world.has_monster(pos),
        AgentKind::Monster => world.has_gnome(pos),
        AgentKind::Animal => false,
    }
}

pub fn wander(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt || core.movement.cooldown > 0.0 {
        return NodeStatus::Success;
    }
    let chance = colony.config.wander_chance.max(1);
    if colony.rng.gen_range(0..chance) != 0 {
        return NodeStatus::Success;
    }
    let options: Vec<Position> = core
        .position
        .cardinal_neighbors()
        .into_iter()
        .filter(|p| match core.kind {
            AgentKind::Gnome => colony.world.is_walkable_gnome(*p),
            _ => colony.world.is_walkable(*p),
        })
        .filter(|p| !blocked_by_occupant(core.kind, &colony.world, *p))
        .collect();
    if options.is_empty() {
        return NodeStatus::Success;
    }
    let next = options[colony.rng.gen_range(0..options.len())];
    core.facing = core.position.facing_towards(&next);
    core.position = next;
    core.movement.cooldown = core.movement.delay;
    NodeStatus::Success
}

// === Items ===

pub fn pick_up_item(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    let Some(item) = core.item_to_pick_up else {
        return NodeStatus::Success;
    };
    if !colony.inventory.contains(item) {
        core.item_to_pick_up = None;
        return NodeStatus::Failure;
    }
    match colony.inventory.held_by(item) {
        Some(holder) if holder == core.id => {}
        Some(_) => return NodeStatus::Failure,
        None => {
            if colony.inventory.position(item) != Some(core.position) {
                return NodeStatus::Failure;
            }
            colony.inventory.pick_up_item(item, core.id);
        }
    }

    core.item_to_pick_up = None;
    if core.blackboard.item(BB_CLAIMED_INVENTORY_ITEM) == Some(item) {
        core.blackboard.remove(BB_CLAIMED_INVENTORY_ITEM);
        core.stash_item(&colony.inventory, item);
    } else if !core.carried_items.contains(&item) {
        core.carried_items.push(item);
    }
    NodeStatus::Success
}

// === Needs ===

fn find_consumable(core: &mut AgentCore, colony: &mut Colony, need: NeedType) -> NodeStatus {
    if core.job.is_some() {
        core.clean_up_job(colony, false);
    }

    // something suitable in the personal inventory comes first
    let stashed = core.inventory_items.iter().copied().find(|item| {
        colony.inventory.item(*item).map_or(false, |i| match need {
            NeedType::Hunger => i.is_food(),
            _ => i.is_drink(),
        })
    });
    if let Some(item) = stashed {
        core.blackboard.insert(BB_MEAL, item);
        core.item_to_pick_up = None;
        core.current_target = Some(core.position);
        return NodeStatus::Success;
    }

    let found = match need {
        NeedType::Hunger => colony.inventory.get_food_item(core.position),
        _ => colony.inventory.get_drink_item(core.position),
    };
    let Some(item) = found else {
        let text = match need {
            NeedType::Hunger => "There is nothing to eat.",
            _ => "There is nothing to drink.",
        };
        log(core, colony, text);
        return NodeStatus::Failure;
    };
    if core
        .add_claimed_item(&mut colony.inventory, item, ClaimOwner::Agent(core.id))
        .is_err()
    {
        return NodeStatus::Failure;
    }
    core.blackboard.insert(BB_MEAL, item);
    core.item_to_pick_up = Some(item);
    core.current_target = colony.inventory.position(item);
    NodeStatus::Success
}

pub fn find_food(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    find_consumable(core, colony, NeedType::Hunger)
}

pub fn find_drink(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    find_consumable(core, colony, NeedType::Thirst)
}

fn consume(core: &mut AgentCore, colony: &mut Colony, halt: bool, need: NeedType) -> NodeStatus {
    let activity = match need {
        NeedType::Hunger => Activity::Eating,
        _ => Activity::Drinking,
    };
    if halt {
        if core.work.activity == activity {
            core.work.activity = Activity::Idle;
        }
        core.unclaim_all(&mut colony.inventory);
        return NodeStatus::Idle;
    }
    let Some(item) = core.blackboard.item(BB_MEAL) else {
        return NodeStatus::Failure;
    };
    if !colony.inventory.contains(item) {
        core.unclaim_all(&mut colony.inventory);
        return NodeStatus::Failure;
    }

    let now = colony.tick();
    if core.work.activity != activity {
        core.work.activity = activity;
        core.work.task_finish_tick = now + colony.config.meal_minutes * colony.clock.ticks_per_minute();
        let text = match need {
            NeedType::Hunger => "Eating.",
            _ => "Drinking.",
        };
        log(core, colony, text);
        return NodeStatus::Running;
    }
    if now < core.work.task_finish_tick {
        return NodeStatus::Running;
    }

    let value = match need {
        NeedType::Hunger => colony.inventory.nutritional_value(item),
        _ => colony.inventory.drink_value(item),
    };
    if let Some(needs) = core.needs.as_mut() {
        needs.satisfy(need, value, colony.config.max_nutrition);
    }
    core.unstash_item(&colony.inventory, item);
    core.carried_items.retain(|i| *i != item);
    core.claimed_items.retain(|i| *i != item);
    colony.inventory.destroy_object(item);
    core.unclaim_all(&mut colony.inventory);
    core.work.activity = Activity::Idle;
    NodeStatus::Success
}

pub fn eat(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    consume(core, colony, halt, NeedType::Hunger)
}

pub fn drink(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    consume(core, colony, halt, NeedType::Thirst)
}

/// Claim the closest free bed; an already claimed bed is kept
pub fn find_bed(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        return NodeStatus::Idle;
    }
    if let Some(bed) = core.blackboard.item(BB_BED) {
        if colony.inventory.is_used_by(bed) == Some(core.id) {
            core.current_target = colony.inventory.position(bed);
            return NodeStatus::Success;
        }
        core.blackboard.remove(BB_BED);
    }
    let Some(bed) = colony.inventory.get_free_bed(core.position) else {
        return NodeStatus::Failure;
    };
    if core
        .add_claimed_item(&mut colony.inventory, bed, ClaimOwner::Agent(core.id))
        .is_err()
    {
        return NodeStatus::Failure;
    }
    core.blackboard.insert(BB_BED, bed);
    core.current_target = colony.inventory.position(bed);
    NodeStatus::Success
}

pub fn sleep(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        if core.work.activity == Activity::Sleeping {
            log(core, colony, "I was rudely awoken.");
            core.work.activity = Activity::Idle;
        }
        core.unclaim_all(&mut colony.inventory);
        return NodeStatus::Idle;
    }
    if core.job.is_some() {
        core.clean_up_job(colony, false);
    }
    if core.needs.is_none() {
        return NodeStatus::Success;
    }
    if core.work.activity != Activity::Sleeping {
        core.work.activity = Activity::Sleeping;
        log(core, colony, "Going to sleep.");
    }

    let config = &colony.config;
    let gain = config.sleep_gain_per_minute / colony.clock.ticks_per_minute() as f32;
    let rested = match core.needs.as_mut() {
        Some(needs) => {
            needs.satisfy(NeedType::Sleep, gain, config.rested_value);
            needs.sleep >= config.rested_value
        }
        None => true,
    };
    let scheduled = core.schedule_at(colony.clock.hour()) == ScheduleActivity::Sleep;
    if rested && !scheduled {
        core.work.activity = Activity::Idle;
        log(core, colony, "Woke up.");
        core.unclaim_all(&mut colony.inventory);
        return NodeStatus::Success;
    }
    NodeStatus::Running
}

/// Animals eat whatever grows where they stand
pub fn graze(core: &mut AgentCore, colony: &mut Colony, halt: bool) -> NodeStatus {
    if halt {
        core.work.activity = Activity::Idle;
        return NodeStatus::Idle;
    }
    let now = colony.tick();
    if core.work.activity != Activity::Grazing {
        core.work.activity = Activity::Grazing;
        core.work.task_finish_tick = now + colony.config.meal_minutes * colony.clock.ticks_per_minute();
        return NodeStatus::Running;
    }
    if now < core.work.task_finish_tick {
        return NodeStatus::Running;
    }
    if let Some(needs) = core.needs.as_mut() {
        needs.satisfy(NeedType::Hunger, colony.config.graze_nutrition, 100.0);
    }
    core.work.activity = Activity::Idle;
    NodeStatus::Success
}
