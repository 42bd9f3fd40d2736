//! Agent state and its capability blocks
//!
//! Every species shares `AgentCore`. Species differences are expressed by
//! which optional blocks are present (needs, equipment, fuel) and by
//! matching on `AgentKind` where a rule only applies to one species.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::agent::needs::{NeedProfile, Needs};
use crate::behavior::{Blackboard, BlackboardHost};
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, ItemId, JobId, Position, ScheduleActivity, Tick};
use crate::jobs::TaskStep;
use crate::util::PriorityQueue;

/// Experience per skill level
pub const XP_PER_LEVEL: f32 = 100.0;
pub const MAX_SKILL_LEVEL: f32 = 20.0;

/// Skills a fresh gnome works, in priority order
pub const DEFAULT_GNOME_SKILLS: &[&str] = &["Mining", "Construction", "Masonry", "Metalsmithing", "Hauling"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    Gnome,
    Trader,
    Animal,
    Monster,
    Automaton,
}

impl AgentKind {
    /// Id of the behavior tree this species runs
    pub fn behavior_id(&self) -> &'static str {
        match self {
            AgentKind::Gnome => "Gnome",
            AgentKind::Trader => "Trader",
            AgentKind::Animal => "Animal",
            AgentKind::Monster => "Monster",
            AgentKind::Automaton => "Automaton",
        }
    }

    /// Gnomes and traders share the gnome movement rules
    pub fn is_gnome_like(&self) -> bool {
        matches!(self, AgentKind::Gnome | AgentKind::Trader)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[default]
    Idle,
    Job,
    Eating,
    Drinking,
    Sleeping,
    Working,
    Grazing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Counts down by `speed` every tick; a step is allowed at or below 0
    pub cooldown: f32,
    pub speed: f32,
    /// Cooldown after each step
    pub delay: f32,
    /// Remaining steps, next step last
    pub path: Vec<Position>,
    pub facing_after_move: Option<u8>,
    pub ignore_no_pass: bool,
}

impl Movement {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            cooldown: 0.0,
            speed: config.move_speed,
            delay: config.move_delay,
            path: Vec::new(),
            facing_after_move: None,
            ignore_no_pass: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldowns {
    pub global: i64,
    pub left_hand: i64,
    pub right_hand: i64,
    pub kick: i64,
    pub bite: i64,
    pub special: i64,
    /// Ticks until the agent may ask the job manager again
    pub job_search: i64,
}

impl Cooldowns {
    pub fn advance(&mut self, ticks: i64) {
        self.global -= ticks;
        self.left_hand -= ticks;
        self.right_hand -= ticks;
        self.kick -= ticks;
        self.bite -= ticks;
        self.special -= ticks;
        self.job_search -= ticks;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub right_hand: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelTank {
    pub fuel: u32,
    pub has_core: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkProgress {
    pub activity: Activity,
    pub task_finish_tick: Tick,
    pub total_ticks: u64,
    pub current_task: Option<TaskStep>,
    pub remaining_tasks: VecDeque<TaskStep>,
    /// Candidate work positions for the current job, best first
    pub work_positions: PriorityQueue<Position, i64>,
}

impl WorkProgress {
    pub fn reset(&mut self) {
        self.activity = Activity::Idle;
        self.task_finish_tick = 0;
        self.total_ticks = 0;
        self.current_task = None;
        self.remaining_tasks.clear();
        self.work_positions.clear();
    }
}

/// Item categories an agent may keep in its personal inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryPolicy {
    pub food: bool,
    pub drinks: bool,
    pub bandages: bool,
}

impl Default for CarryPolicy {
    fn default() -> Self {
        Self {
            food: true,
            drinks: true,
            bandages: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryCounts {
    pub food: u32,
    pub drinks: u32,
    pub bandages: u32,
}

impl CarryCounts {
    /// Whether something is carried that the policy no longer allows
    pub fn violates(&self, policy: &CarryPolicy) -> bool {
        (!policy.food && self.food > 0)
            || (!policy.drinks && self.drinks > 0)
            || (!policy.bandages && self.bandages > 0)
    }
}

/// In-game activity log
///
/// Repeats of the last message are counted and folded into an `xN`
/// suffix once a different message arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<String>,
    repeats: u32,
    capacity: usize,
    trim: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize, trim: usize) -> Self {
        Self {
            entries: Vec::new(),
            repeats: 0,
            capacity,
            trim,
        }
    }

    pub fn push(&mut self, stamp: &str, text: &str) {
        if let Some(last) = self.entries.last_mut() {
            if last.ends_with(text) {
                self.repeats += 1;
                return;
            }
            if self.repeats > 0 {
                last.push_str(&format!(" x{}", self.repeats));
                self.repeats = 0;
            }
        }
        self.entries.push(format!("{}: {}", stamp, text));

        if self.entries.len() > self.capacity {
            let drop = self.trim.min(self.entries.len());
            self.entries.drain(..drop);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn default_schedule() -> [ScheduleActivity; 24] {
    [ScheduleActivity::None; 24]
}

/// Serializable state of one agent; the behavior tree lives next to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCore {
    pub id: AgentId,
    pub name: String,
    pub kind: AgentKind,
    pub behavior_id: String,

    pub position: Position,
    /// 0 = east, 1 = south, 2 = west, 3 = north
    pub facing: u8,
    pub movement: Movement,
    pub cooldowns: Cooldowns,

    pub blackboard: Blackboard,
    #[serde(default = "default_schedule")]
    pub schedule: [ScheduleActivity; 24],

    pub needs: Option<Needs>,
    pub equipment: Option<Equipment>,
    pub fuel: Option<FuelTank>,

    pub job: Option<JobId>,
    /// Items this agent holds a claim on, for a job or for itself
    pub claimed_items: Vec<ItemId>,
    /// Items in hand that are on their way somewhere
    pub carried_items: Vec<ItemId>,
    /// Personal inventory (food, drinks, bandages)
    pub inventory_items: Vec<ItemId>,
    pub item_to_pick_up: Option<ItemId>,
    pub current_target: Option<Position>,

    /// Experience per skill
    pub skills: BTreeMap<String, f32>,
    /// Skills in the order the agent looks for jobs
    pub skill_priorities: Vec<String>,
    pub work: WorkProgress,

    pub carry: CarryPolicy,
    pub carried: CarryCounts,

    pub dead: bool,
    pub expires: Tick,
    pub to_destroy: bool,
    pub left_map: bool,
    pub on_mission: bool,
    /// Traders leave the map once this tick has passed
    pub leave_tick: Option<Tick>,

    pub log: ActivityLog,
    pub last_tick: Tick,
    pub job_changed: bool,
}

impl AgentCore {
    pub fn new(id: AgentId, name: impl Into<String>, kind: AgentKind, position: Position, config: &SimulationConfig) -> Self {
        let needs = match kind {
            AgentKind::Gnome => Some(Needs::new(NeedProfile::Full)),
            AgentKind::Animal => Some(Needs::new(NeedProfile::HungerOnly)),
            AgentKind::Trader | AgentKind::Monster | AgentKind::Automaton => None,
        };
        let equipment = (kind == AgentKind::Gnome).then(Equipment::default);
        let fuel = (kind == AgentKind::Automaton).then(|| FuelTank {
            fuel: config.automaton_fuel,
            has_core: true,
        });
        let skill_priorities: Vec<String> = match kind {
            AgentKind::Gnome => DEFAULT_GNOME_SKILLS.iter().map(|s| s.to_string()).collect(),
            AgentKind::Automaton => vec!["Hauling".to_string()],
            _ => Vec::new(),
        };
        let skills = skill_priorities.iter().map(|s| (s.clone(), 0.0)).collect();

        Self {
            id,
            name: name.into(),
            kind,
            behavior_id: kind.behavior_id().to_string(),
            position,
            facing: 0,
            movement: Movement::new(config),
            cooldowns: Cooldowns::default(),
            blackboard: Blackboard::new(),
            schedule: default_schedule(),
            needs,
            equipment,
            fuel,
            job: None,
            claimed_items: Vec::new(),
            carried_items: Vec::new(),
            inventory_items: Vec::new(),
            item_to_pick_up: None,
            current_target: None,
            skills,
            skill_priorities,
            work: WorkProgress::default(),
            carry: CarryPolicy::default(),
            carried: CarryCounts::default(),
            dead: false,
            expires: 0,
            to_destroy: false,
            left_map: false,
            on_mission: false,
            leave_tick: None,
            log: ActivityLog::new(config.log_capacity, config.log_trim),
            last_tick: 0,
            job_changed: false,
        }
    }

    pub fn log(&mut self, stamp: &str, text: &str) {
        self.log.push(stamp, text);
    }

    pub fn skill_level(&self, skill: &str) -> f32 {
        self.skills
            .get(skill)
            .map_or(0.0, |xp| (xp / XP_PER_LEVEL).floor().min(MAX_SKILL_LEVEL))
    }

    pub fn gain_skill(&mut self, skill: &str, xp: f32) {
        *self.skills.entry(skill.to_string()).or_insert(0.0) += xp;
    }

    pub fn schedule_at(&self, hour: usize) -> ScheduleActivity {
        self.schedule.get(hour).copied().unwrap_or_default()
    }

    /// Run down cooldowns for the ticks since the last update
    pub fn process_cooldowns(&mut self, tick: Tick) {
        let elapsed = tick.saturating_sub(self.last_tick) as i64;
        self.movement.cooldown -= elapsed as f32 * self.movement.speed;
        self.cooldowns.advance(elapsed);
    }

    pub fn equipped_tool(&self) -> Option<ItemId> {
        self.equipment.as_ref().and_then(|e| e.right_hand)
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }
}

impl BlackboardHost for AgentCore {
    fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }
}
