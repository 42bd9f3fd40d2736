//! Simulation configuration with documented constants
//!
//! All tuning numbers are collected here with explanations of their purpose
//! and how they interact with each other. The config is loaded from TOML and
//! travels inside the colony context; nothing reads it through a global.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{ColonyError, Result};

/// Configuration for the simulation systems
///
/// Every field has a default, so a TOML file only needs to name the values
/// it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIME ===
    /// Ticks that make up one in-game minute
    ///
    /// Needs decay once per minute, so this also sets how often need
    /// evaluation runs.
    pub ticks_per_minute: u64,

    pub minutes_per_hour: u64,

    pub hours_per_day: u64,

    /// Days per season before the season counter advances
    pub days_per_season: u64,

    pub seasons_per_year: u64,

    // === AGENT MANAGER ===
    /// Wall-clock budget for one pass over the agents (milliseconds)
    ///
    /// When exceeded the manager stops and resumes at the saved cursor on
    /// the next tick. 0 disables the time budget.
    pub agent_tick_budget_ms: u64,

    /// Maximum agents processed per tick, 0 for no limit
    ///
    /// A deterministic alternative to the time budget, mainly for tests
    /// and replays.
    pub max_agents_per_tick: usize,

    /// Days a corpse stays in the world before it is swept
    pub corpse_expiry_days: u64,

    // === JOBS ===
    /// Ticks an agent waits after an unsuccessful job search
    ///
    /// Keeps idle agents from querying the job manager every tick.
    pub job_search_cooldown: i64,

    /// Lower bound for a single work task (ticks)
    pub min_task_ticks: u64,

    /// Upper bound for a single work task (ticks)
    pub max_task_ticks: u64,

    // === NEEDS ===
    /// Change of the hunger value per in-game minute (negative = decay)
    pub hunger_per_minute: f32,

    /// Change of the thirst value per in-game minute
    pub thirst_per_minute: f32,

    /// Change of the sleep value per in-game minute while awake
    pub sleep_per_minute: f32,

    /// Sleep gained per in-game minute while sleeping
    pub sleep_gain_per_minute: f32,

    /// Hunger and thirst below this trigger the eat/drink branches
    pub need_threshold: f32,

    /// During a scheduled meal hour agents eat below this value
    pub scheduled_meal_threshold: f32,

    /// Hunger or thirst below this kills the agent
    pub starvation_threshold: f32,

    /// Cap for hunger and thirst after eating or drinking
    pub max_nutrition: f32,

    /// Sleep below this triggers the sleep branch
    pub sleepy_threshold: f32,

    /// An agent wakes up once sleep reaches this value
    pub rested_value: f32,

    /// Minutes spent eating or drinking one item
    pub meal_minutes: u64,

    /// Animal hunger decay per minute
    ///
    /// Animals cannot starve; hunger bottoms out at `animal_hunger_floor`.
    pub animal_hunger_per_minute: f32,

    pub animal_hunger_floor: f32,

    /// Hunger restored by one grazing step
    pub graze_nutrition: f32,

    // === MOVEMENT ===
    /// Movement cooldown drained per tick
    pub move_speed: f32,

    /// Cooldown set after each step
    ///
    /// With speed 50 and delay 100 an agent steps every second tick.
    pub move_delay: f32,

    /// One in this many idle ticks an animal or idle gnome takes a random step
    pub wander_chance: u32,

    // === AUTOMATONS ===
    /// Fuel an automaton starts with, one unit burnt per tick
    pub automaton_fuel: u32,

    // === MISC ===
    /// Seed for the colony's deterministic random number generator
    pub seed: u64,

    /// Activity log size that triggers trimming
    pub log_capacity: usize,

    /// Entries dropped from the front of the log when trimming
    pub log_trim: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_minute: 10,
            minutes_per_hour: 60,
            hours_per_day: 24,
            days_per_season: 12,
            seasons_per_year: 4,

            agent_tick_budget_ms: 5,
            max_agents_per_tick: 0,
            corpse_expiry_days: 2,

            job_search_cooldown: 100,
            min_task_ticks: 10,
            max_task_ticks: 1000,

            hunger_per_minute: -0.075,
            thirst_per_minute: -0.1,
            sleep_per_minute: -0.05,
            sleep_gain_per_minute: 1.0,
            need_threshold: 30.0,
            scheduled_meal_threshold: 90.0,
            starvation_threshold: -100.0,
            max_nutrition: 150.0,
            sleepy_threshold: 30.0,
            rested_value: 100.0,
            meal_minutes: 15,

            animal_hunger_per_minute: -0.075,
            animal_hunger_floor: -10.0,
            graze_nutrition: 40.0,

            move_speed: 50.0,
            move_delay: 100.0,
            wander_chance: 25,

            automaton_fuel: 10_000,

            seed: 42,
            log_capacity: 50,
            log_trim: 25,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing fields take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate().map_err(ColonyError::InvalidConfig)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn ticks_per_hour(&self) -> u64 {
        self.ticks_per_minute * self.minutes_per_hour
    }

    pub fn ticks_per_day(&self) -> u64 {
        self.ticks_per_hour() * self.hours_per_day
    }

    /// Ticks a corpse stays around before the sweep removes it
    pub fn corpse_expiry_ticks(&self) -> u64 {
        self.ticks_per_day() * self.corpse_expiry_days
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.ticks_per_minute == 0
            || self.minutes_per_hour == 0
            || self.hours_per_day == 0
            || self.days_per_season == 0
            || self.seasons_per_year == 0
        {
            return Err("Time units must all be positive".into());
        }

        if self.min_task_ticks > self.max_task_ticks {
            return Err(format!(
                "min_task_ticks ({}) should be <= max_task_ticks ({})",
                self.min_task_ticks, self.max_task_ticks
            ));
        }

        // Agents must get hungry before they starve
        if self.starvation_threshold >= self.need_threshold {
            return Err(format!(
                "starvation_threshold ({}) should be < need_threshold ({})",
                self.starvation_threshold, self.need_threshold
            ));
        }

        if self.need_threshold >= self.max_nutrition {
            return Err(format!(
                "need_threshold ({}) should be < max_nutrition ({})",
                self.need_threshold, self.max_nutrition
            ));
        }

        if self.move_speed <= 0.0 {
            return Err("move_speed must be positive".into());
        }

        if self.log_trim == 0 || self.log_trim > self.log_capacity {
            return Err(format!(
                "log_trim ({}) should be in 1..={}",
                self.log_trim, self.log_capacity
            ));
        }

        Ok(())
    }
}
