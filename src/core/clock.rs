//! World clock
//!
//! Tracks the simulation tick together with the in-game minute, hour, day,
//! season and year. Each `advance` reports which of those boundaries were
//! crossed so per-minute and per-day work can key off the flags instead of
//! recomputing them.

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::Tick;

/// Boundaries crossed by the most recent clock advance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeChanges {
    pub season: bool,
    pub day: bool,
    pub hour: bool,
    pub minute: bool,
}

impl TimeChanges {
    /// Every flag set, used for the very first tick after a load
    pub fn all() -> Self {
        Self {
            season: true,
            day: true,
            hour: true,
            minute: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldClock {
    tick: Tick,
    minute: u64,
    hour: u64,
    day: u64,
    season: u64,
    year: u64,
    ticks_per_minute: u64,
    minutes_per_hour: u64,
    hours_per_day: u64,
    days_per_season: u64,
    seasons_per_year: u64,
}

impl WorldClock {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            tick: 0,
            minute: 0,
            hour: 0,
            day: 1,
            season: 0,
            year: 1,
            ticks_per_minute: config.ticks_per_minute,
            minutes_per_hour: config.minutes_per_hour,
            hours_per_day: config.hours_per_day,
            days_per_season: config.days_per_season,
            seasons_per_year: config.seasons_per_year,
        }
    }

    /// Advance one tick and report the boundaries crossed
    pub fn advance(&mut self) -> TimeChanges {
        let mut changes = TimeChanges::default();
        self.tick += 1;

        if self.tick % self.ticks_per_minute == 0 {
            self.minute += 1;
            changes.minute = true;
        }
        if self.minute == self.minutes_per_hour {
            self.minute = 0;
            self.hour += 1;
            changes.hour = true;
        }
        if self.hour == self.hours_per_day {
            self.hour = 0;
            self.day += 1;
            changes.day = true;
        }
        if changes.day && self.day > self.days_per_season {
            self.day = 1;
            self.season += 1;
            changes.season = true;
            if self.season == self.seasons_per_year {
                self.season = 0;
                self.year += 1;
            }
        }
        changes
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn minute(&self) -> u64 {
        self.minute
    }

    /// Hour of the day, clamped into the 24 schedule slots
    pub fn hour(&self) -> usize {
        (self.hour as usize).min(23)
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    pub fn season(&self) -> u64 {
        self.season
    }

    pub fn year(&self) -> u64 {
        self.year
    }

    pub fn ticks_per_minute(&self) -> u64 {
        self.ticks_per_minute
    }

    /// "Day 3, 07:15" style stamp for activity logs
    pub fn day_time(&self) -> String {
        format!("Day {}, {:02}:{:02}", self.day, self.hour, self.minute)
    }
}
