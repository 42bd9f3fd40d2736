//! Decaying needs that drive the eat, drink and sleep branches

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;

/// Which needs an agent tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedProfile {
    /// Hunger, thirst and sleep; starving or dying of thirst kills
    Full,
    /// Hunger only, floored so it never kills
    HungerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedType {
    Hunger,
    Thirst,
    Sleep,
}

/// Need values; higher is better, 100 is satisfied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub profile: NeedProfile,
    pub hunger: f32,
    pub thirst: f32,
    pub sleep: f32,
    /// Set once "I'm hungry" was logged, cleared after eating
    pub hungry_logged: bool,
    pub thirsty_logged: bool,
}

impl Needs {
    pub fn new(profile: NeedProfile) -> Self {
        Self {
            profile,
            hunger: 100.0,
            thirst: 100.0,
            sleep: 100.0,
            hungry_logged: false,
            thirsty_logged: false,
        }
    }

    pub fn tracks(&self, need: NeedType) -> bool {
        match self.profile {
            NeedProfile::Full => true,
            NeedProfile::HungerOnly => need == NeedType::Hunger,
        }
    }

    pub fn value(&self, need: NeedType) -> f32 {
        match need {
            NeedType::Hunger => self.hunger,
            NeedType::Thirst => self.thirst,
            NeedType::Sleep => self.sleep,
        }
    }

    /// Apply one in-game minute of decay
    ///
    /// Returns the need that crossed the starvation threshold, if any.
    pub fn decay_minute(&mut self, config: &SimulationConfig) -> Option<NeedType> {
        match self.profile {
            NeedProfile::HungerOnly => {
                self.hunger = (self.hunger + config.animal_hunger_per_minute).max(config.animal_hunger_floor);
                None
            }
            NeedProfile::Full => {
                self.hunger += config.hunger_per_minute;
                self.thirst += config.thirst_per_minute;
                self.sleep += config.sleep_per_minute;

                if self.hunger < config.starvation_threshold {
                    Some(NeedType::Hunger)
                } else if self.thirst < config.starvation_threshold {
                    Some(NeedType::Thirst)
                } else {
                    None
                }
            }
        }
    }

    /// Raise a need, capped at `max`
    pub fn satisfy(&mut self, need: NeedType, amount: f32, max: f32) {
        let value = match need {
            NeedType::Hunger => &mut self.hunger,
            NeedType::Thirst => &mut self.thirst,
            NeedType::Sleep => &mut self.sleep,
        };
        *value = (*value + amount).min(max);
        if self.hunger > 30.0 {
            self.hungry_logged = false;
        }
        if self.thirst > 30.0 {
            self.thirsty_logged = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_needs_decay_and_starve() {
        let config = SimulationConfig::default();
        let mut needs = Needs::new(NeedProfile::Full);
        needs.hunger = config.starvation_threshold + 0.01;
        assert_eq!(needs.decay_minute(&config), Some(NeedType::Hunger));
        assert!(needs.thirst < 100.0);
        assert!(needs.sleep < 100.0);
    }

    #[test]
    fn test_animal_hunger_is_floored() {
        let config = SimulationConfig::default();
        let mut needs = Needs::new(NeedProfile::HungerOnly);
        needs.hunger = config.animal_hunger_floor;
        assert_eq!(needs.decay_minute(&config), None);
        assert_eq!(needs.hunger, config.animal_hunger_floor);
        assert_eq!(needs.thirst, 100.0, "animals do not get thirsty");
        assert!(!needs.tracks(NeedType::Sleep));
    }

    #[test]
    fn test_satisfy_caps_and_resets_log_flag() {
        let mut needs = Needs::new(NeedProfile::Full);
        needs.hunger = 10.0;
        needs.hungry_logged = true;
        needs.satisfy(NeedType::Hunger, 500.0, 150.0);
        assert_eq!(needs.hunger, 150.0);
        assert!(!needs.hungry_logged);
    }
}
