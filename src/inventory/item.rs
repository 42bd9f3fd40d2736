//! Items and the owners that can claim them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, ItemId, JobId, Position};

/// Holder of an exclusive claim on an item
///
/// Job inputs are claimed by their job; food, drink and beds are claimed
/// by the agent that is going to use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimOwner {
    Job(JobId),
    Agent(AgentId),
}

impl fmt::Display for ClaimOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimOwner::Job(id) => write!(f, "{}", id),
            ClaimOwner::Agent(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub item_sid: String,
    pub material_sid: String,
    /// Last position on the ground; the carrier's position while held
    pub position: Position,
    pub held_by: Option<AgentId>,
    pub in_job: Option<ClaimOwner>,
    pub in_container: Option<ItemId>,
    pub in_stockpile: bool,
    pub constructed: bool,
    pub nutrition: f32,
    pub drink: f32,
    pub tool_level: u8,
}

impl Item {
    /// Not held, claimed, stored in a container or built into the world
    pub fn is_free(&self) -> bool {
        self.held_by.is_none()
            && self.in_job.is_none()
            && self.in_container.is_none()
            && !self.constructed
    }

    pub fn is_food(&self) -> bool {
        self.nutrition > 0.0
    }

    pub fn is_drink(&self) -> bool {
        self.drink > 0.0
    }
}

/// Builder for `Inventory::create_item`
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub item_sid: String,
    pub material_sid: String,
    pub position: Position,
    pub nutrition: f32,
    pub drink: f32,
    pub tool_level: u8,
    pub in_stockpile: bool,
    pub constructed: bool,
}

impl NewItem {
    pub fn new(item_sid: impl Into<String>, material_sid: impl Into<String>, position: Position) -> Self {
        Self {
            item_sid: item_sid.into(),
            material_sid: material_sid.into(),
            position,
            nutrition: 0.0,
            drink: 0.0,
            tool_level: 0,
            in_stockpile: false,
            constructed: false,
        }
    }

    pub fn nutrition(mut self, value: f32) -> Self {
        self.nutrition = value;
        self
    }

    pub fn drink(mut self, value: f32) -> Self {
        self.drink = value;
        self
    }

    pub fn tool_level(mut self, level: u8) -> Self {
        self.tool_level = level;
        self
    }

    pub fn in_stockpile(mut self, in_stockpile: bool) -> Self {
        self.in_stockpile = in_stockpile;
        self
    }

    pub fn constructed(mut self, constructed: bool) -> Self {
        self.constructed = constructed;
        self
    }
}
