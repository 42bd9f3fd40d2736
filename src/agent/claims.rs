//! Item claims held by an agent and the job cleanup that releases them
//!
//! An agent never holds an item without a claim recorded in the inventory.
//! Claims made for a job are owned by the job; claims for the agent's own
//! use (food, a bed) are owned by the agent and survive job cleanup.

use crate::agent::state::AgentCore;
use crate::core::error::Result;
use crate::core::types::ItemId;
use crate::inventory::{ClaimOwner, Inventory};
use crate::simulation::Colony;

pub const BB_JOB_TYPE: &str = "JobType";
pub const BB_JOB_FLOW: &str = "JobFlow";
pub const BB_CLAIMED_TOOL: &str = "ClaimedTool";
pub const BB_CLAIMED_INVENTORY_ITEM: &str = "ClaimedInventoryItem";
pub const BB_MEAL: &str = "MealItem";
pub const BB_BED: &str = "Bed";

pub const BANDAGE_SID: &str = "Bandage";

impl AgentCore {
    /// Claim an item and remember it; fails if someone else holds the claim
    pub fn add_claimed_item(&mut self, inventory: &mut Inventory, item: ItemId, owner: ClaimOwner) -> Result<()> {
        inventory.set_in_job(item, owner)?;
        if !self.claimed_items.contains(&item) {
            self.claimed_items.push(item);
        }
        Ok(())
    }

    /// Release every claim and put down anything claimed that is in hand
    pub fn unclaim_all(&mut self, inventory: &mut Inventory) {
        for item in self.claimed_items.drain(..) {
            inventory.release_claim(item);
            if inventory.held_by(item) == Some(self.id) {
                inventory.put_down_item(item, self.position);
            }
            self.carried_items.retain(|i| *i != item);
        }
        self.blackboard.remove(BB_MEAL);
        self.blackboard.remove(BB_BED);
    }

    /// Consume the items claimed for the current job
    pub fn destroy_claimed_items(&mut self, inventory: &mut Inventory) {
        let (job_items, own): (Vec<ItemId>, Vec<ItemId>) = self
            .claimed_items
            .iter()
            .copied()
            .partition(|item| matches!(inventory.is_in_job(*item), Some(ClaimOwner::Job(_))));
        for item in job_items {
            self.carried_items.retain(|i| *i != item);
            inventory.destroy_object(item);
        }
        self.claimed_items = own;
    }

    /// Give the current job back (or finish it) and drop everything it used
    pub fn clean_up_job(&mut self, colony: &mut Colony, finished: bool) {
        let had_job = self.job.is_some();
        if let Some(id) = self.job {
            if finished {
                if let Some((skill, gain)) = colony.jobs.job(id).map(|j| (j.skill.clone(), j.skill_gain)) {
                    self.gain_skill(&skill, gain);
                }
                colony.jobs.finish_job(id);
            } else {
                if let Some(job) = colony.jobs.job_mut(id) {
                    if job.pos_item_input.is_some() && job.pos_item_input == job.work_pos {
                        job.pos_item_input = None;
                    }
                    job.set_aborted(false);
                }
                colony.jobs.give_back_job(id);
            }
        }

        let inventory = &mut colony.inventory;
        let mut kept = Vec::new();
        for item in std::mem::take(&mut self.claimed_items) {
            match inventory.is_in_job(item) {
                Some(ClaimOwner::Agent(owner)) if owner == self.id => kept.push(item),
                _ => {
                    inventory.release_claim(item);
                    if inventory.held_by(item) == Some(self.id) {
                        inventory.put_down_item(item, self.position);
                    }
                    self.carried_items.retain(|i| *i != item);
                }
            }
        }
        self.claimed_items = kept;

        let personal = &self.claimed_items;
        let (stay, drop): (Vec<ItemId>, Vec<ItemId>) =
            self.carried_items.iter().copied().partition(|item| personal.contains(item));
        for item in drop {
            inventory.put_down_item(item, self.position);
            inventory.release_claim(item);
        }
        self.carried_items = stay;

        self.drop_equipped_item(inventory);
        self.movement.path.clear();
        self.reset_job_vars();
        if had_job {
            self.job_changed = true;
        }
    }

    pub fn reset_job_vars(&mut self) {
        self.job = None;
        self.item_to_pick_up = None;
        self.current_target = None;
        self.work.reset();
        self.blackboard.remove(BB_JOB_TYPE);
        self.blackboard.remove(BB_JOB_FLOW);
    }

    pub fn drop_equipped_item(&mut self, inventory: &mut Inventory) {
        if let Some(tool) = self.blackboard.item(BB_CLAIMED_TOOL) {
            self.blackboard.remove(BB_CLAIMED_TOOL);
            if self.equipped_tool() != Some(tool) {
                self.claimed_items.retain(|i| *i != tool);
                inventory.release_claim(tool);
            }
        }
        let position = self.position;
        if let Some(tool) = self.equipment.as_mut().and_then(|e| e.right_hand.take()) {
            inventory.put_down_item(tool, position);
            inventory.release_claim(tool);
        }
    }

    /// Move an item in hand into the personal inventory
    pub fn stash_item(&mut self, inventory: &Inventory, item: ItemId) -> bool {
        if inventory.held_by(item) != Some(self.id) || self.inventory_items.contains(&item) {
            return false;
        }
        self.carried_items.retain(|i| *i != item);
        self.inventory_items.push(item);
        self.count_inventory_item(inventory, item, 1);
        true
    }

    /// Remove an item from the personal inventory, adjusting the counts
    pub fn unstash_item(&mut self, inventory: &Inventory, item: ItemId) -> bool {
        let before = self.inventory_items.len();
        self.inventory_items.retain(|i| *i != item);
        if self.inventory_items.len() == before {
            return false;
        }
        self.count_inventory_item(inventory, item, -1);
        true
    }

    fn count_inventory_item(&mut self, inventory: &Inventory, item: ItemId, delta: i32) {
        let Some(entry) = inventory.item(item) else {
            return;
        };
        let counter = if entry.is_food() {
            &mut self.carried.food
        } else if entry.is_drink() {
            &mut self.carried.drinks
        } else if entry.item_sid == BANDAGE_SID {
            &mut self.carried.bandages
        } else {
            return;
        };
        *counter = counter.saturating_add_signed(delta);
    }

    /// Drop personal items the carry policy no longer allows
    pub fn enforce_carry_policy(&mut self, inventory: &mut Inventory) {
        if !self.carried.violates(&self.carry) {
            return;
        }
        let disallowed: Vec<ItemId> = self
            .inventory_items
            .iter()
            .copied()
            .filter(|item| match inventory.item(*item) {
                Some(entry) if entry.is_food() => !self.carry.food,
                Some(entry) if entry.is_drink() => !self.carry.drinks,
                Some(entry) if entry.item_sid == BANDAGE_SID => !self.carry.bandages,
                _ => false,
            })
            .collect();
        for item in disallowed {
            self.unstash_item(inventory, item);
            inventory.put_down_item(item, self.position);
            inventory.release_claim(item);
            self.claimed_items.retain(|i| *i != item);
        }
    }
}
