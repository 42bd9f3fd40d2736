//! Item registry: the single source of truth for where items are and who
//! holds or claims them
//!
//! Every location or ownership change goes through one of the entry points
//! here so the position index stays in step with the items. Unknown ids are
//! programming errors elsewhere; they are logged and turned into no-ops.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{ColonyError, Result};
use crate::core::types::{AgentId, ItemId, Position};
use crate::inventory::item::{ClaimOwner, Item, NewItem};
use crate::jobs::RequiredItem;

/// Material key that matches every material
pub const ANY_MATERIAL: &str = "any";

/// Item sid of the furniture agents sleep in
pub const BED_SID: &str = "Bed";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<ItemId, Item>,
    /// Items lying on the ground (not held), by tile
    #[serde(skip)]
    by_position: AHashMap<Position, Vec<ItemId>>,
    next_id: u32,
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            by_position: AHashMap::new(),
            next_id: 1,
        }
    }

    pub fn create_item(&mut self, spec: NewItem) -> ItemId {
        self.next_id = self.next_id.max(1);
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let item = Item {
            id,
            item_sid: spec.item_sid,
            material_sid: spec.material_sid,
            position: spec.position,
            held_by: None,
            in_job: None,
            in_container: None,
            in_stockpile: spec.in_stockpile,
            constructed: spec.constructed,
            nutrition: spec.nutrition,
            drink: spec.drink,
            tool_level: spec.tool_level,
        };
        self.index_insert(item.position, id);
        tracing::debug!("Created {} {} {} at {}", id, item.material_sid, item.item_sid, item.position);
        self.items.insert(id, item);
        id
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    fn get_mut(&mut self, id: ItemId, op: &str) -> Option<&mut Item> {
        let item = self.items.get_mut(&id);
        if item.is_none() {
            tracing::warn!("{}: unknown {}", op, id);
        }
        item
    }

    fn index_insert(&mut self, pos: Position, id: ItemId) {
        let entry = self.by_position.entry(pos).or_default();
        if !entry.contains(&id) {
            entry.push(id);
        }
    }

    fn index_remove(&mut self, pos: Position, id: ItemId) {
        if let Some(entry) = self.by_position.get_mut(&pos) {
            entry.retain(|i| *i != id);
            if entry.is_empty() {
                self.by_position.remove(&pos);
            }
        }
    }

    /// Rebuild the position index after deserializing
    pub fn rebuild_index(&mut self) {
        self.by_position.clear();
        let grounded: Vec<(Position, ItemId)> = self
            .items
            .values()
            .filter(|i| i.held_by.is_none())
            .map(|i| (i.position, i.id))
            .collect();
        for (pos, id) in grounded {
            self.index_insert(pos, id);
        }
        if let Some(max) = self.items.keys().next_back() {
            self.next_id = self.next_id.max(max.0 + 1);
        }
    }

    // === Location entry points ===

    /// Take an item off the ground into an agent's hands
    pub fn pick_up_item(&mut self, id: ItemId, agent: AgentId) -> bool {
        let Some(item) = self.get_mut(id, "pick_up_item") else {
            return false;
        };
        let pos = item.position;
        let was_grounded = item.held_by.is_none();
        item.held_by = Some(agent);
        item.in_stockpile = false;
        item.in_container = None;
        if was_grounded {
            self.index_remove(pos, id);
        }
        true
    }

    pub fn put_down_item(&mut self, id: ItemId, pos: Position) -> bool {
        let Some(item) = self.get_mut(id, "put_down_item") else {
            return false;
        };
        let old = item.position;
        let was_grounded = item.held_by.is_none();
        item.held_by = None;
        item.position = pos;
        if was_grounded {
            self.index_remove(old, id);
        }
        self.index_insert(pos, id);
        true
    }

    /// Move an item; held items travel with their carrier and stay held
    pub fn move_item_to_pos(&mut self, id: ItemId, pos: Position) -> bool {
        let Some(item) = self.get_mut(id, "move_item_to_pos") else {
            return false;
        };
        let old = item.position;
        item.position = pos;
        if item.held_by.is_none() && old != pos {
            self.index_remove(old, id);
            self.index_insert(pos, id);
        }
        true
    }

    // === Claim entry points ===

    /// Claim an item for a job or an agent
    ///
    /// Claiming an item again for its current owner is a no-op. Claiming an
    /// item someone else holds is refused, never overwritten.
    pub fn set_in_job(&mut self, id: ItemId, owner: ClaimOwner) -> Result<()> {
        let item = self.items.get_mut(&id).ok_or(ColonyError::ItemNotFound(id))?;
        match item.in_job {
            Some(current) if current != owner => {
                tracing::debug!("{} refused for {}, held by {}", id, owner, current);
                Err(ColonyError::ItemAlreadyClaimed { item: id, owner: current })
            }
            _ => {
                item.in_job = Some(owner);
                Ok(())
            }
        }
    }

    pub fn release_claim(&mut self, id: ItemId) -> bool {
        match self.get_mut(id, "release_claim") {
            Some(item) => {
                item.in_job = None;
                true
            }
            None => false,
        }
    }

    pub fn set_in_container(&mut self, id: ItemId, container: Option<ItemId>) -> bool {
        match self.get_mut(id, "set_in_container") {
            Some(item) => {
                item.in_container = container;
                true
            }
            None => false,
        }
    }

    pub fn set_in_stockpile(&mut self, id: ItemId, in_stockpile: bool) -> bool {
        match self.get_mut(id, "set_in_stockpile") {
            Some(item) => {
                item.in_stockpile = in_stockpile;
                true
            }
            None => false,
        }
    }

    pub fn set_constructed(&mut self, id: ItemId, constructed: bool) -> bool {
        match self.get_mut(id, "set_constructed") {
            Some(item) => {
                item.constructed = constructed;
                true
            }
            None => false,
        }
    }

    pub fn destroy_object(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id);
        match &item {
            Some(item) => {
                if item.held_by.is_none() {
                    self.index_remove(item.position, id);
                }
                tracing::debug!("Destroyed {} {}", id, item.item_sid);
            }
            None => tracing::warn!("destroy_object: unknown {}", id),
        }
        item
    }

    // === Ownership queries ===

    pub fn is_in_job(&self, id: ItemId) -> Option<ClaimOwner> {
        self.items.get(&id).and_then(|i| i.in_job)
    }

    /// Agent that claimed the item for its own use (food, drink, bed)
    pub fn is_used_by(&self, id: ItemId) -> Option<AgentId> {
        match self.is_in_job(id) {
            Some(ClaimOwner::Agent(agent)) => Some(agent),
            _ => None,
        }
    }

    pub fn is_picked_up(&self, id: ItemId) -> bool {
        self.items.get(&id).map_or(false, |i| i.held_by.is_some())
    }

    pub fn held_by(&self, id: ItemId) -> Option<AgentId> {
        self.items.get(&id).and_then(|i| i.held_by)
    }

    pub fn is_constructed(&self, id: ItemId) -> bool {
        self.items.get(&id).map_or(false, |i| i.constructed)
    }

    // === Property lookups ===

    pub fn item_sid(&self, id: ItemId) -> Option<&str> {
        self.items.get(&id).map(|i| i.item_sid.as_str())
    }

    pub fn material_sid(&self, id: ItemId) -> Option<&str> {
        self.items.get(&id).map(|i| i.material_sid.as_str())
    }

    pub fn position(&self, id: ItemId) -> Option<Position> {
        self.items.get(&id).map(|i| i.position)
    }

    pub fn nutritional_value(&self, id: ItemId) -> f32 {
        self.items.get(&id).map_or(0.0, |i| i.nutrition)
    }

    pub fn drink_value(&self, id: ItemId) -> f32 {
        self.items.get(&id).map_or(0.0, |i| i.drink)
    }

    pub fn tool_level(&self, id: ItemId) -> u8 {
        self.items.get(&id).map_or(0, |i| i.tool_level)
    }

    pub fn items_at(&self, pos: Position) -> &[ItemId] {
        self.by_position.get(&pos).map(|v| v.as_slice()).unwrap_or(&[])
    }

    // === Searches ===

    /// Free items matching `filter`, closest first, ties by lower id
    fn closest_where<F>(&self, pos: Position, allow_in_stockpile: bool, count: usize, filter: F) -> Vec<ItemId>
    where
        F: Fn(&Item) -> bool,
    {
        let mut found: Vec<(i64, ItemId)> = self
            .items
            .values()
            .filter(|i| i.is_free() && (allow_in_stockpile || !i.in_stockpile) && filter(i))
            .map(|i| (pos.dist_square(&i.position), i.id))
            .collect();
        found.sort_unstable();
        found.into_iter().take(count).map(|(_, id)| id).collect()
    }

    pub fn get_closest_items(
        &self,
        pos: Position,
        allow_in_stockpile: bool,
        item_sid: &str,
        material_sid: &str,
        count: usize,
    ) -> Vec<ItemId> {
        self.closest_where(pos, allow_in_stockpile, count, |i| {
            i.item_sid == item_sid && (material_sid == ANY_MATERIAL || i.material_sid == material_sid)
        })
    }

    pub fn get_closest_item(
        &self,
        pos: Position,
        allow_in_stockpile: bool,
        item_sid: &str,
        material_sid: &str,
    ) -> Option<ItemId> {
        self.get_closest_items(pos, allow_in_stockpile, item_sid, material_sid, 1)
            .into_iter()
            .next()
    }

    /// Closest free items that together satisfy one job requirement, or
    /// nothing when the requirement cannot be met in full. Items in
    /// `exclude` are already spoken for by another requirement of the job.
    pub fn pick_for_requirement(&self, from: Position, req: &RequiredItem, exclude: &BTreeSet<ItemId>) -> Vec<ItemId> {
        let count = req.count as usize;
        let usable = |i: &Item| !exclude.contains(&i.id) && requirement_accepts(req, i);
        if !req.require_same {
            let found = self.closest_where(from, true, count, usable);
            return if found.len() == count { found } else { Vec::new() };
        }

        let mut per_material: BTreeMap<&str, usize> = BTreeMap::new();
        for item in self.items.values().filter(|i| i.is_free() && usable(*i)) {
            *per_material.entry(item.material_sid.as_str()).or_default() += 1;
        }
        for (material, available) in per_material {
            if available < count {
                continue;
            }
            let found = self.closest_where(from, true, count, |i| usable(i) && i.material_sid == material);
            if found.len() == count {
                return found;
            }
        }
        Vec::new()
    }

    /// Picks for every requirement of a job at once; no item serves two
    /// requirements. `None` when any requirement falls short.
    pub fn pick_for_requirements(&self, from: Position, reqs: &[RequiredItem]) -> Option<Vec<ItemId>> {
        let mut taken = BTreeSet::new();
        let mut picks = Vec::new();
        for req in requirement_order(reqs) {
            let found = self.pick_for_requirement(from, req, &taken);
            if found.len() < req.count as usize {
                return None;
            }
            taken.extend(found.iter().copied());
            picks.extend(found);
        }
        Some(picks)
    }

    /// Closest free tool of the given kind with at least `min_level`
    pub fn get_closest_tool(&self, pos: Position, item_sid: &str, min_level: u8) -> Option<ItemId> {
        self.closest_where(pos, true, 1, |i| i.item_sid == item_sid && i.tool_level >= min_level)
            .into_iter()
            .next()
    }

    pub fn get_food_item(&self, pos: Position) -> Option<ItemId> {
        self.closest_where(pos, true, 1, |i| i.is_food()).into_iter().next()
    }

    pub fn get_drink_item(&self, pos: Position) -> Option<ItemId> {
        self.closest_where(pos, true, 1, |i| i.is_drink()).into_iter().next()
    }

    /// Closest constructed bed nobody has claimed
    pub fn get_free_bed(&self, pos: Position) -> Option<ItemId> {
        let mut beds: Vec<(i64, ItemId)> = self
            .items
            .values()
            .filter(|i| i.item_sid == BED_SID && i.constructed && i.in_job.is_none())
            .map(|i| (pos.dist_square(&i.position), i.id))
            .collect();
        beds.sort_unstable();
        beds.first().map(|(_, id)| *id)
    }

    /// Free items of a kind per material, plus an `"any"` total
    pub fn material_counts_for_item(&self, item_sid: &str, allow_in_stockpile: bool) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = 0;
        for item in self
            .items
            .values()
            .filter(|i| i.item_sid == item_sid && i.is_free() && (allow_in_stockpile || !i.in_stockpile))
        {
            *counts.entry(item.material_sid.clone()).or_default() += 1;
            total += 1;
        }
        counts.insert(ANY_MATERIAL.to_string(), total);
        counts
    }

    pub fn item_count(&self, item_sid: &str, material_sid: &str) -> usize {
        self.items
            .values()
            .filter(|i| {
                i.item_sid == item_sid
                    && i.is_free()
                    && (material_sid == ANY_MATERIAL || i.material_sid == material_sid)
            })
            .count()
    }

    /// Whether enough free items exist to satisfy one job requirement
    pub fn check_available(&self, req: &RequiredItem) -> bool {
        self.pick_for_requirement(Position::default(), req, &BTreeSet::new()).len() == req.count as usize
    }

    /// Whether all requirements of a job can be met together
    pub fn check_all_available(&self, reqs: &[RequiredItem]) -> bool {
        self.pick_for_requirements(Position::default(), reqs).is_some()
    }
}

/// Narrowest requirements first, so a specific material is not taken by an
/// `"any"` requirement that could have used something else
pub fn requirement_order(reqs: &[RequiredItem]) -> Vec<&RequiredItem> {
    let mut ordered: Vec<&RequiredItem> = reqs.iter().collect();
    ordered.sort_by_key(|r| {
        (
            r.material_sid == ANY_MATERIAL,
            r.material_restriction.is_empty(),
            !r.require_same,
        )
    });
    ordered
}

/// Sid, material and restriction check for one requirement
pub fn requirement_accepts(req: &RequiredItem, item: &Item) -> bool {
    item.item_sid == req.item_sid
        && (req.material_sid == ANY_MATERIAL || item.material_sid == req.material_sid)
        && (req.material_restriction.is_empty() || req.material_restriction.contains(&item.material_sid))
}
