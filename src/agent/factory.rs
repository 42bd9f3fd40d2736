//! Spawning agents and rebuilding them from saves

use serde::{Deserialize, Serialize};

use crate::agent::persist::AgentSnapshot;
use crate::agent::state::{AgentCore, AgentKind};
use crate::agent::{actions, conditions, Agent, AgentRegistry};
use crate::behavior::TreeLibrary;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, Position};

/// Every leaf the shipped trees refer to
pub fn builtin_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    registry.register_condition("IsHungry", conditions::is_hungry);
    registry.register_condition("IsThirsty", conditions::is_thirsty);
    registry.register_condition("IsSleepy", conditions::is_sleepy);
    registry.register_condition("AllItemsInPlaceForJob", conditions::all_items_in_place_for_job);
    registry.register_condition("AllPickedUp", conditions::all_picked_up);

    registry.register_action("GetJob", actions::get_job);
    registry.register_action("InitJob", actions::init_job);
    registry.register_action("ClaimItems", actions::claim_items);
    registry.register_action("FindTool", actions::find_tool);
    registry.register_action("EquipTool", actions::equip_tool);
    registry.register_action("GetWorkPosition", actions::get_work_position);
    registry.register_action("GetItemDropPosition", actions::get_item_drop_position);
    registry.register_action("DropItem", actions::drop_item);
    registry.register_action("DropAllItems", actions::drop_all_items);
    registry.register_action("Work", actions::work);
    registry.register_action("FinishJob", actions::finish_job);
    registry.register_action("AbortJob", actions::abort_job);
    registry.register_action("Move", actions::move_to_target);
    registry.register_action("Wander", actions::wander);
    registry.register_action("PickUpItem", actions::pick_up_item);
    registry.register_action("FindFood", actions::find_food);
    registry.register_action("FindDrink", actions::find_drink);
    registry.register_action("Eat", actions::eat);
    registry.register_action("Drink", actions::drink);
    registry.register_action("FindBed", actions::find_bed);
    registry.register_action("Sleep", actions::sleep);
    registry.register_action("Graze", actions::graze);

    registry
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new(next: u32) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Never hand out an id at or below one already in use
    pub fn observe(&mut self, id: AgentId) {
        self.next = self.next.max(id.0 + 1);
    }
}

pub struct AgentFactory {
    registry: AgentRegistry,
    library: TreeLibrary,
    ids: IdAllocator,
}

impl AgentFactory {
    pub fn new(registry: AgentRegistry, library: TreeLibrary) -> Self {
        Self {
            registry,
            library,
            ids: IdAllocator::default(),
        }
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self::new(builtin_registry(), TreeLibrary::builtin()?))
    }

    pub fn ids(&self) -> IdAllocator {
        self.ids
    }

    pub fn set_ids(&mut self, ids: IdAllocator) {
        self.ids = ids;
    }

    pub fn library(&self) -> &TreeLibrary {
        &self.library
    }

    pub fn spawn(&mut self, kind: AgentKind, name: &str, position: Position, config: &SimulationConfig) -> Result<Agent> {
        let id = self.ids.next_id();
        let core = AgentCore::new(id, name, kind, position, config);
        let tree = self.library.build(&core.behavior_id, &self.registry)?;
        tracing::debug!("Spawned {} {:?} '{}' at {}", id, kind, name, position);
        Ok(Agent { core, tree })
    }

    /// Rebuild an agent's tree and put it back where the save left it
    pub fn restore(&mut self, snapshot: AgentSnapshot) -> Result<Agent> {
        let AgentSnapshot { core, tree: saved } = snapshot;
        self.ids.observe(core.id);
        let mut tree = self.library.build(&core.behavior_id, &self.registry)?;
        if let Some(saved) = saved {
            let report = tree.restore(&saved);
            if !report.is_exact() {
                tracing::warn!("{} restored with a changed behavior tree: {:?}", core.id, report);
            }
        }
        Ok(Agent { core, tree })
    }
}

impl std::fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentFactory")
            .field("actions", &self.registry.action_count())
            .field("conditions", &self.registry.condition_count())
            .field("next_id", &self.ids.peek())
            .finish()
    }
}
