//! Saved form of an agent

use serde::{Deserialize, Serialize};

use crate::agent::state::AgentCore;
use crate::agent::Agent;
use crate::behavior::NodeSnapshot;

/// Agent state plus the execution state of its behavior tree
///
/// The tree shape is not saved; it is rebuilt from the agent's behavior id
/// and the snapshot is laid over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub core: AgentCore,
    #[serde(default)]
    pub tree: Option<NodeSnapshot>,
}

impl AgentSnapshot {
    pub fn capture(agent: &Agent) -> Self {
        Self {
            core: agent.core.clone(),
            tree: Some(agent.tree.snapshot()),
        }
    }
}
