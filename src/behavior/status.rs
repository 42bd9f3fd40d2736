use serde::{Deserialize, Serialize};

/// Result of ticking a behavior node
///
/// `Idle` is never returned by `tick`; it marks a node that has not run
/// since it was built or last halted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Failure,
    Success,
    Running,
    #[default]
    Idle,
}

impl NodeStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, NodeStatus::Failure | NodeStatus::Success)
    }

    /// Success for true, Failure for false
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}
