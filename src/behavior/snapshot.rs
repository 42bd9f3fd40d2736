//! Save and restore of behavior tree execution state
//!
//! Only the mutable part of a tree is persisted: status and cursor per node,
//! plus the two decorator parameters that can change at runtime. The tree
//! shape itself is rebuilt from its definition on load, then the snapshot
//! is laid over it by position.
//!
//! A snapshot taken from an older definition still loads. Name mismatches
//! are logged and applied anyway; with a different child count the first
//! `min(saved, current)` children are restored and the remaining current
//! children keep their freshly built state.

use serde::{Deserialize, Serialize};

use crate::behavior::node::{BehaviorNode, BehaviorTree, BlackboardHost, NodeKind};
use crate::behavior::status::NodeStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub id: u32,
    pub status: NodeStatus,
    #[serde(default)]
    pub cursor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_on_failure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

/// Outcome of laying a snapshot over a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub name_mismatches: usize,
    pub shape_mismatches: usize,
}

impl RestoreReport {
    pub fn is_exact(&self) -> bool {
        self.name_mismatches == 0 && self.shape_mismatches == 0
    }
}

impl<A: BlackboardHost, W> BehaviorNode<A, W> {
    pub fn snapshot(&self) -> NodeSnapshot {
        let (reset_on_failure, num) = match &self.kind {
            NodeKind::SequenceStar { reset_on_failure } => (Some(*reset_on_failure), None),
            NodeKind::RepeatUntilSuccess { attempts } => (None, Some(*attempts)),
            NodeKind::Repeat { count } => (None, Some(*count)),
            _ => (None, None),
        };
        NodeSnapshot {
            name: self.name.clone(),
            id: self.id,
            status: self.status,
            cursor: self.cursor,
            reset_on_failure,
            num,
            children: self.children.iter().map(|c| c.snapshot()).collect(),
        }
    }

    fn restore_from(&mut self, saved: &NodeSnapshot, tree: &str, report: &mut RestoreReport) {
        if saved.name != self.name {
            tracing::warn!(
                "Behavior tree '{}': node {} is '{}' but the save has '{}'",
                tree,
                self.id,
                self.name,
                saved.name
            );
            report.name_mismatches += 1;
        }

        self.status = saved.status;
        match &mut self.kind {
            NodeKind::SequenceStar { reset_on_failure } => {
                if let Some(rof) = saved.reset_on_failure {
                    *reset_on_failure = rof;
                }
            }
            NodeKind::RepeatUntilSuccess { attempts } => {
                if let Some(num) = saved.num {
                    *attempts = num;
                }
            }
            NodeKind::Repeat { count } => {
                if let Some(num) = saved.num {
                    *count = num;
                }
            }
            _ => {}
        }

        // Composites index into children; repeat decorators count cycles
        let cursor_limit = match &self.kind {
            NodeKind::Repeat { count } => *count,
            NodeKind::RepeatUntilSuccess { attempts } => *attempts,
            _ => self.children.len() as u32,
        };
        self.cursor = saved.cursor.min(cursor_limit);
        report.restored += 1;

        if saved.children.len() != self.children.len() {
            tracing::warn!(
                "Behavior tree '{}': node '{}' has {} children but the save has {}, restoring the first {}",
                tree,
                self.name,
                self.children.len(),
                saved.children.len(),
                saved.children.len().min(self.children.len())
            );
            report.shape_mismatches += 1;
        }

        for (child, saved_child) in self.children.iter_mut().zip(saved.children.iter()) {
            child.restore_from(saved_child, tree, report);
        }
    }
}

impl<A: BlackboardHost, W> BehaviorTree<A, W> {
    pub fn snapshot(&self) -> NodeSnapshot {
        self.root().snapshot()
    }

    /// Apply saved execution state; never fails, mismatches are reported
    pub fn restore(&mut self, saved: &NodeSnapshot) -> RestoreReport {
        let mut report = RestoreReport::default();
        let tree = self.id().to_string();
        self.root_mut().restore_from(saved, &tree, &mut report);
        if !report.is_exact() {
            tracing::debug!("Behavior tree '{}' restored with {:?}", tree, report);
        }
        report
    }
}
