use thiserror::Error;

use crate::core::types::{AgentId, ItemId, JobId, Position};
use crate::inventory::ClaimOwner;

#[derive(Error, Debug)]
pub enum ColonyError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Item {item} is already claimed by {owner}")]
    ItemAlreadyClaimed { item: ItemId, owner: ClaimOwner },

    #[error("A job already exists at {0}")]
    JobPositionOccupied(Position),

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Unknown {kind} '{name}' in behavior tree '{tree}'")]
    UnknownBehavior {
        kind: &'static str,
        name: String,
        tree: String,
    },

    #[error("Unknown behavior tree: {0}")]
    UnknownTree(String),

    #[error("Behavior tree '{0}' nests subtrees too deeply")]
    SubtreeTooDeep(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ColonyError>;
