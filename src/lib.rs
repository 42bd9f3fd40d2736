//! Gnome Colony - behavior-tree driven colony simulation core
//!
//! Agents run behavior trees against a shared `Colony`: a tile world, an
//! item registry with exclusive claims, and a prioritized job queue. The
//! `simulation` module ties them into a deterministic, saveable tick loop.

pub mod agent;
pub mod behavior;
pub mod core;
pub mod inventory;
pub mod jobs;
pub mod pathfinding;
pub mod simulation;
pub mod util;
pub mod world;

pub use crate::agent::{Agent, AgentKind};
pub use crate::core::{ColonyError, Result, SimulationConfig};
pub use crate::simulation::{ScenarioBuilder, Simulation, TickReport};
