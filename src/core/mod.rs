pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{TimeChanges, WorldClock};
pub use config::SimulationConfig;
pub use error::{ColonyError, Result};
pub use types::{AgentId, ItemId, JobId, Offset, Position, ScheduleActivity, Tick};
