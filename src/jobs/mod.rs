//! Jobs: catalog, job records and the job manager

pub mod job;
pub mod manager;

pub use job::{Job, JobCatalog, JobDefinition, JobFlow, JobSpec, JobState, Product, RequiredItem, RequiredTool, TaskStep};
pub use manager::{required_items_available, required_tool_exists, JobManager, PRIORITY_LEVELS};
