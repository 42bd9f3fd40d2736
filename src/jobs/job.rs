//! Jobs and the catalog that defines them
//!
//! A job type is data: which skill works it, which tool and input items it
//! needs, from where it can be worked, and the ordered task steps an agent
//! runs once everything is in place.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{ColonyError, Result};
use crate::core::types::{AgentId, ItemId, JobId, Offset, Position};
use crate::inventory::ANY_MATERIAL;

fn any_material() -> String {
    ANY_MATERIAL.to_string()
}

fn default_skill_gain() -> f32 {
    10.0
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Assigned(AgentId),
    ItemsClaimed,
    Worked,
    Finished,
    Aborted,
    Canceled,
}

/// Which branch of the work tree runs the job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobFlow {
    #[default]
    Standard,
    Haul,
}

impl JobFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobFlow::Standard => "Standard",
            JobFlow::Haul => "Haul",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredItem {
    #[serde(default = "default_count")]
    pub count: u32,
    pub item_sid: String,
    #[serde(default = "any_material")]
    pub material_sid: String,
    /// When non-empty, only these materials are accepted
    #[serde(default)]
    pub material_restriction: Vec<String>,
    /// All `count` items must share one material
    #[serde(default)]
    pub require_same: bool,
}

impl RequiredItem {
    pub fn new(item_sid: impl Into<String>, material_sid: impl Into<String>, count: u32) -> Self {
        Self {
            count,
            item_sid: item_sid.into(),
            material_sid: material_sid.into(),
            material_restriction: Vec::new(),
            require_same: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredTool {
    pub item_sid: String,
    #[serde(default)]
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    pub task: String,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub item_sid: String,
    /// `None` takes the material of the first consumed input
    #[serde(default)]
    pub material_sid: Option<String>,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Tool level of the produced items, 0 for non-tools
    #[serde(default)]
    pub tool_level: u8,
}

/// One job type as loaded from the catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub skill: String,
    #[serde(default)]
    pub tool: Option<RequiredTool>,
    /// Working it can wall the worker in; fewer open neighbours go first
    #[serde(default)]
    pub may_trap: bool,
    #[serde(default)]
    pub flow: JobFlow,
    /// Offsets from the job position an agent may work from
    pub work_positions: Vec<[i32; 3]>,
    #[serde(default)]
    pub required_items: Vec<RequiredItem>,
    #[serde(default)]
    pub tasks: Vec<TaskStep>,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default = "default_skill_gain")]
    pub skill_gain: f32,
    #[serde(default)]
    pub destroy_on_abort: bool,
}

impl JobDefinition {
    pub fn work_offsets(&self) -> impl Iterator<Item = Offset> + '_ {
        self.work_positions.iter().map(|o| Offset::from(*o))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    job: Vec<JobDefinition>,
}

/// All known job types, plus the skill -> job types lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCatalog {
    definitions: BTreeMap<String, JobDefinition>,
    /// Definition order, which is also the per-skill search order
    order: Vec<String>,
    #[serde(skip)]
    by_skill: AHashMap<String, Vec<String>>,
}

impl JobCatalog {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        let mut catalog = Self::default();
        for def in file.job {
            if def.work_positions.is_empty() {
                return Err(ColonyError::InvalidConfig(format!(
                    "job type '{}' has no work positions",
                    def.id
                )));
            }
            if catalog.definitions.contains_key(&def.id) {
                return Err(ColonyError::InvalidConfig(format!("job type '{}' defined twice", def.id)));
            }
            catalog.order.push(def.id.clone());
            catalog.definitions.insert(def.id.clone(), def);
        }
        catalog.rebuild_index();
        Ok(catalog)
    }

    /// The job types shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("../../data/jobs.toml"))
    }

    pub fn rebuild_index(&mut self) {
        self.by_skill.clear();
        for id in &self.order {
            if let Some(def) = self.definitions.get(id) {
                self.by_skill.entry(def.skill.clone()).or_default().push(id.clone());
            }
        }
    }

    pub fn get(&self, job_type: &str) -> Option<&JobDefinition> {
        self.definitions.get(job_type)
    }

    pub fn types_for_skill(&self, skill: &str) -> &[String] {
        self.by_skill.get(skill).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub skill: String,
    pub state: JobState,
    pub position: Position,
    /// 0 (lowest) to 9 (highest)
    pub priority: u8,
    pub flow: JobFlow,
    pub work_pos: Option<Position>,
    pub pos_item_input: Option<Position>,
    pub tool_pos: Option<Position>,
    pub possible_work_positions: Vec<Position>,
    pub work_offsets: Vec<Offset>,
    pub required_items: Vec<RequiredItem>,
    pub required_tool: Option<RequiredTool>,
    pub items_to_haul: Vec<ItemId>,
    pub tasks: Vec<TaskStep>,
    pub product: Option<Product>,
    /// Material chosen when the job was placed, if any
    pub material: Option<String>,
    pub may_trap: bool,
    pub destroy_on_abort: bool,
    pub skill_gain: f32,
    pub worked_by: Option<AgentId>,
    pub is_worked: bool,
    pub aborted: bool,
    pub canceled: bool,
    pub silent: bool,
    pub component_missing: bool,
}

impl Job {
    pub(crate) fn from_spec(id: JobId, def: &JobDefinition, spec: JobSpec) -> Self {
        let work_offsets: Vec<Offset> = def.work_offsets().collect();
        let possible_work_positions = work_offsets.iter().map(|o| spec.position.offset(*o)).collect();
        Self {
            id,
            job_type: def.id.clone(),
            skill: def.skill.clone(),
            state: JobState::Pending,
            position: spec.position,
            priority: spec.priority.min(9),
            flow: def.flow,
            work_pos: None,
            pos_item_input: spec.item_input,
            tool_pos: None,
            possible_work_positions,
            work_offsets,
            required_items: spec.required_items.unwrap_or_else(|| def.required_items.clone()),
            required_tool: def.tool.clone(),
            items_to_haul: spec.items_to_haul,
            tasks: def.tasks.clone(),
            product: def.product.clone(),
            material: spec.material,
            may_trap: def.may_trap,
            destroy_on_abort: def.destroy_on_abort,
            skill_gain: def.skill_gain,
            worked_by: None,
            is_worked: false,
            aborted: false,
            canceled: false,
            silent: spec.silent,
            component_missing: false,
        }
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn required_items(&self) -> &[RequiredItem] {
        &self.required_items
    }

    pub fn required_tool(&self) -> Option<&RequiredTool> {
        self.required_tool.as_ref()
    }

    pub fn possible_work_positions(&self) -> &[Position] {
        &self.possible_work_positions
    }

    pub fn set_work_pos(&mut self, pos: Position) {
        self.work_pos = Some(pos);
    }

    pub fn pos_item_input(&self) -> Option<Position> {
        self.pos_item_input
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn set_aborted(&mut self, aborted: bool) {
        self.aborted = aborted;
    }

    /// Recompute the work positions that are currently standable
    pub(crate) fn refresh_work_positions(&mut self, walkable: impl Fn(Position) -> bool) -> bool {
        self.possible_work_positions = self
            .work_offsets
            .iter()
            .map(|o| self.position.offset(*o))
            .filter(|p| walkable(*p))
            .collect();
        !self.possible_work_positions.is_empty()
    }

    /// Back to the unassigned state after an abort
    pub(crate) fn reset_assignment(&mut self) {
        self.is_worked = false;
        self.worked_by = None;
        self.work_pos = None;
        self.tool_pos = None;
        self.aborted = false;
    }
}

/// Everything needed to place a job; defaults come from the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub job_type: String,
    pub position: Position,
    pub priority: u8,
    pub silent: bool,
    pub items_to_haul: Vec<ItemId>,
    pub required_items: Option<Vec<RequiredItem>>,
    pub material: Option<String>,
    pub item_input: Option<Position>,
}

impl JobSpec {
    pub fn new(job_type: impl Into<String>, position: Position) -> Self {
        Self {
            job_type: job_type.into(),
            position,
            priority: 5,
            silent: false,
            items_to_haul: Vec::new(),
            required_items: None,
            material: None,
            item_input: None,
        }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn items_to_haul(mut self, items: Vec<ItemId>) -> Self {
        self.items_to_haul = items;
        self
    }

    pub fn required_items(mut self, items: Vec<RequiredItem>) -> Self {
        self.required_items = Some(items);
        self
    }

    pub fn material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn item_input(mut self, pos: Position) -> Self {
        self.item_input = Some(pos);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = JobCatalog::builtin().unwrap();
        assert!(catalog.get("Dig").is_some());
        assert_eq!(catalog.get("Haul").map(|d| d.flow), Some(JobFlow::Haul));
        assert!(catalog.types_for_skill("Mining").contains(&"Dig".to_string()));
    }

    #[test]
    fn test_catalog_defaults() {
        let catalog = JobCatalog::from_toml_str(
            r#"
            [[job]]
            id = "Build"
            skill = "Construction"
            work_positions = [[1, 0, 0]]
            [[job.required_items]]
            item_sid = "Block"
            "#,
        )
        .unwrap();
        let def = catalog.get("Build").unwrap();
        assert_eq!(def.required_items[0].count, 1);
        assert_eq!(def.required_items[0].material_sid, "any");
        assert_eq!(def.skill_gain, 10.0);
        assert_eq!(def.flow, JobFlow::Standard);
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_missing_positions() {
        let dup = r#"
            [[job]]
            id = "A"
            skill = "S"
            work_positions = [[0, 0, 0]]
            [[job]]
            id = "A"
            skill = "S"
            work_positions = [[0, 0, 0]]
        "#;
        assert!(matches!(JobCatalog::from_toml_str(dup), Err(ColonyError::InvalidConfig(_))));

        let empty = r#"
            [[job]]
            id = "A"
            skill = "S"
            work_positions = []
        "#;
        assert!(JobCatalog::from_toml_str(empty).is_err());
    }

    #[test]
    fn test_job_from_spec_offsets() {
        let catalog = JobCatalog::builtin().unwrap();
        let def = catalog.get("Dig").unwrap();
        let job = Job::from_spec(
            JobId::new(0, 0),
            def,
            JobSpec::new("Dig", Position::new(5, 5, 0)).priority(12),
        );
        assert_eq!(job.priority, 9, "priority is clamped");
        assert!(job.possible_work_positions().contains(&Position::new(4, 5, 0)));
        assert_eq!(job.state, JobState::Pending);
    }
}
