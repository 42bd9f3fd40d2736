//! Scenario setup: map, items, agents and starting jobs
//!
//! Scenarios can be assembled in code or read from TOML:
//!
//! ```toml
//! width = 16
//! height = 16
//! walls = [[5, 5, 0], [5, 6, 0]]
//!
//! [[items]]
//! item_sid = "Pickaxe"
//! material_sid = "Iron"
//! position = [1, 1, 0]
//! tool_level = 1
//!
//! [[agents]]
//! kind = "Gnome"
//! name = "Urist"
//! position = [2, 2, 0]
//!
//! [[jobs]]
//! job_type = "Dig"
//! position = [5, 5, 0]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::agent::AgentKind;
use crate::core::config::SimulationConfig;
use crate::core::error::{ColonyError, Result};
use crate::core::types::{ItemId, Position};
use crate::inventory::NewItem;
use crate::jobs::{JobCatalog, JobSpec};
use crate::simulation::Simulation;
use crate::world::{FloorType, World};

fn default_depth() -> i32 {
    1
}

fn default_priority() -> u8 {
    5
}

fn any_material() -> String {
    crate::inventory::ANY_MATERIAL.to_string()
}

fn to_pos(p: [i32; 3]) -> Position {
    Position::new(p[0], p[1], p[2])
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemEntry {
    pub item_sid: String,
    #[serde(default = "any_material")]
    pub material_sid: String,
    pub position: [i32; 3],
    #[serde(default)]
    pub nutrition: f32,
    #[serde(default)]
    pub drink: f32,
    #[serde(default)]
    pub tool_level: u8,
    #[serde(default)]
    pub in_stockpile: bool,
    /// Built furniture such as beds
    #[serde(default)]
    pub constructed: bool,
    /// Place this many identical items
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentEntry {
    pub kind: AgentKind,
    pub name: String,
    pub position: [i32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobEntry {
    pub job_type: String,
    pub position: [i32; 3],
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub material: Option<String>,
    /// Indices into the scenario's item list
    #[serde(default)]
    pub haul: Vec<usize>,
    #[serde(default)]
    pub item_input: Option<[i32; 3]>,
}

/// TOML form of a scenario
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioFile {
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_depth")]
    pub depth: i32,
    #[serde(default)]
    pub walls: Vec<[i32; 3]>,
    #[serde(default)]
    pub items: Vec<ItemEntry>,
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
    #[serde(default)]
    pub config: Option<SimulationConfig>,
}

enum PendingJob {
    Spec(JobSpec),
    /// From a scenario file; haul items are indices into `items`
    Entry(JobEntry),
}

pub struct ScenarioBuilder {
    width: i32,
    height: i32,
    depth: i32,
    config: SimulationConfig,
    catalog: Option<JobCatalog>,
    walls: Vec<Position>,
    items: Vec<NewItem>,
    agents: Vec<(AgentKind, String, Position)>,
    jobs: Vec<PendingJob>,
}

impl ScenarioBuilder {
    /// Floored single-level map of the given size
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            depth: 1,
            config: SimulationConfig::default(),
            catalog: None,
            walls: Vec::new(),
            items: Vec::new(),
            agents: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Extra levels above ground; only level 0 gets a floor
    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn catalog(mut self, catalog: JobCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn wall(mut self, pos: Position) -> Self {
        self.walls.push(pos);
        self
    }

    pub fn item(mut self, item: NewItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn food(self, pos: Position, nutrition: f32) -> Self {
        self.item(NewItem::new("Meal", "any", pos).nutrition(nutrition))
    }

    pub fn drink(self, pos: Position, value: f32) -> Self {
        self.item(NewItem::new("Beer", "any", pos).drink(value))
    }

    pub fn agent(mut self, kind: AgentKind, name: &str, pos: Position) -> Self {
        self.agents.push((kind, name.to_string(), pos));
        self
    }

    pub fn job(mut self, spec: JobSpec) -> Self {
        self.jobs.push(PendingJob::Spec(spec));
        self
    }

    pub fn from_file(file: ScenarioFile) -> Self {
        let mut builder = Self::new(file.width, file.height).depth(file.depth);
        if let Some(config) = file.config {
            builder = builder.config(config);
        }
        builder.walls = file.walls.into_iter().map(to_pos).collect();
        for entry in file.items {
            let item = NewItem::new(entry.item_sid, entry.material_sid, to_pos(entry.position))
                .nutrition(entry.nutrition)
                .drink(entry.drink)
                .tool_level(entry.tool_level)
                .in_stockpile(entry.in_stockpile)
                .constructed(entry.constructed);
            for _ in 0..entry.count.unwrap_or(1) {
                builder.items.push(item.clone());
            }
        }
        builder.agents = file
            .agents
            .into_iter()
            .map(|a| (a.kind, a.name, to_pos(a.position)))
            .collect();
        builder.jobs = file.jobs.into_iter().map(PendingJob::Entry).collect();
        builder
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ScenarioFile = toml::from_str(text)?;
        Ok(Self::from_file(file))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// A small colony with a little of everything, used by the binaries
    /// and benchmarks
    pub fn demo(gnomes: usize, seed: u64) -> Self {
        let side = 24 + (gnomes as f32).sqrt() as i32 * 4;
        let mut builder = Self::new(side, side).seed(seed);

        for x in 8..16 {
            builder = builder.wall(Position::new(x, 8, 0));
        }
        for i in 0..gnomes.max(1) as i32 * 2 {
            let pos = Position::new(1 + i % (side - 2), side - 2, 0);
            builder = builder.food(pos, 60.0).drink(Position::new(pos.x, side - 3, 0), 60.0);
        }
        for i in 0..gnomes.max(1) as i32 {
            builder = builder.item(NewItem::new("Pickaxe", "Iron", Position::new(i % side, 0, 0)).tool_level(1));
            builder = builder.item(NewItem::new("Bed", "Wood", Position::new(side - 1, i % side, 0)).constructed(true));
        }
        for x in 8..16 {
            builder = builder.job(JobSpec::new("Dig", Position::new(x, 8, 0)));
        }
        for i in 0..gnomes {
            let pos = Position::new(2 + (i as i32 * 3) % (side - 4), 12 + (i as i32 / 6) % 8, 0);
            builder = builder.agent(AgentKind::Gnome, &format!("Gnome {}", i + 1), pos);
        }
        builder
            .agent(AgentKind::Animal, "Goat", Position::new(side / 2, side / 2, 0))
            .agent(AgentKind::Monster, "Goblin", Position::new(side - 2, 1, 0))
    }

    pub fn build(self) -> Result<Simulation> {
        let mut world = World::new(self.width, self.height, self.depth);
        for y in 0..self.height {
            for x in 0..self.width {
                world.set_floor(Position::new(x, y, 0), FloorType::Floor);
            }
        }
        for wall in &self.walls {
            if !world.set_wall(*wall, true) {
                return Err(ColonyError::InvalidConfig(format!("Wall at {} is outside the map", wall)));
            }
        }

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => JobCatalog::builtin()?,
        };
        let mut sim = Simulation::new(self.config, world, catalog)?;

        let items: Vec<ItemId> = self
            .items
            .into_iter()
            .map(|item| sim.colony.inventory.create_item(item))
            .collect();

        for (kind, name, pos) in &self.agents {
            sim.spawn(*kind, name, *pos)?;
        }

        for job in self.jobs {
            let spec = match job {
                PendingJob::Spec(spec) => spec,
                PendingJob::Entry(entry) => {
                    let mut spec = JobSpec::new(entry.job_type, to_pos(entry.position)).priority(entry.priority);
                    if let Some(material) = entry.material {
                        spec = spec.material(material);
                    }
                    if let Some(input) = entry.item_input {
                        spec = spec.item_input(to_pos(input));
                    }
                    if !entry.haul.is_empty() {
                        let haul = entry
                            .haul
                            .iter()
                            .map(|&i| {
                                items.get(i).copied().ok_or_else(|| {
                                    ColonyError::InvalidConfig(format!("Job refers to missing item {}", i))
                                })
                            })
                            .collect::<Result<Vec<_>>>()?;
                        spec = spec.items_to_haul(haul);
                    }
                    spec
                }
            };
            sim.colony.jobs.add_job_with(spec)?;
        }

        tracing::info!(
            "Scenario ready: {}x{}x{} map, {} agents, {} items, {} jobs",
            self.width,
            self.height,
            self.depth,
            sim.agents.len(),
            items.len(),
            sim.colony.jobs.len()
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_places_everything() {
        let sim = ScenarioBuilder::new(8, 8)
            .wall(Position::new(3, 3, 0))
            .food(Position::new(1, 1, 0), 50.0)
            .agent(AgentKind::Gnome, "Urist", Position::new(0, 0, 0))
            .job(JobSpec::new("Dig", Position::new(3, 3, 0)))
            .build()
            .unwrap();
        assert!(sim.colony.world.is_wall(Position::new(3, 3, 0)));
        assert_eq!(sim.colony.inventory.len(), 1);
        assert_eq!(sim.agents.len(), 1);
        assert!(sim.colony.jobs.has_job_at(Position::new(3, 3, 0)));
        assert!(sim.colony.world.has_gnome(Position::new(0, 0, 0)));
    }

    #[test]
    fn test_scenario_from_toml() {
        let text = r#"
            width = 10
            height = 10
            walls = [[4, 4, 0]]

            [[items]]
            item_sid = "RawStone"
            material_sid = "Granite"
            position = [1, 1, 0]
            count = 3

            [[agents]]
            kind = "Gnome"
            name = "Urist"
            position = [2, 2, 0]

            [[jobs]]
            job_type = "Haul"
            position = [6, 6, 0]
            haul = [0, 2]
        "#;
        let sim = ScenarioBuilder::from_toml_str(text).unwrap().build().unwrap();
        assert_eq!(sim.colony.inventory.len(), 3);
        assert_eq!(sim.colony.jobs.len(), 1);
    }

    #[test]
    fn test_missing_haul_item_is_an_error() {
        let text = r#"
            width = 4
            height = 4
            [[jobs]]
            job_type = "Haul"
            position = [1, 1, 0]
            haul = [5]
        "#;
        let err = ScenarioBuilder::from_toml_str(text).unwrap().build().unwrap_err();
        assert!(matches!(err, ColonyError::InvalidConfig(_)));
    }

    #[test]
    fn test_demo_builds() {
        let sim = ScenarioBuilder::demo(4, 7).build().unwrap();
        assert_eq!(sim.agents.len(), 6);
        assert_eq!(sim.colony.jobs.len(), 8);
    }
}
