//! Headless colony runner
//!
//! Builds a scenario (the demo colony or a TOML file), runs it for a number
//! of ticks and prints a summary. Saves can be written at the end and
//! resumed later with `--load`.

use std::path::PathBuf;

use clap::Parser;
use gnome_colony::agent::TickResult;
use gnome_colony::core::config::SimulationConfig;
use gnome_colony::core::error::Result;
use gnome_colony::simulation::{AgentEvent, ScenarioBuilder, Simulation};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "colony_sim")]
#[command(about = "Run a gnome colony headless and report what happened")]
struct Args {
    /// Scenario TOML; the built-in demo colony is used when absent
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Simulation config TOML, overrides the scenario's config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume from a JSON save instead of building a scenario
    #[arg(long, conflicts_with = "scenario")]
    load: Option<PathBuf>,

    /// Write a JSON save after the run
    #[arg(long)]
    save: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 2000)]
    ticks: u64,

    /// Gnomes in the demo colony
    #[arg(long, default_value_t = 6)]
    gnomes: usize,

    /// Random seed for the demo colony
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,

    /// Print each agent's activity log at the end
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    ticks: u64,
    final_tick: u64,
    agents: usize,
    corpses: usize,
    jobs_left: usize,
    job_changes: usize,
    deaths: usize,
    removed: usize,
    agent_updates: usize,
}

fn build(args: &Args) -> Result<Simulation> {
    if let Some(path) = &args.load {
        return Simulation::load_from(path);
    }
    let mut builder = match &args.scenario {
        Some(path) => ScenarioBuilder::load(path)?,
        None => ScenarioBuilder::demo(args.gnomes, args.seed),
    };
    if let Some(path) = &args.config {
        builder = builder.config(SimulationConfig::load(path)?);
    }
    builder.build()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gnome_colony=info")),
        )
        .init();

    let args = Args::parse();
    let mut sim = build(&args)?;
    tracing::info!("Running {} ticks from tick {}", args.ticks, sim.colony.tick());

    let mut summary = RunSummary {
        ticks: args.ticks,
        ..Default::default()
    };
    for _ in 0..args.ticks {
        let report = sim.tick();
        summary.agent_updates += report.results.len();
        for event in &report.events {
            match event {
                AgentEvent::JobChanged(_) => summary.job_changes += 1,
                AgentEvent::Died(_) => summary.deaths += 1,
                AgentEvent::Removed(_) => summary.removed += 1,
            }
        }
        for (id, result) in &report.results {
            if matches!(result, TickResult::NoFuel | TickResult::NoCore) {
                tracing::debug!("{} is out of power", id);
            }
        }
    }

    summary.final_tick = sim.colony.tick();
    summary.agents = sim.agents.len();
    summary.corpses = sim.agents.corpses().len();
    summary.jobs_left = sim.colony.jobs.len();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("=== Colony after {} ticks ({}) ===", summary.ticks, sim.colony.stamp());
        println!("Agents: {}  Corpses: {}", summary.agents, summary.corpses);
        println!("Jobs left: {}", summary.jobs_left);
        println!(
            "Job changes: {}  Deaths: {}  Removed: {}",
            summary.job_changes, summary.deaths, summary.removed
        );
        for agent in sim.agents.agents() {
            let core = &agent.core;
            println!(
                "  {:<12} {:?} at {} doing {:?}{}",
                core.name,
                core.kind,
                core.position,
                core.work.activity,
                core.log.last().map(|l| format!(" | {}", l)).unwrap_or_default()
            );
            if args.verbose {
                for line in core.log.entries() {
                    println!("      {}", line);
                }
            }
        }
    }

    if let Some(path) = &args.save {
        sim.save_to(path)?;
        tracing::info!("Saved to {}", path.display());
    }
    Ok(())
}
