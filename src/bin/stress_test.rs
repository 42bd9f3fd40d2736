use std::time::{Duration, Instant};

use clap::Parser;
use gnome_colony::agent::Activity;
use gnome_colony::simulation::{ScenarioBuilder, Simulation};

#[derive(Parser, Debug)]
#[command(name = "stress_test")]
#[command(about = "Time agent ticks in a large demo colony")]
struct Args {
    /// Number of gnomes
    #[arg(long, default_value_t = 500)]
    gnomes: usize,

    /// Ticks to measure
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Per-tick agent budget in milliseconds (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    budget_ms: u64,

    /// Cap on agents updated per tick (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_agents: usize,

    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> gnome_colony::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gnome_colony=warn")),
        )
        .init();
    let args = Args::parse();
    println!("=== STRESS TEST: {} gnomes ===\n", args.gnomes);

    let mut builder = ScenarioBuilder::demo(args.gnomes, args.seed);
    let mut config = gnome_colony::SimulationConfig::default();
    config.seed = args.seed;
    config.agent_tick_budget_ms = args.budget_ms;
    config.max_agents_per_tick = args.max_agents;
    builder = builder.config(config);
    let mut sim = builder.build()?;

    println!("=== Initial State ===");
    print_stats(&sim);

    println!("\n=== Running {} ticks ===\n", args.ticks);
    let mut tick_times = Vec::with_capacity(args.ticks as usize);
    let mut updates = 0usize;
    for tick in 0..args.ticks {
        let start = Instant::now();
        let report = sim.tick();
        let elapsed = start.elapsed();
        tick_times.push(elapsed);
        updates += report.results.len();

        if tick % 20 == 19 {
            println!(
                "Tick {:>4}: {:>8.2?} | updated {:>5} | jobs left {:>4}",
                tick + 1,
                elapsed,
                report.results.len(),
                sim.colony.jobs.len()
            );
        }
    }

    println!("\n=== Final State ===");
    print_stats(&sim);

    if tick_times.is_empty() {
        return Ok(());
    }
    let total: Duration = tick_times.iter().sum();
    let avg = total / tick_times.len() as u32;
    let min = tick_times.iter().min().copied().unwrap_or_default();
    let max = tick_times.iter().max().copied().unwrap_or_default();

    println!("\n=== Performance Summary ===");
    println!("Total time:     {:?}", total);
    println!("Avg tick:       {:?}", avg);
    println!("Min tick:       {:?}", min);
    println!("Max tick:       {:?}", max);
    println!("Ticks/sec:      {:.1}", 1.0 / avg.as_secs_f64().max(f64::EPSILON));
    println!("Agent updates:  {}", updates);
    Ok(())
}

fn print_stats(sim: &Simulation) {
    let agents = sim.agents.agents();
    let with_job = agents.iter().filter(|a| a.core.job.is_some()).count();
    let working = agents
        .iter()
        .filter(|a| a.core.work.activity == Activity::Working)
        .count();
    let hungry = agents
        .iter()
        .filter_map(|a| a.core.needs.as_ref())
        .filter(|n| n.hunger < sim.colony.config.need_threshold)
        .count();

    println!("  Agents:        {}", agents.len());
    println!("  Corpses:       {}", sim.agents.corpses().len());
    println!("  With a job:    {}", with_job);
    println!("  Working:       {}", working);
    println!("  Hungry:        {}", hungry);
    println!("  Open jobs:     {}", sim.colony.jobs.len());
}
