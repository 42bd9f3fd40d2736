//! Agent manager integration tests: round-robin fairness under a per-tick cap,
//! death and corpse expiry, and destroying agents from outside.

use std::collections::HashMap;

use gnome_colony::agent::{AgentKind, TickResult};
use gnome_colony::core::config::SimulationConfig;
use gnome_colony::core::types::{AgentId, Position};
use gnome_colony::simulation::{AgentEvent, ScenarioBuilder, Simulation};

fn colony_of(gnomes: i32, config: SimulationConfig) -> Simulation {
    let mut builder = ScenarioBuilder::new(16, 16).config(config);
    for i in 0..gnomes {
        builder = builder.agent(AgentKind::Gnome, &format!("Gnome{}", i), Position::new(i, 1, 0));
    }
    builder.build().unwrap()
}

fn capped(max_agents: usize) -> SimulationConfig {
    SimulationConfig {
        agent_tick_budget_ms: 0,
        max_agents_per_tick: max_agents,
        ..SimulationConfig::default()
    }
}

#[test]
fn test_capped_ticks_visit_everyone_before_anyone_twice() {
    let mut sim = colony_of(5, capped(2));
    let mut visits: HashMap<AgentId, u32> = HashMap::new();

    // 5 ticks of 2 updates each: every gnome exactly twice
    for _ in 0..5 {
        let report = sim.tick();
        assert_eq!(report.results.len(), 2);
        for (id, _) in report.results {
            *visits.entry(id).or_default() += 1;
        }
    }
    assert_eq!(visits.len(), 5);
    assert!(visits.values().all(|&n| n == 2), "{:?}", visits);
}

#[test]
fn test_uncapped_tick_updates_all_agents_in_order() {
    let mut sim = colony_of(4, capped(0));
    let expected: Vec<AgentId> = sim.agents.agents().iter().map(|a| a.id()).collect();
    let report = sim.tick();
    let seen: Vec<AgentId> = report.results.iter().map(|(id, _)| *id).collect();
    assert_eq!(seen, expected);
    assert_eq!(sim.agents.cursor(), 0);
}

#[test]
fn test_starved_gnome_becomes_corpse_then_expires() {
    let config = SimulationConfig {
        corpse_expiry_days: 1,
        ..capped(0)
    };
    let mut sim = colony_of(2, config);
    let victim = sim.agents.agents()[1].id();
    let starving = sim.colony.config.starvation_threshold;
    sim.agents.agent_mut(victim).unwrap().core.needs.as_mut().unwrap().hunger = starving;

    let mut died_at = None;
    for _ in 0..sim.colony.config.ticks_per_minute * 2 {
        let report = sim.tick();
        if report.events.contains(&AgentEvent::Died(victim)) {
            assert!(report.results.contains(&(victim, TickResult::Dead)));
            died_at = Some(report.tick);
            break;
        }
    }
    assert!(died_at.is_some(), "gnome never starved");
    assert_eq!(sim.agents.len(), 1);
    assert!(sim.agents.corpse(victim).is_some());
    assert_eq!(sim.colony.world.index_count(victim), 1, "corpse stays on its tile");

    let expiry = sim.colony.config.corpse_expiry_ticks();
    let mut removed = false;
    for _ in 0..=expiry + 1 {
        let report = sim.tick();
        removed |= report.events.contains(&AgentEvent::Removed(victim));
    }
    assert!(removed, "corpse never expired");
    assert!(sim.agents.corpse(victim).is_none());
    assert_eq!(sim.colony.world.index_count(victim), 0);
}

#[test]
fn test_destroyed_agent_releases_claims_and_leaves() {
    let mut sim = ScenarioBuilder::new(10, 10)
        .config(capped(0))
        .food(Position::new(8, 8, 0), 60.0)
        .agent(AgentKind::Gnome, "Urist", Position::new(1, 1, 0))
        .agent(AgentKind::Gnome, "Kadol", Position::new(2, 1, 0))
        .build()
        .unwrap();
    let id = sim.agents.agents()[0].id();
    let threshold = sim.colony.config.need_threshold;
    sim.agents.agent_mut(id).unwrap().core.needs.as_mut().unwrap().hunger = threshold - 1.0;
    let meal = sim.colony.inventory.iter().next().map(|i| i.id).unwrap();

    sim.tick();
    assert!(sim.colony.inventory.is_in_job(meal).is_some(), "meal claimed first");

    assert!(sim.agents.destroy_agent(id));
    let report = sim.tick();
    assert!(report.events.contains(&AgentEvent::Removed(id)));
    assert!(sim.agents.agent(id).is_none());
    assert_eq!(sim.colony.world.index_count(id), 0);
    assert_eq!(sim.colony.inventory.is_in_job(meal), None);
    assert!(!sim.agents.destroy_agent(id), "already gone");
}
