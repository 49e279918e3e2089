//! Skirmish Simulator - Entry Point
//!
//! Drives the engine against a seeded sandbox skirmish and prints what it
//! decided each tick, either as a short summary line or as JSON.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use skirmish_engine::core::config::EngineConfig;
use skirmish_engine::core::error::Result;
use skirmish_engine::objective::Completion;
use skirmish_engine::scenario;
use skirmish_engine::world::World;
use skirmish_engine::TickReport;

/// Skirmish Simulator - run the decision engine on a sandbox map
#[derive(Parser, Debug)]
#[command(name = "skirmish-sim")]
#[command(about = "Run the request arbitrator and objective scheduler on a seeded skirmish")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 2000)]
    ticks: u64,

    /// Random seed for the map layout
    #[arg(long)]
    seed: Option<u64>,

    /// Engine tuning file (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every tick report as one JSON line
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    requests_fulfilled: usize,
    objectives_created: usize,
    objectives_completed: Vec<Completion>,
    own_units: usize,
    enemy_units: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("skirmish_engine=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!("Skirmish seed {}", seed);

    let mut world = scenario::skirmish(seed)?;
    let mut engine = scenario::demo_engine(config)?;
    let rt = Runtime::new()?;

    let mut summary = RunSummary {
        seed,
        ticks: 0,
        requests_fulfilled: 0,
        objectives_created: 0,
        objectives_completed: Vec::new(),
        own_units: 0,
        enemy_units: 0,
    };

    for _ in 0..args.ticks {
        let report = rt.block_on(engine.tick(&mut world));

        // World step, then feed back what happened in it
        let destroyed = world.advance();
        let tick = report.tick;
        for unit in destroyed {
            engine.on_unit_destroyed(unit, tick);
        }
        for upgrade in world.take_finished_upgrades() {
            engine.on_upgrade_complete(upgrade);
        }

        summary.ticks += 1;
        summary.requests_fulfilled += report.arbitration.fulfilled_count();
        summary.objectives_created += report.objectives.created.len();
        summary
            .objectives_completed
            .extend(report.objectives.completed.iter().map(|c| c.reason));

        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else if is_eventful(&report) {
            print_summary(&report);
        }
    }

    summary.own_units = world.own_units().len();
    summary.enemy_units = world.all_enemies().len();
    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "\n{} ticks, {} requests fulfilled, {} objectives created, {} completed",
            summary.ticks,
            summary.requests_fulfilled,
            summary.objectives_created,
            summary.objectives_completed.len()
        );
        println!(
            "Own units left: {}, enemy units left: {}",
            summary.own_units, summary.enemy_units
        );
    }
    Ok(())
}

fn is_eventful(report: &TickReport) -> bool {
    report.arbitration.fulfilled_count() > 0
        || !report.objectives.created.is_empty()
        || !report.objectives.completed.is_empty()
}

fn print_summary(report: &TickReport) {
    let objectives: Vec<String> = report
        .objectives
        .live
        .iter()
        .map(|o| format!("{} {:?} {}u/{}e", o.label, o.status, o.held, o.enemies))
        .collect();
    println!(
        "[{:>5}] minerals {:>4} supply {:>3} optimism {:>5.2} | fulfilled {} | {}",
        report.tick,
        report.resources.minerals,
        report.resources.supply,
        report.optimism,
        report.arbitration.fulfilled_count(),
        objectives.join(", ")
    );
    for done in &report.objectives.completed {
        println!(
            "        {} objective finished: {:?}, {} units released",
            done.label, done.reason, done.released
        );
    }
}
