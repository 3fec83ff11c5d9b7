use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};
use tokio::time::{self, Duration};
use warehouse_rl::{Config, Simulation, SimulationEngine, WarehouseConfig};

/// Train a Q-learning agent to cross a warehouse floor.
#[derive(Parser, Debug)]
#[command(name = "warehouse-rl", version)]
struct Args {
    /// TOML config file; built-in defaults otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Episodes to train headless before anything else.
    #[arg(long, default_value_t = 500)]
    episodes: u32,

    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Use the 15x15 layout when no config file is given.
    #[arg(long)]
    large: bool,

    /// After training, run the timed simulation for this many milliseconds.
    #[arg(long)]
    live_ms: Option<u64>,

    /// Also write the learned Q-table as JSON to this file.
    #[arg(long)]
    q_table: Option<PathBuf>,
}

const LOG_EVERY: u32 = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if args.large => Config {
            warehouse: WarehouseConfig::large(),
            ..Config::default()
        },
        None => Config::default(),
    };

    let mut sim = Simulation::from_config(&config, args.seed)?;
    for _ in 0..args.episodes {
        let result = sim.run_episode();
        if result.episode % LOG_EVERY == 0 {
            let stats = sim.learning_stats();
            info!(
                "Episodes: {}, Successes: {}, Failures: {}, Recent avg. steps: {:.1}, Trend: {}, Epsilon: {:.3}",
                stats.total_runs(),
                stats.successful_runs,
                stats.failed_runs,
                stats.recent_average,
                stats.trend,
                sim.exploration_rate()
            );
        }
    }

    let (stats, q_table) = match args.live_ms {
        Some(live_ms) => {
            let mut engine = SimulationEngine::from_simulation(sim);
            engine.start(|agent, state| {
                debug!(
                    "Episode: {:4} | Step: {:4} | Position: {} | Reward: {:.0}",
                    state.episode, state.step, agent.position, state.total_reward
                );
            })?;
            time::sleep(Duration::from_millis(live_ms)).await;
            engine.pause();
            (engine.learning_stats(), engine.q_table())
        }
        None => (sim.learning_stats(), sim.q_table()),
    };

    if let Some(path) = &args.q_table {
        fs::write(path, serde_json::to_string_pretty(&q_table)?)?;
        info!("Q-table written to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
