// junction_sim_main.rs
use anyhow::{Context, Result};
use clap::Parser;
use junction_sim::global_variables::RESULTS_CSV;
use junction_sim::monitoring::results_log::{append_report, current_timestamp};
use junction_sim::{Direction, InMemoryVehicleStore, JunctionConfig, SimulationEngine};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "junction_sim")]
#[command(about = "Four-way signalised junction simulation")]
struct Cli {
    /// JSON junction configuration; a demo layout is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall-clock seconds per simulated second
    #[arg(long)]
    speed_scale: Option<f64>,

    /// Vehicles generated per direction
    #[arg(long)]
    pool_size: Option<usize>,

    /// Seed for vehicle generation
    #[arg(long)]
    seed: Option<u64>,

    /// CSV file the per-direction results are appended to
    #[arg(long, default_value = RESULTS_CSV)]
    results_csv: PathBuf,
}

fn demo_config() -> JunctionConfig {
    JunctionConfig::new(2, true)
        .with_flow(
            Direction::North,
            500.0,
            &[
                (Direction::East, 200.0),
                (Direction::South, 150.0),
                (Direction::West, 150.0),
            ],
        )
        .with_flow(
            Direction::East,
            300.0,
            &[(Direction::North, 100.0), (Direction::West, 200.0)],
        )
        .with_flow(
            Direction::South,
            400.0,
            &[
                (Direction::North, 250.0),
                (Direction::East, 50.0),
                (Direction::West, 100.0),
            ],
        )
        .with_flow(
            Direction::West,
            200.0,
            &[(Direction::East, 150.0), (Direction::South, 50.0)],
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => JunctionConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => demo_config(),
    };
    if cli.speed_scale.is_some() {
        config.speed_scale = cli.speed_scale;
    }
    if cli.pool_size.is_some() {
        config.pool_size = cli.pool_size;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let engine = Arc::new(SimulationEngine::new(Arc::new(InMemoryVehicleStore::new())));
    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine.cancel();
            }
        });
    }

    println!("Starting junction simulation...");
    let report = engine.start(&config).await.context("simulation failed")?;
    println!("{}", report.summary());

    let written = append_report(&cli.results_csv, &report, current_timestamp())
        .with_context(|| format!("writing {}", cli.results_csv.display()))?;
    if written > 0 {
        println!("Results appended to {}", cli.results_csv.display());
    }
    Ok(())
}
