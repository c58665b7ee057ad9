//! Tipset simulator CLI
//!
//! Runs networks of tipset event creators, either stepped deterministically
//! in-process or live on the tokio runtime.

mod live;
mod ordering;
mod simulation;

use clap::{Parser, Subcommand, ValueEnum};
use simulation::{run_simulation, SimulationConfig};
use std::path::PathBuf;
use std::time::Duration;
use tipset_core::AncientMode;
use tipset_node::{encode_text, init_logging, NodeConfig};

#[derive(Parser)]
#[command(name = "tipset-sim")]
#[command(version)]
#[command(about = "Simulate tipset-based event creation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TIPSET_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a simulated network in-process
    Simulate {
        /// Nodes with weight 1
        #[arg(short, long, default_value = "4")]
        nodes: usize,

        /// Additional nodes with weight 0
        #[arg(long, default_value = "0")]
        zero_weight: usize,

        /// Creation attempts
        #[arg(short, long, default_value = "1000")]
        steps: usize,

        /// Attempts between event window advances, 0 disables
        #[arg(long, default_value = "40")]
        steps_per_round: usize,

        /// Seed for scheduling, keys and parent selection
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Ancient mode
        #[arg(long, value_enum, default_value = "birth-round")]
        ancient_mode: AncientModeArg,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run event creation services on the tokio runtime
    Live {
        /// Number of nodes
        #[arg(short, long, default_value = "4")]
        nodes: u64,

        /// Run time in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Print every node's metrics in the Prometheus text format
        #[arg(long)]
        metrics: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum AncientModeArg {
    BirthRound,
    Generation,
}

impl From<AncientModeArg> for AncientMode {
    fn from(arg: AncientModeArg) -> Self {
        match arg {
            AncientModeArg::BirthRound => AncientMode::BirthRoundThreshold,
            AncientModeArg::Generation => AncientMode::GenerationThreshold,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = NodeConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Simulate {
            nodes,
            zero_weight,
            steps,
            steps_per_round,
            seed,
            ancient_mode,
            json,
        } => {
            let report = run_simulation(&SimulationConfig {
                nodes,
                zero_weight_nodes: zero_weight,
                steps,
                steps_per_round,
                seed,
                ancient_mode: ancient_mode.into(),
                event_creation: config.event_creation.clone(),
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }

        Commands::Live {
            nodes,
            duration,
            metrics,
        } => {
            tracing::info!("Running {} live nodes for {}s", nodes, duration);
            let outcome = live::run_live(&config, nodes, Duration::from_secs(duration)).await?;

            let mut created: Vec<_> = outcome.created.into_iter().collect();
            created.sort();
            for (node_id, count) in created {
                println!("{}: {} events", node_id, count);
            }

            if metrics {
                for (index, manager) in outcome.managers.iter().enumerate() {
                    println!("# node {}", index);
                    print!("{}", encode_text(manager.registry())?);
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
