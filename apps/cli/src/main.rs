//! # Stagedrive CLI
//!
//! Bench tool for exercising the stagedrive control core against a
//! simulated device bench.
//!
//! ```bash
//! # enumerate the bench
//! stagedrive-cli list
//!
//! # identity and calibration of one device
//! stagedrive-cli info --serial 1001
//!
//! # relative stepper move, blocking until idle
//! stagedrive-cli move --serial 2001 --axis x --velocity 2.0 --distance 0.5
//!
//! # piezo position write
//! stagedrive-cli position --serial 1001 --axis z --target 42.0
//!
//! # hardware-timed read acquisition
//! stagedrive-cli wave --serial 1001 --axis x --points 64 --interval 0.5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod bench;
mod commands;

use commands::{InfoArgs, MoveArgs, PositionArgs, WaveArgs};

/// Bench tool for stagedrive positioning stages.
#[derive(Parser, Debug)]
#[command(name = "stagedrive-cli")]
#[command(about = "Command-line bench tool for stagedrive positioning stages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enumerate the devices on the bench
    List,

    /// Show identity, firmware and calibration of one device
    Info {
        #[command(flatten)]
        args: InfoArgs,
    },

    /// Relative move on a micro-stepping stage, blocking until idle
    Move {
        #[command(flatten)]
        args: MoveArgs,
    },

    /// Read or write an absolute piezo position
    Position {
        #[command(flatten)]
        args: PositionArgs,
    },

    /// Run a hardware-timed read acquisition and print the samples
    Wave {
        #[command(flatten)]
        args: WaveArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stagedrive_cli=info".parse()?)
                .add_directive("stagedrive_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let registry = bench::simulated_bench()?;

    match cli.command {
        Commands::List => commands::list(&registry),
        Commands::Info { args } => commands::info(&registry, args),
        Commands::Move { args } => commands::move_stage(&registry, args),
        Commands::Position { args } => commands::position(&registry, args),
        Commands::Wave { args } => commands::wave(&registry, args),
    }
}
