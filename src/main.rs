//! Annex CLI - Command-line interface for running and viewing simulations.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Annex - A deterministic territory-conquest simulation
#[derive(Parser, Debug)]
#[command(name = "annex")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a headless simulation and print the final state
    Run {
        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Ticks to simulate (default: 200)
        #[arg(short, long, default_value = "200")]
        ticks: u64,

        /// Grid width (default: 10)
        #[arg(long, default_value = "10")]
        width: u16,

        /// Grid height (default: 10)
        #[arg(long, default_value = "10")]
        height: u16,

        /// Drive both factions with a randomized command stream
        #[arg(long)]
        skirmish: bool,

        /// Check invariants after every tick
        #[arg(long)]
        verify: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Suppress everything except the final summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Interactive TUI to watch and play a simulation in real-time
    Watch {
        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Grid width (default: 10)
        #[arg(long, default_value = "10")]
        width: u16,

        /// Grid height (default: 10)
        #[arg(long, default_value = "10")]
        height: u16,

        /// Tick interval in milliseconds (default: 500)
        #[arg(long, default_value = "500")]
        speed: u64,
    },

    /// Run mass randomized simulations and aggregate statistics
    Batch {
        /// Number of simulations to run (default: 100)
        #[arg(short = 'n', long, default_value = "100")]
        sims: u64,

        /// Starting seed (increments for each simulation)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Ticks per simulation (default: 200)
        #[arg(short, long, default_value = "200")]
        ticks: u64,

        /// Grid width (default: 10)
        #[arg(long, default_value = "10")]
        width: u16,

        /// Grid height (default: 10)
        #[arg(long, default_value = "10")]
        height: u16,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::BatchFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            seed,
            ticks,
            width,
            height,
            skirmish,
            verify,
            format,
            quiet,
        } => cli::run::execute(seed, ticks, width, height, skirmish, verify, format, quiet),

        Commands::Watch {
            seed,
            width,
            height,
            speed,
        } => cli::watch::execute(seed, width, height, speed),

        Commands::Batch {
            sims,
            seed,
            ticks,
            width,
            height,
            threads,
            format,
            progress,
        } => cli::batch::execute(sims, seed, ticks, width, height, threads, format, progress),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
