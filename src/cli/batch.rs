//! Batch command implementation.
//!
//! Runs many independent seeded simulations in parallel and aggregates end
//! states. Each simulation is single-threaded; parallelism is across sims.

use super::harness::skirmish_step;
use super::output::{BatchStats, JsonBatchResult, format_batch_csv, format_batch_text};
use super::{BatchFormat, CliError, seed_or_entropy};
use annex::sim::check_invariants;
use annex::{Rng, Sim};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::time::Instant;

/// Execute the batch command.
///
/// # Errors
///
/// Returns an error if the thread pool or output serialization fails;
/// individual simulation failures are counted, not fatal.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    sims: u64,
    seed: Option<u64>,
    ticks: u64,
    width: u16,
    height: u16,
    threads: Option<usize>,
    format: BatchFormat,
    progress: bool,
) -> Result<(), CliError> {
    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = seed_or_entropy(seed);

    // Progress bar
    let pb = if progress {
        let pb = ProgressBar::new(sims);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sims ({per_sec})")
                .map_err(|e| CliError::new(format!("invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();

    // Lock-free fold/reduce: each thread accumulates its own stats, merged
    // at the end.
    let stats = (0..sims)
        .into_par_iter()
        .fold(BatchStats::new, |mut local, i| {
            let sim_seed = base_seed.wrapping_add(i);
            match run_one(sim_seed, ticks, width, height) {
                Ok((sim, violations)) => local.add_sim(&sim, violations),
                Err(_) => local.failures += 1,
            }
            local
        })
        .reduce(BatchStats::new, |mut a, b| {
            a.merge(&b);
            a
        });

    if let Some(pb) = pb {
        pb.set_position(stats.sims_run);
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();

    match format {
        BatchFormat::Text => {
            println!();
            print!(
                "{}",
                format_batch_text(&stats, base_seed, duration.as_secs_f64())
            );
        }
        BatchFormat::Json => {
            let json_result = JsonBatchResult::from_stats(&stats, base_seed);
            let json = serde_json::to_string_pretty(&json_result)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
        BatchFormat::Csv => {
            print!("{}", format_batch_csv(&stats, base_seed));
        }
    }

    Ok(())
}

/// Run a single seeded simulation to completion.
fn run_one(
    seed: u64,
    ticks: u64,
    width: u16,
    height: u16,
) -> Result<(Sim, usize), annex::SimError> {
    let mut rng = Rng::new(seed);
    let mut sim = Sim::new(width, height)?;
    sim.seed_factions(&mut rng)?;
    for _ in 0..ticks {
        skirmish_step(&mut sim, &mut rng)?;
    }
    let violations = check_invariants(&sim).len();
    Ok((sim, violations))
}
