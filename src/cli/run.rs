//! Run command implementation.

use std::cell::RefCell;
use std::rc::Rc;

use super::harness::skirmish_step;
use super::output::{ChangeTally, JsonSimResult, format_text};
use super::{CliError, OutputFormat, seed_or_entropy};
use annex::sim::check_invariants;
use annex::{Rng, Sim};

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the simulation fails or a verification sweep finds
/// an invariant violation.
#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
pub(crate) fn execute(
    seed: Option<u64>,
    ticks: u64,
    width: u16,
    height: u16,
    skirmish: bool,
    verify: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let seed = seed_or_entropy(seed);
    let mut rng = Rng::new(seed);

    let mut sim = Sim::new(width, height)?;
    let tally = Rc::new(RefCell::new(ChangeTally::default()));
    sim.add_observer(Box::new(Rc::clone(&tally)));
    sim.seed_factions(&mut rng)?;

    if !quiet {
        println!("Running {width}x{height} simulation with seed {seed}...");
        println!();
    }

    for _ in 0..ticks {
        if skirmish {
            skirmish_step(&mut sim, &mut rng)?;
        } else {
            sim.step()?;
        }
        if verify {
            let violations = check_invariants(&sim);
            if let Some(first) = violations.first() {
                return Err(CliError::new(format!(
                    "tick {}: {first} ({} total)",
                    sim.ticks(),
                    violations.len()
                )));
            }
        }
    }

    let tally = *tally.borrow();
    match format {
        OutputFormat::Text => {
            print!("{}", format_text(&sim, seed, tally));
        }
        OutputFormat::Json => {
            let result = JsonSimResult::from_sim(&sim, seed, tally);
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }

    Ok(())
}
