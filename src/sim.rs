//! Simulation core for Annex.
//!
//! Implements the territory-conquest rules:
//! - Grid of cells with owners, garrisons, and growth counters
//! - Reconciliation engine keeping derived cell state self-consistent
//! - Tick-ordered event scheduler for delayed, cancellable actions
//! - Tick driver with the growth rule and the attack/split command layer

mod driver;
mod grid;
mod invariants;
mod queue;
mod rng;
mod world;

pub use driver::{
    ATTACK_RESOLVE_TICKS, CommandOutcome, GROWTH_THRESHOLD, STARTING_TROOPS, ScheduledAction, Sim,
};
pub use grid::{Cell, FULL_MORALE, Faction, Grid, Occupation, Pos};
pub use invariants::{InvariantViolation, check_invariants, holds};
pub use queue::{EventHandle, TickQueue};
pub use rng::Rng;
pub use world::{CellChange, CellObserver, MAX_CASCADE_DEPTH, Mutation, World};
