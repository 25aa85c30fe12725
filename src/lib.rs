// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Annex: a deterministic tile-based territory-conquest simulation.
//!
//! Two factions claim cells on a fixed grid, grow garrisons over discrete
//! ticks, and fight over adjacent cells. The crate centers on:
//! - Bit-exact deterministic execution from a seed
//! - A reconciliation engine that keeps derived cell state consistent
//! - A tick-ordered scheduler for delayed, cancellable actions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       CLI (run / watch / batch)     │
//! ├─────────────────────────────────────┤
//! │    Tick Driver + Command Layer      │
//! ├─────────────────────────────────────┤
//! │  Reconciliation Engine + Scheduler  │
//! ├─────────────────────────────────────┤
//! │            Cell Store               │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod sim;

pub use error::{MutationFault, SimError, SimResult};

// Re-export key simulation types at crate root for convenience
pub use sim::{
    Cell, CellChange, CellObserver, CommandOutcome, Faction, Grid, Mutation, Occupation, Pos, Rng,
    Sim, TickQueue, World,
};
