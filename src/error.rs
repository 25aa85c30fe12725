//! Error types for the simulation core.

use std::fmt;

use crate::sim::Pos;

/// Errors surfaced by the cell store, reconciliation engine, and tick driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// A position outside the configured grid dimensions was requested.
    ///
    /// Positions are never silently clamped.
    OutOfBounds {
        /// The offending position.
        pos: Pos,
        /// Grid width at the time of the call.
        width: u16,
        /// Grid height at the time of the call.
        height: u16,
    },
    /// A mutation violated its caller contract.
    InvalidMutation {
        /// Cell the mutation targeted.
        pos: Pos,
        /// What the caller got wrong.
        reason: MutationFault,
    },
    /// A reconciliation cascade failed to reach a fixed point within the
    /// depth bound.
    ///
    /// This indicates a rule-derivation cycle, which is an internal
    /// consistency fault, never expected behavior.
    CascadeDepthExceeded {
        /// Cell whose cascade diverged.
        pos: Pos,
        /// Number of mutation-sets processed before giving up.
        depth: u32,
    },
    /// A grid with zero area was requested at construction.
    EmptyGrid {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
    },
    /// Faction seeding could not find an unaligned cell to claim.
    NoUnalignedCell,
}

/// The specific contract violation behind an `InvalidMutation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationFault {
    /// Morale must stay within [0, 100].
    MoraleOutOfRange(u8),
    /// An attack target must be a different cell.
    AttackTargetSelf,
    /// An attack target must be Chebyshev-adjacent to its source.
    AttackTargetNotAdjacent(Pos),
    /// An attack target must lie inside the grid.
    AttackTargetOutOfBounds(Pos),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::OutOfBounds { pos, width, height } => {
                write!(f, "position {pos} outside {width}x{height} grid")
            }
            SimError::InvalidMutation { pos, reason } => {
                write!(f, "invalid mutation at {pos}: {reason}")
            }
            SimError::CascadeDepthExceeded { pos, depth } => {
                write!(f, "reconciliation cascade at {pos} exceeded depth {depth}")
            }
            SimError::EmptyGrid { width, height } => {
                write!(f, "grid must have positive area, got {width}x{height}")
            }
            SimError::NoUnalignedCell => {
                write!(f, "no unaligned cell available for faction seeding")
            }
        }
    }
}

impl fmt::Display for MutationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationFault::MoraleOutOfRange(v) => {
                write!(f, "morale {v} outside [0, 100]")
            }
            MutationFault::AttackTargetSelf => {
                write!(f, "attack target is the source cell itself")
            }
            MutationFault::AttackTargetNotAdjacent(target) => {
                write!(f, "attack target {target} is not adjacent")
            }
            MutationFault::AttackTargetOutOfBounds(target) => {
                write!(f, "attack target {target} is outside the grid")
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
