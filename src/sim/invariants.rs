//! Simulation invariants - sanity checks that detect bugs.
//!
//! These should NEVER trigger for states reached through the driver and the
//! reconciliation engine. A violation indicates a bug in a primitive rule or
//! in the pending-attack bookkeeping, not a gameplay condition.

use crate::sim::{Occupation, Sim};

/// Invariant violation found by a sweep.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all simulation invariants.
///
/// Returns every violation found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(sim: &Sim) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let world = sim.world();

    for (pos, cell) in world.grid().iter() {
        let garrisoned = cell.troops > 0;
        let unoccupied = cell.occupation == Occupation::Unoccupied;

        if garrisoned == unoccupied {
            violations.push(InvariantViolation {
                message: format!(
                    "cell {pos} has {} troops but occupation {:?}",
                    cell.troops, cell.occupation
                ),
            });
        }

        if world.is_active(pos) != garrisoned {
            violations.push(InvariantViolation {
                message: format!(
                    "cell {pos} with {} troops has active-index membership {}",
                    cell.troops,
                    world.is_active(pos)
                ),
            });
        }

        if cell.morale > 100 {
            violations.push(InvariantViolation {
                message: format!("cell {pos} morale {} outside [0, 100]", cell.morale),
            });
        }

        if let Some(target) = cell.attack_target {
            if unoccupied {
                violations.push(InvariantViolation {
                    message: format!("unoccupied cell {pos} still targets {target}"),
                });
            }
            if !pos.is_adjacent(target) {
                violations.push(InvariantViolation {
                    message: format!("cell {pos} targets non-adjacent {target}"),
                });
            }
            if !world.grid().in_bounds(target) {
                violations.push(InvariantViolation {
                    message: format!("cell {pos} targets out-of-bounds {target}"),
                });
            }
            if !sim.pending_attacks().contains_key(&pos) {
                violations.push(InvariantViolation {
                    message: format!("cell {pos} has an attack marker but no scheduled resolution"),
                });
            }
        }
    }

    for &pos in sim.pending_attacks().keys() {
        let marker = world
            .cell(pos)
            .ok()
            .and_then(|cell| cell.attack_target);
        if marker.is_none() {
            violations.push(InvariantViolation {
                message: format!("pending attack recorded at {pos} without an attack marker"),
            });
        }
    }

    if sim.pending_attacks().len() != sim.queue().len() {
        violations.push(InvariantViolation {
            message: format!(
                "{} pending attacks but {} scheduled events",
                sim.pending_attacks().len(),
                sim.queue().len()
            ),
        });
    }

    violations
}

/// Convenience predicate for tests and harnesses.
#[must_use]
pub fn holds(sim: &Sim) -> bool {
    check_invariants(sim).is_empty()
}
