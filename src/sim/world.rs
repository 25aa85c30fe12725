//! Cell store and reconciliation engine.
//!
//! All cell mutation flows through [`World::apply`]: a work-list cascade
//! that applies primitive field rules, derives follow-up mutations until the
//! cell is self-consistent, and keeps the active index in step
//! transactionally. Observers are notified once per committed primitive
//! change and never participate in the cascade.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::error::{MutationFault, SimError, SimResult};
use crate::sim::{Cell, Faction, Grid, Occupation, Pos};

/// Maximum number of mutation-sets one `apply` call may process.
///
/// Each derived set strictly narrows what can still cascade (owner and
/// troops derive occupation; nothing derives from occupation, growth, or
/// morale), so legitimate cascades stay well under this. Exceeding it is an
/// internal consistency fault, not a loop to ride out.
pub const MAX_CASCADE_DEPTH: u32 = 8;

/// A single field mutation.
///
/// One variant per cell field, matched exhaustively — there is no
/// "unrecognized key" failure mode, and negative troop counts are
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Set the owning faction.
    Owner(Faction),
    /// Set the occupation status. Internal use: external callers submit
    /// owner/troop changes and let the engine derive occupation.
    Occupation(Occupation),
    /// Set the troop count.
    Troops(u32),
    /// Set the growth counter.
    Growth(u32),
    /// Set morale; values above 100 are rejected.
    Morale(u8),
    /// Set or clear the pending attack target. A target must be a distinct
    /// adjacent in-bounds cell.
    AttackTarget(Option<Pos>),
}

/// A committed change to one cell field, carried to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellChange {
    /// Owner was assigned.
    Owner {
        /// Value before the mutation.
        previous: Faction,
        /// Value after the mutation.
        current: Faction,
    },
    /// Occupation status was assigned.
    Occupation {
        /// Value before the mutation.
        previous: Occupation,
        /// Value after the mutation.
        current: Occupation,
    },
    /// Troop count was assigned.
    Troops {
        /// Value before the mutation.
        previous: u32,
        /// Value after the mutation.
        current: u32,
    },
    /// Growth counter was assigned.
    Growth {
        /// Value before the mutation.
        previous: u32,
        /// Value after the mutation.
        current: u32,
    },
    /// Morale was assigned.
    Morale {
        /// Value before the mutation.
        previous: u8,
        /// Value after the mutation.
        current: u8,
    },
    /// Attack target was set or cleared.
    AttackTarget {
        /// Value before the mutation.
        previous: Option<Pos>,
        /// Value after the mutation.
        current: Option<Pos>,
    },
}

/// Presentation-side subscriber to per-field cell changes.
///
/// Fired after the value is committed and the active index updated.
/// Implementations must not mutate cells; they react, they do not cascade.
pub trait CellObserver {
    /// Called once per committed primitive field change.
    fn cell_changed(&mut self, pos: Pos, change: &CellChange);
}

impl<T: CellObserver> CellObserver for Rc<RefCell<T>> {
    fn cell_changed(&mut self, pos: Pos, change: &CellChange) {
        self.borrow_mut().cell_changed(pos, change);
    }
}

/// The cell store plus its reconciliation engine.
pub struct World {
    grid: Grid,
    /// Positions with a positive troop count, maintained transactionally by
    /// the primitive rules. Ordered so iteration is reproducible.
    active: BTreeSet<Pos>,
    observers: Vec<Box<dyn CellObserver>>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("grid", &self.grid)
            .field("active", &self.active)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl World {
    /// Create a world over a fresh grid of default cells.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyGrid`] if either dimension is zero.
    pub fn new(width: u16, height: u16) -> SimResult<Self> {
        Ok(Self {
            grid: Grid::new(width, height)?,
            active: BTreeSet::new(),
            observers: Vec::new(),
        })
    }

    /// The underlying grid, read-only.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Look up a cell.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] for positions outside the grid.
    pub fn cell(&self, pos: Pos) -> SimResult<&Cell> {
        self.grid.cell(pos)
    }

    /// Positions currently holding troops, in ascending row-major order.
    pub fn active(&self) -> impl Iterator<Item = Pos> + '_ {
        self.active.iter().copied()
    }

    /// Whether a position is in the active index.
    #[must_use]
    pub fn is_active(&self, pos: Pos) -> bool {
        self.active.contains(&pos)
    }

    /// Register an observer for per-field change notifications.
    pub fn add_observer(&mut self, observer: Box<dyn CellObserver>) {
        self.observers.push(observer);
    }

    /// Apply a mutation-set to one cell and cascade to a fixed point.
    ///
    /// The caller's set is validated up front so a rejected call leaves the
    /// cell untouched. Primitive rules run in the order supplied; each may
    /// derive one follow-up set, processed before control returns.
    ///
    /// # Errors
    ///
    /// [`SimError::OutOfBounds`] for a bad position,
    /// [`SimError::InvalidMutation`] for a contract violation, and
    /// [`SimError::CascadeDepthExceeded`] if derivation fails to settle
    /// within [`MAX_CASCADE_DEPTH`] mutation-sets.
    pub fn apply(&mut self, pos: Pos, mutations: Vec<Mutation>) -> SimResult<()> {
        self.validate(pos, &mutations)?;

        let mut pending: VecDeque<Vec<Mutation>> = VecDeque::new();
        pending.push_back(mutations);
        let mut depth = 0u32;

        while let Some(set) = pending.pop_front() {
            depth += 1;
            if depth > MAX_CASCADE_DEPTH {
                return Err(SimError::CascadeDepthExceeded { pos, depth });
            }
            let sets_occupation = set
                .iter()
                .any(|m| matches!(m, Mutation::Occupation(_)));
            for mutation in set {
                if let Some(derived) = self.apply_primitive(pos, mutation, sets_occupation)? {
                    pending.push_back(derived);
                }
            }
        }
        Ok(())
    }

    /// Reject contract violations before touching any field.
    fn validate(&self, pos: Pos, mutations: &[Mutation]) -> SimResult<()> {
        self.grid.cell(pos)?;
        for mutation in mutations {
            match *mutation {
                Mutation::Morale(v) if v > 100 => {
                    return Err(SimError::InvalidMutation {
                        pos,
                        reason: MutationFault::MoraleOutOfRange(v),
                    });
                }
                Mutation::AttackTarget(Some(target)) => {
                    if target == pos {
                        return Err(SimError::InvalidMutation {
                            pos,
                            reason: MutationFault::AttackTargetSelf,
                        });
                    }
                    if !self.grid.in_bounds(target) {
                        return Err(SimError::InvalidMutation {
                            pos,
                            reason: MutationFault::AttackTargetOutOfBounds(target),
                        });
                    }
                    if !pos.is_adjacent(target) {
                        return Err(SimError::InvalidMutation {
                            pos,
                            reason: MutationFault::AttackTargetNotAdjacent(target),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one primitive rule. Returns the derived mutation-set, if any.
    fn apply_primitive(
        &mut self,
        pos: Pos,
        mutation: Mutation,
        set_has_occupation: bool,
    ) -> SimResult<Option<Vec<Mutation>>> {
        let cell = self.grid.cell_mut(pos)?;
        let (change, derived) = match mutation {
            Mutation::Owner(current) => {
                let previous = cell.owner;
                cell.owner = current;
                let garrisoned = cell.troops > 0;
                if current.is_aligned() {
                    if garrisoned {
                        self.active.insert(pos);
                    }
                } else {
                    self.active.remove(&pos);
                }
                let derived = (previous == Faction::Unaligned
                    && current.is_aligned()
                    && !set_has_occupation)
                    .then(|| vec![Mutation::Occupation(Occupation::Idle)]);
                (CellChange::Owner { previous, current }, derived)
            }
            Mutation::Occupation(current) => {
                let previous = cell.occupation;
                cell.occupation = current;
                (CellChange::Occupation { previous, current }, None)
            }
            Mutation::Troops(current) => {
                let previous = cell.troops;
                cell.troops = current;
                let derived = if current == 0 {
                    self.active.remove(&pos);
                    let mut set = vec![Mutation::Occupation(Occupation::Unoccupied)];
                    if cell.attack_target.is_some() {
                        set.push(Mutation::AttackTarget(None));
                    }
                    Some(set)
                } else {
                    self.active.insert(pos);
                    (previous == 0).then(|| vec![Mutation::Occupation(Occupation::Idle)])
                };
                (CellChange::Troops { previous, current }, derived)
            }
            Mutation::Growth(current) => {
                let previous = cell.growth;
                cell.growth = current;
                (CellChange::Growth { previous, current }, None)
            }
            Mutation::Morale(current) => {
                let previous = cell.morale;
                cell.morale = current;
                (CellChange::Morale { previous, current }, None)
            }
            Mutation::AttackTarget(current) => {
                let previous = cell.attack_target;
                cell.attack_target = current;
                (CellChange::AttackTarget { previous, current }, None)
            }
        };
        self.notify(pos, &change);
        Ok(derived)
    }

    fn notify(&mut self, pos: Pos, change: &CellChange) {
        for observer in &mut self.observers {
            observer.cell_changed(pos, change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_3x3() -> World {
        World::new(3, 3).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        changes: Vec<(Pos, CellChange)>,
    }

    impl CellObserver for Recorder {
        fn cell_changed(&mut self, pos: Pos, change: &CellChange) {
            self.changes.push((pos, *change));
        }
    }

    #[test]
    fn test_claiming_unaligned_cell_derives_idle() {
        let mut world = world_3x3();
        let pos = Pos::new(1, 1);
        world.apply(pos, vec![Mutation::Owner(Faction::Red)]).unwrap();

        let cell = world.cell(pos).unwrap();
        assert_eq!(cell.owner, Faction::Red);
        assert_eq!(cell.occupation, Occupation::Idle);
        assert!(!world.is_active(pos), "zero troops stays out of the index");
    }

    #[test]
    fn test_explicit_occupation_suppresses_derivation() {
        let mut world = world_3x3();
        let pos = Pos::new(0, 0);
        world
            .apply(
                pos,
                vec![
                    Mutation::Owner(Faction::Blue),
                    Mutation::Occupation(Occupation::Unoccupied),
                ],
            )
            .unwrap();
        let cell = world.cell(pos).unwrap();
        assert_eq!(cell.occupation, Occupation::Unoccupied);
    }

    #[test]
    fn test_troops_zero_to_positive_activates() {
        let mut world = world_3x3();
        let pos = Pos::new(2, 0);
        world
            .apply(pos, vec![Mutation::Owner(Faction::Red), Mutation::Troops(5)])
            .unwrap();

        let cell = world.cell(pos).unwrap();
        assert_eq!(cell.troops, 5);
        assert_eq!(cell.occupation, Occupation::Idle);
        assert!(world.is_active(pos));
    }

    #[test]
    fn test_zeroing_troops_deactivates_and_unoccupies() {
        let mut world = world_3x3();
        let pos = Pos::new(1, 2);
        world
            .apply(pos, vec![Mutation::Owner(Faction::Blue), Mutation::Troops(8)])
            .unwrap();
        world.apply(pos, vec![Mutation::Troops(0)]).unwrap();

        let cell = world.cell(pos).unwrap();
        assert_eq!(cell.troops, 0);
        assert_eq!(cell.occupation, Occupation::Unoccupied);
        assert_eq!(cell.owner, Faction::Blue, "owner survives zeroing");
        assert!(!world.is_active(pos));
    }

    #[test]
    fn test_zeroing_clears_pending_attack() {
        let mut world = world_3x3();
        let pos = Pos::new(1, 1);
        world
            .apply(pos, vec![Mutation::Owner(Faction::Red), Mutation::Troops(3)])
            .unwrap();
        world
            .apply(pos, vec![Mutation::AttackTarget(Some(Pos::new(1, 0)))])
            .unwrap();
        world.apply(pos, vec![Mutation::Troops(0)]).unwrap();

        let cell = world.cell(pos).unwrap();
        assert_eq!(cell.attack_target, None);
        assert_eq!(cell.occupation, Occupation::Unoccupied);
    }

    #[test]
    fn test_morale_above_bound_rejected_atomically() {
        let mut world = world_3x3();
        let pos = Pos::new(0, 1);
        let err = world
            .apply(pos, vec![Mutation::Troops(4), Mutation::Morale(101)])
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidMutation { .. }));
        // The whole set was rejected, including the leading valid mutation.
        assert_eq!(world.cell(pos).unwrap().troops, 0);
        assert!(!world.is_active(pos));
    }

    #[test]
    fn test_attack_target_must_be_adjacent() {
        let mut world = world_3x3();
        let pos = Pos::new(0, 0);
        let err = world
            .apply(pos, vec![Mutation::AttackTarget(Some(Pos::new(2, 2)))])
            .unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidMutation {
                pos,
                reason: MutationFault::AttackTargetNotAdjacent(Pos::new(2, 2)),
            }
        );

        let err = world
            .apply(pos, vec![Mutation::AttackTarget(Some(pos))])
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidMutation {
                reason: MutationFault::AttackTargetSelf,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_bounds_apply_is_error() {
        let mut world = world_3x3();
        let err = world
            .apply(Pos::new(3, 3), vec![Mutation::Troops(1)])
            .unwrap_err();
        assert!(matches!(err, SimError::OutOfBounds { .. }));
    }

    #[test]
    fn test_observer_sees_cascade_in_commit_order() {
        let mut world = world_3x3();
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        world.add_observer(Box::new(Rc::clone(&recorder)));

        let pos = Pos::new(1, 1);
        world.apply(pos, vec![Mutation::Owner(Faction::Red)]).unwrap();

        let changes = &recorder.borrow().changes;
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            changes[0],
            (
                p,
                CellChange::Owner {
                    previous: Faction::Unaligned,
                    current: Faction::Red,
                }
            ) if p == pos
        ));
        assert!(matches!(
            changes[1],
            (
                _,
                CellChange::Occupation {
                    previous: Occupation::Unoccupied,
                    current: Occupation::Idle,
                }
            )
        ));
    }

    #[test]
    fn test_full_mutation_set_settles_within_bound() {
        let mut world = world_3x3();
        let pos = Pos::new(2, 2);
        world
            .apply(
                pos,
                vec![
                    Mutation::Owner(Faction::Blue),
                    Mutation::Troops(6),
                    Mutation::Growth(2),
                    Mutation::Morale(90),
                    Mutation::AttackTarget(Some(Pos::new(1, 2))),
                ],
            )
            .unwrap();

        let cell = world.cell(pos).unwrap();
        assert_eq!(cell.owner, Faction::Blue);
        assert_eq!(cell.troops, 6);
        assert_eq!(cell.growth, 2);
        assert_eq!(cell.morale, 90);
        assert_eq!(cell.attack_target, Some(Pos::new(1, 2)));
        assert_eq!(cell.occupation, Occupation::Idle);
        assert!(world.is_active(pos));
    }
}
