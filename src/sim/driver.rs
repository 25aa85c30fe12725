//! Tick driver and command layer.
//!
//! [`Sim`] is the explicit simulation context: it owns the world, the event
//! queue, the pending-attack table, the selection, and the pause flag. It is
//! the only source of time advancement; a `step()` never overlaps with
//! command handling.

use std::collections::BTreeMap;

use crate::error::SimResult;
use crate::sim::{
    Cell, CellObserver, EventHandle, Faction, Mutation, Occupation, Pos, Rng, TickQueue, World,
};

/// Ticks of accrued growth before a cell raises one troop.
pub const GROWTH_THRESHOLD: u32 = 4;

/// Delay between marking an attack and resolving it.
pub const ATTACK_RESOLVE_TICKS: u32 = 3;

/// Garrison granted to each faction's starting cell.
pub const STARTING_TROOPS: u32 = 10;

/// Delayed action fired by the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Resolve the pending attack from `from` against `to`.
    ResolveAttack {
        /// Attacking cell.
        from: Pos,
        /// Defending cell.
        to: Pos,
    },
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Troops merged into an allied cell.
    Merged {
        /// Troops transferred.
        moved: u32,
    },
    /// An undefended cell was captured outright.
    Captured {
        /// Troops transferred.
        moved: u32,
    },
    /// The attack was marked and its resolution scheduled.
    AttackPending,
    /// Troops split onto an unowned or allied cell.
    Split {
        /// Troops transferred.
        moved: u32,
    },
    /// The command did not apply (no selection, not adjacent, empty source,
    /// or ineligible target) and changed nothing.
    Ignored,
}

/// The simulation context and tick driver.
#[derive(Debug)]
pub struct Sim {
    world: World,
    queue: TickQueue<ScheduledAction>,
    /// One pending attack per source cell; the handle cancels the scheduled
    /// resolution when the attack is called off.
    pending_attacks: BTreeMap<Pos, EventHandle>,
    selected: Option<Pos>,
    paused: bool,
    ticks: u64,
}

impl Sim {
    /// Create a simulation over a fresh grid.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::EmptyGrid`] if either dimension is zero.
    pub fn new(width: u16, height: u16) -> SimResult<Self> {
        Ok(Self {
            world: World::new(width, height)?,
            queue: TickQueue::new(),
            pending_attacks: BTreeMap::new(),
            selected: None,
            paused: false,
            ticks: 0,
        })
    }

    /// The world, read-only.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Look up a cell.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::OutOfBounds`] outside the grid.
    pub fn cell(&self, pos: Pos) -> SimResult<&Cell> {
        self.world.cell(pos)
    }

    /// Register a presentation observer on the world.
    pub fn add_observer(&mut self, observer: Box<dyn CellObserver>) {
        self.world.add_observer(observer);
    }

    /// Ticks elapsed since construction (paused ticks are not counted).
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the driver is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the pause flag. Paused ticks are skipped outright, never queued.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Currently selected cell, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<Pos> {
        self.selected
    }

    /// Select a cell as the source for subsequent commands.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::OutOfBounds`] outside the grid; the
    /// previous selection is kept.
    pub fn select(&mut self, pos: Pos) -> SimResult<()> {
        self.world.cell(pos)?;
        self.selected = Some(pos);
        Ok(())
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Number of attacks awaiting resolution.
    #[must_use]
    pub fn pending_attack_count(&self) -> usize {
        self.pending_attacks.len()
    }

    /// Remaining ticks until the soonest scheduled event fires.
    #[must_use]
    pub fn next_event_in(&self) -> Option<i32> {
        self.queue.peek_next()
    }

    pub(crate) fn queue(&self) -> &TickQueue<ScheduledAction> {
        &self.queue
    }

    pub(crate) fn pending_attacks(&self) -> &BTreeMap<Pos, EventHandle> {
        &self.pending_attacks
    }

    /// Apply a mutation-set through the reconciliation engine.
    ///
    /// This is the sanctioned mutation entry point: it keeps the
    /// pending-attack table in step when a mutation clears a cell's attack
    /// marker (zeroed troops cancel the scheduled resolution).
    ///
    /// # Errors
    ///
    /// Propagates reconciliation errors; see [`World::apply`].
    pub fn apply(&mut self, pos: Pos, mutations: Vec<Mutation>) -> SimResult<()> {
        self.world.apply(pos, mutations)?;
        if let Some(handle) = self.pending_attacks.get(&pos).copied()
            && self.world.cell(pos)?.attack_target.is_none()
        {
            self.queue.cancel(handle);
            self.pending_attacks.remove(&pos);
        }
        Ok(())
    }

    /// Claim two distinct unaligned cells as faction starts.
    ///
    /// Rejection sampling on uniform draws, as many rounds as it takes;
    /// each chosen cell receives `{Owner, Troops(STARTING_TROOPS)}`.
    /// Returns the red and blue starting positions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::NoUnalignedCell`] if the grid has no
    /// unaligned cell left to claim.
    pub fn seed_factions(&mut self, rng: &mut Rng) -> SimResult<(Pos, Pos)> {
        let red = self.random_unaligned(rng)?;
        self.apply(
            red,
            vec![
                Mutation::Owner(Faction::Red),
                Mutation::Troops(STARTING_TROOPS),
            ],
        )?;
        let blue = self.random_unaligned(rng)?;
        self.apply(
            blue,
            vec![
                Mutation::Owner(Faction::Blue),
                Mutation::Troops(STARTING_TROOPS),
            ],
        )?;
        Ok((red, blue))
    }

    fn random_unaligned(&self, rng: &mut Rng) -> SimResult<Pos> {
        let grid = self.world.grid();
        if !grid.iter().any(|(_, c)| c.owner == Faction::Unaligned) {
            return Err(crate::SimError::NoUnalignedCell);
        }
        loop {
            let pos = Pos::new(
                rng.next_u16(grid.width()),
                rng.next_u16(grid.height()),
            );
            if self.world.cell(pos)?.owner == Faction::Unaligned {
                return Ok(pos);
            }
        }
    }

    /// Advance the simulation by one tick.
    ///
    /// Fires due scheduled events in ascending remaining-tick order, then
    /// runs the growth rule over the active index. A paused driver does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Propagates reconciliation errors from fired actions or growth.
    pub fn step(&mut self) -> SimResult<()> {
        if self.paused {
            return Ok(());
        }
        self.ticks += 1;

        for action in self.queue.tick() {
            match action {
                ScheduledAction::ResolveAttack { from, to } => {
                    self.resolve_attack(from, to)?;
                }
            }
        }

        let due: Vec<Pos> = self.world.active().collect();
        for pos in due {
            let cell = *self.world.cell(pos)?;
            if cell.occupation != Occupation::Idle {
                continue;
            }
            let accrued = cell.growth + 1;
            if accrued >= GROWTH_THRESHOLD {
                self.apply(
                    pos,
                    vec![
                        Mutation::Growth(0),
                        Mutation::Troops(cell.troops.saturating_add(1)),
                    ],
                )?;
            } else {
                self.apply(pos, vec![Mutation::Growth(accrued)])?;
            }
        }
        Ok(())
    }

    /// Attack from the selected cell onto `target`.
    ///
    /// # Errors
    ///
    /// Propagates reconciliation errors; see [`Sim::attack_between`].
    pub fn attack(&mut self, target: Pos) -> SimResult<CommandOutcome> {
        match self.selected {
            Some(from) => self.attack_between(from, target),
            None => Ok(CommandOutcome::Ignored),
        }
    }

    /// Split from the selected cell onto `target`.
    ///
    /// # Errors
    ///
    /// Propagates reconciliation errors; see [`Sim::split_between`].
    pub fn split(&mut self, target: Pos) -> SimResult<CommandOutcome> {
        match self.selected {
            Some(from) => self.split_between(from, target),
            None => Ok(CommandOutcome::Ignored),
        }
    }

    /// Attack an adjacent cell.
    ///
    /// Same owner merges, an undefended target is captured outright, and a
    /// defended enemy cell gets an attack marker plus a resolution scheduled
    /// [`ATTACK_RESOLVE_TICKS`] out. Re-attacking from the same source first
    /// cancels the prior pending resolution. Non-adjacent pairs are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::OutOfBounds`] if either position is
    /// outside the grid; propagates reconciliation errors.
    pub fn attack_between(&mut self, from: Pos, to: Pos) -> SimResult<CommandOutcome> {
        let source = *self.world.cell(from)?;
        let target = *self.world.cell(to)?;

        if !from.is_adjacent(to) || source.troops == 0 || !source.owner.is_aligned() {
            return Ok(CommandOutcome::Ignored);
        }

        if target.owner == source.owner {
            self.apply(
                to,
                vec![Mutation::Troops(target.troops.saturating_add(source.troops))],
            )?;
            self.apply(from, vec![Mutation::Troops(0)])?;
            return Ok(CommandOutcome::Merged {
                moved: source.troops,
            });
        }

        if !target.owner.is_aligned() || target.troops == 0 {
            self.apply(
                to,
                vec![
                    Mutation::Owner(source.owner),
                    Mutation::Troops(source.troops),
                ],
            )?;
            self.apply(from, vec![Mutation::Troops(0)])?;
            return Ok(CommandOutcome::Captured {
                moved: source.troops,
            });
        }

        if let Some(handle) = self.pending_attacks.remove(&from) {
            self.queue.cancel(handle);
        }
        self.apply(from, vec![Mutation::AttackTarget(Some(to))])?;
        let handle = self
            .queue
            .schedule(ATTACK_RESOLVE_TICKS, ScheduledAction::ResolveAttack { from, to });
        self.pending_attacks.insert(from, handle);
        Ok(CommandOutcome::AttackPending)
    }

    /// Split troops onto an adjacent unowned or allied cell.
    ///
    /// Moves `ceil(troops / 2)`; the source keeps the remainder. An unowned
    /// target takes the source's owner. Ignored for enemy targets or
    /// non-adjacent pairs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::OutOfBounds`] if either position is
    /// outside the grid; propagates reconciliation errors.
    pub fn split_between(&mut self, from: Pos, to: Pos) -> SimResult<CommandOutcome> {
        let source = *self.world.cell(from)?;
        let target = *self.world.cell(to)?;

        if !from.is_adjacent(to) || source.troops == 0 || !source.owner.is_aligned() {
            return Ok(CommandOutcome::Ignored);
        }
        if target.owner.is_aligned() && target.owner != source.owner {
            return Ok(CommandOutcome::Ignored);
        }

        let moved = source.troops.div_ceil(2);
        let remainder = source.troops - moved;

        if target.owner == source.owner {
            self.apply(
                to,
                vec![Mutation::Troops(target.troops.saturating_add(moved))],
            )?;
        } else {
            self.apply(
                to,
                vec![Mutation::Owner(source.owner), Mutation::Troops(moved)],
            )?;
        }
        self.apply(from, vec![Mutation::Troops(remainder)])?;
        Ok(CommandOutcome::Split { moved })
    }

    /// Resolve a fired attack with the subtraction model.
    ///
    /// The defender fights at `troops + troops / 4`. A source that was
    /// zeroed, captured, or retargeted since scheduling fizzles. The source
    /// commits its full garrison and ends empty in every outcome.
    fn resolve_attack(&mut self, from: Pos, to: Pos) -> SimResult<()> {
        self.pending_attacks.remove(&from);
        let source = *self.world.cell(from)?;

        if source.troops == 0 || !source.owner.is_aligned() || source.attack_target != Some(to) {
            if source.attack_target.is_some() {
                self.apply(from, vec![Mutation::AttackTarget(None)])?;
            }
            return Ok(());
        }

        let target = *self.world.cell(to)?;
        if target.owner == source.owner {
            // Target turned friendly while the attack was in flight.
            self.apply(
                to,
                vec![Mutation::Troops(target.troops.saturating_add(source.troops))],
            )?;
            self.apply(from, vec![Mutation::Troops(0)])?;
            return Ok(());
        }

        let attackers = source.troops;
        let effective_defense = target.troops.saturating_add(target.troops / 4);
        if attackers > effective_defense {
            self.apply(
                to,
                vec![
                    Mutation::Owner(source.owner),
                    Mutation::Troops(attackers - effective_defense),
                ],
            )?;
        } else {
            // Defender holds, losing only real troops.
            self.apply(
                to,
                vec![Mutation::Troops(target.troops.saturating_sub(attackers))],
            )?;
        }
        self.apply(from, vec![Mutation::Troops(0)])?;
        Ok(())
    }
}
