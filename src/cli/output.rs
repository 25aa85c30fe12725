//! Output formatting utilities for CLI.

use annex::{CellChange, CellObserver, Faction, Pos, Sim};
use serde::Serialize;

/// Per-field counts of committed reconciliation changes.
///
/// Registered as a world observer by the run command; demonstrates the
/// presentation hook without a terminal UI.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct ChangeTally {
    /// Owner assignments.
    pub(super) owner: u64,
    /// Occupation assignments.
    pub(super) occupation: u64,
    /// Troop-count assignments.
    pub(super) troops: u64,
    /// Growth-counter assignments.
    pub(super) growth: u64,
    /// Morale assignments.
    pub(super) morale: u64,
    /// Attack-marker assignments.
    pub(super) attack_target: u64,
}

impl CellObserver for ChangeTally {
    fn cell_changed(&mut self, _pos: Pos, change: &CellChange) {
        match change {
            CellChange::Owner { .. } => self.owner += 1,
            CellChange::Occupation { .. } => self.occupation += 1,
            CellChange::Troops { .. } => self.troops += 1,
            CellChange::Growth { .. } => self.growth += 1,
            CellChange::Morale { .. } => self.morale += 1,
            CellChange::AttackTarget { .. } => self.attack_target += 1,
        }
    }
}

/// JSON-serializable per-faction summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonFactionSummary {
    /// Faction name.
    pub(super) faction: String,
    /// Cells claimed (garrisoned or not).
    pub(super) claimed: u32,
    /// Total troops across claimed cells.
    pub(super) troops: u64,
}

/// JSON-serializable simulation summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimResult {
    /// Random seed used.
    pub(super) seed: u64,
    /// Ticks simulated.
    pub(super) ticks: u64,
    /// Grid width.
    pub(super) width: u16,
    /// Grid height.
    pub(super) height: u16,
    /// Per-faction results.
    pub(super) factions: Vec<JsonFactionSummary>,
    /// Cells currently garrisoned.
    pub(super) active_cells: usize,
    /// Attacks awaiting resolution.
    pub(super) pending_attacks: usize,
    /// Committed reconciliation changes by field.
    pub(super) changes: JsonChangeTally,
}

/// JSON-serializable change tally.
#[derive(Debug, Serialize)]
pub(super) struct JsonChangeTally {
    /// Owner assignments.
    pub(super) owner: u64,
    /// Occupation assignments.
    pub(super) occupation: u64,
    /// Troop-count assignments.
    pub(super) troops: u64,
    /// Growth-counter assignments.
    pub(super) growth: u64,
    /// Morale assignments.
    pub(super) morale: u64,
    /// Attack-marker assignments.
    pub(super) attack_target: u64,
}

impl JsonSimResult {
    /// Build a summary from a finished simulation.
    pub(super) fn from_sim(sim: &Sim, seed: u64, tally: ChangeTally) -> Self {
        let grid = sim.world().grid();
        let factions = [Faction::Red, Faction::Blue]
            .into_iter()
            .map(|f| JsonFactionSummary {
                faction: f.to_string(),
                claimed: grid.claimed_by(f),
                troops: grid.troops_of(f),
            })
            .collect();
        Self {
            seed,
            ticks: sim.ticks(),
            width: grid.width(),
            height: grid.height(),
            factions,
            active_cells: sim.world().active().count(),
            pending_attacks: sim.pending_attack_count(),
            changes: JsonChangeTally {
                owner: tally.owner,
                occupation: tally.occupation,
                troops: tally.troops,
                growth: tally.growth,
                morale: tally.morale,
                attack_target: tally.attack_target,
            },
        }
    }
}

/// Render the grid as ASCII: digits for garrisons (mod 10), lowercase
/// letters for claimed empty cells, dots for unaligned ground.
pub(super) fn render_grid(sim: &Sim) -> String {
    let grid = sim.world().grid();
    let mut out = String::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let ch = grid
                .cell(Pos::new(x, y))
                .map_or('?', |cell| cell_char(cell.owner, cell.troops));
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

fn cell_char(owner: Faction, troops: u32) -> char {
    match (owner, troops) {
        (Faction::Unaligned, _) => '.',
        (Faction::Red, 0) => 'r',
        (Faction::Blue, 0) => 'b',
        (_, n) => char::from_digit(n % 10, 10).unwrap_or('#'),
    }
}

/// Format a finished simulation as human-readable text.
pub(super) fn format_text(sim: &Sim, seed: u64, tally: ChangeTally) -> String {
    let grid = sim.world().grid();
    let mut output = String::new();

    output.push_str(&format!("Simulation (seed: {seed})\n"));
    output.push_str(&format!("  Ticks: {}\n\n", sim.ticks()));
    output.push_str(&render_grid(sim));
    output.push('\n');

    for faction in [Faction::Red, Faction::Blue] {
        output.push_str(&format!(
            "  {faction}: {} cells, {} troops\n",
            grid.claimed_by(faction),
            grid.troops_of(faction)
        ));
    }
    output.push_str(&format!(
        "  Active cells: {}  Pending attacks: {}\n",
        sim.world().active().count(),
        sim.pending_attack_count()
    ));
    output.push_str(&format!(
        "  Changes: {} owner, {} occupation, {} troops, {} growth, {} attack\n",
        tally.owner, tally.occupation, tally.troops, tally.growth, tally.attack_target
    ));

    output
}

/// Aggregated statistics over a batch of simulations.
#[derive(Debug, Clone, Copy)]
pub(super) struct BatchStats {
    /// Simulations completed.
    pub(super) sims_run: u64,
    /// Simulations where red ended with more claimed cells.
    pub(super) red_wins: u64,
    /// Simulations where blue ended with more claimed cells.
    pub(super) blue_wins: u64,
    /// Simulations ending with equal claims.
    pub(super) draws: u64,
    /// Simulations that failed with a simulation error.
    pub(super) failures: u64,
    /// Total invariant violations observed across all end states.
    pub(super) violations: u64,
    /// Total troops on the board at the end, both factions.
    pub(super) total_troops: u64,
}

impl BatchStats {
    /// Empty accumulator.
    pub(super) const fn new() -> Self {
        Self {
            sims_run: 0,
            red_wins: 0,
            blue_wins: 0,
            draws: 0,
            failures: 0,
            violations: 0,
            total_troops: 0,
        }
    }

    /// Fold one finished simulation into the accumulator.
    pub(super) fn add_sim(&mut self, sim: &Sim, violations: usize) {
        let grid = sim.world().grid();
        self.sims_run += 1;
        self.violations += violations as u64;
        self.total_troops += grid.troops_of(Faction::Red) + grid.troops_of(Faction::Blue);
        let red = grid.claimed_by(Faction::Red);
        let blue = grid.claimed_by(Faction::Blue);
        match red.cmp(&blue) {
            std::cmp::Ordering::Greater => self.red_wins += 1,
            std::cmp::Ordering::Less => self.blue_wins += 1,
            std::cmp::Ordering::Equal => self.draws += 1,
        }
    }

    /// Merge a peer accumulator (parallel reduce).
    pub(super) fn merge(&mut self, other: &BatchStats) {
        self.sims_run += other.sims_run;
        self.red_wins += other.red_wins;
        self.blue_wins += other.blue_wins;
        self.draws += other.draws;
        self.failures += other.failures;
        self.violations += other.violations;
        self.total_troops += other.total_troops;
    }
}

/// JSON-serializable batch result.
#[derive(Debug, Serialize)]
pub(super) struct JsonBatchResult {
    /// Starting seed.
    pub(super) base_seed: u64,
    /// Simulations completed.
    pub(super) sims_run: u64,
    /// Red victories by claimed cells.
    pub(super) red_wins: u64,
    /// Blue victories by claimed cells.
    pub(super) blue_wins: u64,
    /// Equal-claim endings.
    pub(super) draws: u64,
    /// Simulations that errored out.
    pub(super) failures: u64,
    /// Invariant violations across all end states.
    pub(super) violations: u64,
    /// Mean troops on the board at the end.
    pub(super) mean_troops: f64,
}

impl JsonBatchResult {
    /// Build from an accumulated batch.
    pub(super) fn from_stats(stats: &BatchStats, base_seed: u64) -> Self {
        Self {
            base_seed,
            sims_run: stats.sims_run,
            red_wins: stats.red_wins,
            blue_wins: stats.blue_wins,
            draws: stats.draws,
            failures: stats.failures,
            violations: stats.violations,
            #[allow(clippy::cast_precision_loss)]
            mean_troops: if stats.sims_run == 0 {
                0.0
            } else {
                stats.total_troops as f64 / stats.sims_run as f64
            },
        }
    }
}

/// Format batch statistics as human-readable text.
pub(super) fn format_batch_text(stats: &BatchStats, base_seed: u64, elapsed_secs: f64) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Batch complete: {} sims (base seed {base_seed}) in {elapsed_secs:.1}s\n",
        stats.sims_run
    ));
    output.push_str(&format!(
        "  Red wins: {}  Blue wins: {}  Draws: {}\n",
        stats.red_wins, stats.blue_wins, stats.draws
    ));
    #[allow(clippy::cast_precision_loss)]
    let mean = if stats.sims_run == 0 {
        0.0
    } else {
        stats.total_troops as f64 / stats.sims_run as f64
    };
    output.push_str(&format!("  Mean end-state troops: {mean:.1}\n"));
    output.push_str(&format!(
        "  Failures: {}  Invariant violations: {}\n",
        stats.failures, stats.violations
    ));
    output
}

/// Format batch statistics as CSV.
pub(super) fn format_batch_csv(stats: &BatchStats, base_seed: u64) -> String {
    let mut output = String::new();
    output.push_str("base_seed,sims_run,red_wins,blue_wins,draws,failures,violations,total_troops\n");
    output.push_str(&format!(
        "{},{},{},{},{},{},{},{}\n",
        base_seed,
        stats.sims_run,
        stats.red_wins,
        stats.blue_wins,
        stats.draws,
        stats.failures,
        stats.violations,
        stats.total_troops
    ));
    output
}
