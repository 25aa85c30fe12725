//! Randomized command stream for headless and batch runs.
//!
//! Drives both factions with seeded random attack/split commands so mass
//! runs exercise the full command surface. This is a stress harness, not an
//! opponent: commands are drawn blind, outcomes are ignored.

use annex::{Faction, Pos, Rng, Sim, SimResult};

/// Chance denominator for issuing a command per faction per tick.
const COMMAND_CHANCE: u32 = 4;

/// Issue up to one random command per faction, then advance one tick.
pub(crate) fn skirmish_step(sim: &mut Sim, rng: &mut Rng) -> SimResult<()> {
    for faction in [Faction::Red, Faction::Blue] {
        if rng.next_u32(COMMAND_CHANCE) == 0 {
            random_command(sim, rng, faction)?;
        }
    }
    sim.step()
}

/// Pick a random garrisoned cell of `faction` and hit a random neighbor.
fn random_command(sim: &mut Sim, rng: &mut Rng, faction: Faction) -> SimResult<()> {
    let sources: Vec<Pos> = sim
        .world()
        .active()
        .filter(|&pos| sim.cell(pos).is_ok_and(|c| c.owner == faction))
        .collect();
    if sources.is_empty() {
        return Ok(());
    }

    #[allow(clippy::cast_possible_truncation)]
    let from = sources[rng.next_u32(sources.len() as u32) as usize];
    let Some(to) = random_neighbor(sim, rng, from) else {
        return Ok(());
    };

    if rng.next_u32(2) == 0 {
        sim.attack_between(from, to)?;
    } else {
        sim.split_between(from, to)?;
    }
    Ok(())
}

fn random_neighbor(sim: &Sim, rng: &mut Rng, from: Pos) -> Option<Pos> {
    // A handful of draws is plenty; a cell on the rim simply skips its turn
    // more often.
    for _ in 0..4 {
        let dx = i32::from(rng.next_u16(3)) - 1;
        let dy = i32::from(rng.next_u16(3)) - 1;
        let x = i32::from(from.x) + dx;
        let y = i32::from(from.y) + dy;
        if x < 0 || y < 0 || (dx == 0 && dy == 0) {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to = Pos::new(x as u16, y as u16);
        if sim.world().grid().in_bounds(to) {
            return Some(to);
        }
    }
    None
}
