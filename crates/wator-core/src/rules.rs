//! Rule 1–4: the per-cell update rules (movement, feeding, reproduction,
//! death). Pure with respect to the region of the grid they touch; never
//! panics or aborts on bad input, returning [`RulesError`] instead (§4.1,
//! §7: "the rules never abort the process — they are a library").

use crate::error::RulesError;
use crate::planet::{Cell, CellState, Params, Planet};
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};

/// Grid position, row-major.
pub type Pos = (usize, usize);

/// The four toroidal directions, inspected in this fixed `UP, RIGHT,
/// DOWN, LEFT` order everywhere a rule scans neighbours. Rule 1/3 pick
/// uniformly at random among whichever of these turn out eligible (so the
/// order only fixes *which candidate a given RNG draw lands on*, not a
/// preference); rule 2/4's birth scan has no randomness and returns the
/// first eligible neighbour in this order — see design note (b).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Up,
    Down,
    Left,
    Right,
}

const SCAN_ORDER: [Motion; 4] = [Motion::Up, Motion::Right, Motion::Down, Motion::Left];
const INSPECT_ORDER: [Motion; 4] = SCAN_ORDER;

/// Advisory population counters, updated alongside the grid by the rules
/// that cause a birth or a death. Derived state (the grid is authoritative)
/// but kept live so `fish_count`/`shark_count` don't require a full scan
/// every chronon.
#[derive(Debug, Default)]
pub struct Counts {
    fish: AtomicI64,
    shark: AtomicI64,
}

impl Counts {
    pub fn new(fish: i64, shark: i64) -> Counts {
        Counts {
            fish: AtomicI64::new(fish),
            shark: AtomicI64::new(shark),
        }
    }

    pub fn fish(&self) -> i64 {
        self.fish.load(Ordering::Relaxed)
    }

    pub fn shark(&self) -> i64 {
        self.shark.load(Ordering::Relaxed)
    }

    fn fish_delta(&self, delta: i64) {
        self.fish.fetch_add(delta, Ordering::Relaxed);
    }

    fn shark_delta(&self, delta: i64) {
        self.shark.fetch_add(delta, Ordering::Relaxed);
    }
}

/// Outcome of rule 1 (shark) or rule 3 (fish): a fish never eats, so its
/// rule 3 call never returns `Ate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Stop,
    Moved(Pos),
    Ate(Pos),
}

/// Outcome of rule 2's fasting/death half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeOutcome {
    Alive,
    Dead,
}

#[inline]
fn in_bounds(planet: &Planet, pos: Pos) -> Result<(), RulesError> {
    if pos.0 >= planet.nrow() || pos.1 >= planet.ncol() {
        return Err(RulesError::OutOfBounds {
            row: pos.0,
            col: pos.1,
        });
    }
    Ok(())
}

/// Toroidal neighbour of `(row, col)` in direction `m`.
pub fn neighbor_cell(planet: &Planet, row: usize, col: usize, m: Motion) -> Result<Pos, RulesError> {
    in_bounds(planet, (row, col))?;
    let (row, col) = (row as isize, col as isize);
    Ok(match m {
        Motion::Up => (planet.wrap_row(row - 1), col as usize),
        Motion::Down => (planet.wrap_row(row + 1), col as usize),
        Motion::Left => (row as usize, planet.wrap_col(col - 1)),
        Motion::Right => (row as usize, planet.wrap_col(col + 1)),
    })
}

/// Move a fish or shark from `from` to `to`, carrying its counters. Pre:
/// `to` is `Water`. No-op (matching the original) if `to` isn't water.
pub fn move_cell(planet: &Planet, from: Pos, to: Pos) {
    if planet.get(to.0, to.1).kind != Cell::Water {
        return;
    }
    let who = planet.get(from.0, from.1);
    if who.kind == Cell::Water {
        return;
    }
    planet.set(to.0, to.1, who);
    planet.set(from.0, from.1, CellState::default());
}

/// Rule 1: shark movement/feeding.
pub fn shark_rule1(
    planet: &Planet,
    counts: &Counts,
    row: usize,
    col: usize,
    rng: &mut impl Rng,
) -> Result<MoveOutcome, RulesError> {
    let here = planet.get(row, col);
    if here.kind != Cell::Shark {
        return Err(RulesError::NotAnimal { row, col });
    }

    let mut water_cells = Vec::with_capacity(4);
    for &m in &SCAN_ORDER {
        let dest = neighbor_cell(planet, row, col, m)?;
        match planet.get(dest.0, dest.1).kind {
            Cell::Fish => {
                planet.set(dest.0, dest.1, CellState::default());
                let mut shark = here;
                shark.dtime = 0;
                planet.set(row, col, CellState::default());
                planet.set(dest.0, dest.1, shark);
                counts.fish_delta(-1);
                return Ok(MoveOutcome::Ate(dest));
            }
            Cell::Water => water_cells.push(dest),
            Cell::Shark => {}
        }
    }

    if water_cells.is_empty() {
        return Ok(MoveOutcome::Stop);
    }
    let dest = water_cells[rng.gen_range(0..water_cells.len())];
    move_cell(planet, (row, col), dest);
    Ok(MoveOutcome::Moved(dest))
}

/// Rule 2: shark reproduction/death. Birth scan order is fixed
/// (UP, RIGHT, DOWN, LEFT), not random — this is the documented asymmetry
/// with rule 1.
pub fn shark_rule2(
    planet: &Planet,
    counts: &Counts,
    params: &Params,
    row: usize,
    col: usize,
) -> Result<(LifeOutcome, Option<Pos>), RulesError> {
    let mut here = planet.get(row, col);
    if here.kind != Cell::Shark {
        return Err(RulesError::NotAnimal { row, col });
    }

    let mut newborn = None;
    if here.btime < params.sb {
        here.btime += 1;
    } else {
        here.btime = 0;
        for &m in &INSPECT_ORDER {
            let dest = neighbor_cell(planet, row, col, m)?;
            if planet.get(dest.0, dest.1).kind == Cell::Water {
                planet.set(
                    dest.0,
                    dest.1,
                    CellState {
                        kind: Cell::Shark,
                        btime: 0,
                        dtime: 0,
                    },
                );
                counts.shark_delta(1);
                newborn = Some(dest);
                break;
            }
        }
    }

    let outcome = if here.dtime < params.sd {
        here.dtime += 1;
        planet.set(row, col, here);
        LifeOutcome::Alive
    } else {
        planet.set(row, col, CellState::default());
        counts.shark_delta(-1);
        LifeOutcome::Dead
    };
    Ok((outcome, newborn))
}

/// Rule 3: fish movement. Fish never eat, so `Ate` is never returned.
pub fn fish_rule3(
    planet: &Planet,
    row: usize,
    col: usize,
    rng: &mut impl Rng,
) -> Result<MoveOutcome, RulesError> {
    let here = planet.get(row, col);
    if here.kind != Cell::Fish {
        return Err(RulesError::NotAnimal { row, col });
    }

    let mut water_cells = Vec::with_capacity(4);
    for &m in &SCAN_ORDER {
        let dest = neighbor_cell(planet, row, col, m)?;
        if planet.get(dest.0, dest.1).kind == Cell::Water {
            water_cells.push(dest);
        }
    }

    if water_cells.is_empty() {
        return Ok(MoveOutcome::Stop);
    }
    let dest = water_cells[rng.gen_range(0..water_cells.len())];
    move_cell(planet, (row, col), dest);
    Ok(MoveOutcome::Moved(dest))
}

/// Rule 4: fish reproduction. Symmetric to rule 2's birth half, no death.
pub fn fish_rule4(
    planet: &Planet,
    counts: &Counts,
    params: &Params,
    row: usize,
    col: usize,
) -> Result<Option<Pos>, RulesError> {
    let mut here = planet.get(row, col);
    if here.kind != Cell::Fish {
        return Err(RulesError::NotAnimal { row, col });
    }

    let mut newborn = None;
    if here.btime < params.fb {
        here.btime += 1;
        planet.set(row, col, here);
    } else {
        here.btime = 0;
        planet.set(row, col, here);
        for &m in &INSPECT_ORDER {
            let dest = neighbor_cell(planet, row, col, m)?;
            if planet.get(dest.0, dest.1).kind == Cell::Water {
                planet.set(
                    dest.0,
                    dest.1,
                    CellState {
                        kind: Cell::Fish,
                        btime: 0,
                        dtime: 0,
                    },
                );
                counts.fish_delta(1);
                newborn = Some(dest);
                break;
            }
        }
    }
    Ok(newborn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn params(sd: u32, sb: u32, fb: u32) -> Params {
        Params {
            sd,
            sb,
            fb,
            chron_interval: 1,
            chron_delay_us: 0,
            total_workers: 1,
        }
    }

    #[test]
    fn shark_eats_adjacent_fish() {
        let planet = Planet::new(5, 5).unwrap();
        planet.set(
            2,
            2,
            CellState {
                kind: Cell::Shark,
                btime: 0,
                dtime: 0,
            },
        );
        planet.set(
            2,
            3,
            CellState {
                kind: Cell::Fish,
                btime: 0,
                dtime: 0,
            },
        );
        let counts = Counts::new(1, 1);
        let outcome = shark_rule1(&planet, &counts, 2, 2, &mut rng()).unwrap();
        assert_eq!(outcome, MoveOutcome::Ate((2, 3)));
        assert_eq!(planet.get(2, 2).kind, Cell::Water);
        assert_eq!(planet.get(2, 3).kind, Cell::Shark);
        assert_eq!(planet.get(2, 3).dtime, 0);
        assert_eq!(counts.fish(), 0);
        assert_eq!(counts.shark(), 1);

        let (life, newborn) = shark_rule2(&planet, &counts, &params(5, 5, 5), 2, 3).unwrap();
        assert_eq!(life, LifeOutcome::Alive);
        assert!(newborn.is_none());
        assert_eq!(planet.get(2, 3).dtime, 1);
        assert_eq!(planet.get(2, 3).btime, 1);
    }

    #[test]
    fn shark_stop_when_surrounded_by_sharks() {
        let planet = Planet::new(5, 5).unwrap();
        let shark = CellState {
            kind: Cell::Shark,
            btime: 0,
            dtime: 0,
        };
        for (r, c) in [(0, 0), (4, 0), (1, 0), (0, 4), (0, 1)] {
            planet.set(r, c, shark);
        }
        let counts = Counts::new(0, 5);
        let outcome = shark_rule1(&planet, &counts, 0, 0, &mut rng()).unwrap();
        assert_eq!(outcome, MoveOutcome::Stop);
    }

    #[test]
    fn shark_starves_after_sd_chronons() {
        let planet = Planet::new(5, 5).unwrap();
        planet.set(
            2,
            2,
            CellState {
                kind: Cell::Shark,
                btime: 0,
                dtime: 0,
            },
        );
        let counts = Counts::new(0, 1);
        let p = params(2, 99, 99);
        let (l1, _) = shark_rule2(&planet, &counts, &p, 2, 2).unwrap();
        assert_eq!(l1, LifeOutcome::Alive);
        let (l2, _) = shark_rule2(&planet, &counts, &p, 2, 2).unwrap();
        assert_eq!(l2, LifeOutcome::Dead);
        assert_eq!(planet.get(2, 2).kind, Cell::Water);
        assert_eq!(counts.shark(), 0);
    }

    #[test]
    fn fish_reproduces_with_btime_reset() {
        let planet = Planet::new(5, 5).unwrap();
        planet.set(
            2,
            2,
            CellState {
                kind: Cell::Fish,
                btime: 3,
                dtime: 0,
            },
        );
        let counts = Counts::new(1, 0);
        let newborn = fish_rule4(&planet, &counts, &params(5, 5, 3), 2, 2).unwrap();
        assert!(newborn.is_some());
        assert_eq!(planet.get(2, 2).btime, 0);
        let (nr, nc) = newborn.unwrap();
        assert_eq!(planet.get(nr, nc).kind, Cell::Fish);
        assert_eq!(planet.get(nr, nc).btime, 0);
        assert_eq!(counts.fish(), 2);
    }

    #[test]
    fn toroidal_wrap_movement() {
        let planet = Planet::new(5, 5).unwrap();
        planet.set(
            0,
            0,
            CellState {
                kind: Cell::Shark,
                btime: 0,
                dtime: 0,
            },
        );
        // Surround (0,0) with sharks except the toroidal neighbour (4,0).
        let shark = CellState {
            kind: Cell::Shark,
            btime: 0,
            dtime: 0,
        };
        planet.set(0, 1, shark); // RIGHT
        planet.set(1, 0, shark); // DOWN
        // (4, 0) is UP (wraps), left at Water
        let _ = planet.get(0, 4); // LEFT is Water by default, but we want only (4,0) water
        planet.set(0, 4, shark); // LEFT occupied too
        let counts = Counts::new(0, 4);
        let outcome = shark_rule1(&planet, &counts, 0, 0, &mut rng()).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved((4, 0)));
        assert_eq!(planet.get(4, 0).kind, Cell::Shark);
        assert_eq!(planet.get(0, 0).kind, Cell::Water);
    }

    #[test]
    fn out_of_bounds_returns_sentinel_error() {
        let planet = Planet::new(5, 5).unwrap();
        let err = neighbor_cell(&planet, 10, 10, Motion::Up).unwrap_err();
        assert_eq!(
            err,
            RulesError::OutOfBounds { row: 10, col: 10 }
        );
    }
}
