//! Rectangles, the skip-map, and the per-rectangle chronon sweep (§4.2).
//!
//! A [`Rectangle`] names a region of the planet; [`sweep`] is the only
//! place rule 1/2/3/4 get invoked together, in the exact order the design
//! notes require: rule 1 (or 3), mark the post-rule-1 cell in the
//! skip-map *unconditionally* — including `Stop`, where that cell is the
//! animal's own position — then rule 2 (or 4) at that location, marking
//! any newborn too. Marking on `Stop` matters because batch 2 and batch 3
//! deliberately overlap at the right-edge seam (§4.4); an animal that
//! stops in that overlap must not be picked up by rule 1/2 twice in the
//! same chronon. A worker thread runs `sweep` once per rectangle per
//! batch; the partitioner is responsible for handing out rectangles that
//! never overlap within a batch.

use crate::planet::{Cell, Params, Planet};
use crate::rules::{self, Counts, LifeOutcome, MoveOutcome};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};

/// An axis-aligned region of the planet, `rows` tall and `cols` wide,
/// with its top-left corner at `(from_row, from_col)`. Does not wrap;
/// the partitioner never emits a rectangle that needs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub from_row: usize,
    pub from_col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Rectangle {
    pub fn new(from_row: usize, from_col: usize, rows: usize, cols: usize) -> Rectangle {
        Rectangle {
            from_row,
            from_col,
            rows,
            cols,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.from_row..self.from_row + self.rows)
            .flat_map(move |r| (self.from_col..self.from_col + self.cols).map(move |c| (r, c)))
    }
}

/// One boolean per planet cell, reset to all-`false` by the controller at
/// the start of every chronon (§4.2: "an animal that has already moved or
/// been born this chronon is not updated again"). Plain `AtomicBool`s
/// rather than a `Mutex<Vec<bool>>`: writes from concurrent workers only
/// ever target disjoint cells, same discipline as [`Planet`].
pub struct SkipMap {
    ncol: usize,
    flags: Box<[AtomicBool]>,
}

unsafe impl Sync for SkipMap {}

impl SkipMap {
    pub fn new(nrow: usize, ncol: usize) -> SkipMap {
        let flags = (0..nrow * ncol).map(|_| AtomicBool::new(false)).collect();
        SkipMap { ncol, flags }
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.ncol + col
    }

    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.flags[self.index(row, col)].load(Ordering::Relaxed)
    }

    pub fn mark(&self, row: usize, col: usize) {
        self.flags[self.index(row, col)].store(true, Ordering::Relaxed);
    }

    /// Reset every flag to unmarked. Only safe between chronons, when no
    /// worker is touching the map.
    pub fn reset(&self) {
        for flag in self.flags.iter() {
            flag.store(false, Ordering::Relaxed);
        }
    }
}

/// Apply rules 1–4 to every live cell of `rect`, in row-major order,
/// skipping cells already marked in `skip` (an animal this sweep already
/// moved or birthed into). Uses `rng` for the random tie-break in rules
/// 1/3.
pub fn sweep(
    planet: &Planet,
    skip: &SkipMap,
    counts: &Counts,
    params: &Params,
    rect: &Rectangle,
    rng: &mut impl Rng,
) {
    for (row, col) in rect.cells() {
        if skip.is_marked(row, col) {
            continue;
        }
        match planet.get(row, col).kind {
            Cell::Water => continue,
            Cell::Shark => sweep_shark(planet, skip, counts, params, row, col, rng),
            Cell::Fish => sweep_fish(planet, skip, counts, params, row, col, rng),
        }
    }
}

fn sweep_shark(
    planet: &Planet,
    skip: &SkipMap,
    counts: &Counts,
    params: &Params,
    row: usize,
    col: usize,
    rng: &mut impl Rng,
) {
    let (row, col) = match rules::shark_rule1(planet, counts, row, col, rng) {
        Ok(MoveOutcome::Stop) => (row, col),
        Ok(MoveOutcome::Moved((r, c))) | Ok(MoveOutcome::Ate((r, c))) => (r, c),
        Err(_) => return,
    };
    skip.mark(row, col);

    match rules::shark_rule2(planet, counts, params, row, col) {
        Ok((LifeOutcome::Dead, _)) => {}
        Ok((LifeOutcome::Alive, Some((nr, nc)))) => skip.mark(nr, nc),
        Ok((LifeOutcome::Alive, None)) => {}
        Err(_) => {}
    }
}

fn sweep_fish(
    planet: &Planet,
    skip: &SkipMap,
    counts: &Counts,
    params: &Params,
    row: usize,
    col: usize,
    rng: &mut impl Rng,
) {
    let (row, col) = match rules::fish_rule3(planet, row, col, rng) {
        Ok(MoveOutcome::Stop) => (row, col),
        Ok(MoveOutcome::Moved((r, c))) => (r, c),
        Ok(MoveOutcome::Ate(_)) => unreachable!("fish never eat"),
        Err(_) => return,
    };
    skip.mark(row, col);

    if let Ok(Some((nr, nc))) = rules::fish_rule4(planet, counts, params, row, col) {
        skip.mark(nr, nc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::CellState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn params() -> Params {
        Params {
            sd: 5,
            sb: 5,
            fb: 5,
            chron_interval: 1,
            chron_delay_us: 0,
            total_workers: 1,
        }
    }

    #[test]
    fn rectangle_enumerates_row_major() {
        let rect = Rectangle::new(1, 1, 2, 3);
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3)]
        );
    }

    #[test]
    fn skip_map_starts_clear_and_resets() {
        let skip = SkipMap::new(4, 4);
        assert!(!skip.is_marked(2, 2));
        skip.mark(2, 2);
        assert!(skip.is_marked(2, 2));
        skip.reset();
        assert!(!skip.is_marked(2, 2));
    }

    #[test]
    fn sweep_skips_marked_cells() {
        let planet = Planet::new(5, 5).unwrap();
        planet.set(
            2,
            2,
            CellState {
                kind: Cell::Fish,
                btime: 0,
                dtime: 0,
            },
        );
        let skip = SkipMap::new(5, 5);
        skip.mark(2, 2);
        let counts = Counts::new(1, 0);
        let rect = Rectangle::new(2, 2, 1, 1);
        sweep(&planet, &skip, &counts, &params(), &rect, &mut rng());
        // Untouched: still a fish at (2,2), nothing moved.
        assert_eq!(planet.get(2, 2).kind, Cell::Fish);
    }

    #[test]
    fn sweep_moves_and_marks_destination() {
        let planet = Planet::new(5, 5).unwrap();
        planet.set(
            2,
            2,
            CellState {
                kind: Cell::Fish,
                btime: 0,
                dtime: 0,
            },
        );
        let skip = SkipMap::new(5, 5);
        let counts = Counts::new(1, 0);
        let rect = Rectangle::new(0, 0, 5, 5);
        sweep(&planet, &skip, &counts, &params(), &rect, &mut rng());
        assert_eq!(planet.fish_count(), 1);
        let moved_to = planet
            .iter_cells()
            .find(|(_, _, s)| s.kind == Cell::Fish)
            .map(|(r, c, _)| (r, c))
            .unwrap();
        assert!(skip.is_marked(moved_to.0, moved_to.1));
    }

    #[test]
    fn sweep_marks_own_cell_on_stop() {
        // A shark hemmed in by sharks on all four sides has nowhere to
        // move or eat; rule 1 returns `Stop`, but the cell must still be
        // marked so a later, overlapping rectangle in the same chronon
        // (batch 2/batch 3's right-edge seam, §4.4) does not re-run rule
        // 1/2 on it and double-advance its counters.
        let planet = Planet::new(5, 5).unwrap();
        let shark = CellState {
            kind: Cell::Shark,
            btime: 0,
            dtime: 0,
        };
        for (r, c) in [(2, 2), (1, 2), (3, 2), (2, 1), (2, 3)] {
            planet.set(r, c, shark);
        }
        let skip = SkipMap::new(5, 5);
        let counts = Counts::new(0, 5);
        let rect = Rectangle::new(2, 2, 1, 1);
        sweep(&planet, &skip, &counts, &params(), &rect, &mut rng());
        assert_eq!(planet.get(2, 2).kind, Cell::Shark);
        assert!(skip.is_marked(2, 2));
    }
}
