//! The toroidal grid and the simulation parameters it is updated under.
//!
//! Concurrent workers update disjoint rectangles of the same planet without
//! a lock (§5, §9 of the design notes): each cell lives in an [`UnsafeCell`]
//! and [`Planet`] is declared `Sync` on the strength of the partitioning
//! discipline enforced upstream by [`crate::partition`], not by anything the
//! type system checks here. `get`/`set` are therefore safe to call from any
//! thread, but callers must still honour "no two concurrently-running
//! rectangles may touch the same cell or one another's neighbours" — the
//! same contract the original C implementation relied on through a raw
//! `volatile` pointer cast instead of a borrow checker.

use crate::error::ResourceError;
use std::cell::UnsafeCell;

/// Minimum planet dimensions the partitioner can slice safely.
pub const MIN_DIM: usize = 5;

/// One cell of the planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Water,
    Fish,
    Shark,
}

impl Cell {
    pub fn to_char(self) -> char {
        match self {
            Cell::Water => 'W',
            Cell::Fish => 'F',
            Cell::Shark => 'S',
        }
    }

    pub fn from_char(c: char) -> Option<Cell> {
        match c {
            'W' => Some(Cell::Water),
            'F' => Some(Cell::Fish),
            'S' => Some(Cell::Shark),
            _ => None,
        }
    }
}

/// Per-cell bookkeeping. `btime`/`dtime` only mean something while the
/// owning cell is `Fish`/`Shark`; both are zero on `Water`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellState {
    pub kind: Cell,
    pub btime: u32,
    pub dtime: u32,
}

/// Simulation parameters, immutable after load.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// Chronons of fasting before a shark dies.
    pub sd: u32,
    /// Chronons between shark reproductions.
    pub sb: u32,
    /// Chronons between fish reproductions.
    pub fb: u32,
    /// Publish a snapshot every N chronons.
    pub chron_interval: u32,
    /// Sleep between chronons, for visualization pacing.
    pub chron_delay_us: u64,
    /// Number of worker threads.
    pub total_workers: usize,
}

/// The toroidal grid. Addressed `(row, col)`, wrapping modulo `nrow`/`ncol`.
pub struct Planet {
    nrow: usize,
    ncol: usize,
    cells: Box<[UnsafeCell<CellState>]>,
}

// Safety: concurrent `get`/`set` calls only ever target disjoint cells
// because the farm controller only ever runs rectangles from the same
// batch concurrently, and the partitioner guarantees those rectangles
// (plus their one-cell halo) are pairwise disjoint. See `crate::partition`.
unsafe impl Sync for Planet {}

impl Planet {
    /// A new, all-water planet of the given dimensions.
    pub fn new(nrow: usize, ncol: usize) -> Result<Planet, ResourceError> {
        if nrow < MIN_DIM || ncol < MIN_DIM {
            return Err(ResourceError::PlanetTooSmall { nrow, ncol });
        }
        let cells = (0..nrow * ncol)
            .map(|_| UnsafeCell::new(CellState::default()))
            .collect();
        Ok(Planet { nrow, ncol, cells })
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.nrow && col < self.ncol);
        row * self.ncol + col
    }

    /// Read a cell. Safe to call concurrently with `set` on disjoint cells;
    /// see the struct-level safety note.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        let idx = self.index(row, col);
        unsafe { *self.cells[idx].get() }
    }

    /// Write a cell. Safe to call concurrently with `get`/`set` on disjoint
    /// cells; see the struct-level safety note.
    #[inline]
    pub fn set(&self, row: usize, col: usize, state: CellState) {
        let idx = self.index(row, col);
        unsafe { *self.cells[idx].get() = state };
    }

    /// Toroidal wrap of a `(row-1)`-style step; never panics.
    #[inline]
    pub fn wrap_row(&self, row: isize) -> usize {
        row.rem_euclid(self.nrow as isize) as usize
    }

    #[inline]
    pub fn wrap_col(&self, col: isize) -> usize {
        col.rem_euclid(self.ncol as isize) as usize
    }

    pub fn fish_count(&self) -> usize {
        self.iter_cells().filter(|(_, _, s)| s.kind == Cell::Fish).count()
    }

    pub fn shark_count(&self) -> usize {
        self.iter_cells().filter(|(_, _, s)| s.kind == Cell::Shark).count()
    }

    /// Row-major iteration of `(row, col, state)`, used by the planet text
    /// writer and by tests. Only safe to call when no concurrent writers
    /// are active (i.e. outside a chronon, between batches).
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, CellState)> + '_ {
        (0..self.nrow).flat_map(move |r| (0..self.ncol).map(move |c| (r, c, self.get(r, c))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_undersized_planet() {
        assert!(matches!(
            Planet::new(4, 10),
            Err(ResourceError::PlanetTooSmall { nrow: 4, ncol: 10 })
        ));
    }

    #[test]
    fn new_planet_is_all_water() {
        let p = Planet::new(5, 5).unwrap();
        for (_, _, state) in p.iter_cells() {
            assert_eq!(state.kind, Cell::Water);
            assert_eq!(state.btime, 0);
            assert_eq!(state.dtime, 0);
        }
    }

    #[test]
    fn toroidal_wrap_matches_spec() {
        let p = Planet::new(5, 5).unwrap();
        assert_eq!(p.wrap_row(-1), 4);
        assert_eq!(p.wrap_col(-1), 4);
        assert_eq!(p.wrap_row(5), 0);
        assert_eq!(p.wrap_col(5), 0);
    }

    #[test]
    fn cell_char_round_trip() {
        for c in [Cell::Water, Cell::Fish, Cell::Shark] {
            assert_eq!(Cell::from_char(c.to_char()), Some(c));
        }
        assert_eq!(Cell::from_char('?'), None);
    }
}
