//! The partitioner (§4.4): splits the planet into three disjoint batches
//! of rectangles, one batch dispatched at a time, so that every rectangle
//! running concurrently within a batch (plus its one-cell halo) never
//! touches another rectangle in that same batch.
//!
//! Batch 1 is `slices` horizontal strips covering columns `[0, ncol-2)`;
//! batch 2 fills the 2-row gaps batch 1 left between those strips, also
//! `slices` of them, full width; batch 3 is a single 2-column-wide strip
//! down the right edge, full height. Running batch 1 then batch 2 then
//! batch 3, in that order, updates every cell exactly once per chronon.

use crate::error::ResourceError;
use crate::rect::Rectangle;

/// The three batches for one chronon, in dispatch order.
#[derive(Debug, Clone)]
pub struct Batches {
    pub batch1: Vec<Rectangle>,
    pub batch2: Vec<Rectangle>,
    pub batch3: Rectangle,
}

impl Batches {
    pub fn total_rectangles(&self) -> usize {
        self.batch1.len() + self.batch2.len() + 1
    }
}

/// Largest `slices` count (at most `total_workers + 1`) for which every
/// batch-1 strip is at least 2 rows tall. Mirrors the original farm's
/// search: start from one strip per worker plus one, and back off until
/// the strip height clears the minimum, or give up.
fn choose_slices(nrow: usize, total_workers: usize) -> Result<(usize, usize), ResourceError> {
    if total_workers == 0 {
        return Err(ResourceError::NoWorkers);
    }
    let mut slices = total_workers + 1;
    while slices >= 1 {
        let gap_rows = 2 * slices;
        if nrow > gap_rows {
            let height = (nrow - gap_rows) / slices;
            if height >= 2 {
                return Ok((slices, height));
            }
        }
        slices -= 1;
    }
    Err(ResourceError::NoValidPartition { nrow })
}

/// Build the three batches for a planet of `nrow` x `ncol`, targeting
/// `total_workers` worker threads.
pub fn partition(nrow: usize, ncol: usize, total_workers: usize) -> Result<Batches, ResourceError> {
    let (slices, height) = choose_slices(nrow, total_workers)?;
    let unit = height + 2;
    let remainder = nrow - slices * unit;

    let mut batch1 = Vec::with_capacity(slices);
    let mut batch2 = Vec::with_capacity(slices);
    let strip_cols = ncol - 2;

    let mut row = 0;
    for i in 0..slices {
        let rows = if i == slices - 1 { height + remainder } else { height };
        batch1.push(Rectangle::new(row, 0, rows, strip_cols));
        row += rows;
        batch2.push(Rectangle::new(row, 0, 2, ncol));
        row += 2;
    }
    debug_assert_eq!(row, nrow);

    let batch3 = Rectangle::new(0, ncol - 2, nrow, 2);

    Ok(Batches {
        batch1,
        batch2,
        batch3,
    })
}
