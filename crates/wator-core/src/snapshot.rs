//! Pluggable sinks the collector calls into at chronon boundaries (§6).
//!
//! `wator-core` only knows the shapes of these calls; `wator-io` supplies
//! the real implementations (a TCP visualizer feed, a planet-text
//! checkpoint file). Tests substitute an in-memory buffer.

use crate::error::PublishError;
use crate::planet::{Cell, Planet};

/// Receives one binary snapshot per published chronon: `nrow`, `ncol`,
/// then `nrow * ncol` bytes in row-major order, each the ASCII encoding
/// of a [`Cell`]. The collector may call `publish` from only one thread
/// at a time, but sinks still need `Send` to be handed across the
/// collector/controller thread boundary at construction.
pub trait SnapshotSink: Send {
    fn publish(&mut self, nrow: usize, ncol: usize, cells: &[u8]) -> Result<(), PublishError>;
}

/// Receives a full planet-text dump on `request_checkpoint()`. Distinct
/// from [`SnapshotSink`]: a checkpoint is a restartable save file, not a
/// visualizer frame, and uses the planet text format rather than the
/// wire protocol.
pub trait CheckpointSink: Send {
    fn checkpoint(&mut self, planet: &Planet) -> Result<(), PublishError>;
}

/// Render `planet` into the row-major byte buffer [`SnapshotSink::publish`]
/// expects, without allocating more than the one output buffer.
pub fn encode_cells(planet: &Planet) -> Vec<u8> {
    let mut buf = Vec::with_capacity(planet.nrow() * planet.ncol());
    for row in 0..planet.nrow() {
        for col in 0..planet.ncol() {
            buf.push(planet.get(row, col).kind.to_char() as u8);
        }
    }
    buf
}

/// An in-memory sink for tests: records every call it receives.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub frames: Vec<(usize, usize, Vec<u8>)>,
}

impl SnapshotSink for BufferSink {
    fn publish(&mut self, nrow: usize, ncol: usize, cells: &[u8]) -> Result<(), PublishError> {
        self.frames.push((nrow, ncol, cells.to_vec()));
        Ok(())
    }
}

impl CheckpointSink for BufferSink {
    fn checkpoint(&mut self, planet: &Planet) -> Result<(), PublishError> {
        let cells = encode_cells(planet);
        self.frames.push((planet.nrow(), planet.ncol(), cells));
        Ok(())
    }
}
