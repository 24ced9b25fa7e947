//! External snapshot/checkpoint sinks (§6.3): a TCP feed for the
//! visualizer, and a planet-text checkpoint writer for `-f <dump file>`.

use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;
use tracing::trace;
use wator_core::error::PublishError;
use wator_core::{CheckpointSink, Planet, SnapshotSink};

/// Bytes per chunk of the cell stream, matching the original visualizer
/// protocol's fixed message-2 buffer size. The final chunk is short
/// rather than zero-padded: padding would desynchronise a reader that
/// expects exactly `nrow * ncol` cell bytes after the two dimension
/// words.
const CHUNK_LEN: usize = 512;

/// Streams snapshots to a connected visualizer over TCP: native-endian
/// `usize` `nrow`, then `ncol`, then the cell bytes in `CHUNK_LEN`-sized
/// writes.
pub struct TcpSnapshotSink {
    stream: TcpStream,
}

impl TcpSnapshotSink {
    pub fn connect(addr: impl std::net::ToSocketAddrs) -> std::io::Result<TcpSnapshotSink> {
        Ok(TcpSnapshotSink {
            stream: TcpStream::connect(addr)?,
        })
    }

    /// Block on an already-bound `listener` until one visualizer connects,
    /// matching the original's `bind`/`listen`/`accept` server role (the
    /// original used a Unix-domain socket; this port uses TCP so the
    /// visualizer need not share a filesystem with the simulation
    /// process). Binding is the caller's job so it can report a bind
    /// failure before committing to the blocking `accept`.
    pub fn accept(listener: &std::net::TcpListener) -> std::io::Result<TcpSnapshotSink> {
        let (stream, _peer) = listener.accept()?;
        Ok(TcpSnapshotSink { stream })
    }
}

impl SnapshotSink for TcpSnapshotSink {
    fn publish(&mut self, nrow: usize, ncol: usize, cells: &[u8]) -> Result<(), PublishError> {
        self.stream.write_all(&nrow.to_ne_bytes())?;
        self.stream.write_all(&ncol.to_ne_bytes())?;
        for chunk in cells.chunks(CHUNK_LEN) {
            self.stream.write_all(chunk)?;
        }
        self.stream.flush()?;
        trace!(nrow, ncol, bytes = cells.len(), "snapshot published");
        Ok(())
    }
}

/// Writes a full planet-text dump to `path` on every `request_checkpoint`
/// (§6.3, §8: a restartable save, not a visualizer frame).
pub struct FileCheckpointSink {
    path: PathBuf,
}

impl FileCheckpointSink {
    pub fn new(path: impl Into<PathBuf>) -> FileCheckpointSink {
        FileCheckpointSink { path: path.into() }
    }
}

impl CheckpointSink for FileCheckpointSink {
    fn checkpoint(&mut self, planet: &Planet) -> Result<(), PublishError> {
        crate::planet_text::print_planet(planet, &self.path)
            .map_err(|err| PublishError(std::io::Error::other(err.to_string())))
    }
}
