//! The Wa-Tor chronon engine: a toroidal predator/prey grid updated by a
//! controller/worker/collector thread farm, with no locking on the grid
//! itself — only the partitioning discipline in [`partition`] and the
//! skip-map in [`rect`] keep concurrent writers disjoint.
//!
//! External collaborators (config/planet-text/IO) live in `wator-io`;
//! this crate only knows the [`snapshot::SnapshotSink`] and
//! [`snapshot::CheckpointSink`] seams they plug into.

pub mod error;
pub mod farm;
pub mod partition;
pub mod planet;
pub mod queue;
pub mod rect;
pub mod rules;
pub mod snapshot;

pub use error::{PublishError, ResourceError, RulesError};
pub use farm::{Farm, FarmHandle, FarmState};
pub use partition::{partition as partition_planet, Batches};
pub use planet::{Cell, CellState, Params, Planet, MIN_DIM};
pub use rect::{Rectangle, SkipMap};
pub use rules::Counts;
pub use snapshot::{CheckpointSink, SnapshotSink};

/// Build a [`Planet`], partition it, and construct a [`Farm`] ready to
/// run — the composition root `wator-cli` calls into after loading
/// configuration and the initial planet state.
pub fn build_farm(
    planet: Planet,
    params: Params,
    on_chronon_completed: impl Fn(u64) + Send + Sync + 'static,
) -> Result<Farm, ResourceError> {
    let batches = partition::partition(planet.nrow(), planet.ncol(), params.total_workers)?;
    Ok(Farm::new(std::sync::Arc::new(planet), batches, params, on_chronon_completed))
}
