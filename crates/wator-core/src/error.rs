//! Error taxonomy for the chronon engine.
//!
//! Library-level errors never abort the process: [`RulesError`] is a
//! sentinel returned to the caller, and [`PublishError`] is logged and
//! swallowed by the collector. [`ResourceError`] is fatal, but only at
//! startup — the engine never calls `exit`/`abort` itself.

use thiserror::Error;

/// Returned by the rules engine when called with invalid coordinates or a
/// planet in an unexpected state. Mirrors the original library's `errno =
/// EINVAL` sentinel: callers get a typed error back, nothing terminates.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum RulesError {
    #[error("coordinate ({row}, {col}) is outside the planet bounds")]
    OutOfBounds { row: usize, col: usize },
    #[error("expected a live cell at ({row}, {col})")]
    NotAnimal { row: usize, col: usize },
}

/// Allocation/setup failure while building the partitioner, the task
/// queue, or the skip-map. Fatal at startup; never raised mid-run.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("planet is too small: {nrow}x{ncol} (minimum 5x5)")]
    PlanetTooSmall { nrow: usize, ncol: usize },
    #[error("partitioner could not find a valid slice count for {nrow} rows")]
    NoValidPartition { nrow: usize },
    #[error("worker pool requires at least one worker")]
    NoWorkers,
}

/// A snapshot failed to publish. The collector logs this and continues;
/// the farm returns to `DispatchB1` on the next chronon regardless.
#[derive(Debug, Error)]
#[error("snapshot publish failed: {0}")]
pub struct PublishError(#[from] pub std::io::Error);
