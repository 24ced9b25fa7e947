//! External collaborators for the chronon engine: configuration loading,
//! the planet text format, and the snapshot/checkpoint sinks that plug
//! into `wator_core`'s [`wator_core::SnapshotSink`]/[`wator_core::CheckpointSink`] seams.

pub mod config;
pub mod error;
pub mod planet_text;
pub mod publisher;

pub use config::{load_rules_config, load_runtime_config, RulesConfig, RuntimeConfig};
pub use error::{ConfigError, PlanetTextError};
pub use planet_text::{load_planet, print_planet};
pub use publisher::{FileCheckpointSink, TcpSnapshotSink};
