//! Errors for the external collaborators: config and planet-file loading.
//! Always fatal at startup (§7): the caller reports and the core never
//! starts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is missing required key `{key}`")]
    MissingKey { path: PathBuf, key: &'static str },
    #[error("config file {path} has a non-integer value for `{key}`: {value}")]
    InvalidValue {
        path: PathBuf,
        key: &'static str,
        value: String,
    },
    #[error("malformed config line {line_no} in {path}: {line}")]
    MalformedLine {
        path: PathBuf,
        line_no: usize,
        line: String,
    },
    #[error("failed to parse {path} as TOML: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum PlanetTextError {
    #[error("failed to read planet file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write planet file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("planet file {path} is truncated: expected {expected} cells, found {found}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("planet file {path} has an invalid cell character `{ch}` at row {row}, col {col}")]
    InvalidCell {
        path: PathBuf,
        row: usize,
        col: usize,
        ch: char,
    },
    #[error("planet file {path} has a malformed dimension line: {line}")]
    MalformedDimensions { path: PathBuf, line: String },
    #[error(transparent)]
    Resource(#[from] wator_core::ResourceError),
}
