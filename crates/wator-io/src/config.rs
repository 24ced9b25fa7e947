//! Two configuration surfaces (§6.1):
//!
//! - [`load_rules_config`] parses the original's flat `key value` format
//!   for the three rule constants (`sd`, `sb`, `fb`) — one pair per
//!   line, blank lines and `#` comments ignored.
//! - [`RuntimeConfig`] is an additional, optional `wator.toml` layer for
//!   the runtime knobs the original only ever took from the CLI
//!   (`total_workers`, `chron_interval`, `chron_delay_us`); CLI flags
//!   still take precedence when both are supplied.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// The three rule constants the original `wator.conf` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulesConfig {
    pub sd: u32,
    pub sb: u32,
    pub fb: u32,
}

fn parse_key_value_line(
    path: &Path,
    line_no: usize,
    line: &str,
) -> Result<Option<(&str, &str)>, ConfigError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
        return Err(ConfigError::MalformedLine {
            path: path.to_path_buf(),
            line_no,
            line: line.to_string(),
        });
    };
    Ok(Some((key, value.trim())))
}

/// Load `sd`/`sb`/`fb` from a flat key-value file.
pub fn load_rules_config(path: impl AsRef<Path>) -> Result<RulesConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (mut sd, mut sb, mut fb) = (None, None, None);
    for (line_no, line) in text.lines().enumerate() {
        let Some((key, value)) = parse_key_value_line(path, line_no + 1, line)? else {
            continue;
        };
        let parsed = |key: &'static str| {
            value
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue {
                    path: path.to_path_buf(),
                    key,
                    value: value.to_string(),
                })
        };
        match key {
            "sd" => sd = Some(parsed("sd")?),
            "sb" => sb = Some(parsed("sb")?),
            "fb" => fb = Some(parsed("fb")?),
            _ => {}
        }
    }

    let config = RulesConfig {
        sd: sd.ok_or(ConfigError::MissingKey { path: path.to_path_buf(), key: "sd" })?,
        sb: sb.ok_or(ConfigError::MissingKey { path: path.to_path_buf(), key: "sb" })?,
        fb: fb.ok_or(ConfigError::MissingKey { path: path.to_path_buf(), key: "fb" })?,
    };
    debug!(path = %path.display(), ?config, "rules config loaded");
    Ok(config)
}

/// Optional `wator.toml` runtime defaults, overridden by any CLI flag
/// the user actually passed.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_total_workers")]
    pub total_workers: usize,
    #[serde(default = "default_chron_interval")]
    pub chron_interval: u32,
    #[serde(default = "default_chron_delay_us")]
    pub chron_delay_us: u64,
}

fn default_total_workers() -> usize {
    4
}

fn default_chron_interval() -> u32 {
    1
}

fn default_chron_delay_us() -> u64 {
    0
}

impl Default for RuntimeConfig {
    fn default() -> RuntimeConfig {
        RuntimeConfig {
            total_workers: default_total_workers(),
            chron_interval: default_chron_interval(),
            chron_delay_us: default_chron_delay_us(),
        }
    }
}

/// Load `wator.toml` if `path` exists; otherwise return defaults. A
/// present-but-malformed file is still an error.
pub fn load_runtime_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no wator.toml present, using runtime defaults");
        return Ok(RuntimeConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: RuntimeConfig = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?config, "runtime config loaded");
    Ok(config)
}
