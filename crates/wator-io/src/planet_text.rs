//! The plain-text planet format (§6.2): `nrow`, `ncol`, then `nrow` rows
//! of `ncol` single-character cells. The reader tolerates arbitrary
//! whitespace between tokens; the writer emits exactly one space between
//! cells and a newline per row.

use crate::error::PlanetTextError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use wator_core::{Cell, CellState, Planet};

/// Load a planet from `path`. Counter matrices (`btime`/`dtime`) are not
/// serialised and come back zeroed, matching the round-trip contract in
/// §8 ("ignoring the counter matrices, which ... must be reset to zero
/// on load").
pub fn load_planet(path: impl AsRef<Path>) -> Result<Planet, PlanetTextError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| PlanetTextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tokens = text.split_whitespace();

    let nrow: usize = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| PlanetTextError::MalformedDimensions {
            path: path.to_path_buf(),
            line: text.lines().next().unwrap_or_default().to_string(),
        })?;
    let ncol: usize = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| PlanetTextError::MalformedDimensions {
            path: path.to_path_buf(),
            line: text.lines().nth(1).unwrap_or_default().to_string(),
        })?;

    let planet = Planet::new(nrow, ncol)?;
    let mut found = 0;
    'outer: for row in 0..nrow {
        for col in 0..ncol {
            let Some(tok) = tokens.next() else {
                break 'outer;
            };
            let ch = tok.chars().next().unwrap_or('?');
            let kind = Cell::from_char(ch).ok_or(PlanetTextError::InvalidCell {
                path: path.to_path_buf(),
                row,
                col,
                ch,
            })?;
            planet.set(row, col, CellState { kind, btime: 0, dtime: 0 });
            found += 1;
        }
    }
    let expected = nrow * ncol;
    if found != expected {
        return Err(PlanetTextError::Truncated {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    debug!(path = %path.display(), nrow, ncol, "planet loaded");
    Ok(planet)
}

/// Write `planet` to `path` in the same format `load_planet` reads.
pub fn print_planet(planet: &Planet, path: impl AsRef<Path>) -> Result<(), PlanetTextError> {
    let path = path.as_ref();
    let mut out = String::with_capacity(planet.nrow() * (planet.ncol() * 2 + 1) + 16);
    out.push_str(&planet.nrow().to_string());
    out.push('\n');
    out.push_str(&planet.ncol().to_string());
    out.push('\n');
    for row in 0..planet.nrow() {
        for col in 0..planet.ncol() {
            if col > 0 {
                out.push(' ');
            }
            out.push(planet.get(row, col).kind.to_char());
        }
        out.push('\n');
    }
    let mut file = fs::File::create(path).map_err(|source| PlanetTextError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(out.as_bytes())
        .map_err(|source| PlanetTextError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), nrow = planet.nrow(), ncol = planet.ncol(), "planet written");
    Ok(())
}
