#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Versioned reference data: the precinct roster and the ZIP-to-precinct
//! lookup table.
//!
//! Both tables ship as TOML files embedded at compile time. Callers that
//! need a different table (tests, a newer roster) load one from disk with
//! [`load_roster`] / [`load_zip_lookup`]. Tables are read once and never
//! mutated afterwards.

use std::collections::BTreeSet;
use std::path::Path;

use safety_map_precinct_models::{PrecinctInfo, ZipLookup};
use serde::Deserialize;

const ROSTER_TOML: &str = include_str!("../data/precincts.toml");
const ZIP_LOOKUP_TOML: &str = include_str!("../data/zip_to_precinct.toml");

/// Errors that can occur while loading reference data.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// The table file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path of the table file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The table is not valid TOML or does not match the schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The table parsed but its contents are inconsistent.
    #[error("Invalid reference data: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// The fixed set of precincts a consolidation run covers, in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Roster {
    precincts: Vec<PrecinctInfo>,
}

impl Roster {
    /// Builds a roster from explicit rows.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Invalid`] if a precinct number repeats or
    /// a row has an empty borough.
    pub fn new(precincts: Vec<PrecinctInfo>) -> Result<Self, ReferenceError> {
        let roster = Self { precincts };
        roster.validate()?;
        Ok(roster)
    }

    /// Returns the roster row for `precinct`, if present.
    #[must_use]
    pub fn get(&self, precinct: u16) -> Option<&PrecinctInfo> {
        self.precincts.iter().find(|p| p.precinct == precinct)
    }

    /// Iterates roster rows in order.
    pub fn iter(&self) -> impl Iterator<Item = &PrecinctInfo> {
        self.precincts.iter()
    }

    /// Number of precincts on the roster.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.precincts.len()
    }

    /// Returns `true` if the roster has no precincts.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.precincts.is_empty()
    }

    fn validate(&self) -> Result<(), ReferenceError> {
        let mut seen = BTreeSet::new();
        for info in &self.precincts {
            if !seen.insert(info.precinct) {
                return Err(ReferenceError::Invalid {
                    message: format!("duplicate precinct {}", info.precinct),
                });
            }
            if info.borough.trim().is_empty() {
                return Err(ReferenceError::Invalid {
                    message: format!("precinct {} has an empty borough", info.precinct),
                });
            }
        }
        Ok(())
    }
}

/// Parses a roster from TOML text (`[[precincts]]` array of tables).
///
/// # Errors
///
/// Returns [`ReferenceError`] if the text is not a valid roster.
pub fn parse_roster(toml_str: &str) -> Result<Roster, ReferenceError> {
    let roster: Roster = toml::de::from_str(toml_str)?;
    roster.validate()?;
    Ok(roster)
}

/// Parses a ZIP lookup from TOML text (a `[zips]` table).
///
/// # Errors
///
/// Returns [`ReferenceError`] if the text is not a valid lookup table.
pub fn parse_zip_lookup(toml_str: &str) -> Result<ZipLookup, ReferenceError> {
    Ok(toml::de::from_str(toml_str)?)
}

/// Loads a roster from a TOML file.
///
/// # Errors
///
/// Returns [`ReferenceError`] if the file cannot be read or parsed.
pub fn load_roster(path: &Path) -> Result<Roster, ReferenceError> {
    let roster = parse_roster(&read_table(path)?)?;
    log::info!("Loaded {} precincts from {}", roster.len(), path.display());
    Ok(roster)
}

/// Loads a ZIP lookup from a TOML file.
///
/// # Errors
///
/// Returns [`ReferenceError`] if the file cannot be read or parsed.
pub fn load_zip_lookup(path: &Path) -> Result<ZipLookup, ReferenceError> {
    let lookup = parse_zip_lookup(&read_table(path)?)?;
    log::info!("Loaded {} ZIP codes from {}", lookup.len(), path.display());
    Ok(lookup)
}

fn read_table(path: &Path) -> Result<String, ReferenceError> {
    std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Returns the embedded NYPD precinct roster.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse. Since it is a compile-time
/// constant, a parse failure is a development error caught by the tests.
#[must_use]
pub fn embedded_roster() -> Roster {
    parse_roster(ROSTER_TOML).unwrap_or_else(|e| panic!("Failed to parse embedded roster: {e}"))
}

/// Returns the embedded ZIP-to-precinct lookup.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse.
#[must_use]
pub fn embedded_zip_lookup() -> ZipLookup {
    parse_zip_lookup(ZIP_LOOKUP_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded ZIP lookup: {e}"))
}
