#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the pipeline's data directory.
//!
//! Everything lives under one data directory: `SAFETY_MAP_DATA_DIR` when
//! set, otherwise `data/` at the project root.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "SAFETY_MAP_DATA_DIR";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => project_root().join("data"),
    }
}

/// Consolidated per-precinct table.
#[must_use]
pub fn cache_table_path() -> PathBuf {
    data_dir().join("crime_data_cache.csv")
}

/// Freshness timestamp written alongside the table.
#[must_use]
pub fn cache_timestamp_path() -> PathBuf {
    data_dir().join("crime_data_cache_date.txt")
}

/// ZIP code tabulation area polygons (input).
#[must_use]
pub fn zip_geojson_path() -> PathBuf {
    data_dir().join("nyc-zip-code-tabulation-areas-polygons.geojson")
}

/// Police precinct polygons (input).
#[must_use]
pub fn precinct_geojson_path() -> PathBuf {
    data_dir().join("police-precincts.geojson")
}

/// ZIP polygons enriched with safety data (output).
#[must_use]
pub fn zip_output_path() -> PathBuf {
    data_dir().join("nyc_zipcodes_with_crime.geojson")
}

/// Precinct polygons enriched with safety data (output).
#[must_use]
pub fn precinct_output_path() -> PathBuf {
    data_dir().join("nyc_precincts_with_crime.geojson")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Writes `contents` next to `path` and renames it into place, so
/// readers never observe a half-written file.
///
/// # Errors
///
/// Returns an I/O error if the temporary file cannot be written or
/// renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let staged = stage(path, contents)?;
    std::fs::rename(&staged, path)
}

/// Writes `contents` to a staging file next to `path` and returns the
/// staging path. Nothing is visible at `path` until the staging file is
/// renamed onto it.
///
/// # Errors
///
/// Returns an I/O error if the parent directory or the staging file cannot
/// be written.
pub fn stage(path: &Path, contents: &[u8]) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, contents)?;
    Ok(tmp)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
