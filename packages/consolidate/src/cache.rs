//! Persistence for the consolidated table.
//!
//! A [`CacheStore`] holds at most one [`CacheEntry`] and replaces it
//! wholesale. [`CsvCacheStore`] keeps the table as CSV (breakdown column
//! serialized as JSON) with a sibling plain-text timestamp file;
//! [`MemoryCacheStore`] keeps it in memory.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone as _};
use safety_map_crime_models::CrimeBreakdown;
use safety_map_precinct_models::{CacheEntry, PrecinctRecord};
use serde::{Deserialize, Serialize};

use crate::paths;
use crate::scoring::rerank;

/// Errors that can occur while reading or writing the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error (file read/write/rename).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table is not valid CSV or a row does not match the schema.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A serialized breakdown cell is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The timestamp file does not hold a recognizable timestamp.
    #[error("Unparseable cache timestamp: {value:?}")]
    Timestamp {
        /// The offending file contents.
        value: String,
    },
}

/// Storage for the single current [`CacheEntry`].
pub trait CacheStore: Send + Sync {
    /// Returns the current entry, or `None` if no complete entry (table
    /// and timestamp) has been written.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if an entry exists but cannot be read.
    fn read(&self) -> Result<Option<CacheEntry>, CacheError>;

    /// Replaces the current entry. Readers see either the old entry, the
    /// new one, or (after a crash mid-write) no entry, never a table paired
    /// with another run's timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the entry cannot be persisted.
    fn write_atomic(&self, entry: &CacheEntry) -> Result<(), CacheError>;
}

/// In-process store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entry: Mutex<Option<CacheEntry>>,
}

impl MemoryCacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `entry`.
    #[must_use]
    pub const fn with_entry(entry: CacheEntry) -> Self {
        Self {
            entry: Mutex::new(Some(entry)),
        }
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self
            .entry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn write_atomic(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        *self
            .entry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(entry.clone());
        Ok(())
    }
}

/// One row of the CSV table.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheRow {
    precinct: u16,
    borough: String,
    neighborhoods: String,
    crime_count: u64,
    month_to_date: u64,
    year_to_date: u64,
    crime_breakdown: String,
    weighted_crime_val: f64,
    safety_score: f64,
}

impl CacheRow {
    fn from_record(record: &PrecinctRecord) -> Result<Self, CacheError> {
        Ok(Self {
            precinct: record.precinct,
            borough: record.borough.clone(),
            neighborhoods: record.neighborhoods.clone(),
            crime_count: record.week_to_date,
            month_to_date: record.month_to_date,
            year_to_date: record.year_to_date,
            crime_breakdown: serde_json::to_string(&record.crime_breakdown)?,
            weighted_crime_val: record.weighted_severity,
            safety_score: record.safety_score,
        })
    }

    fn into_record(self) -> Result<PrecinctRecord, CacheError> {
        let crime_breakdown: CrimeBreakdown = serde_json::from_str(&self.crime_breakdown)?;
        Ok(PrecinctRecord {
            precinct: self.precinct,
            borough: self.borough,
            neighborhoods: self.neighborhoods,
            week_to_date: self.crime_count,
            month_to_date: self.month_to_date,
            year_to_date: self.year_to_date,
            crime_breakdown,
            weighted_severity: self.weighted_crime_val,
            safety_score: self.safety_score,
            safety_rank: 0,
        })
    }
}

/// File-backed store: a CSV table plus a timestamp file.
#[derive(Debug, Clone)]
pub struct CsvCacheStore {
    table_path: PathBuf,
    timestamp_path: PathBuf,
}

impl CsvCacheStore {
    /// Creates a store over explicit file paths.
    #[must_use]
    pub const fn new(table_path: PathBuf, timestamp_path: PathBuf) -> Self {
        Self {
            table_path,
            timestamp_path,
        }
    }

    /// Creates a store over the canonical data-directory paths.
    #[must_use]
    pub fn open_default() -> Self {
        Self::new(paths::cache_table_path(), paths::cache_timestamp_path())
    }

    fn read_records(&self) -> Result<Vec<PrecinctRecord>, CacheError> {
        let mut reader = csv::Reader::from_path(&self.table_path)?;
        let mut records = reader
            .deserialize::<CacheRow>()
            .map(|row| row?.into_record())
            .collect::<Result<Vec<_>, _>>()?;
        rerank(&mut records);
        Ok(records)
    }

    fn encode_records(records: &[PrecinctRecord]) -> Result<Vec<u8>, CacheError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer.serialize(CacheRow::from_record(record)?)?;
        }
        writer
            .into_inner()
            .map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))
    }
}

impl CacheStore for CsvCacheStore {
    fn read(&self) -> Result<Option<CacheEntry>, CacheError> {
        if !self.table_path.exists() {
            log::debug!("No cache table at {}", self.table_path.display());
            return Ok(None);
        }
        if !self.timestamp_path.exists() {
            log::debug!("No cache timestamp at {}", self.timestamp_path.display());
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.timestamp_path)?;
        let cached_at = parse_timestamp(&raw).ok_or_else(|| CacheError::Timestamp {
            value: raw.trim().to_string(),
        })?;
        let records = self.read_records()?;

        Ok(Some(CacheEntry { records, cached_at }))
    }

    fn write_atomic(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let table = Self::encode_records(&entry.records)?;
        let staged_table = paths::stage(&self.table_path, &table)?;
        let staged_timestamp = paths::stage(
            &self.timestamp_path,
            entry.cached_at.to_rfc3339().as_bytes(),
        )?;

        // Drop the old timestamp before swapping the table in. A crash
        // between the renames then leaves a table with no timestamp, which
        // reads as missing.
        if let Err(e) = std::fs::remove_file(&self.timestamp_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(e.into());
        }
        std::fs::rename(&staged_table, &self.table_path)?;
        std::fs::rename(&staged_timestamp, &self.timestamp_path)?;
        log::debug!(
            "Wrote {} cached precincts to {}",
            entry.records.len(),
            self.table_path.display()
        );
        Ok(())
    }
}

/// Parses a cache timestamp: RFC 3339, or a naive ISO-8601 date-time
/// interpreted in local time.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use safety_map_crime_models::CrimeType;

    use super::*;

    fn record(precinct: u16, score: f64) -> PrecinctRecord {
        let mut crime_breakdown = CrimeBreakdown::zeroed();
        crime_breakdown.set(CrimeType::Robbery, u64::from(precinct));
        crime_breakdown.set(CrimeType::GrandLarcenyAuto, 3);
        PrecinctRecord {
            precinct,
            borough: "Brooklyn".to_string(),
            neighborhoods: "Park Slope, Carroll Gardens".to_string(),
            week_to_date: 31,
            month_to_date: 140,
            year_to_date: 1_802,
            crime_breakdown,
            weighted_severity: f64::from(precinct) * 10.0 + 9.0,
            safety_score: score,
            safety_rank: 0,
        }
    }

    fn entry() -> CacheEntry {
        let mut records = vec![record(78, 0.612_345_678_9), record(76, 1.0), record(60, 0.0)];
        rerank(&mut records);
        CacheEntry {
            records,
            cached_at: DateTime::parse_from_rfc3339("2026-10-14T09:15:30-04:00").unwrap(),
        }
    }

    fn store(name: &str) -> (PathBuf, CsvCacheStore) {
        let dir = std::env::temp_dir().join(format!("safety_map_cache_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        let store = CsvCacheStore::new(dir.join("cache.csv"), dir.join("cache_date.txt"));
        (dir, store)
    }

    #[test]
    fn csv_store_roundtrip() {
        let (dir, store) = store("roundtrip");
        let entry = entry();

        store.write_atomic(&entry).unwrap();
        let restored = store.read().unwrap().unwrap();

        assert_eq!(restored, entry);
        assert_eq!(restored.records[1].safety_rank, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn csv_header_uses_cache_column_names() {
        let (dir, store) = store("header");
        store.write_atomic(&entry()).unwrap();

        let table = std::fs::read_to_string(dir.join("cache.csv")).unwrap();
        let header = table.lines().next().unwrap();
        assert_eq!(
            header,
            "precinct,borough,neighborhoods,crimeCount,monthToDate,yearToDate,\
             crimeBreakdown,weightedCrimeVal,safetyScore"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rewrite_leaves_no_staging_files() {
        let (dir, store) = store("staging");
        store.write_atomic(&entry()).unwrap();

        let mut second = entry();
        second.records.truncate(2);
        second.cached_at = DateTime::parse_from_rfc3339("2026-10-15T07:00:00-04:00").unwrap();
        store.write_atomic(&second).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["cache.csv", "cache_date.txt"]);
        assert_eq!(store.read().unwrap(), Some(second));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_files_read_as_none() {
        let (dir, store) = store("missing");
        assert!(store.read().unwrap().is_none());

        store.write_atomic(&entry()).unwrap();
        // State left by a crash between the table and timestamp renames.
        std::fs::remove_file(dir.join("cache_date.txt")).unwrap();
        assert!(store.read().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        let (dir, store) = store("garbage_ts");
        store.write_atomic(&entry()).unwrap();
        std::fs::write(dir.join("cache_date.txt"), "last tuesday").unwrap();

        assert!(matches!(store.read(), Err(CacheError::Timestamp { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn parses_naive_iso_timestamps() {
        let parsed = parse_timestamp("2026-10-12T08:01:02.123456\n").unwrap();
        assert_eq!(
            parsed.naive_local().to_string(),
            "2026-10-12 08:01:02.123456"
        );
        assert!(parse_timestamp("2026-10-12T08:01:02+00:00").is_some());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn memory_store_replaces_wholesale() {
        let store = MemoryCacheStore::new();
        assert!(store.read().unwrap().is_none());

        let first = entry();
        store.write_atomic(&first).unwrap();

        let mut second = entry();
        second.records.truncate(1);
        store.write_atomic(&second).unwrap();

        assert_eq!(store.read().unwrap().unwrap().records.len(), 1);
    }
}
