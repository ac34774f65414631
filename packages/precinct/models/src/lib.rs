#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Precinct roster, consolidated record, and cache entry types.
//!
//! A precinct is keyed internally by its integer number and externally
//! (report URLs, lookup tables) by a zero-padded three-digit string.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use safety_map_crime_models::{CrimeBreakdown, SafetyLabel};
use serde::{Deserialize, Deserializer, Serialize};

/// Formats a precinct number as the zero-padded string used in report
/// URLs (e.g. `1` becomes `"001"`, `123` stays `"123"`).
#[must_use]
pub fn format_precinct_id(precinct: u16) -> String {
    format!("{precinct:03}")
}

/// Parses a precinct identifier in either padded (`"014"`) or plain
/// (`"14"`) form.
#[must_use]
pub fn parse_precinct_id(s: &str) -> Option<u16> {
    s.trim().parse().ok()
}

/// One row of the static precinct roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecinctInfo {
    /// Precinct number.
    pub precinct: u16,
    /// Borough name (e.g. "Manhattan", "The Bronx").
    pub borough: String,
    /// Free-text neighborhood label(s), comma-separated.
    pub neighborhoods: String,
}

/// Consolidated, scored statistics for one precinct in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecinctRecord {
    /// Precinct number.
    pub precinct: u16,
    /// Borough name, joined from the roster.
    pub borough: String,
    /// Neighborhood label(s), joined from the roster.
    pub neighborhoods: String,
    /// Week-to-date total across all itemized categories.
    #[serde(rename = "crimeCount")]
    pub week_to_date: u64,
    /// 28-day total across all itemized categories.
    pub month_to_date: u64,
    /// Year-to-date total across all itemized categories.
    pub year_to_date: u64,
    /// Week-to-date counts for the seven major categories.
    pub crime_breakdown: CrimeBreakdown,
    /// Weighted severity of the breakdown.
    #[serde(rename = "weightedCrimeVal")]
    pub weighted_severity: f64,
    /// Normalized safety score in `[0, 1]`, 1 being safest.
    pub safety_score: f64,
    /// Rank by descending safety score, 1 being safest.
    pub safety_rank: u32,
}

impl PrecinctRecord {
    /// Returns the label for this record's safety score.
    #[must_use]
    pub fn safety_label(&self) -> SafetyLabel {
        SafetyLabel::from_score(self.safety_score)
    }
}

/// A full consolidated run together with the time it was produced.
///
/// One timestamp governs the whole record set; entries are only ever
/// replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Every precinct that was successfully consolidated in the run.
    pub records: Vec<PrecinctRecord>,
    /// When the run completed.
    pub cached_at: DateTime<FixedOffset>,
}

/// Static mapping from ZIP code to the precinct that covers it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipLookup {
    /// ZIP code -> precinct number.
    #[serde(deserialize_with = "deserialize_precinct_map")]
    pub zips: BTreeMap<String, u16>,
}

impl ZipLookup {
    /// Returns the precinct covering `zip`, if any.
    #[must_use]
    pub fn precinct_for(&self, zip: &str) -> Option<u16> {
        self.zips.get(zip.trim()).copied()
    }

    /// Number of ZIP codes in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zips.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zips.is_empty()
    }
}

/// Lookup tables write precincts either as integers or padded strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum PrecinctRef {
    Number(u16),
    Text(String),
}

fn deserialize_precinct_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, PrecinctRef>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(zip, precinct)| {
            let number = match precinct {
                PrecinctRef::Number(n) => n,
                PrecinctRef::Text(s) => parse_precinct_id(&s).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid precinct '{s}' for ZIP {zip}"))
                })?,
            };
            Ok((zip, number))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_precinct_ids_with_padding() {
        assert_eq!(format_precinct_id(1), "001");
        assert_eq!(format_precinct_id(14), "014");
        assert_eq!(format_precinct_id(123), "123");
    }

    #[test]
    fn parses_padded_and_plain_ids() {
        assert_eq!(parse_precinct_id("014"), Some(14));
        assert_eq!(parse_precinct_id(" 7 "), Some(7));
        assert_eq!(parse_precinct_id("abc"), None);
    }

    #[test]
    fn zip_lookup_ignores_surrounding_whitespace() {
        let lookup = ZipLookup {
            zips: BTreeMap::from([("10001".to_string(), 14)]),
        };
        assert_eq!(lookup.precinct_for(" 10001"), Some(14));
        assert_eq!(lookup.precinct_for("99999"), None);
    }
}
