#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime type keys, severity weights, and safety labels.
//!
//! The NYPD weekly precinct report itemizes seven major felony categories.
//! This crate defines those categories as a fixed key set, the per-category
//! severity weights used to collapse a breakdown into one scalar, and the
//! categorical label derived from a normalized safety score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One of the seven major felony categories itemized per precinct.
///
/// The string form matches the row labels of the source report and the
/// keys of the serialized breakdown (e.g. `"Felony Assault"`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum CrimeType {
    /// Murder and non-negligent manslaughter
    Murder,
    /// Rape
    Rape,
    /// Robbery
    Robbery,
    /// Felony assault
    #[serde(rename = "Felony Assault")]
    #[strum(serialize = "Felony Assault")]
    FelonyAssault,
    /// Burglary
    Burglary,
    /// Grand larceny
    #[serde(rename = "Grand Larceny")]
    #[strum(serialize = "Grand Larceny")]
    GrandLarceny,
    /// Grand larceny of a motor vehicle
    #[serde(rename = "Grand Larceny Auto")]
    #[strum(serialize = "Grand Larceny Auto")]
    GrandLarcenyAuto,
}

impl CrimeType {
    /// Returns the severity weight applied to each incident of this type.
    ///
    /// Violent crimes carry far more weight than property theft.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Murder => 50,
            Self::Rape => 25,
            Self::Robbery => 10,
            Self::FelonyAssault => 8,
            Self::Burglary => 5,
            Self::GrandLarcenyAuto => 3,
            Self::GrandLarceny => 1,
        }
    }

    /// Returns all variants of this enum, in report row order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Murder,
            Self::Rape,
            Self::Robbery,
            Self::FelonyAssault,
            Self::Burglary,
            Self::GrandLarceny,
            Self::GrandLarcenyAuto,
        ]
    }
}

/// Per-type incident counts for one precinct.
///
/// Missing types read as zero. Serializes as a flat JSON object keyed by
/// the type's display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrimeBreakdown(BTreeMap<CrimeType, u64>);

impl CrimeBreakdown {
    /// Creates an empty breakdown.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Creates a breakdown with every [`CrimeType`] present and set to zero.
    #[must_use]
    pub fn zeroed() -> Self {
        Self(CrimeType::all().iter().map(|t| (*t, 0)).collect())
    }

    /// Returns the count for `crime_type`, or zero when absent.
    #[must_use]
    pub fn get(&self, crime_type: CrimeType) -> u64 {
        self.0.get(&crime_type).copied().unwrap_or(0)
    }

    /// Sets the count for `crime_type`.
    pub fn set(&mut self, crime_type: CrimeType, count: u64) {
        self.0.insert(crime_type, count);
    }

    /// Returns `true` if no type has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates recorded `(type, count)` pairs in report row order.
    pub fn iter(&self) -> impl Iterator<Item = (CrimeType, u64)> + '_ {
        self.0.iter().map(|(t, c)| (*t, *c))
    }

    /// Sum of all recorded counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

impl FromIterator<(CrimeType, u64)> for CrimeBreakdown {
    fn from_iter<I: IntoIterator<Item = (CrimeType, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Collapses a breakdown into a single weighted severity value.
///
/// The result is `sum(count * weight)` over every [`CrimeType`]; absent
/// types contribute nothing, so an empty breakdown weighs `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weigh(breakdown: &CrimeBreakdown) -> f64 {
    CrimeType::all()
        .iter()
        .map(|t| breakdown.get(*t) as f64 * f64::from(t.weight()))
        .sum()
}

/// Categorical label derived from a normalized safety score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SafetyLabel {
    /// Score above 0.8
    #[serde(rename = "Very Safe")]
    #[strum(serialize = "Very Safe")]
    VerySafe,
    /// Score above 0.6
    Safe,
    /// Score above 0.4
    Moderate,
    /// Score above 0.2
    #[serde(rename = "High Crime")]
    #[strum(serialize = "High Crime")]
    HighCrime,
    /// Everything else
    #[serde(rename = "Extreme Alert")]
    #[strum(serialize = "Extreme Alert")]
    ExtremeAlert,
}

impl SafetyLabel {
    /// Maps a safety score onto its label. Thresholds are exclusive lower
    /// bounds, so a score of exactly `0.8` is [`Self::Safe`].
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Self::VerySafe
        } else if score > 0.6 {
            Self::Safe
        } else if score > 0.4 {
            Self::Moderate
        } else if score > 0.2 {
            Self::HighCrime
        } else {
            Self::ExtremeAlert
        }
    }
}
