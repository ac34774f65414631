#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Projects consolidated precinct scores onto map geometry.
//!
//! ZIP code polygons are matched to precincts through the static ZIP
//! lookup ([`zip::remap_zip_features`]); precinct polygons are joined
//! directly on their precinct number ([`precinct::enrich_precinct_features`]).
//! Both enrich feature properties in place and leave geometry untouched.

pub mod precinct;
pub mod zip;

use std::path::Path;

use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use safety_map_crime_models::SafetyLabel;
use safety_map_precinct_models::PrecinctRecord;
use thiserror::Error;

/// Score given to features with no consolidated precinct behind them.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Errors that can occur while reading or writing geometry files.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// I/O error.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File being accessed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The file is valid `GeoJSON` but not usable as input.
    #[error("Invalid geometry input: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Loads a `GeoJSON` `FeatureCollection` from disk.
///
/// # Errors
///
/// Returns [`GeographyError`] if the file is missing, is not `GeoJSON`,
/// or holds something other than a `FeatureCollection`.
pub fn load_feature_collection(path: &Path) -> Result<FeatureCollection, GeographyError> {
    let text = std::fs::read_to_string(path).map_err(|source| GeographyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let collection = parse_feature_collection(&text)?;
    log::info!(
        "Loaded {} features from {}",
        collection.features.len(),
        path.display()
    );
    Ok(collection)
}

/// Parses `GeoJSON` text that must hold a `FeatureCollection`.
///
/// # Errors
///
/// Returns [`GeographyError`] if the text is not `GeoJSON` or is a bare
/// feature or geometry.
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection, GeographyError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(GeographyError::Invalid {
            message: "expected a FeatureCollection, found a single Feature".to_string(),
        }),
        GeoJson::Geometry(_) => Err(GeographyError::Invalid {
            message: "expected a FeatureCollection, found a bare Geometry".to_string(),
        }),
    }
}

/// Serializes a collection as indented JSON, ready to be written out.
///
/// # Errors
///
/// Returns [`GeographyError::Json`] if serialization fails.
pub fn to_pretty_json(collection: &FeatureCollection) -> Result<Vec<u8>, GeographyError> {
    Ok(serde_json::to_vec_pretty(collection)?)
}

/// Writes the score and its label, the two properties every enriched
/// feature carries.
fn set_score(props: &mut JsonObject, score: f64) {
    props.insert("safetyScore".to_string(), JsonValue::from(score));
    props.insert(
        "safetyLabel".to_string(),
        JsonValue::from(SafetyLabel::from_score(score).to_string()),
    );
}

/// Writes a record's counts, severity, and breakdown.
fn set_counts(props: &mut JsonObject, record: &PrecinctRecord) -> Result<(), GeographyError> {
    props.insert(
        "weightedCrimeVal".to_string(),
        JsonValue::from(record.weighted_severity),
    );
    props.insert("crimeCount".to_string(), JsonValue::from(record.week_to_date));
    props.insert(
        "monthToDate".to_string(),
        JsonValue::from(record.month_to_date),
    );
    props.insert("yearToDate".to_string(), JsonValue::from(record.year_to_date));
    props.insert(
        "crimeBreakdown".to_string(),
        serde_json::to_value(&record.crime_breakdown)?,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feature_collections_only() {
        let collection =
            parse_feature_collection(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(collection.features.is_empty());

        let point = r#"{"type":"Point","coordinates":[-73.99,40.75]}"#;
        assert!(matches!(
            parse_feature_collection(point),
            Err(GeographyError::Invalid { .. })
        ));
        assert!(matches!(
            parse_feature_collection("not json"),
            Err(GeographyError::GeoJson(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_feature_collection(Path::new("/nonexistent/zips.geojson"));
        assert!(matches!(result, Err(GeographyError::Io { .. })));
    }

    #[test]
    fn score_and_label_travel_together() {
        let mut props = JsonObject::new();
        set_score(&mut props, 0.73);
        assert_eq!(props["safetyScore"], JsonValue::from(0.73));
        assert_eq!(props["safetyLabel"], JsonValue::from("Safe"));

        set_score(&mut props, 0.2);
        assert_eq!(props["safetyLabel"], JsonValue::from("Extreme Alert"));
    }
}
