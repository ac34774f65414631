//! ZIP code remapping.
//!
//! Each ZIP polygon takes the figures of the precinct the lookup table
//! assigns it. ZIPs without a consolidated precinct get a neutral score
//! and the citywide mean severity so the map still colors them.

use std::collections::BTreeMap;

use geojson::{FeatureCollection, JsonObject, JsonValue};
use safety_map_precinct_models::{PrecinctRecord, ZipLookup, format_precinct_id};

use crate::{GeographyError, NEUTRAL_SCORE, set_counts, set_score};

/// Property holding the feature's ZIP code.
pub const POSTAL_CODE_PROPERTY: &str = "postalCode";

/// Property holding the post office name used for unmapped ZIPs.
pub const AREA_NAME_PROPERTY: &str = "PO_NAME";

/// Neighborhood label for unmapped ZIPs with no area name.
pub const FALLBACK_AREA_NAME: &str = "NYC Area";

/// Counts from one remap pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapStats {
    /// Features that took a precinct's figures.
    pub mapped: usize,
    /// Features given the neutral default.
    pub defaulted: usize,
}

/// Mean weighted severity over `records`, or `0.0` for an empty set.
#[must_use]
pub fn mean_severity(records: &[PrecinctRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = records.len() as f64;
    records.iter().map(|r| r.weighted_severity).sum::<f64>() / n
}

/// Reads the ZIP code of a feature, accepting string or numeric values.
fn postal_code(props: &JsonObject) -> Option<String> {
    match props.get(POSTAL_CODE_PROPERTY)? {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Enriches every ZIP feature of `collection` in place.
///
/// # Errors
///
/// Returns [`GeographyError::Json`] if a breakdown cannot be converted to
/// a JSON value.
pub fn remap_zip_features(
    collection: &mut FeatureCollection,
    records: &[PrecinctRecord],
    lookup: &ZipLookup,
) -> Result<RemapStats, GeographyError> {
    let by_precinct: BTreeMap<u16, &PrecinctRecord> =
        records.iter().map(|r| (r.precinct, r)).collect();
    let mean = mean_severity(records);
    let mut stats = RemapStats::default();

    for feature in &mut collection.features {
        let props = feature.properties.get_or_insert_with(JsonObject::new);
        let record = postal_code(props)
            .and_then(|zip| lookup.precinct_for(&zip))
            .and_then(|precinct| by_precinct.get(&precinct).copied());

        if let Some(record) = record {
            props.insert(
                "neighborhood".to_string(),
                JsonValue::from(record.neighborhoods.as_str()),
            );
            props.insert(
                "precinct".to_string(),
                JsonValue::from(format_precinct_id(record.precinct)),
            );
            set_counts(props, record)?;
            set_score(props, record.safety_score);
            stats.mapped += 1;
        } else {
            let area = match props.get(AREA_NAME_PROPERTY) {
                Some(JsonValue::String(name)) => name.clone(),
                _ => FALLBACK_AREA_NAME.to_string(),
            };
            props.insert("neighborhood".to_string(), JsonValue::from(area));
            props.insert("weightedCrimeVal".to_string(), JsonValue::from(mean));
            props.insert("crimeCount".to_string(), JsonValue::from(0_u64));
            props.insert(
                "crimeBreakdown".to_string(),
                JsonValue::Object(JsonObject::new()),
            );
            set_score(props, NEUTRAL_SCORE);
            stats.defaulted += 1;
        }
    }

    log::info!(
        "Mapped {} ZIP codes to precincts ({} given the neutral default)",
        stats.mapped,
        stats.defaulted
    );
    Ok(stats)
}
