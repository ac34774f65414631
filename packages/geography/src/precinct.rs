//! Precinct polygon enrichment.
//!
//! Precinct boundary files carry the precinct number in a `precinct`
//! property, as an integer, an integral float, or a (possibly padded)
//! string.

use std::collections::BTreeMap;

use geojson::{FeatureCollection, JsonObject, JsonValue};
use safety_map_precinct_models::{PrecinctRecord, parse_precinct_id};

use crate::{GeographyError, NEUTRAL_SCORE, set_counts, set_score};

/// Property holding the feature's precinct number.
pub const PRECINCT_PROPERTY: &str = "precinct";

/// Counts from one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    /// Polygons joined to a consolidated record.
    pub joined: usize,
    /// Polygons with no record this run.
    pub unmatched: usize,
}

/// Shapefile exports often write integer ids as floats (`14.0`).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then(|| value as u64)
}

fn precinct_number(props: &JsonObject) -> Option<u16> {
    match props.get(PRECINCT_PROPERTY)? {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(integral))
            .and_then(|n| u16::try_from(n).ok()),
        JsonValue::String(s) => parse_precinct_id(s),
        _ => None,
    }
}

/// Enriches every precinct polygon of `collection` in place.
///
/// Unmatched polygons are kept with the neutral score so the map has no
/// holes.
///
/// # Errors
///
/// Returns [`GeographyError::Json`] if a breakdown cannot be converted to
/// a JSON value.
pub fn enrich_precinct_features(
    collection: &mut FeatureCollection,
    records: &[PrecinctRecord],
) -> Result<EnrichStats, GeographyError> {
    let by_precinct: BTreeMap<u16, &PrecinctRecord> =
        records.iter().map(|r| (r.precinct, r)).collect();
    let mut stats = EnrichStats::default();

    for feature in &mut collection.features {
        let props = feature.properties.get_or_insert_with(JsonObject::new);
        let record = precinct_number(props).and_then(|p| by_precinct.get(&p).copied());

        if let Some(record) = record {
            props.insert(
                "borough".to_string(),
                JsonValue::from(record.borough.as_str()),
            );
            props.insert(
                "neighborhoods".to_string(),
                JsonValue::from(record.neighborhoods.as_str()),
            );
            props.insert("safetyRank".to_string(), JsonValue::from(record.safety_rank));
            set_counts(props, record)?;
            set_score(props, record.safety_score);
            stats.joined += 1;
        } else {
            log::debug!("No consolidated record for precinct polygon {props:?}");
            set_score(props, NEUTRAL_SCORE);
            stats.unmatched += 1;
        }
    }

    log::info!(
        "Joined {} precinct polygons ({} without data this run)",
        stats.joined,
        stats.unmatched
    );
    Ok(stats)
}
