//! Turns per-precinct counts into weighted severity, safety scores, and
//! ranks.
//!
//! Scores are an affine, decreasing map of weighted severity over the
//! whole run: the least severe precinct scores `1.0`, the most severe
//! `0.0`. Ranks follow the "min" method, so tied scores share the lowest
//! rank among them.

use safety_map_crime_models::weigh;
use safety_map_precinct_models::{PrecinctInfo, PrecinctRecord};
use safety_map_source::extract::PrecinctStats;

/// Normalizes severity values into safety scores in `[0, 1]`.
///
/// When every value is equal (including a single value) every score is
/// `1.0`.
#[must_use]
pub fn safety_scores(severities: &[f64]) -> Vec<f64> {
    let min = severities.iter().copied().fold(f64::INFINITY, f64::min);
    let max = severities.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max > min {
        let span = max - min;
        severities.iter().map(|v| 1.0 - (v - min) / span).collect()
    } else {
        vec![1.0; severities.len()]
    }
}

/// Ranks scores descending: each rank is one more than the number of
/// strictly higher scores.
#[must_use]
pub fn safety_ranks(scores: &[f64]) -> Vec<u32> {
    scores
        .iter()
        .map(|score| {
            let higher = scores.iter().filter(|other| *other > score).count();
            u32::try_from(higher).map_or(u32::MAX, |h| h + 1)
        })
        .collect()
}

/// Builds scored records for one run from the roster rows and extracted
/// stats of every precinct that succeeded.
#[must_use]
pub fn score_precincts(collected: Vec<(PrecinctInfo, PrecinctStats)>) -> Vec<PrecinctRecord> {
    let severities: Vec<f64> = collected
        .iter()
        .map(|(_, stats)| weigh(&stats.breakdown))
        .collect();
    let scores = safety_scores(&severities);
    let ranks = safety_ranks(&scores);

    collected
        .into_iter()
        .zip(severities)
        .zip(scores.into_iter().zip(ranks))
        .map(|(((info, stats), severity), (score, rank))| PrecinctRecord {
            precinct: info.precinct,
            borough: info.borough,
            neighborhoods: info.neighborhoods,
            week_to_date: stats.week_to_date,
            month_to_date: stats.month_to_date,
            year_to_date: stats.year_to_date,
            crime_breakdown: stats.breakdown,
            weighted_severity: severity,
            safety_score: score,
            safety_rank: rank,
        })
        .collect()
}

/// Re-derives ranks from the records' scores, e.g. after a cache load.
pub fn rerank(records: &mut [PrecinctRecord]) {
    let scores: Vec<f64> = records.iter().map(|r| r.safety_score).collect();
    for (record, rank) in records.iter_mut().zip(safety_ranks(&scores)) {
        record.safety_rank = rank;
    }
}

/// Orders records safest first, then by precinct number.
pub fn sort_by_rank(records: &mut [PrecinctRecord]) {
    records.sort_by_key(|r| (r.safety_rank, r.precinct));
}

#[cfg(test)]
mod tests {
    use safety_map_crime_models::{CrimeBreakdown, CrimeType};

    use super::*;

    fn collected(precinct: u16, murders: u64) -> (PrecinctInfo, PrecinctStats) {
        let mut breakdown = CrimeBreakdown::zeroed();
        breakdown.set(CrimeType::Murder, murders);
        (
            PrecinctInfo {
                precinct,
                borough: "Manhattan".to_string(),
                neighborhoods: format!("Area {precinct}"),
            },
            PrecinctStats {
                week_to_date: murders,
                month_to_date: murders * 4,
                year_to_date: murders * 50,
                breakdown,
            },
        )
    }

    #[test]
    fn extremes_map_to_exact_bounds() {
        let scores = safety_scores(&[100.0, 0.0, 25.0]);
        assert!((scores[0] - 0.0).abs() < f64::EPSILON);
        assert!((scores[1] - 1.0).abs() < f64::EPSILON);
        assert!((scores[2] - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn all_scores_lie_in_unit_interval() {
        let scores = safety_scores(&[3.0, 17.5, 8.0, 120.0, 44.0]);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn equal_severities_all_score_one() {
        assert_eq!(safety_scores(&[42.0, 42.0, 42.0]), vec![1.0, 1.0, 1.0]);
        assert_eq!(safety_scores(&[5.0]), vec![1.0]);
        assert!(safety_scores(&[]).is_empty());
    }

    #[test]
    fn ties_share_the_lowest_rank() {
        let ranks = safety_ranks(&[0.5, 1.0, 0.5, 0.0, 1.0]);
        assert_eq!(ranks, vec![3, 1, 3, 5, 1]);
    }

    #[test]
    fn two_precinct_example() {
        // Precinct 1 weighs 100 (two murders), precinct 2 weighs 0.
        let records = score_precincts(vec![collected(1, 2), collected(2, 0)]);

        assert!((records[0].weighted_severity - 100.0).abs() < f64::EPSILON);
        assert!((records[0].safety_score - 0.0).abs() < f64::EPSILON);
        assert!((records[1].safety_score - 1.0).abs() < f64::EPSILON);
        assert_eq!(records[0].safety_rank, 2);
        assert_eq!(records[1].safety_rank, 1);
        assert_eq!(records[1].neighborhoods, "Area 2");
        assert_eq!(records[0].month_to_date, 8);
    }

    #[test]
    fn rerank_and_sort() {
        let mut records = score_precincts(vec![collected(7, 1), collected(5, 3), collected(9, 1)]);
        for record in &mut records {
            record.safety_rank = 0;
        }
        rerank(&mut records);
        sort_by_rank(&mut records);

        let order: Vec<(u32, u16)> = records
            .iter()
            .map(|r| (r.safety_rank, r.precinct))
            .collect();
        assert_eq!(order, vec![(1, 7), (1, 9), (3, 5)]);
    }
}
