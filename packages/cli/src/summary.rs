//! Plain-text summaries of a consolidated run.

use std::collections::BTreeMap;

use safety_map_precinct_models::{PrecinctRecord, format_precinct_id};

/// Number of safest precincts listed.
const TOP: usize = 10;

/// Number of least safe precincts listed.
const BOTTOM: usize = 5;

fn row(record: &PrecinctRecord) -> String {
    let label = record.safety_label().to_string();
    format!(
        "{:>4}  {:<4} {:<14} {:>6.3}  {:<13} {}",
        record.safety_rank,
        format_precinct_id(record.precinct),
        record.borough,
        record.safety_score,
        label,
        record.neighborhoods
    )
}

/// Renders the safest and least safe precincts of rank-sorted `records`.
pub fn ranking(records: &[PrecinctRecord]) -> String {
    let header = format!(
        "{:>4}  {:<4} {:<14} {:>6}  {:<13} NEIGHBORHOODS",
        "RANK", "PCT", "BOROUGH", "SCORE", "LABEL"
    );
    let mut lines = vec![format!("Safest {TOP} precincts:"), header.clone()];
    lines.extend(records.iter().take(TOP).map(row));

    let tail = records.len().saturating_sub(BOTTOM).max(TOP.min(records.len()));
    if tail < records.len() {
        lines.push(String::new());
        lines.push(format!("Least safe {BOTTOM} precincts:"));
        lines.push(header);
        lines.extend(records[tail..].iter().map(row));
    }
    lines.join("\n")
}

/// Renders week-to-date totals per borough or neighborhood.
pub fn totals(counts: &BTreeMap<String, u64>) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("  {name:<36} {count:>6}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use safety_map_crime_models::CrimeBreakdown;

    use super::*;

    fn records(n: u16) -> Vec<PrecinctRecord> {
        (1..=n)
            .map(|i| PrecinctRecord {
                precinct: i,
                borough: "Bronx".to_string(),
                neighborhoods: format!("Area {i}"),
                week_to_date: u64::from(i),
                month_to_date: 0,
                year_to_date: 0,
                crime_breakdown: CrimeBreakdown::zeroed(),
                weighted_severity: f64::from(i),
                safety_score: 1.0 - f64::from(i) / f64::from(n),
                safety_rank: u32::from(i),
            })
            .collect()
    }

    #[test]
    fn lists_top_and_bottom_without_overlap() {
        let text = ranking(&records(20));
        assert!(text.contains("Area 1\n"));
        assert!(text.contains("Area 10\n"));
        assert!(!text.contains("Area 11\n"));
        assert!(!text.contains("Area 15\n"));
        assert!(text.contains("Area 16\n"));
        assert!(text.ends_with("Area 20"));
    }

    #[test]
    fn short_runs_skip_the_bottom_section() {
        let text = ranking(&records(8));
        assert!(!text.contains("Least safe"));
        assert!(text.ends_with("Area 8"));

        let text = ranking(&records(12));
        assert!(text.contains("Least safe"));
        assert!(text.contains("Area 11\n"));
        assert!(text.ends_with("Area 12"));
    }

    #[test]
    fn total_lines() {
        let by_borough: BTreeMap<String, u64> = [("Bronx".to_string(), 40), ("Queens".to_string(), 7)]
            .into_iter()
            .collect();
        let text = totals(&by_borough);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("  Bronx"));
    }
}
