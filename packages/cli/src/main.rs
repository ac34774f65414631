#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the NYC precinct safety map pipeline.
//!
//! Consolidates the weekly per-precinct NYPD reports into a scored, cached
//! table and projects it onto ZIP code and precinct polygons for the map.
//!
//! Uses `indicatif-log-bridge` (via [`safety_map_cli_utils::init_logger`])
//! so log lines and the download progress bar never fight for the
//! terminal.

mod summary;

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use safety_map_cli_utils::{IndicatifProgress, MultiProgress};
use safety_map_consolidate::cache::{CacheStore, CsvCacheStore};
use safety_map_consolidate::freshness::{Freshness, FreshnessPolicy};
use safety_map_consolidate::scoring::sort_by_rank;
use safety_map_consolidate::{
    Consolidator, borough_totals, inspect_cache, neighborhood_totals, paths,
};
use safety_map_geography::precinct::enrich_precinct_features;
use safety_map_geography::zip::remap_zip_features;
use safety_map_geography::{load_feature_collection, to_pretty_json};
use safety_map_precinct_models::{PrecinctRecord, ZipLookup};
use safety_map_reference::Roster;
use safety_map_source::fetch::{FetchConfig, HttpSheetSource};

#[derive(Parser)]
#[command(name = "safety_map", about = "NYC precinct safety map pipeline")]
struct Cli {
    /// Precinct roster TOML to use instead of the built-in roster
    #[arg(long, global = true)]
    roster: Option<PathBuf>,
    /// ZIP-to-precinct lookup TOML to use instead of the built-in table
    #[arg(long, global = true)]
    zip_lookup: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every precinct report (unless the cache is fresh) and rebuild
    /// the consolidated table
    Consolidate {
        /// Refresh even if the cache is fresh
        #[arg(long)]
        force: bool,
    },
    /// Enrich ZIP code polygons with the cached precinct scores
    Remap {
        /// ZIP code `GeoJSON` input (defaults to the data directory copy)
        #[arg(long)]
        zip_geojson: Option<PathBuf>,
        /// Output path (defaults to `nyc_zipcodes_with_crime.geojson`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Enrich precinct polygons with the cached precinct scores
    Precincts {
        /// Precinct `GeoJSON` input (defaults to the data directory copy)
        #[arg(long)]
        precinct_geojson: Option<PathBuf>,
        /// Output path (defaults to `nyc_precincts_with_crime.geojson`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Consolidate, then enrich both ZIP and precinct polygons
    Run {
        /// Refresh even if the cache is fresh
        #[arg(long)]
        force: bool,
    },
    /// Show whether the cache is fresh and summarize its contents
    Status {
        /// Also list week-to-date totals per neighborhood
        #[arg(long)]
        neighborhoods: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = safety_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Consolidate { force } => {
            let roster = roster(cli.roster.as_deref())?;
            let records = consolidate(&multi, &roster, force).await?;
            print_summary(&records);
        }
        Commands::Remap {
            zip_geojson,
            output,
        } => {
            let lookup = zip_lookup(cli.zip_lookup.as_deref())?;
            let records = cached_records(&CsvCacheStore::open_default(), now())?;
            remap_zips(
                &records,
                &lookup,
                &zip_geojson.unwrap_or_else(paths::zip_geojson_path),
                &output.unwrap_or_else(paths::zip_output_path),
            )?;
        }
        Commands::Precincts {
            precinct_geojson,
            output,
        } => {
            let records = cached_records(&CsvCacheStore::open_default(), now())?;
            enrich_precincts(
                &records,
                &precinct_geojson.unwrap_or_else(paths::precinct_geojson_path),
                &output.unwrap_or_else(paths::precinct_output_path),
            )?;
        }
        Commands::Run { force } => {
            let roster = roster(cli.roster.as_deref())?;
            let lookup = zip_lookup(cli.zip_lookup.as_deref())?;
            let records = consolidate(&multi, &roster, force).await?;
            print_summary(&records);
            remap_zips(
                &records,
                &lookup,
                &paths::zip_geojson_path(),
                &paths::zip_output_path(),
            )?;
            enrich_precincts(
                &records,
                &paths::precinct_geojson_path(),
                &paths::precinct_output_path(),
            )?;
        }
        Commands::Status { neighborhoods } => status(neighborhoods),
    }

    Ok(())
}

fn roster(path: Option<&Path>) -> Result<Roster, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => safety_map_reference::load_roster(path)?,
        None => safety_map_reference::embedded_roster(),
    })
}

fn zip_lookup(path: Option<&Path>) -> Result<ZipLookup, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => safety_map_reference::load_zip_lookup(path)?,
        None => safety_map_reference::embedded_zip_lookup(),
    })
}

async fn consolidate(
    multi: &MultiProgress,
    roster: &Roster,
    force: bool,
) -> Result<Vec<PrecinctRecord>, Box<dyn std::error::Error>> {
    let config = FetchConfig::from_env();
    let source = HttpSheetSource::new(&config)?;
    let store = CsvCacheStore::open_default();
    let progress = IndicatifProgress::precincts_bar(multi, "Precinct reports");

    let records = Consolidator::new(roster, &source, &store)
        .with_request_delay(config.request_delay)
        .with_progress(progress.clone())
        .get_consolidated_data(force)
        .await?;

    progress.finish(format!("{} precincts", records.len()));
    Ok(records)
}

fn now() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}

/// Loads the cached table for the remap commands, which never fetch.
///
/// A stale table is used with a warning. A missing, empty, or unreadable
/// one is an error that points at `consolidate`.
fn cached_records(
    store: &dyn CacheStore,
    now: DateTime<FixedOffset>,
) -> Result<Vec<PrecinctRecord>, Box<dyn std::error::Error>> {
    let entry = match inspect_cache(store, &FreshnessPolicy::default(), now) {
        (Some(entry), Freshness::Fresh) => entry,
        (Some(entry), Freshness::Stale(reason)) => {
            log::warn!("Using stale cached data ({reason})");
            entry
        }
        (None, freshness) => {
            let reason = match freshness {
                Freshness::Stale(reason) => reason.to_string(),
                Freshness::Fresh => "no cache present".to_string(),
            };
            return Err(format!(
                "No usable consolidated data at {} ({reason}); run `safety_map consolidate` first",
                paths::cache_table_path().display()
            )
            .into());
        }
    };

    let mut records = entry.records;
    sort_by_rank(&mut records);
    Ok(records)
}

fn remap_zips(
    records: &[PrecinctRecord],
    lookup: &ZipLookup,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut collection = load_feature_collection(input)?;
    let stats = remap_zip_features(&mut collection, records, lookup)?;
    paths::write_atomic(output, &to_pretty_json(&collection)?)?;
    println!(
        "Mapped {} of {} ZIP codes; wrote {}",
        stats.mapped,
        stats.mapped + stats.defaulted,
        output.display()
    );
    Ok(())
}

fn enrich_precincts(
    records: &[PrecinctRecord],
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut collection = load_feature_collection(input)?;
    let stats = enrich_precinct_features(&mut collection, records)?;
    paths::write_atomic(output, &to_pretty_json(&collection)?)?;
    println!(
        "Joined {} of {} precinct polygons; wrote {}",
        stats.joined,
        stats.joined + stats.unmatched,
        output.display()
    );
    Ok(())
}

fn print_summary(records: &[PrecinctRecord]) {
    println!("Consolidated {} precincts", records.len());
    println!();
    println!("{}", summary::ranking(records));
}

fn status(neighborhoods: bool) {
    let store = CsvCacheStore::open_default();
    let now = now();
    let (entry, freshness) = inspect_cache(&store, &FreshnessPolicy::default(), now);

    println!("Cache:      {}", paths::cache_table_path().display());
    println!("Freshness:  {}", describe(freshness));
    let Some(entry) = entry else {
        return;
    };

    let age = now.signed_duration_since(entry.cached_at);
    println!(
        "Written:    {} ({}h ago)",
        entry.cached_at.to_rfc3339(),
        age.num_hours()
    );
    println!("Precincts:  {}", entry.records.len());
    println!();
    println!("Week-to-date crimes by borough:");
    println!("{}", summary::totals(&borough_totals(&entry.records)));
    if neighborhoods {
        println!();
        println!("Week-to-date crimes by neighborhood:");
        println!("{}", summary::totals(&neighborhood_totals(&entry.records)));
    }

    let mut records = entry.records;
    sort_by_rank(&mut records);
    println!();
    println!("{}", summary::ranking(&records));
}

fn describe(freshness: Freshness) -> String {
    match freshness {
        Freshness::Fresh => "fresh".to_string(),
        Freshness::Stale(reason) => format!("stale ({reason})"),
    }
}

#[cfg(test)]
mod tests {
    use safety_map_consolidate::cache::MemoryCacheStore;
    use safety_map_consolidate::freshness::StaleReason;
    use safety_map_crime_models::CrimeBreakdown;
    use safety_map_precinct_models::CacheEntry;

    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn record(precinct: u16, rank: u32) -> PrecinctRecord {
        PrecinctRecord {
            precinct,
            borough: "Brooklyn".to_string(),
            neighborhoods: "Bushwick".to_string(),
            week_to_date: 12,
            month_to_date: 50,
            year_to_date: 700,
            crime_breakdown: CrimeBreakdown::zeroed(),
            weighted_severity: 40.0,
            safety_score: 0.5,
            safety_rank: rank,
        }
    }

    #[test]
    fn unreadable_cache_is_a_clear_error() {
        let dir = std::env::temp_dir().join("safety_map_cli_unreadable");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let store = CsvCacheStore::new(dir.join("cache.csv"), dir.join("cache_date.txt"));
        store
            .write_atomic(&CacheEntry {
                records: vec![record(83, 1)],
                cached_at: at("2026-10-14T09:00:00-04:00"),
            })
            .unwrap();
        std::fs::write(dir.join("cache_date.txt"), "last tuesday").unwrap();

        let err = cached_records(&store, at("2026-10-14T12:00:00-04:00")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cache unreadable"), "{message}");
        assert!(message.contains("safety_map consolidate"), "{message}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_cache_is_a_clear_error() {
        let store = MemoryCacheStore::with_entry(CacheEntry {
            records: Vec::new(),
            cached_at: at("2026-10-14T09:00:00-04:00"),
        });
        let err = cached_records(&store, at("2026-10-14T12:00:00-04:00")).unwrap_err();
        assert!(err.to_string().contains("no cache present"));
    }

    #[test]
    fn stale_cache_is_still_served_in_rank_order() {
        let store = MemoryCacheStore::with_entry(CacheEntry {
            records: vec![record(90, 2), record(83, 1)],
            cached_at: at("2026-09-01T09:00:00-04:00"),
        });
        let records = cached_records(&store, at("2026-10-14T12:00:00-04:00")).unwrap();
        let precincts: Vec<u16> = records.iter().map(|r| r.precinct).collect();
        assert_eq!(precincts, vec![83, 90]);
    }

    #[test]
    fn describes_freshness() {
        assert_eq!(describe(Freshness::Fresh), "fresh");
        assert_eq!(
            describe(Freshness::Stale(StaleReason::Unreadable)),
            "stale (cache unreadable)"
        );
    }
}
