#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Produces the current set of scored precinct records.
//!
//! A [`Consolidator`] serves the cached table while it is fresh and
//! otherwise runs the whole roster through the report fetcher and stat
//! extractor, scores the result, and replaces the cache in one write.

pub mod cache;
pub mod freshness;
pub mod paths;
pub mod scoring;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Local};
use safety_map_precinct_models::{CacheEntry, PrecinctInfo, PrecinctRecord, format_precinct_id};
use safety_map_reference::Roster;
use safety_map_source::SheetSource;
use safety_map_source::extract::{PrecinctStats, SheetLayout, extract_stats};
use safety_map_source::progress::{ProgressCallback, null_progress};

use crate::cache::{CacheError, CacheStore};
use crate::freshness::{Freshness, FreshnessPolicy, StaleReason};
use crate::scoring::{score_precincts, sort_by_rank};

/// Errors that abort a consolidation run.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    /// The cache could not be written.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// There are no precincts to fetch.
    #[error("Precinct roster is empty")]
    EmptyRoster,

    /// Every precinct failed, so there is nothing to score or cache.
    #[error("No precinct reports could be read ({attempted} attempted)")]
    NoRecords {
        /// Number of precincts that were tried.
        attempted: usize,
    },
}

/// Outcome of one refresh across the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Scored records, safest first.
    pub records: Vec<PrecinctRecord>,
    /// Precincts whose report was fetched and read.
    pub fetched: usize,
    /// Precincts skipped because the request failed.
    pub transient_failures: Vec<u16>,
    /// Precincts skipped because their sheet did not match the layout.
    pub malformed: Vec<u16>,
}

impl RunReport {
    /// Total number of precincts skipped this run.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.transient_failures.len() + self.malformed.len()
    }
}

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Cache-aware builder of the consolidated precinct table.
pub struct Consolidator<'a> {
    roster: &'a Roster,
    source: &'a dyn SheetSource,
    store: &'a dyn CacheStore,
    layout: SheetLayout,
    policy: FreshnessPolicy,
    request_delay: Duration,
    progress: Arc<dyn ProgressCallback>,
    clock: fn() -> DateTime<FixedOffset>,
}

impl<'a> Consolidator<'a> {
    /// Creates a consolidator with the NYPD sheet layout, the default
    /// freshness policy, no request delay, and no progress reporting.
    #[must_use]
    pub fn new(
        roster: &'a Roster,
        source: &'a dyn SheetSource,
        store: &'a dyn CacheStore,
    ) -> Self {
        Self {
            roster,
            source,
            store,
            layout: SheetLayout::default(),
            policy: FreshnessPolicy::default(),
            request_delay: Duration::ZERO,
            progress: null_progress(),
            clock: local_now,
        }
    }

    /// Uses `layout` to read report sheets.
    #[must_use]
    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Uses `policy` to decide when the cache is stale.
    #[must_use]
    pub const fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Waits `delay` between consecutive precinct requests.
    #[must_use]
    pub const fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Reports per-precinct progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Replaces the wall clock, e.g. with a fixed instant in tests.
    #[must_use]
    pub const fn with_clock(mut self, clock: fn() -> DateTime<FixedOffset>) -> Self {
        self.clock = clock;
        self
    }

    /// Reads the cache and judges it against the freshness policy.
    ///
    /// See [`inspect_cache`].
    #[must_use]
    pub fn inspect(&self) -> (Option<CacheEntry>, Freshness) {
        inspect_cache(self.store, &self.policy, (self.clock)())
    }

    /// Returns the consolidated records, safest first.
    ///
    /// Serves the cache when it is fresh and `force_refresh` is `false`;
    /// otherwise fetches every roster precinct and rewrites the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConsolidateError`] if a refresh is needed and it produces
    /// no records or cannot be persisted.
    pub async fn get_consolidated_data(
        &self,
        force_refresh: bool,
    ) -> Result<Vec<PrecinctRecord>, ConsolidateError> {
        let reason = if force_refresh {
            StaleReason::Forced
        } else {
            match self.inspect() {
                (Some(entry), Freshness::Fresh) => {
                    log::info!(
                        "Serving {} cached precincts from {}",
                        entry.records.len(),
                        entry.cached_at.to_rfc3339()
                    );
                    let mut records = entry.records;
                    sort_by_rank(&mut records);
                    return Ok(records);
                }
                (_, Freshness::Stale(reason)) => reason,
                (None, Freshness::Fresh) => StaleReason::Missing,
            }
        };

        log::info!("Refreshing precinct data ({reason})");
        Ok(self.refresh().await?.records)
    }

    /// Fetches and scores every roster precinct, then replaces the cache.
    ///
    /// Precincts whose request fails or whose sheet is malformed are
    /// skipped for this run. The previous cache is left in place when no
    /// precinct succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ConsolidateError`] if the roster is empty, every precinct
    /// fails, or the cache cannot be written.
    pub async fn refresh(&self) -> Result<RunReport, ConsolidateError> {
        if self.roster.is_empty() {
            return Err(ConsolidateError::EmptyRoster);
        }

        let start = Instant::now();
        let attempted = self.roster.len();
        self.progress.set_total(attempted as u64);

        let mut collected: Vec<(PrecinctInfo, PrecinctStats)> = Vec::with_capacity(attempted);
        let mut transient_failures = Vec::new();
        let mut malformed = Vec::new();

        for (i, info) in self.roster.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let id = format_precinct_id(info.precinct);
            self.progress.set_message(format!("precinct {id}"));

            let result = match self.source.fetch_sheet(info.precinct).await {
                Ok(sheet) => extract_stats(&sheet, &self.layout),
                Err(e) => Err(e),
            };

            match result {
                Ok(stats) => {
                    log::debug!(
                        "Precinct {id}: {} this week, {} year to date",
                        stats.week_to_date,
                        stats.year_to_date
                    );
                    collected.push((info.clone(), stats));
                }
                Err(e) if e.is_transient() => {
                    log::warn!("Precinct {id}: fetch failed, skipping this run: {e}");
                    transient_failures.push(info.precinct);
                }
                Err(e) => {
                    log::warn!("Precinct {id}: unreadable report, skipping: {e}");
                    malformed.push(info.precinct);
                }
            }
            self.progress.inc(1);
        }

        let fetched = collected.len();
        self.progress.finish(format!("{fetched}/{attempted} precincts"));

        if collected.is_empty() {
            return Err(ConsolidateError::NoRecords { attempted });
        }

        let mut records = score_precincts(collected);
        sort_by_rank(&mut records);

        let entry = CacheEntry {
            records,
            cached_at: (self.clock)(),
        };
        self.store.write_atomic(&entry)?;

        log::info!(
            "Consolidated {fetched}/{attempted} precincts in {:.1}s ({} fetch failures, {} malformed)",
            start.elapsed().as_secs_f64(),
            transient_failures.len(),
            malformed.len()
        );

        Ok(RunReport {
            records: entry.records,
            fetched,
            transient_failures,
            malformed,
        })
    }
}

/// Reads `store` and judges the entry against `policy` as seen at `now`.
///
/// An unreadable cache, or one holding no records, is reported as stale
/// with no entry rather than as an error, so callers never serve an empty
/// table.
#[must_use]
pub fn inspect_cache(
    store: &dyn CacheStore,
    policy: &FreshnessPolicy,
    now: DateTime<FixedOffset>,
) -> (Option<CacheEntry>, Freshness) {
    match store.read() {
        Ok(Some(entry)) if entry.records.is_empty() => {
            log::warn!("Ignoring cache with no records");
            (None, Freshness::Stale(StaleReason::Missing))
        }
        Ok(Some(entry)) => {
            let freshness = policy.evaluate(entry.cached_at, now);
            (Some(entry), freshness)
        }
        Ok(None) => (None, Freshness::Stale(StaleReason::Missing)),
        Err(e) => {
            log::warn!("Ignoring unreadable cache: {e}");
            (None, Freshness::Stale(StaleReason::Unreadable))
        }
    }
}

/// Sums week-to-date crime counts per borough.
#[must_use]
pub fn borough_totals(records: &[PrecinctRecord]) -> BTreeMap<String, u64> {
    totals_by(records, |r| &r.borough)
}

/// Sums week-to-date crime counts per neighborhood label. Precincts that
/// share a label are added together.
#[must_use]
pub fn neighborhood_totals(records: &[PrecinctRecord]) -> BTreeMap<String, u64> {
    totals_by(records, |r| &r.neighborhoods)
}

fn totals_by(
    records: &[PrecinctRecord],
    key: impl Fn(&PrecinctRecord) -> &String,
) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(key(record).clone()).or_insert(0) += record.week_to_date;
    }
    totals
}
