//! Reads crime counts out of a precinct report sheet.
//!
//! The report is a fixed-format spreadsheet: the seven major felonies sit
//! on known rows, all itemized categories span a known row range, and the
//! week, 28-day, and year-to-date figures sit in known columns. Every
//! offset lives in [`SheetLayout`] so a format change touches one place.

use std::ops::RangeInclusive;

use safety_map_crime_models::{CrimeBreakdown, CrimeType};

use crate::SourceError;
use crate::sheet::Sheet;

/// Row and column offsets of the published precinct report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// Row holding each major felony's counts.
    pub breakdown_rows: &'static [(CrimeType, usize)],
    /// Rows summed for the rolling totals (all itemized categories).
    pub total_rows: RangeInclusive<usize>,
    /// "Week to Date" column; also the column the breakdown is read from.
    pub week_to_date_col: usize,
    /// "28 Day" column.
    pub month_to_date_col: usize,
    /// "Year to Date" column.
    pub year_to_date_col: usize,
}

impl SheetLayout {
    /// Layout of the NYPD `cs-en-us-NNNpct.xlsx` weekly report.
    pub const NYPD: Self = Self {
        breakdown_rows: &[
            (CrimeType::Murder, 13),
            (CrimeType::Rape, 14),
            (CrimeType::Robbery, 15),
            (CrimeType::FelonyAssault, 16),
            (CrimeType::Burglary, 17),
            (CrimeType::GrandLarceny, 18),
            (CrimeType::GrandLarcenyAuto, 19),
        ],
        total_rows: 13..=32,
        week_to_date_col: 2,
        month_to_date_col: 5,
        year_to_date_col: 8,
    };

    /// Minimum `(height, width)` a sheet needs for every offset to exist.
    #[must_use]
    pub fn required_shape(&self) -> (usize, usize) {
        let last_breakdown_row = self
            .breakdown_rows
            .iter()
            .map(|(_, row)| *row)
            .max()
            .unwrap_or(0);
        let last_row = last_breakdown_row.max(*self.total_rows.end());
        let last_col = self
            .week_to_date_col
            .max(self.month_to_date_col)
            .max(self.year_to_date_col);
        (last_row + 1, last_col + 1)
    }
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self::NYPD
    }
}

/// Counts extracted from one precinct's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecinctStats {
    /// Week-to-date total across all itemized categories.
    pub week_to_date: u64,
    /// 28-day total across all itemized categories.
    pub month_to_date: u64,
    /// Year-to-date total across all itemized categories.
    pub year_to_date: u64,
    /// Week-to-date counts of the major felonies.
    pub breakdown: CrimeBreakdown,
}

/// Extracts the breakdown and rolling totals from a report sheet.
///
/// Individual cells that are empty or unparseable count as zero.
///
/// # Errors
///
/// Returns [`SourceError::MalformedSheet`] if the sheet is too short or
/// too narrow for the layout's offsets.
pub fn extract_stats(sheet: &Sheet, layout: &SheetLayout) -> Result<PrecinctStats, SourceError> {
    let (min_height, min_width) = layout.required_shape();
    if sheet.height() < min_height || sheet.width() < min_width {
        return Err(SourceError::MalformedSheet {
            message: format!(
                "expected at least {min_height}x{min_width} cells, found {}x{}",
                sheet.height(),
                sheet.width()
            ),
        });
    }

    let count = |row: usize, col: usize| sheet.cell(row, col).map_or(0, |c| c.as_count());

    let breakdown = layout
        .breakdown_rows
        .iter()
        .map(|(crime_type, row)| (*crime_type, count(*row, layout.week_to_date_col)))
        .collect();

    let mut stats = PrecinctStats {
        week_to_date: 0,
        month_to_date: 0,
        year_to_date: 0,
        breakdown,
    };
    for row in layout.total_rows.clone() {
        stats.week_to_date += count(row, layout.week_to_date_col);
        stats.month_to_date += count(row, layout.month_to_date_col);
        stats.year_to_date += count(row, layout.year_to_date_col);
    }

    Ok(stats)
}
