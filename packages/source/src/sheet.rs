//! Headerless cell grid decoded from a report workbook.
//!
//! Row and column indices are absolute (zero-based from cell `A1`), so the
//! fixed offsets in [`crate::extract::SheetLayout`] line up with the
//! published report regardless of where the used range starts.

use std::io::Cursor;

use calamine::{Data, Reader as _, Xlsx};

use crate::SourceError;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value.
    Empty,
    /// A numeric value.
    Number(f64),
    /// A text value.
    Text(String),
}

impl Cell {
    /// Reads the cell as a non-negative whole count.
    ///
    /// Numbers and numeric text are truncated toward zero. Anything
    /// missing, non-numeric, negative, or non-finite reads as `0` so that
    /// one bad cell never aborts a precinct.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_count(&self) -> u64 {
        let value = match self {
            Self::Empty => return 0,
            Self::Number(n) => *n,
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => n,
                Err(_) => return 0,
            },
        };
        if value.is_finite() && value > 0.0 {
            value.trunc() as u64
        } else {
            0
        }
    }
}

impl From<&Data> for Cell {
    #[allow(clippy::cast_precision_loss)]
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Number(if *b { 1.0 } else { 0.0 }),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            _ => Self::Empty,
        }
    }
}

/// A rectangular-ish grid of cells, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Wraps an existing grid.
    #[must_use]
    pub const fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Decodes the first worksheet of an `.xlsx` payload.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Workbook`] if the payload is not a readable
    /// workbook or has no worksheets.
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self, SourceError> {
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes)).map_err(|e| SourceError::Workbook {
                message: e.to_string(),
            })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SourceError::Workbook {
                message: "workbook has no worksheets".to_string(),
            })?
            .map_err(|e| SourceError::Workbook {
                message: e.to_string(),
            })?;

        let Some((start_row, start_col)) = range.start() else {
            return Ok(Self::default());
        };
        let start_row = start_row as usize;
        let start_col = start_col as usize;

        let mut rows = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }

        Ok(Self { rows })
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Returns the cell at `(row, col)`, or `None` when out of bounds.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_numbers_and_numeric_text() {
        assert_eq!(Cell::Number(12.0).as_count(), 12);
        assert_eq!(Cell::Number(3.9).as_count(), 3);
        assert_eq!(Cell::Text(" 42 ".to_string()).as_count(), 42);
        assert_eq!(Cell::Text("7.0".to_string()).as_count(), 7);
    }

    #[test]
    fn unparseable_cells_count_as_zero() {
        assert_eq!(Cell::Empty.as_count(), 0);
        assert_eq!(Cell::Text("***.*".to_string()).as_count(), 0);
        assert_eq!(Cell::Number(f64::NAN).as_count(), 0);
        assert_eq!(Cell::Number(-4.0).as_count(), 0);
    }

    #[test]
    fn converts_workbook_data() {
        assert_eq!(Cell::from(&Data::Int(5)), Cell::Number(5.0));
        assert_eq!(
            Cell::from(&Data::String("Murder".to_string())),
            Cell::Text("Murder".to_string())
        );
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn rejects_non_workbook_payload() {
        let result = Sheet::from_xlsx(b"<html>Not Found</html>");
        assert!(matches!(result, Err(SourceError::Workbook { .. })));
    }

    #[test]
    fn out_of_bounds_cells_are_none() {
        let sheet = Sheet::new(vec![vec![Cell::Number(1.0)], vec![]]);
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.width(), 1);
        assert_eq!(sheet.cell(0, 0), Some(&Cell::Number(1.0)));
        assert!(sheet.cell(1, 0).is_none());
        assert!(sheet.cell(5, 5).is_none());
    }
}
