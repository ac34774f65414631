#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-precinct report fetching and statistics extraction.
//!
//! The NYPD publishes one weekly spreadsheet per precinct. A
//! [`SheetSource`] retrieves and decodes one precinct's sheet into a
//! [`sheet::Sheet`] grid, and [`extract::extract_stats`] reads the crime
//! counts out of it using a fixed [`extract::SheetLayout`].

pub mod extract;
pub mod fetch;
pub mod progress;
pub mod sheet;

use async_trait::async_trait;

use crate::sheet::Sheet;

/// Errors that can occur while fetching or reading a precinct report.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (timeout, DNS, connection reset, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than `200 OK`.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The payload is not a readable workbook.
    #[error("Workbook error: {message}")]
    Workbook {
        /// Description of what went wrong.
        message: String,
    },

    /// The sheet decoded but its shape does not match the report layout.
    #[error("Malformed sheet: {message}")]
    MalformedSheet {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Returns `true` for network-level failures that should clear up on
    /// a later run, as opposed to malformed source data.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}

/// Something that can produce the raw report sheet for a precinct.
///
/// Implementations make exactly one attempt per call; a failed precinct
/// is picked up again on the next scheduled run.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Retrieves and decodes the report sheet for `precinct`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails, the server does not
    /// answer `200 OK`, or the payload is not a readable workbook.
    async fn fetch_sheet(&self, precinct: u16) -> Result<Sheet, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_errors() {
        let status = SourceError::Status {
            status: 404,
            url: "https://example.com/cs-en-us-001pct.xlsx".to_string(),
        };
        assert!(status.is_transient());

        let malformed = SourceError::MalformedSheet {
            message: "too short".to_string(),
        };
        assert!(!malformed.is_transient());

        let workbook = SourceError::Workbook {
            message: "not a zip".to_string(),
        };
        assert!(!workbook.is_transient());
    }
}
