//! HTTP fetcher for the NYPD weekly precinct reports.
//!
//! Each precinct's report lives at
//! `{base_url}/cs-en-us-{NNN}pct.xlsx`, where `NNN` is the zero-padded
//! precinct number. One GET per precinct, bounded by a timeout, no
//! retries.

use std::time::Duration;

use async_trait::async_trait;
use safety_map_precinct_models::format_precinct_id;

use crate::sheet::Sheet;
use crate::{SheetSource, SourceError};

/// Default location of the NYPD crime statistics spreadsheets.
pub const DEFAULT_BASE_URL: &str =
    "https://www.nyc.gov/assets/nypd/downloads/excel/crime_statistics";

/// Environment variable that overrides [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "SAFETY_MAP_SOURCE_URL";

/// Settings for the report fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// URL prefix the per-precinct file names are appended to.
    pub base_url: String,
    /// Upper bound on a single request, connect through body.
    pub timeout: Duration,
    /// Pause between consecutive precinct requests.
    pub request_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(500),
        }
    }
}

impl FetchConfig {
    /// Defaults, with the base URL taken from `SAFETY_MAP_SOURCE_URL` when
    /// set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            log::info!("Using report base URL from {BASE_URL_ENV}: {url}");
            config.base_url = url;
        }
        config
    }
}

/// Builds the report URL for `precinct`.
#[must_use]
pub fn report_url(base_url: &str, precinct: u16) -> String {
    format!(
        "{}/cs-en-us-{}pct.xlsx",
        base_url.trim_end_matches('/'),
        format_precinct_id(precinct)
    )
}

/// Downloads report workbooks over HTTP.
pub struct HttpSheetSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSheetSource {
    /// Creates a fetcher with a client bounded by `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    async fn fetch_sheet(&self, precinct: u16) -> Result<Sheet, SourceError> {
        let url = report_url(&self.base_url, precinct);
        log::debug!("GET {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        log::debug!("{url}: {} bytes", bytes.len());
        Sheet::from_xlsx(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_padded_report_urls() {
        assert_eq!(
            report_url(DEFAULT_BASE_URL, 1),
            "https://www.nyc.gov/assets/nypd/downloads/excel/crime_statistics/cs-en-us-001pct.xlsx"
        );
        assert_eq!(
            report_url("http://localhost:8080/", 45),
            "http://localhost:8080/cs-en-us-045pct.xlsx"
        );
        assert_eq!(
            report_url("http://localhost:8080", 123),
            "http://localhost:8080/cs-en-us-123pct.xlsx"
        );
    }

    #[test]
    fn default_config_matches_source_etiquette() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.request_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn unreachable_host_is_transient() {
        let source = HttpSheetSource::new(&FetchConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            request_delay: Duration::ZERO,
        })
        .unwrap();

        let err = source.fetch_sheet(1).await.unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {err}");
    }
}
