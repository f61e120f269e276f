//! HTTP client for the facility API.
//!
//! Each listing is a one-shot GET: no retry, no backoff. A failure is reported
//! as [`MapError::LoadFailure`] and it is up to the caller (usually
//! [`FacilitySource::load_session`]) to surface it.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;

use crate::session::MapSession;
use crate::store::{parse_facility_listing, parse_filter_options, FilterOptions};
use crate::{FacilityRecord, MapError, Result};

const FACILITIES_PATH: &str = "/api/sports";
const DISTRICTS_PATH: &str = "/api/districts";
const SPORT_TYPES_PATH: &str = "/api/sport-types";

/// Where and how to reach the facility API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Default: "http://localhost:5000"
    pub base_url: String,
    /// Per-request timeout. Default: 30s
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fetches the facility listing and filter metadata.
pub struct FacilitySource {
    client: Client,
    base_url: String,
}

impl FacilitySource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MapError::load("facility source", format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch and parse the bulk facility listing.
    pub async fn fetch_facilities(&self) -> Result<Vec<FacilityRecord>> {
        let body = self.fetch_text(FACILITIES_PATH, "facilities").await?;
        let records = parse_facility_listing(&body)?;
        info!("[FacilitySource] Received {} facilities", records.len());
        Ok(records)
    }

    /// Fetch both metadata listings concurrently.
    pub async fn fetch_filter_options(&self) -> Result<FilterOptions> {
        let (districts, sport_types) = futures::try_join!(
            self.fetch_text(DISTRICTS_PATH, "districts"),
            self.fetch_text(SPORT_TYPES_PATH, "sport types"),
        )?;
        parse_filter_options(&districts, &sport_types)
    }

    /// Load a session: facilities first, then filter options.
    ///
    /// A facility failure empties the session and is returned. Missing filter
    /// options only cost the filter dropdowns, so that failure is logged and
    /// the session keeps its previous options.
    pub async fn load_session(&self, session: &mut MapSession) -> Result<usize> {
        let count = session.load_result(self.fetch_facilities().await)?;

        match self.fetch_filter_options().await {
            Ok(options) => session.set_filter_options(options),
            Err(e) => warn!("[FacilitySource] Filter options unavailable: {}", e),
        }
        Ok(count)
    }

    /// Blocking wrapper around [`load_session`](Self::load_session) for
    /// callers without an async runtime of their own.
    pub fn load_session_blocking(config: SourceConfig, session: &mut MapSession) -> Result<usize> {
        use tokio::runtime::Builder;

        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MapError::load("facility source", format!("Runtime error: {}", e)))?;

        let source = Self::new(config)?;
        rt.block_on(source.load_session(session))
    }

    async fn fetch_text(&self, path: &str, source_name: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MapError::load(source_name, format!("Request error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MapError::load(source_name, format!("Body download error: {}", e)))?;

        debug!(
            "[FacilitySource] GET {} -> {} ({:.1}KB in {:?})",
            url,
            status,
            body.len() as f64 / 1024.0,
            start.elapsed()
        );

        if !status.is_success() {
            // The API puts its reason in an {"error": ...} body when it can
            let reason = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .map_or_else(|| format!("HTTP {}", status), |e| format!("HTTP {}: {}", status, e));
            return Err(MapError::load(source_name, reason));
        }

        Ok(body)
    }
}
