//! Greenhouse job board adapter.

use crate::adapter::SourceAdapter;
use crate::error::{SourceFetchError, SourceResult};
use crate::extract::{extract_sections, extract_years, html_to_text};
use boardsync_client::{ClientConfig, Request, RequestKind, ResilientClient, Transport};
use boardsync_core::{Section, SourceRecord, LOCATION_TABLE};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Default API root of the public job board API.
pub const GREENHOUSE_API_BASE: &str = "https://boards-api.greenhouse.io/v1";

/// Default board token.
pub const DEFAULT_BOARD: &str = "andurilindustries";

/// Settings for a Greenhouse board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreenhouseConfig {
    /// Board token, as in `boards.greenhouse.io/<board>`.
    pub board: String,
    /// API root.
    pub api_base: String,
    /// Lowercase keywords; a posting is kept if its location contains one.
    pub location_keywords: Vec<String>,
    /// Whether to fetch each kept posting's body and department.
    pub fetch_details: bool,
}

impl GreenhouseConfig {
    /// Creates a configuration for a board, filtering on the location table.
    pub fn new(board: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            api_base: GREENHOUSE_API_BASE.to_string(),
            location_keywords: LOCATION_TABLE.iter().map(|(k, _)| (*k).to_string()).collect(),
            fetch_details: true,
        }
    }

    /// Sets the API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the location keywords.
    pub fn with_location_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.location_keywords = keywords.into_iter().map(|k| k.into().to_lowercase()).collect();
        self
    }

    /// Skips per-posting detail requests.
    pub fn listing_only(mut self) -> Self {
        self.fetch_details = false;
        self
    }

    fn jobs_url(&self) -> String {
        format!("{}/boards/{}/jobs", self.api_base, self.board)
    }

    fn matches_location(&self, location: &str) -> bool {
        let lower = location.to_lowercase();
        self.location_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for GreenhouseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD)
    }
}

/// Counts from the most recent fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Postings on the board.
    pub listed: usize,
    /// Postings matching the location filter.
    pub matched: usize,
    /// Postings enriched with their detail.
    pub detailed: usize,
    /// Postings kept without detail after the detail request failed.
    pub degraded: usize,
}

#[derive(Debug, Deserialize)]
struct Listing {
    jobs: Vec<ListingItem>,
}

#[derive(Debug, Deserialize)]
struct ListingItem {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    location: Option<Named>,
    #[serde(default)]
    absolute_url: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct JobDetail {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    departments: Vec<Named>,
}

impl ListingItem {
    fn key(&self) -> Option<String> {
        match &self.id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    fn location(&self) -> &str {
        self.location.as_ref().map_or("", |l| l.name.as_str())
    }
}

/// A [`SourceAdapter`] reading a public Greenhouse board.
pub struct GreenhouseSource<T: Transport> {
    client: ResilientClient<T>,
    config: GreenhouseConfig,
    last_report: RwLock<FetchReport>,
}

impl<T: Transport> GreenhouseSource<T> {
    /// Creates an adapter. Requests use the read retry policy of
    /// `client_config`.
    pub fn new(transport: T, client_config: ClientConfig, config: GreenhouseConfig) -> Self {
        Self {
            client: ResilientClient::new(transport, client_config),
            config,
            last_report: RwLock::new(FetchReport::default()),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &ResilientClient<T> {
        &self.client
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GreenhouseConfig {
        &self.config
    }

    /// Returns the counts of the most recent fetch.
    pub fn last_report(&self) -> FetchReport {
        *self.last_report.read()
    }

    fn fetch_detail(&self, key: &str) -> Option<JobDetail> {
        let url = format!("{}/{}", self.config.jobs_url(), key);
        let value = match self.client.execute(&Request::get(url), RequestKind::Read) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "detail fetch failed, keeping listing data");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(detail) => Some(detail),
            Err(err) => {
                warn!(key, error = %err, "malformed detail, keeping listing data");
                None
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for GreenhouseSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreenhouseSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builds a record from a listing entry and, if available, its detail.
fn build_record(key: String, item: &ListingItem, detail: Option<&JobDetail>) -> SourceRecord {
    let department = detail
        .and_then(|d| d.departments.first())
        .map_or("", |d| d.name.as_str());
    let mut record = SourceRecord::new(key, item.title.trim(), item.location(), department);

    if let Some(url) = item.absolute_url.as_deref().filter(|u| !u.trim().is_empty()) {
        record = record.with_apply_url(url);
    }
    if let Some(updated_at) = item.updated_at.as_deref().filter(|u| !u.trim().is_empty()) {
        record = record.with_updated_at(updated_at);
    }
    if let Some(detail) = detail {
        let text = detail.content.as_deref().map(html_to_text).unwrap_or_default();
        let sections = extract_sections(&text);
        if let Some(years) = sections
            .get(&Section::RequiredQualifications)
            .and_then(|s| extract_years(s))
        {
            record = record.with_years_required(years);
        }
        record = record.with_sections(sections);
    }
    record
}

impl<T: Transport> SourceAdapter for GreenhouseSource<T> {
    fn name(&self) -> &str {
        "greenhouse"
    }

    fn fetch_listing(&self) -> SourceResult<Vec<SourceRecord>> {
        let url = self.config.jobs_url();
        info!(board = %self.config.board, "fetching job listing");

        let value = self.client.execute(&Request::get(url), RequestKind::Read)?;
        let listing: Listing = serde_json::from_value(value)
            .map_err(|err| SourceFetchError::Malformed(err.to_string()))?;

        let mut report = FetchReport {
            listed: listing.jobs.len(),
            ..FetchReport::default()
        };
        let mut records = Vec::new();

        for item in &listing.jobs {
            if !self.config.matches_location(item.location()) {
                continue;
            }
            let key = item.key().ok_or_else(|| {
                SourceFetchError::Malformed(format!("posting {:?} has no usable id", item.title))
            })?;
            report.matched += 1;

            let detail = if self.config.fetch_details {
                let detail = self.fetch_detail(&key);
                if detail.is_some() {
                    report.detailed += 1;
                } else {
                    report.degraded += 1;
                }
                detail
            } else {
                None
            };

            debug!(key = %key, title = %item.title, "kept posting");
            records.push(build_record(key, item, detail.as_ref()));
        }

        info!(
            listed = report.listed,
            matched = report.matched,
            detailed = report.detailed,
            degraded = report.degraded,
            "job listing fetched"
        );
        *self.last_report.write() = report;
        Ok(records)
    }
}
