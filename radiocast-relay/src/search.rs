//! Online station directory search
//!
//! Looks stations up by name in a radio-browser compatible directory and
//! remembers each caller's latest results, so a later play request can pick
//! one by its 1-based position in the list.

use crate::error::{Error, Result};
use async_trait::async_trait;
use radiocast_common::config::SearchConfig;
use radiocast_common::stations::validate_stream_url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Results kept per search
pub const MAX_RESULTS: usize = 10;

/// Caller name used when a request does not identify itself
pub const DEFAULT_CALLER: &str = "anonymous";

const USER_AGENT: &str = concat!("radiocast-relay/", env!("CARGO_PKG_VERSION"));

/// One station found by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub url: String,
}

/// Where station searches are answered
#[async_trait]
pub trait StationDirectory: Send + Sync {
    /// Up to `limit` stations whose name matches `query`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Station entry as returned by radio-browser
#[derive(Debug, Deserialize)]
struct DirectoryStation {
    name: String,
    /// Stream URL with playlists already resolved
    #[serde(default)]
    url_resolved: String,
}

/// radio-browser `json/stations/search` client
pub struct RadioBrowserClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl RadioBrowserClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::SearchFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Self::new(&config.endpoint, Duration::from_millis(config.timeout_ms))
    }
}

#[async_trait]
impl StationDirectory for RadioBrowserClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        debug!(query = %query, endpoint = %self.endpoint, "Querying station directory");

        let limit_param = limit.to_string();
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("name", query), ("limit", limit_param.as_str())])
            .send()
            .await
            .map_err(|e| Error::SearchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::SearchFailed(format!(
                "directory returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let stations: Vec<DirectoryStation> = response
            .json()
            .await
            .map_err(|e| Error::SearchFailed(format!("unreadable directory response: {}", e)))?;

        Ok(stations
            .into_iter()
            .take(limit)
            .map(|station| SearchHit {
                name: station.name.trim().to_string(),
                url: station.url_resolved,
            })
            .collect())
    }
}

/// Searches plus the latest results of every caller
pub struct StationSearch {
    directory: Arc<dyn StationDirectory>,
    results: Mutex<HashMap<String, Vec<SearchHit>>>,
}

impl StationSearch {
    pub fn new(directory: Arc<dyn StationDirectory>) -> Self {
        Self {
            directory,
            results: Mutex::new(HashMap::new()),
        }
    }

    /// Search by name and remember the hits for `caller`
    ///
    /// Hits without a usable stream URL are dropped. A search that finds
    /// nothing leaves the caller's previous results in place.
    pub async fn search(&self, caller: &str, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::BadRequest("search query must not be empty".to_string()));
        }

        let mut hits = self.directory.search(query, MAX_RESULTS).await?;
        hits.retain(|hit| validate_stream_url(&hit.url).is_ok());
        hits.truncate(MAX_RESULTS);
        info!(caller = %caller, query = %query, found = hits.len(), "Station search");

        if !hits.is_empty() {
            self.lock().insert(caller.to_string(), hits.clone());
        }
        Ok(hits)
    }

    /// Hit number `index` (1-based) from the caller's latest search
    pub fn pick(&self, caller: &str, index: usize) -> Result<SearchHit> {
        let results = self.lock();
        let hits = results
            .get(caller)
            .filter(|hits| !hits.is_empty())
            .ok_or_else(|| Error::NoSearchResults(caller.to_string()))?;

        index
            .checked_sub(1)
            .and_then(|i| hits.get(i))
            .cloned()
            .ok_or(Error::SearchIndexOutOfRange {
                index,
                available: hits.len(),
            })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<SearchHit>>> {
        // Lists are replaced whole, so a poisoned map is still consistent
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }
}
