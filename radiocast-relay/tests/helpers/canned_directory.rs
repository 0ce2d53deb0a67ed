//! Station directory that answers from a fixed list

use async_trait::async_trait;
use radiocast_relay::search::{SearchHit, StationDirectory};
use radiocast_relay::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Case-insensitive substring match over `stations`
#[derive(Clone, Default)]
pub struct CannedDirectory {
    stations: Vec<SearchHit>,
    offline: bool,
    queries: Arc<AtomicUsize>,
}

impl CannedDirectory {
    pub fn new(stations: &[(&str, &str)]) -> Self {
        Self {
            stations: stations
                .iter()
                .map(|(name, url)| SearchHit {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Every search fails as if the directory were unreachable
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationDirectory for CannedDirectory {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(Error::SearchFailed("directory offline".to_string()));
        }
        let query = query.to_lowercase();
        Ok(self
            .stations
            .iter()
            .filter(|hit| hit.name.to_lowercase().contains(&query))
            .take(limit)
            .cloned()
            .collect())
    }
}
