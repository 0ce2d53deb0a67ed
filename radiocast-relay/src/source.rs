//! Source name resolution
//!
//! A play request names a station, a raw stream URL or a position in the
//! caller's latest station search. Names go through a [`SourceResolver`];
//! URLs are validated and used as-is.

use crate::error::{Error, Result};
use crate::search::StationSearch;
use radiocast_common::stations::validate_stream_url;
use radiocast_common::StationCatalog;

/// Maps a station name to a stream locator
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<String>;
}

impl SourceResolver for StationCatalog {
    fn resolve(&self, name: &str) -> Option<String> {
        StationCatalog::resolve(self, name)
    }
}

/// What a play request asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRequest {
    Station(String),
    Url(String),
    /// 1-based position in `caller`'s latest search results
    SearchResult { caller: String, index: usize },
}

impl SourceRequest {
    /// Turn the request into a locator the decoder can open
    pub fn locate(&self, resolver: &dyn SourceResolver, search: &StationSearch) -> Result<String> {
        match self {
            SourceRequest::Station(name) => resolver
                .resolve(name)
                .ok_or_else(|| Error::UnknownStation(name.clone())),
            SourceRequest::Url(url) => {
                validate_stream_url(url)?;
                Ok(url.clone())
            }
            SourceRequest::SearchResult { caller, index } => {
                search.pick(caller, *index).map(|hit| hit.url)
            }
        }
    }
}
