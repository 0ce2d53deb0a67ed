//! Error types for radiocast-relay
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for radiocast-relay
#[derive(Error, Debug)]
pub enum Error {
    /// The voice transport for a room could not be joined
    #[error("Failed to join voice channel for room {room}: {reason}")]
    VoiceJoinFailed { room: String, reason: String },

    /// Decoder failed to start or the source is unreachable
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Control command for a room without a streaming session
    #[error("Nothing is playing in room {0}")]
    NothingPlaying(String),

    /// Volume outside 0-100
    #[error("Volume must be a number between 0 and 100, got {0}")]
    InvalidVolume(u32),

    /// Station name not in the catalog
    #[error("Unknown radio station: {0}")]
    UnknownStation(String),

    /// Reading PCM from the decoder failed
    #[error("PCM read error: {0}")]
    DecodeRead(String),

    /// Opus encoder creation or encoding failed
    #[error("Opus encode error: {0}")]
    Encode(String),

    /// The station directory could not be queried
    #[error("Station search failed: {0}")]
    SearchFailed(String),

    /// Play by search position before any successful search
    #[error("No search results for {0}; search for stations first")]
    NoSearchResults(String),

    /// Search position outside the caller's latest results
    #[error("Search result {index} out of range (1-{available})")]
    SearchIndexOutOfRange { index: usize, available: usize },

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from radiocast-common (configuration, stations)
    #[error(transparent)]
    Common(#[from] radiocast_common::Error),
}

/// Convenience Result type using radiocast-relay Error
pub type Result<T> = std::result::Result<T, Error>;
