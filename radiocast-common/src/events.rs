//! Event types for the Radiocast event system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a room session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EndReason {
    /// Stop was requested (stop command, replacement, or shutdown)
    Requested,
    /// Decoder stream ended
    EndOfStream,
    /// Reading PCM from the decoder failed
    ReadError(String),
    /// Opus encoding failed
    EncodeError(String),
    /// Transport sink stopped accepting frames
    SinkNotReady,
    /// Pipeline loop panicked
    Panicked,
}

impl EndReason {
    /// True for endings nobody asked for
    pub fn is_failure(&self) -> bool {
        !matches!(self, EndReason::Requested | EndReason::EndOfStream)
    }
}

/// Radiocast event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayEvent {
    /// Session entered streaming
    SessionStarted {
        room_id: String,
        session_id: Uuid,
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// Session reached its terminal state and released its resources
    SessionEnded {
        room_id: String,
        session_id: Uuid,
        reason: EndReason,
        frames_sent: u64,
        timestamp: DateTime<Utc>,
    },

    /// Volume changed
    VolumeChanged {
        room_id: String,
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// Frame production suspended
    PlaybackPaused {
        room_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Frame production resumed
    PlaybackResumed {
        room_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl RelayEvent {
    /// Room the event belongs to
    pub fn room_id(&self) -> &str {
        match self {
            RelayEvent::SessionStarted { room_id, .. }
            | RelayEvent::SessionEnded { room_id, .. }
            | RelayEvent::VolumeChanged { room_id, .. }
            | RelayEvent::PlaybackPaused { room_id, .. }
            | RelayEvent::PlaybackResumed { room_id, .. } => room_id,
        }
    }
}
