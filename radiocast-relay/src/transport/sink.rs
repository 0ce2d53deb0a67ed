//! Transport sink and gateway capabilities
//!
//! The relay does not speak any voice protocol itself. A [`VoiceGateway`]
//! joins a room and hands back a [`TransportSink`]; the sink takes encoded
//! frames in order and deals with framing, encryption and the wire.

use crate::audio::types::EncodedFrame;
use crate::error::Result;
use crate::types::RoomId;
use async_trait::async_trait;

/// What the transport did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame accepted
    Ready,
    /// Connection exists but cannot take frames right now
    Busy,
    /// Destination is gone
    Closed,
}

/// Destination for one room's encoded frames
///
/// Only the owning session's pipeline task ever writes to a sink.
#[async_trait]
pub trait TransportSink: Send {
    /// Push one frame
    ///
    /// Waits while the transport applies backpressure.
    async fn try_send(&mut self, frame: EncodedFrame) -> SendOutcome;

    /// Toggle the speaking indicator
    async fn set_speaking(&mut self, speaking: bool);

    /// Leave the room and free the connection
    async fn release(&mut self);
}

/// Joins rooms on the voice transport
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Connect to `room`
    ///
    /// Fails with [`crate::Error::VoiceJoinFailed`].
    async fn join(&self, room: &RoomId) -> Result<Box<dyn TransportSink>>;
}
