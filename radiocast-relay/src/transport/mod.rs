//! Voice transport seam
//!
//! Sessions only see [`VoiceGateway`] and [`TransportSink`]. The bundled
//! implementation writes length-prefixed packets to per-room files.

pub mod channel;
pub mod file;
pub mod sink;

pub use channel::ChannelSink;
pub use file::FileGateway;
pub use sink::{SendOutcome, TransportSink, VoiceGateway};
