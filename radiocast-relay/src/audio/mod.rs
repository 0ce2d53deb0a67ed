//! Audio pipeline stages
//!
//! Decoder process → frame reader → volume → Opus encoder.

pub mod decoder;
pub mod encoder;
pub mod frame_reader;
pub mod types;
pub mod volume;

pub use decoder::{DecoderProcess, DecoderSpawner, FfmpegSpawner, PcmStream};
pub use encoder::{EncoderFactory, FrameEncoder, OpusEncoderFactory};
pub use frame_reader::{FrameRead, FrameReader};
pub use types::{EncodedFrame, PcmFrame};
