//! Opus frame encoder
//!
//! One PCM frame in, one Opus packet out. Each session owns its own encoder;
//! Opus keeps inter-frame state, so an encoder is never shared between rooms.

use crate::audio::types::{EncodedFrame, PcmFrame, FRAME_SAMPLES, MAX_PACKET_BYTES};
use crate::error::{Error, Result};
use audiopus::coder::Encoder;
use audiopus::{Application, Channels, SampleRate};

/// Compresses PCM frames for the transport
pub trait FrameEncoder: Send {
    fn encode(&mut self, frame: &PcmFrame) -> Result<EncodedFrame>;
}

/// Creates one encoder per session
pub trait EncoderFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn FrameEncoder>>;
}

/// Opus encoder fixed to 48 kHz stereo
pub struct OpusFrameEncoder {
    encoder: Encoder,
    output: Vec<u8>,
}

impl OpusFrameEncoder {
    pub fn new() -> Result<Self> {
        let encoder = Encoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio)
            .map_err(|e| Error::Encode(format!("Failed to create Opus encoder: {}", e)))?;

        Ok(Self {
            encoder,
            output: vec![0; MAX_PACKET_BYTES],
        })
    }
}

impl FrameEncoder for OpusFrameEncoder {
    fn encode(&mut self, frame: &PcmFrame) -> Result<EncodedFrame> {
        let samples = frame.samples();
        if samples.len() != FRAME_SAMPLES {
            return Err(Error::Encode(format!(
                "expected {} samples per frame, got {}",
                FRAME_SAMPLES,
                samples.len()
            )));
        }

        let len = self
            .encoder
            .encode(samples, &mut self.output)
            .map_err(|e| Error::Encode(format!("Opus encode failed: {}", e)))?;
        Ok(EncodedFrame::new(self.output[..len].to_vec()))
    }
}

/// Factory for [`OpusFrameEncoder`]
#[derive(Debug, Default, Clone, Copy)]
pub struct OpusEncoderFactory;

impl EncoderFactory for OpusEncoderFactory {
    fn create(&self) -> Result<Box<dyn FrameEncoder>> {
        Ok(Box::new(OpusFrameEncoder::new()?))
    }
}
