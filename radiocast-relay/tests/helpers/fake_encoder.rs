//! Encoders that make pipeline output easy to inspect
//!
//! [`FirstSampleEncoder`] emits each frame's first sample as two
//! little-endian bytes, so a recorded packet tells which frame (and which
//! gain) produced it.

use radiocast_relay::audio::{EncodedFrame, EncoderFactory, FrameEncoder, PcmFrame};
use radiocast_relay::{Error, Result};

/// How the factory's encoders behave
#[derive(Debug, Clone, Copy, Default)]
pub enum EncoderMode {
    #[default]
    FirstSample,
    /// Panic on the frame after `after` successful ones
    PanicAfter { after: usize },
    /// Fail on the frame after `after` successful ones
    FailAfter { after: usize },
    /// Encoder creation fails
    FailCreate,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeEncoderFactory {
    pub mode: EncoderMode,
}

impl FakeEncoderFactory {
    pub fn new(mode: EncoderMode) -> Self {
        Self { mode }
    }
}

impl EncoderFactory for FakeEncoderFactory {
    fn create(&self) -> Result<Box<dyn FrameEncoder>> {
        if let EncoderMode::FailCreate = self.mode {
            return Err(Error::Encode("synthetic encoder unavailable".to_string()));
        }
        Ok(Box::new(FirstSampleEncoder {
            mode: self.mode,
            encoded: 0,
        }))
    }
}

pub struct FirstSampleEncoder {
    mode: EncoderMode,
    encoded: usize,
}

impl FrameEncoder for FirstSampleEncoder {
    fn encode(&mut self, frame: &PcmFrame) -> Result<EncodedFrame> {
        match self.mode {
            EncoderMode::PanicAfter { after } if self.encoded >= after => {
                panic!("synthetic encoder panic");
            }
            EncoderMode::FailAfter { after } if self.encoded >= after => {
                return Err(Error::Encode("synthetic encode failure".to_string()));
            }
            _ => {}
        }

        self.encoded += 1;
        let first = frame.samples().first().copied().unwrap_or_default();
        Ok(EncodedFrame::new(first.to_le_bytes().to_vec()))
    }
}

/// Sample value carried by a [`FirstSampleEncoder`] packet
pub fn packet_sample(packet: &EncodedFrame) -> i16 {
    let bytes = packet.as_bytes();
    i16::from_le_bytes([bytes[0], bytes[1]])
}
