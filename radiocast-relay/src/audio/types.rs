//! Core audio data types
//!
//! PCM frame geometry and the frame containers passed through the pipeline.
//!
//! **Format:**
//! - Samples are signed 16-bit little-endian on the wire
//! - Stereo interleaved: [L, R, L, R, ...]
//! - Sample rate always 48000 Hz (the decoder resamples)

use std::time::Duration;

/// Output sample rate requested from the decoder (Hz)
pub const SAMPLE_RATE: u32 = 48_000;

/// Interleaved channel count
pub const CHANNELS: usize = 2;

/// Samples per channel in one frame (20 ms at 48 kHz)
pub const FRAME_SIZE: usize = 960;

/// Interleaved samples in one frame
pub const FRAME_SAMPLES: usize = FRAME_SIZE * CHANNELS;

/// Bytes of s16le PCM in one frame
pub const FRAME_BYTES: usize = FRAME_SAMPLES * 2;

/// Upper bound on one encoded frame
pub const MAX_PACKET_BYTES: usize = (FRAME_SIZE * 2) * 2;

/// Playback duration of one frame
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// One fixed-size frame of interleaved PCM
///
/// Always holds exactly [`FRAME_SAMPLES`] samples; partial frames never leave
/// the frame reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFrame {
    samples: Vec<i16>,
}

impl PcmFrame {
    /// Frame of digital silence
    pub fn silence() -> Self {
        Self {
            samples: vec![0; FRAME_SAMPLES],
        }
    }

    /// Frame with every sample set to `value`
    pub fn filled(value: i16) -> Self {
        Self {
            samples: vec![value; FRAME_SAMPLES],
        }
    }

    /// Decode one frame from s16le bytes
    ///
    /// Returns `None` unless `bytes` is exactly [`FRAME_BYTES`] long.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != FRAME_BYTES {
            return None;
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Some(Self { samples })
    }

    /// Encode the frame as s16le bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }
}

/// One compressed frame ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    data: Vec<u8>,
}

impl EncodedFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_geometry() {
        assert_eq!(FRAME_SAMPLES, 1920);
        assert_eq!(FRAME_BYTES, 3840);
        assert_eq!(MAX_PACKET_BYTES, 3840);
        assert_eq!(
            FRAME_DURATION.as_micros() as u64,
            FRAME_SIZE as u64 * 1_000_000 / SAMPLE_RATE as u64
        );
    }

    #[test]
    fn test_le_bytes_layout() {
        let mut frame = PcmFrame::silence();
        frame.samples_mut()[0] = -2;
        frame.samples_mut()[1] = 0x0102;

        let bytes = frame.to_le_bytes();
        assert_eq!(&bytes[0..4], &[0xFE, 0xFF, 0x02, 0x01]);
        assert_eq!(PcmFrame::from_le_bytes(&bytes), Some(frame));
        assert!(PcmFrame::from_le_bytes(&bytes[1..]).is_none());
    }
}
