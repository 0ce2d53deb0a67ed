//! Fixed-size PCM frame reader
//!
//! Pulls whole frames of s16le PCM off the decoder's stdout. A stream that
//! ends mid-frame yields `EndOfStream`; the trailing partial frame is dropped.

use crate::audio::types::{PcmFrame, FRAME_BYTES};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::debug;

/// Read buffer in front of the decoder pipe
const READ_BUFFER_BYTES: usize = 16 * 1024;

/// Result of one frame read
#[derive(Debug, PartialEq, Eq)]
pub enum FrameRead {
    Frame(PcmFrame),
    EndOfStream,
}

/// Reads whole PCM frames from a byte stream
pub struct FrameReader<R> {
    inner: BufReader<R>,
    scratch: Vec<u8>,
    frames_read: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_BYTES, reader),
            scratch: vec![0; FRAME_BYTES],
            frames_read: 0,
        }
    }

    /// Wait until at least one byte is buffered without consuming it
    ///
    /// Returns `false` if the stream ended before producing anything.
    pub async fn wait_for_data(&mut self) -> Result<bool> {
        let available = self
            .inner
            .fill_buf()
            .await
            .map_err(|e| Error::DecodeRead(e.to_string()))?;
        Ok(!available.is_empty())
    }

    /// Read the next complete frame
    pub async fn read_frame(&mut self) -> Result<FrameRead> {
        let mut filled = 0;
        while filled < FRAME_BYTES {
            match self.inner.read(&mut self.scratch[filled..]).await {
                Ok(0) => {
                    if filled > 0 {
                        debug!(
                            partial_bytes = filled,
                            frames_read = self.frames_read,
                            "Dropping partial frame at end of stream"
                        );
                    }
                    return Ok(FrameRead::EndOfStream);
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::DecodeRead(e.to_string())),
            }
        }

        let frame = PcmFrame::from_le_bytes(&self.scratch)
            .ok_or_else(|| Error::DecodeRead("frame buffer size mismatch".to_string()))?;
        self.frames_read += 1;
        Ok(FrameRead::Frame(frame))
    }

    /// Complete frames delivered so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}
