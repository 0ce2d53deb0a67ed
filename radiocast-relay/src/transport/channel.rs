//! Queue-backed transport sink with a paced writer
//!
//! Frames go into a bounded queue; a writer task drains it at the frame
//! cadence (one frame per 20 ms) into any `AsyncWrite`. A full queue blocks
//! `try_send`, which is the backpressure the pipeline loop waits on.
//!
//! **Packet format:** u16 big-endian payload length, then the payload.

use crate::audio::types::EncodedFrame;
use crate::transport::sink::{SendOutcome, TransportSink};
use crate::types::RoomId;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Sink feeding a paced writer task
pub struct ChannelSink {
    room: RoomId,
    tx: Option<mpsc::Sender<EncodedFrame>>,
    writer: Option<JoinHandle<io::Result<u64>>>,
    speaking: bool,
}

impl ChannelSink {
    /// Start the writer task and return the sink feeding it
    pub fn spawn<W>(room: RoomId, writer: W, queue_frames: usize, frame_duration: Duration) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(queue_frames.max(1));
        let writer = tokio::spawn(write_paced(rx, writer, frame_duration));

        Self {
            room,
            tx: Some(tx),
            writer: Some(writer),
            speaking: false,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }
}

#[async_trait]
impl TransportSink for ChannelSink {
    async fn try_send(&mut self, frame: EncodedFrame) -> SendOutcome {
        let Some(tx) = &self.tx else {
            return SendOutcome::Closed;
        };

        match tx.send(frame).await {
            Ok(()) => SendOutcome::Ready,
            Err(_) => {
                warn!(room = %self.room, "Transport writer has stopped");
                SendOutcome::Closed
            }
        }
    }

    async fn set_speaking(&mut self, speaking: bool) {
        if self.speaking != speaking {
            debug!(room = %self.room, speaking, "Speaking state changed");
        }
        self.speaking = speaking;
    }

    async fn release(&mut self) {
        // Closing the queue lets the writer drain what is left and exit
        self.tx.take();

        if let Some(writer) = self.writer.take() {
            match writer.await {
                Ok(Ok(frames)) => info!(room = %self.room, frames, "Transport released"),
                Ok(Err(e)) => warn!(room = %self.room, error = %e, "Transport writer failed"),
                Err(e) => warn!(room = %self.room, error = %e, "Transport writer task aborted"),
            }
        }
    }
}

/// Drain `rx` into `writer`, one frame per `frame_duration`
async fn write_paced<W>(
    mut rx: mpsc::Receiver<EncodedFrame>,
    mut writer: W,
    frame_duration: Duration,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = tokio::time::interval(frame_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut written = 0u64;
    while let Some(frame) = rx.recv().await {
        ticker.tick().await;
        write_packet(&mut writer, &frame).await?;
        written += 1;
    }

    writer.flush().await?;
    Ok(written)
}

/// Write one length-prefixed packet
pub async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, frame: &EncodedFrame) -> io::Result<()> {
    let len = u16::try_from(frame.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "packet exceeds 65535 bytes"))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(frame.as_bytes()).await
}

/// Read one length-prefixed packet, `None` at a clean end of stream
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<EncodedFrame>> {
    let mut len = [0u8; 2];
    match reader.read_exact(&mut len).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let mut data = vec![0u8; u16::from_be_bytes(len) as usize];
    reader.read_exact(&mut data).await?;
    Ok(Some(EncodedFrame::new(data)))
}
