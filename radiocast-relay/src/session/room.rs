//! One room's relay session
//!
//! **Lifecycle:** `Starting -> Streaming -> Stopping -> Stopped`
//!
//! `start` does all fallible setup (join, spawn, probe, encoder) before the
//! session exists; any failure there releases what was already acquired and
//! the caller never sees a half-built session. Once streaming, a dedicated
//! task owns the decoder, encoder and sink. The handle only holds the shared
//! controls, the stop token and a watch on the lifecycle state.
//!
//! Teardown runs exactly once, on every exit path out of the frame loop,
//! including a panic inside it.

use crate::audio::decoder::{DecoderProcess, DecoderSpawner, PcmStream};
use crate::audio::encoder::{EncoderFactory, FrameEncoder};
use crate::audio::frame_reader::{FrameRead, FrameReader};
use crate::audio::volume;
use crate::error::{Error, Result};
use crate::session::controls::SessionControls;
use crate::transport::sink::{SendOutcome, TransportSink, VoiceGateway};
use crate::types::RoomId;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use radiocast_common::config::RelayConfig;
use radiocast_common::{EndReason, RelayEvent};
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Starting,
    Streaming,
    Stopping,
    Stopped,
}

/// Timing knobs for sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// How long to wait for the decoder's first PCM bytes
    pub startup_timeout: Duration,
    /// Idle period between pause checks
    pub pause_poll_interval: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            startup_timeout: Duration::from_millis(config.decoder.startup_timeout_ms),
            pause_poll_interval: Duration::from_millis(config.session.pause_poll_interval_ms),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Capabilities a session is built from
#[derive(Clone)]
pub struct SessionServices {
    pub gateway: Arc<dyn VoiceGateway>,
    pub decoders: Arc<dyn DecoderSpawner>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub settings: SessionSettings,
    pub events: broadcast::Sender<RelayEvent>,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub room_id: RoomId,
    pub session_id: Uuid,
    pub source: String,
    pub state: SessionState,
    pub volume_percent: u8,
    pub paused: bool,
    pub frames_sent: u64,
    pub started_at: DateTime<Utc>,
}

/// Handle to a running (or finished) room session
pub struct RoomSession {
    room_id: RoomId,
    session_id: Uuid,
    source: String,
    started_at: DateTime<Utc>,
    controls: Arc<SessionControls>,
    stop: CancellationToken,
    state_rx: watch::Receiver<SessionState>,
    frames_sent: Arc<AtomicU64>,
}

impl RoomSession {
    /// Join `room`, start decoding `source` and launch the pipeline task
    ///
    /// Returns only once the session is streaming.
    pub async fn start(room: RoomId, source: &str, services: &SessionServices) -> Result<Self> {
        let session_id = Uuid::new_v4();
        let (state_tx, state_rx) = watch::channel(SessionState::Starting);
        debug!(room = %room, session = %session_id, source, "Starting session");

        let mut sink = services.gateway.join(&room).await?;

        let mut process = match services.decoders.spawn(source).await {
            Ok(process) => process,
            Err(e) => {
                sink.release().await;
                return Err(e);
            }
        };

        let (reader, encoder) = match prepare(&mut *process, services).await {
            Ok(parts) => parts,
            Err(e) => {
                warn!(room = %room, session = %session_id, error = %e, "Session failed to start");
                if let Err(kill_err) = process.kill_and_wait().await {
                    warn!(room = %room, error = %kill_err, "Failed to reap decoder");
                }
                sink.release().await;
                return Err(e);
            }
        };

        let controls = Arc::new(SessionControls::new());
        let stop = CancellationToken::new();
        let frames_sent = Arc::new(AtomicU64::new(0));
        let started_at = Utc::now();

        state_tx.send_replace(SessionState::Streaming);
        sink.set_speaking(true).await;

        let pipeline = Pipeline {
            room_id: room.clone(),
            session_id,
            reader,
            process,
            encoder,
            sink,
            controls: Arc::clone(&controls),
            stop: stop.clone(),
            state_tx,
            frames_sent: Arc::clone(&frames_sent),
            pause_poll_interval: services.settings.pause_poll_interval,
            events: services.events.clone(),
        };

        info!(room = %room, session = %session_id, source, "Session streaming");
        // Published before the task starts so it always precedes SessionEnded
        let _ = services.events.send(RelayEvent::SessionStarted {
            room_id: room.to_string(),
            session_id,
            source: source.to_string(),
            timestamp: started_at,
        });
        tokio::spawn(pipeline.run());

        Ok(Self {
            room_id: room,
            session_id,
            source: source.to_string(),
            started_at,
            controls,
            stop,
            state_rx,
            frames_sent,
        })
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == SessionState::Streaming && !self.stop.is_cancelled()
    }

    /// True once teardown has completed
    pub fn is_done(&self) -> bool {
        self.state() == SessionState::Stopped || self.state_rx.has_changed().is_err()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Fire the stop signal and wait for teardown
    ///
    /// Idempotent; calling it on a finished session returns immediately.
    pub async fn stop(&self) {
        self.stop.cancel();
        self.wait_done().await;
    }

    /// Wait until the session reaches `Stopped`
    pub async fn wait_done(&self) {
        let mut state_rx = self.state_rx.clone();
        if state_rx
            .wait_for(|state| *state == SessionState::Stopped)
            .await
            .is_err()
        {
            // Pipeline task went away without publishing; its process and
            // sink were dropped with it
            warn!(room = %self.room_id, session = %self.session_id, "Session ended without reporting");
        }
    }

    /// Set the gain from a 0-100 percentage
    pub fn set_volume(&self, percent: u8) -> Result<()> {
        self.ensure_streaming()?;
        self.controls.set_volume(f64::from(percent.min(100)) / 100.0);
        Ok(())
    }

    /// Suspend frame production, returning whether anything changed
    pub fn pause(&self) -> Result<bool> {
        self.ensure_streaming()?;
        Ok(!self.controls.set_paused(true))
    }

    /// Continue frame production, returning whether anything changed
    pub fn resume(&self) -> Result<bool> {
        self.ensure_streaming()?;
        Ok(self.controls.set_paused(false))
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            room_id: self.room_id.clone(),
            session_id: self.session_id,
            source: self.source.clone(),
            state: self.state(),
            volume_percent: (self.controls.volume() * 100.0).round() as u8,
            paused: self.controls.is_paused(),
            frames_sent: self.frames_sent(),
            started_at: self.started_at,
        }
    }

    fn ensure_streaming(&self) -> Result<()> {
        if self.is_streaming() {
            Ok(())
        } else {
            Err(Error::NothingPlaying(self.room_id.to_string()))
        }
    }
}

/// Probe the decoder for audio and create the session's encoder
async fn prepare(
    process: &mut dyn DecoderProcess,
    services: &SessionServices,
) -> Result<(FrameReader<PcmStream>, Box<dyn FrameEncoder>)> {
    let stdout = process
        .take_stdout()
        .ok_or_else(|| Error::SourceUnavailable("decoder has no output pipe".to_string()))?;
    let mut reader = FrameReader::new(stdout);

    let timeout = services.settings.startup_timeout;
    match tokio::time::timeout(timeout, reader.wait_for_data()).await {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => {
            return Err(Error::SourceUnavailable(
                "decoder exited without producing audio".to_string(),
            ))
        }
        Ok(Err(e)) => return Err(Error::SourceUnavailable(e.to_string())),
        Err(_) => {
            return Err(Error::SourceUnavailable(format!(
                "no audio within {} ms",
                timeout.as_millis()
            )))
        }
    }

    let encoder = services.encoders.create()?;
    Ok((reader, encoder))
}

/// Everything the pipeline task owns
struct Pipeline {
    room_id: RoomId,
    session_id: Uuid,
    reader: FrameReader<PcmStream>,
    process: Box<dyn DecoderProcess>,
    encoder: Box<dyn FrameEncoder>,
    sink: Box<dyn TransportSink>,
    controls: Arc<SessionControls>,
    stop: CancellationToken,
    state_tx: watch::Sender<SessionState>,
    frames_sent: Arc<AtomicU64>,
    pause_poll_interval: Duration,
    events: broadcast::Sender<RelayEvent>,
}

impl Pipeline {
    async fn run(mut self) {
        let outcome = AssertUnwindSafe(self.stream()).catch_unwind().await;
        let reason = match outcome {
            Ok(reason) => reason,
            Err(panic) => {
                error!(
                    room = %self.room_id,
                    session = %self.session_id,
                    panic = %panic_message(panic.as_ref()),
                    "Pipeline panicked"
                );
                EndReason::Panicked
            }
        };

        self.state_tx.send_replace(SessionState::Stopping);
        self.teardown(reason).await;
    }

    /// Frame loop; returns why it stopped
    async fn stream(&mut self) -> EndReason {
        let stop = self.stop.clone();

        loop {
            if stop.is_cancelled() {
                return EndReason::Requested;
            }

            if self.controls.is_paused() {
                tokio::select! {
                    _ = stop.cancelled() => return EndReason::Requested,
                    _ = tokio::time::sleep(self.pause_poll_interval) => continue,
                }
            }

            let frame = tokio::select! {
                biased;
                _ = stop.cancelled() => return EndReason::Requested,
                read = self.reader.read_frame() => match read {
                    Ok(FrameRead::Frame(frame)) => frame,
                    Ok(FrameRead::EndOfStream) => return EndReason::EndOfStream,
                    Err(e) => return EndReason::ReadError(e.to_string()),
                },
            };

            let frame = volume::scale(frame, self.controls.volume());
            let packet = match self.encoder.encode(&frame) {
                Ok(packet) => packet,
                Err(e) => return EndReason::EncodeError(e.to_string()),
            };

            let outcome = tokio::select! {
                biased;
                _ = stop.cancelled() => return EndReason::Requested,
                outcome = self.sink.try_send(packet) => outcome,
            };
            match outcome {
                SendOutcome::Ready => {
                    self.frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                SendOutcome::Busy | SendOutcome::Closed => {
                    debug!(room = %self.room_id, ?outcome, "Sink refused frame");
                    return EndReason::SinkNotReady;
                }
            }
        }
    }

    async fn teardown(mut self, reason: EndReason) {
        if let Err(e) = self.process.kill_and_wait().await {
            warn!(room = %self.room_id, session = %self.session_id, error = %e, "Failed to reap decoder");
        }
        self.sink.set_speaking(false).await;
        self.sink.release().await;

        let frames_sent = self.frames_sent.load(Ordering::Relaxed);
        let frames_read = self.reader.frames_read();
        if reason.is_failure() {
            warn!(room = %self.room_id, session = %self.session_id, ?reason, frames_read, frames_sent, "Session ended");
        } else {
            info!(room = %self.room_id, session = %self.session_id, ?reason, frames_read, frames_sent, "Session ended");
        }

        self.state_tx.send_replace(SessionState::Stopped);
        let _ = self.events.send(RelayEvent::SessionEnded {
            room_id: self.room_id.to_string(),
            session_id: self.session_id,
            reason,
            frames_sent,
            timestamp: Utc::now(),
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
