//! Gateway and sink that record what the pipeline does
//!
//! Every join creates a fresh [`SinkLog`]; tests inspect the logs after the
//! fact (frames in arrival order, speaking changes, release).

use async_trait::async_trait;
use radiocast_relay::audio::EncodedFrame;
use radiocast_relay::transport::{SendOutcome, TransportSink, VoiceGateway};
use radiocast_relay::{Error, Result, RoomId};
use std::sync::{Arc, Mutex};

/// How joined sinks answer `try_send`
#[derive(Debug, Clone, Copy, Default)]
pub enum SinkMode {
    #[default]
    AcceptAll,
    /// Accept `accept` frames, then answer `outcome` forever
    RefuseAfter { accept: usize, outcome: SendOutcome },
}

#[derive(Debug, Default)]
pub struct SinkRecord {
    pub room: Option<RoomId>,
    pub frames: Vec<EncodedFrame>,
    pub speaking: bool,
    pub speaking_changes: Vec<bool>,
    pub released: bool,
    pub frames_after_release: usize,
}

/// Shared view of one sink's history
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    inner: Arc<Mutex<SinkRecord>>,
}

impl SinkLog {
    pub fn frame_count(&self) -> usize {
        self.inner.lock().unwrap().frames.len()
    }

    pub fn frames(&self) -> Vec<EncodedFrame> {
        self.inner.lock().unwrap().frames.clone()
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().unwrap().released
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.lock().unwrap().speaking
    }

    pub fn speaking_changes(&self) -> Vec<bool> {
        self.inner.lock().unwrap().speaking_changes.clone()
    }

    pub fn frames_after_release(&self) -> usize {
        self.inner.lock().unwrap().frames_after_release
    }

    pub fn room(&self) -> Option<RoomId> {
        self.inner.lock().unwrap().room.clone()
    }
}

pub struct RecordingSink {
    log: SinkLog,
    mode: SinkMode,
}

#[async_trait]
impl TransportSink for RecordingSink {
    async fn try_send(&mut self, frame: EncodedFrame) -> SendOutcome {
        let mut record = self.log.inner.lock().unwrap();
        if record.released {
            record.frames_after_release += 1;
            return SendOutcome::Closed;
        }

        if let SinkMode::RefuseAfter { accept, outcome } = self.mode {
            if record.frames.len() >= accept {
                return outcome;
            }
        }

        record.frames.push(frame);
        SendOutcome::Ready
    }

    async fn set_speaking(&mut self, speaking: bool) {
        let mut record = self.log.inner.lock().unwrap();
        record.speaking = speaking;
        record.speaking_changes.push(speaking);
    }

    async fn release(&mut self) {
        self.log.inner.lock().unwrap().released = true;
    }
}

/// Gateway handing out [`RecordingSink`]s
#[derive(Clone, Default)]
pub struct RecordingGateway {
    mode: SinkMode,
    fail_join: bool,
    sinks: Arc<Mutex<Vec<SinkLog>>>,
}

impl RecordingGateway {
    pub fn new(mode: SinkMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Gateway whose joins always fail
    pub fn failing() -> Self {
        Self {
            fail_join: true,
            ..Self::default()
        }
    }

    /// Every sink handed out, in join order
    pub fn sinks(&self) -> Vec<SinkLog> {
        self.sinks.lock().unwrap().clone()
    }

    pub fn last_sink(&self) -> SinkLog {
        self.sinks()
            .last()
            .cloned()
            .expect("no sink has been joined")
    }

    /// Sinks joined and not yet released
    pub fn open_sinks(&self) -> usize {
        self.sinks().iter().filter(|s| !s.is_released()).count()
    }
}

#[async_trait]
impl VoiceGateway for RecordingGateway {
    async fn join(&self, room: &RoomId) -> Result<Box<dyn TransportSink>> {
        if self.fail_join {
            return Err(Error::VoiceJoinFailed {
                room: room.to_string(),
                reason: "synthetic gateway refused".to_string(),
            });
        }

        let log = SinkLog::default();
        log.inner.lock().unwrap().room = Some(room.clone());
        self.sinks.lock().unwrap().push(log.clone());

        Ok(Box::new(RecordingSink {
            log,
            mode: self.mode,
        }))
    }
}
