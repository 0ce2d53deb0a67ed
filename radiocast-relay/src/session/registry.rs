//! Session registry: one session per room
//!
//! Two levels of locking:
//! - a per-room slot, held across the whole of play and stop, so two
//!   commands for the same room never interleave their teardown and startup;
//! - the session map, only ever held for a lookup, insert or remove.
//!
//! Slow work (stopping a session, joining, spawning, probing) happens with
//! only the room's slot held, so other rooms stay fully controllable.

use crate::audio::decoder::DecoderSpawner;
use crate::audio::encoder::EncoderFactory;
use crate::error::{Error, Result};
use crate::session::room::{RoomSession, SessionServices, SessionSettings, SessionStatus};
use crate::transport::sink::VoiceGateway;
use crate::types::RoomId;
use chrono::Utc;
use futures::future::join_all;
use radiocast_common::RelayEvent;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns every room session in the process
pub struct SessionRegistry {
    sessions: Mutex<HashMap<RoomId, Arc<RoomSession>>>,
    room_slots: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    services: SessionServices,
}

impl SessionRegistry {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        decoders: Arc<dyn DecoderSpawner>,
        encoders: Arc<dyn EncoderFactory>,
        settings: SessionSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sessions: Mutex::new(HashMap::new()),
            room_slots: Mutex::new(HashMap::new()),
            services: SessionServices {
                gateway,
                decoders,
                encoders,
                settings,
                events,
            },
        }
    }

    /// Start relaying `locator` into `room`
    ///
    /// An existing session for the room is stopped and fully torn down
    /// before the new one starts.
    pub async fn play(&self, room: RoomId, locator: &str) -> Result<Uuid> {
        let _slot = self.room_slot(&room).await;

        let previous = self.sessions.lock().await.remove(&room);
        if let Some(previous) = previous {
            info!(room = %room, session = %previous.session_id(), "Replacing session");
            previous.stop().await;
        }

        let session = Arc::new(RoomSession::start(room.clone(), locator, &self.services).await?);
        let session_id = session.session_id();
        self.sessions.lock().await.insert(room, session);
        Ok(session_id)
    }

    /// Stop the room's session and wait for its teardown
    pub async fn stop(&self, room: &RoomId) -> Result<()> {
        let _slot = self.room_slot(room).await;

        let session = self
            .sessions
            .lock()
            .await
            .remove(room)
            .ok_or_else(|| Error::NothingPlaying(room.to_string()))?;

        if !session.is_streaming() {
            // Ended on its own; drop the stale entry once teardown is done
            session.wait_done().await;
            return Err(Error::NothingPlaying(room.to_string()));
        }

        session.stop().await;
        Ok(())
    }

    /// Set the room's volume from a percentage
    pub async fn set_volume(&self, room: &RoomId, percent: u32) -> Result<()> {
        let percent = u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(Error::InvalidVolume(percent))?;

        self.streaming_session(room).await?.set_volume(percent)?;
        debug!(room = %room, percent, "Volume changed");
        self.emit(RelayEvent::VolumeChanged {
            room_id: room.to_string(),
            percent,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Suspend frame production in the room
    pub async fn pause(&self, room: &RoomId) -> Result<()> {
        if self.streaming_session(room).await?.pause()? {
            self.emit(RelayEvent::PlaybackPaused {
                room_id: room.to_string(),
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Continue frame production in the room
    pub async fn resume(&self, room: &RoomId) -> Result<()> {
        if self.streaming_session(room).await?.resume()? {
            self.emit(RelayEvent::PlaybackResumed {
                room_id: room.to_string(),
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    pub async fn lookup(&self, room: &RoomId) -> Option<Arc<RoomSession>> {
        self.sessions.lock().await.get(room).cloned()
    }

    /// Remove a finished session's entry
    pub async fn release(&self, room: &RoomId) -> Result<()> {
        let _slot = self.room_slot(room).await;
        let mut sessions = self.sessions.lock().await;
        match sessions.get(room) {
            None => Err(Error::NothingPlaying(room.to_string())),
            Some(session) if !session.is_done() => Err(Error::InvalidState(format!(
                "session for room {} has not finished",
                room
            ))),
            Some(_) => {
                sessions.remove(room);
                Ok(())
            }
        }
    }

    /// Drop entries whose sessions ended on their own, returning how many
    pub async fn reap_finished(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_done());
        let reaped = before - sessions.len();
        if reaped > 0 {
            debug!(reaped, "Reaped finished sessions");
        }
        reaped
    }

    /// Status of every registered session, ordered by room
    pub async fn sessions(&self) -> Vec<SessionStatus> {
        let sessions = self.sessions.lock().await;
        let mut statuses: Vec<SessionStatus> =
            sessions.values().map(|session| session.status()).collect();
        statuses.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        statuses
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent> {
        self.services.events.subscribe()
    }

    /// Stop every session
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<RoomSession>> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();
        if drained.is_empty() {
            return;
        }

        info!(count = drained.len(), "Stopping all sessions");
        join_all(drained.iter().map(|session| session.stop())).await;
    }

    /// Exclusive right to start or stop `room`
    async fn room_slot(&self, room: &RoomId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.room_slots.lock().await;
            Arc::clone(slots.entry(room.clone()).or_default())
        };
        slot.lock_owned().await
    }

    async fn streaming_session(&self, room: &RoomId) -> Result<Arc<RoomSession>> {
        self.lookup(room)
            .await
            .filter(|session| session.is_streaming())
            .ok_or_else(|| Error::NothingPlaying(room.to_string()))
    }

    fn emit(&self, event: RelayEvent) {
        // No subscribers is fine
        let _ = self.services.events.send(event);
    }
}

/// Prune sessions that ended on their own as soon as they report it
///
/// Holds only a weak reference; the task exits once the registry is gone.
pub fn spawn_reaper(registry: &Arc<SessionRegistry>) -> JoinHandle<()> {
    let mut events = registry.subscribe_events();
    let registry: Weak<SessionRegistry> = Arc::downgrade(registry);

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RelayEvent::SessionEnded { .. }) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    let Some(registry) = registry.upgrade() else {
                        break;
                    };
                    registry.reap_finished().await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
