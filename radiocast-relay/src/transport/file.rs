//! File-backed voice gateway
//!
//! Stands in for a real voice connection: each room gets
//! `<directory>/<room>.opus`, written through a [`ChannelSink`] at the real
//! frame cadence. Joining a room truncates any earlier recording.

use crate::audio::types::FRAME_DURATION;
use crate::error::{Error, Result};
use crate::transport::channel::ChannelSink;
use crate::transport::sink::{TransportSink, VoiceGateway};
use crate::types::RoomId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::BufWriter;
use tracing::info;

/// Extension of per-room packet files
pub const PACKET_FILE_EXTENSION: &str = "opus";

/// Gateway that "joins" a room by opening its packet file
#[derive(Debug, Clone)]
pub struct FileGateway {
    directory: PathBuf,
    queue_frames: usize,
}

impl FileGateway {
    pub fn new(directory: impl Into<PathBuf>, queue_frames: usize) -> Self {
        Self {
            directory: directory.into(),
            queue_frames,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Packet file used for `room`
    pub fn path_for(&self, room: &RoomId) -> PathBuf {
        self.directory
            .join(format!("{}.{}", file_stem(room), PACKET_FILE_EXTENSION))
    }
}

/// Room id reduced to characters safe in a file name
fn file_stem(room: &RoomId) -> String {
    let stem: String = room
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

#[async_trait]
impl VoiceGateway for FileGateway {
    async fn join(&self, room: &RoomId) -> Result<Box<dyn TransportSink>> {
        let join_failed = |reason: String| Error::VoiceJoinFailed {
            room: room.to_string(),
            reason,
        };

        fs::create_dir_all(&self.directory).await.map_err(|e| {
            join_failed(format!(
                "cannot create {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        let path = self.path_for(room);
        let file = File::create(&path)
            .await
            .map_err(|e| join_failed(format!("cannot open {}: {}", path.display(), e)))?;

        info!(room = %room, path = %path.display(), "Joined room");

        Ok(Box::new(ChannelSink::spawn(
            room.clone(),
            BufWriter::new(file),
            self.queue_frames,
            FRAME_DURATION,
        )))
    }
}
