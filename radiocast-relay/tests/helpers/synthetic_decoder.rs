//! Scripted stand-in for the ffmpeg decoder
//!
//! Each spawned "process" is a feeder task writing PCM frames into an
//! in-memory pipe. Frame `i` is filled with sample value `i` unless a
//! constant value is given, so tests can check ordering downstream.
//!
//! A spawner runs one default script, with per-locator overrides added by
//! [`SyntheticSpawner::route`].
//!
//! The spawner counts live processes: a process is live from spawn until
//! it is killed or dropped.

use async_trait::async_trait;
use radiocast_relay::audio::types::{PcmFrame, FRAME_BYTES};
use radiocast_relay::audio::{DecoderProcess, DecoderSpawner, PcmStream};
use radiocast_relay::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// What the fake decoder writes
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// `count` frames, then end of stream
    Frames { count: usize, value: Option<i16> },
    /// Frames forever, one per `pace`
    Endless { pace: Duration, value: Option<i16> },
    /// `frames` frames, then the pipe stays open with nothing more on it
    Stall { frames: usize },
    /// Pipe closes without any data
    Empty,
    /// Pipe stays open with no data
    Silent,
    /// The process never starts
    FailSpawn,
}

impl Script {
    /// Numbered frames forever at a quick pace
    pub fn endless() -> Self {
        Script::Endless {
            pace: Duration::from_millis(2),
            value: None,
        }
    }
}

/// Spawner that runs [`Script`]s instead of processes
#[derive(Clone)]
pub struct SyntheticSpawner {
    script: Script,
    routes: HashMap<String, Script>,
    live: Arc<AtomicUsize>,
    spawned: Arc<AtomicUsize>,
}

impl SyntheticSpawner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            routes: HashMap::new(),
            live: Arc::new(AtomicUsize::new(0)),
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run `script` instead of the default for `locator`
    pub fn route(mut self, locator: &str, script: Script) -> Self {
        self.routes.insert(locator.to_string(), script);
        self
    }

    fn script_for(&self, locator: &str) -> Script {
        self.routes.get(locator).copied().unwrap_or(self.script)
    }

    /// Processes spawned and not yet killed
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Processes spawned in total
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecoderSpawner for SyntheticSpawner {
    async fn spawn(&self, locator: &str) -> Result<Box<dyn DecoderProcess>> {
        let script = self.script_for(locator);
        if let Script::FailSpawn = script {
            return Err(Error::SourceUnavailable(format!(
                "synthetic decoder refused {}",
                locator
            )));
        }

        let (reader, writer) = duplex(FRAME_BYTES * 4);
        let feeder = tokio::spawn(feed(script, writer));

        let id = self.spawned.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        self.live.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(SyntheticProcess {
            id,
            stdout: Some(Box::new(reader)),
            feeder,
            live: Arc::clone(&self.live),
            running: true,
        }))
    }
}

async fn feed(script: Script, mut writer: DuplexStream) {
    match script {
        Script::Frames { count, value } => {
            for i in 0..count {
                if write_frame(&mut writer, value.unwrap_or(i as i16)).await.is_err() {
                    return;
                }
            }
        }
        Script::Endless { pace, value } => {
            let mut i: u64 = 0;
            loop {
                let sample = value.unwrap_or((i % 32_768) as i16);
                if write_frame(&mut writer, sample).await.is_err() {
                    return;
                }
                i += 1;
                tokio::time::sleep(pace).await;
            }
        }
        Script::Stall { frames } => {
            for i in 0..frames {
                if write_frame(&mut writer, i as i16).await.is_err() {
                    return;
                }
            }
            std::future::pending::<()>().await;
        }
        Script::Silent => std::future::pending::<()>().await,
        Script::Empty | Script::FailSpawn => {}
    }
    // Dropping the writer is end of stream
}

async fn write_frame(writer: &mut DuplexStream, sample: i16) -> std::io::Result<()> {
    writer.write_all(&PcmFrame::filled(sample).to_le_bytes()).await
}

pub struct SyntheticProcess {
    id: u32,
    stdout: Option<PcmStream>,
    feeder: JoinHandle<()>,
    live: Arc<AtomicUsize>,
    running: bool,
}

impl SyntheticProcess {
    fn terminate(&mut self) {
        if self.running {
            self.running = false;
            self.feeder.abort();
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DecoderProcess for SyntheticProcess {
    fn id(&self) -> Option<u32> {
        self.running.then_some(self.id)
    }

    fn take_stdout(&mut self) -> Option<PcmStream> {
        self.stdout.take()
    }

    async fn kill_and_wait(&mut self) -> Result<()> {
        self.terminate();
        Ok(())
    }
}

impl Drop for SyntheticProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
