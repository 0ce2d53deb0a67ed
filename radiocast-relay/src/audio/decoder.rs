//! External decoder process adapter
//!
//! Runs ffmpeg to turn an arbitrary stream URL into raw s16le PCM on stdout.
//! The container/codec work happens entirely inside ffmpeg; this module only
//! owns the process: spawning it, handing out its stdout, forwarding its
//! stderr to the log, and killing and reaping it on teardown.
//!
//! # Requirements
//! - `ffmpeg` on `PATH`, or `decoder.ffmpeg_path` set in the config

use crate::audio::types::{CHANNELS, SAMPLE_RATE};
use crate::error::{Error, Result};
use async_trait::async_trait;
use radiocast_common::config::DecoderConfig;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, warn};

/// Raw PCM byte stream produced by a decoder
pub type PcmStream = Box<dyn AsyncRead + Send + Unpin>;

/// A running decoder process
#[async_trait]
pub trait DecoderProcess: Send {
    /// OS process id, if there is one
    fn id(&self) -> Option<u32>;

    /// Hand out the PCM pipe (only once)
    fn take_stdout(&mut self) -> Option<PcmStream>;

    /// Forcibly terminate the process and wait for it to exit
    ///
    /// Safe to call on a process that already exited.
    async fn kill_and_wait(&mut self) -> Result<()>;
}

/// Launches decoder processes for source locators
#[async_trait]
pub trait DecoderSpawner: Send + Sync {
    /// Start decoding `locator`
    ///
    /// Fails with [`Error::SourceUnavailable`] if the process cannot start.
    async fn spawn(&self, locator: &str) -> Result<Box<dyn DecoderProcess>>;
}

/// Spawns ffmpeg decoders
#[derive(Debug, Clone)]
pub struct FfmpegSpawner {
    ffmpeg_path: PathBuf,
    log_level: String,
}

impl FfmpegSpawner {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            log_level: config.log_level.clone(),
        }
    }

    /// Arguments passed to ffmpeg for `locator`
    pub fn command_args(&self, locator: &str) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
            "-i".to_string(),
            locator.to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            CHANNELS.to_string(),
            "pipe:1".to_string(),
        ]
    }
}

#[async_trait]
impl DecoderSpawner for FfmpegSpawner {
    async fn spawn(&self, locator: &str) -> Result<Box<dyn DecoderProcess>> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args(self.command_args(locator))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::SourceUnavailable(format!(
                    "failed to start {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        let pid = child.id();
        debug!(pid = ?pid, locator, "Decoder process started");

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, pid));
        }

        Ok(Box::new(FfmpegProcess { child }))
    }
}

/// Copy decoder diagnostics into the `ffmpeg` log target, line by line
async fn forward_stderr(stderr: ChildStderr, pid: Option<u32>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => warn!(target: "ffmpeg", pid = ?pid, "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(target: "ffmpeg", pid = ?pid, error = %e, "stderr closed");
                break;
            }
        }
    }
}

/// A spawned ffmpeg process
pub struct FfmpegProcess {
    child: Child,
}

#[async_trait]
impl DecoderProcess for FfmpegProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_stdout(&mut self) -> Option<PcmStream> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as PcmStream)
    }

    async fn kill_and_wait(&mut self) -> Result<()> {
        if let Some(status) = self.child.try_wait()? {
            debug!(%status, "Decoder process already exited");
            return Ok(());
        }

        let pid = self.child.id();
        self.child.kill().await?;
        debug!(pid = ?pid, "Decoder process killed");
        Ok(())
    }
}
