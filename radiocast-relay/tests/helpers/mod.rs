//! Test helper modules for radiocast-relay integration tests
//!
//! Provides in-process stand-ins for every external capability:
//! - SyntheticSpawner: scripted decoder "processes" with a live-process count
//! - RecordingGateway: sinks that record frames, speaking and release
//! - FakeEncoderFactory: encoders that expose each frame's first sample
//! - CannedDirectory: station search answered from a fixed list

#![allow(dead_code)]

pub mod canned_directory;
pub mod fake_encoder;
pub mod recording_sink;
pub mod synthetic_decoder;

pub use canned_directory::CannedDirectory;
pub use fake_encoder::{packet_sample, EncoderMode, FakeEncoderFactory};
pub use recording_sink::{RecordingGateway, SinkLog, SinkMode};
pub use synthetic_decoder::{Script, SyntheticSpawner};

use radiocast_relay::session::{SessionRegistry, SessionSettings};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Short timings so tests run quickly
pub fn test_settings() -> SessionSettings {
    SessionSettings {
        startup_timeout: Duration::from_millis(500),
        pause_poll_interval: Duration::from_millis(10),
    }
}

/// A registry wired to synthetic capabilities, plus handles to inspect them
pub struct TestRig {
    pub registry: Arc<SessionRegistry>,
    pub decoders: SyntheticSpawner,
    pub gateway: RecordingGateway,
}

impl TestRig {
    pub fn new(script: Script) -> Self {
        Self::build(script, RecordingGateway::default(), EncoderMode::default(), test_settings())
    }

    pub fn build(
        script: Script,
        gateway: RecordingGateway,
        encoder: EncoderMode,
        settings: SessionSettings,
    ) -> Self {
        Self::with_spawner(SyntheticSpawner::new(script), gateway, encoder, settings)
    }

    pub fn with_spawner(
        decoders: SyntheticSpawner,
        gateway: RecordingGateway,
        encoder: EncoderMode,
        settings: SessionSettings,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(
            Arc::new(gateway.clone()),
            Arc::new(decoders.clone()),
            Arc::new(FakeEncoderFactory::new(encoder)),
            settings,
        ));

        Self {
            registry,
            decoders,
            gateway,
        }
    }
}

/// Poll `condition` until it holds, panicking after `timeout`
pub async fn wait_until<F>(timeout: Duration, what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("timed out after {:?} waiting for {}", timeout, what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await `future`, panicking if it takes longer than `timeout`
pub async fn within<T>(timeout: Duration, what: &str, future: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, future)
        .await
        .unwrap_or_else(|_| panic!("{} did not finish within {:?}", what, timeout))
}
