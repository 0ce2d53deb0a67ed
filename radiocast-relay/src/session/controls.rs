//! Live playback controls shared between a session handle and its pipeline
//!
//! Read once per frame by the pipeline, written by control commands. Plain
//! atomics: a control change applies no later than the next frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Volume and pause state for one session
#[derive(Debug)]
pub struct SessionControls {
    /// f64 gain stored as raw bits
    volume_bits: AtomicU64,
    paused: AtomicBool,
}

impl SessionControls {
    pub fn new() -> Self {
        Self {
            volume_bits: AtomicU64::new(1.0f64.to_bits()),
            paused: AtomicBool::new(false),
        }
    }

    /// Current gain, 0.0 to 1.0
    pub fn volume(&self) -> f64 {
        f64::from_bits(self.volume_bits.load(Ordering::Acquire))
    }

    pub fn set_volume(&self, gain: f64) {
        self.volume_bits
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Set the pause flag, returning the previous value
    pub fn set_paused(&self, paused: bool) -> bool {
        self.paused.swap(paused, Ordering::AcqRel)
    }
}

impl Default for SessionControls {
    fn default() -> Self {
        Self::new()
    }
}
