//! Linear gain with saturation
//!
//! Scaling happens in f64, is clamped to the i16 range, then truncated toward
//! zero. Samples never wrap around.

use crate::audio::types::PcmFrame;

/// Scale one sample by `gain`, saturating to `[-32768, 32767]`
#[inline]
pub fn scale_sample(sample: i16, gain: f64) -> i16 {
    (sample as f64 * gain).clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Apply `gain` to every sample in place
pub fn apply_gain(samples: &mut [i16], gain: f64) {
    if gain == 1.0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample = scale_sample(*sample, gain);
    }
}

/// Return `frame` scaled by `gain`
pub fn scale(mut frame: PcmFrame, gain: f64) -> PcmFrame {
    apply_gain(frame.samples_mut(), gain);
    frame
}
