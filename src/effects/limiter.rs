//! Limiter effect for preventing clipping.

use super::Effect;
use crate::buffer::AudioBuffer;

/// Peak limiter with instant attack and smooth release.
///
/// Gain is computed once per frame from the loudest channel and applied to
/// all channels, so the stereo image does not shift while limiting.
///
/// # Examples
///
/// ```
/// use humdrum::buffer::AudioBuffer;
/// use humdrum::effects::{Effect, Limiter};
///
/// let mut limiter = Limiter::new(44_100, 0.5, 0.1);
/// let mut buffer = AudioBuffer::new(2, 1);
/// buffer.add(0, 0, 1.0);
/// buffer.add(1, 0, 0.25);
/// limiter.apply(&mut buffer);
///
/// assert_eq!(buffer.get(0, 0), 0.5);
/// assert_eq!(buffer.get(1, 0), 0.125);
/// ```
#[derive(Debug, Clone)]
pub struct Limiter {
    sample_rate: u32,
    threshold: f32,
    release: f32, // seconds
    current_gain: f32,
}

impl Limiter {
    /// Creates a limiter.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Rate of the buffers the limiter will process
    /// * `threshold` - Maximum allowed amplitude (typically 0.8-0.95)
    /// * `release` - Seconds for the gain to recover once the peak passes
    pub fn new(sample_rate: u32, threshold: f32, release: f32) -> Self {
        Self {
            sample_rate,
            threshold: threshold.max(0.0),
            // Minimum 0.1 ms
            release: release.max(0.0001),
            current_gain: 1.0,
        }
    }

    /// Conservative output-stage limiter: 0.95 threshold, 50 ms release.
    pub fn safety(sample_rate: u32) -> Self {
        Self::new(sample_rate, 0.95, 0.05)
    }

    /// Aggressive limiter: 0.9 threshold, 10 ms release.
    pub fn brick_wall(sample_rate: u32) -> Self {
        Self::new(sample_rate, 0.9, 0.01)
    }

    /// Current gain multiplier; 1.0 means no reduction.
    pub fn current_gain(&self) -> f32 {
        self.current_gain
    }
}

impl Effect for Limiter {
    fn apply(&mut self, buffer: &mut AudioBuffer) {
        let release_coeff = 1.0 - (-1.0 / (self.release * self.sample_rate as f32)).exp();

        for frame in 0..buffer.frames() {
            let peak = (0..buffer.channels())
                .map(|ch| buffer.get(ch, frame).abs())
                .fold(0.0_f32, f32::max);

            let target_gain = if peak > self.threshold {
                self.threshold / peak.max(0.0001)
            } else {
                1.0
            };

            if target_gain < self.current_gain {
                self.current_gain = target_gain;
            } else {
                self.current_gain += (target_gain - self.current_gain) * release_coeff;
            }

            for ch in 0..buffer.channels() {
                buffer.channel_mut(ch)[frame] *= self.current_gain;
            }
        }
    }
}
