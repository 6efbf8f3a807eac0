//! Basic periodic and noise waveforms.

use rand::Rng;
use std::f64::consts::PI;

/// Shape of a [`Patch`](super::Patch)'s raw signal.
///
/// Periodic shapes are evaluated from a phase in `[0, 1)`, so a voice only
/// needs its elapsed time and frequency to produce a sample; there is no
/// oscillator state to carry between buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    /// Uniform white noise in `[-1, 1]`, independent of pitch.
    Noise,
}

impl Waveform {
    /// Evaluates the waveform at `phase` (any real; only the fractional part
    /// matters). Noise draws from `rng`.
    ///
    /// # Examples
    ///
    /// ```
    /// use humdrum::instrument::Waveform;
    ///
    /// let mut rng = rand::thread_rng();
    /// assert_eq!(Waveform::Square.evaluate(0.25, &mut rng), 1.0);
    /// assert_eq!(Waveform::Square.evaluate(0.75, &mut rng), -1.0);
    /// assert!((Waveform::Sine.evaluate(0.25, &mut rng) - 1.0).abs() < 1e-6);
    /// ```
    pub fn evaluate<R: Rng + ?Sized>(&self, phase: f64, rng: &mut R) -> f32 {
        let phase = phase.rem_euclid(1.0);
        let value = match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            // Rises from -1 to 1 over one period
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            // Peaks at 1 a quarter of the way in, like a phase-aligned sine
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Noise => rng.gen_range(-1.0..=1.0),
        };
        value as f32
    }
}
