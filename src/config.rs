//! Construction parameters for a [`Synthesizer`](crate::Synthesizer).

use log::warn;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: usize = 2;
pub const DEFAULT_POLYPHONY: usize = 40;
pub const DEFAULT_POLYPHONY_PER_NOTE: usize = 2;
pub const DEFAULT_PITCH_BEND_RANGE: f32 = 2.0;

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;
pub const MAX_SAMPLES_PER_BUFFER: usize = 65_536;
pub const MAX_POLYPHONY: usize = 1_024;

/// Default buffer length in milliseconds, used when none (or a bad one) is given.
const DEFAULT_BUFFER_MILLIS: u32 = 50;

/// Engine configuration.
///
/// Invalid values are never fatal: [`SynthConfig::validated`] replaces each
/// one with its default and logs a warning. The synthesizer always validates
/// the configuration it is given.
///
/// # Examples
///
/// ```
/// use humdrum::SynthConfig;
///
/// let config = SynthConfig::new(48_000)
///     .with_channels(1)
///     .with_samples_per_buffer(256)
///     .with_polyphony(16);
///
/// assert_eq!(config.sample_rate, 48_000);
/// assert_eq!(config.channels, 1);
///
/// // A zero-length buffer is corrected to 50 ms of audio.
/// let fixed = SynthConfig::new(48_000).with_samples_per_buffer(0).validated();
/// assert_eq!(fixed.samples_per_buffer, 2_400);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved output channels: 1 (mono) or 2 (stereo).
    pub channels: usize,
    /// Frames rendered by each call to `next_buffer`.
    pub samples_per_buffer: usize,
    /// Total number of voices; fixed for the synthesizer's lifetime.
    pub polyphony: usize,
    /// Voices allowed to sound the same channel/note at once.
    pub max_polyphony_per_note: usize,
    /// Semitones covered by a full-scale pitch-bend message.
    pub pitch_bend_range: f32,
}

impl SynthConfig {
    /// Creates a configuration for the given sample rate with every other
    /// field at its default.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: DEFAULT_CHANNELS,
            samples_per_buffer: default_buffer_len(sample_rate),
            polyphony: DEFAULT_POLYPHONY,
            max_polyphony_per_note: DEFAULT_POLYPHONY_PER_NOTE,
            pitch_bend_range: DEFAULT_PITCH_BEND_RANGE,
        }
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_samples_per_buffer(mut self, samples_per_buffer: usize) -> Self {
        self.samples_per_buffer = samples_per_buffer;
        self
    }

    pub fn with_polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    pub fn with_max_polyphony_per_note(mut self, max_polyphony_per_note: usize) -> Self {
        self.max_polyphony_per_note = max_polyphony_per_note;
        self
    }

    pub fn with_pitch_bend_range(mut self, semitones: f32) -> Self {
        self.pitch_bend_range = semitones;
        self
    }

    /// Returns a copy with every out-of-range field replaced by its default.
    ///
    /// Each correction is reported through `log::warn!`. A polyphony of zero
    /// is accepted: such a synthesizer ignores every note-on.
    pub fn validated(mut self) -> Self {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            warn!(
                "sample rate {} Hz outside {}..={} Hz, using {} Hz",
                self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE, DEFAULT_SAMPLE_RATE
            );
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        if !(1..=2).contains(&self.channels) {
            warn!(
                "{} output channels not supported, using {}",
                self.channels, DEFAULT_CHANNELS
            );
            self.channels = DEFAULT_CHANNELS;
        }
        if self.samples_per_buffer == 0 || self.samples_per_buffer > MAX_SAMPLES_PER_BUFFER {
            let fallback = default_buffer_len(self.sample_rate);
            warn!(
                "buffer of {} samples outside 1..={}, using {}",
                self.samples_per_buffer, MAX_SAMPLES_PER_BUFFER, fallback
            );
            self.samples_per_buffer = fallback;
        }
        if self.polyphony > MAX_POLYPHONY {
            warn!(
                "polyphony {} exceeds {}, using {}",
                self.polyphony, MAX_POLYPHONY, DEFAULT_POLYPHONY
            );
            self.polyphony = DEFAULT_POLYPHONY;
        }
        if self.max_polyphony_per_note == 0 {
            warn!(
                "per-note polyphony must be at least 1, using {}",
                DEFAULT_POLYPHONY_PER_NOTE
            );
            self.max_polyphony_per_note = DEFAULT_POLYPHONY_PER_NOTE;
        }
        if !(self.pitch_bend_range > 0.0 && self.pitch_bend_range <= 12.0) {
            warn!(
                "pitch bend range {} outside (0, 12] semitones, using {}",
                self.pitch_bend_range, DEFAULT_PITCH_BEND_RANGE
            );
            self.pitch_bend_range = DEFAULT_PITCH_BEND_RANGE;
        }
        self
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

fn default_buffer_len(sample_rate: u32) -> usize {
    (u64::from(sample_rate) * u64::from(DEFAULT_BUFFER_MILLIS) / 1000).max(1) as usize
}
