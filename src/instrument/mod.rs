//! The instrument contract voices play through.
//!
//! The engine never inspects instruments. It resolves a program to an
//! [`InstrumentId`] once per note-on, asks for the note's envelope lengths,
//! and then pulls raw samples one at a time. Anything that can answer those
//! questions can drive the synthesizer: a sample bank, a wavetable set, or
//! the bundled [`SynthBank`].

pub mod bank;
pub mod waveform;

pub use bank::{Patch, SynthBank};
pub use waveform::Waveform;

/// Handle to an instrument inside an [`InstrumentBank`].
///
/// Voices keep this index instead of a reference; the bank is owned by the
/// synthesizer, so a handle can never outlive what it points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstrumentId(pub usize);

/// Sustain length used when an instrument reports no natural decay.
///
/// At 48 kHz this is roughly 12 hours of sustain.
pub const DEFAULT_DECAY_SAMPLES: u32 = i32::MAX as u32;

/// Envelope phase lengths, in samples, for one note of one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSamples {
    pub attack: u32,
    pub hold: u32,
    /// Length of the natural decay to silence; 0 means the note sustains.
    pub decay: u32,
    pub release: u32,
}

impl EnvelopeSamples {
    pub fn new(attack: u32, hold: u32, decay: u32, release: u32) -> Self {
        Self {
            attack,
            hold,
            decay,
            release,
        }
    }

    /// Converts phase lengths in seconds to samples at `sample_rate`.
    ///
    /// A decay of `None` means the note sustains until released.
    pub fn from_seconds(
        attack: f64,
        hold: f64,
        decay: Option<f64>,
        release: f64,
        sample_rate: f64,
    ) -> Self {
        let to_samples = |seconds: f64| (seconds.max(0.0) * sample_rate).round() as u32;
        Self {
            attack: to_samples(attack),
            hold: to_samples(hold),
            decay: decay.map_or(0, to_samples),
            release: to_samples(release),
        }
    }
}

impl Default for EnvelopeSamples {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

/// Source of instruments and their raw samples.
///
/// # Examples
///
/// A bank with a single square-wave instrument:
///
/// ```
/// use humdrum::instrument::{EnvelopeSamples, InstrumentBank, InstrumentId};
///
/// struct Buzz;
///
/// impl InstrumentBank for Buzz {
///     fn resolve(&self, _program: u8, _is_drum: bool) -> Option<InstrumentId> {
///         Some(InstrumentId(0))
///     }
///
///     fn envelope(&self, _id: InstrumentId, _note: u8) -> EnvelopeSamples {
///         EnvelopeSamples::new(64, 0, 0, 256)
///     }
///
///     fn sample_at(
///         &mut self,
///         _id: InstrumentId,
///         note: u8,
///         _channel: usize,
///         _sample_rate: f64,
///         time: &mut f64,
///     ) -> f32 {
///         let freq = humdrum::midi::note_to_frequency(note);
///         if (*time * freq).fract() < 0.5 { 1.0 } else { -1.0 }
///     }
/// }
///
/// let mut bank = Buzz;
/// let mut time = 0.0;
/// assert_eq!(bank.sample_at(InstrumentId(0), 69, 0, 44_100.0, &mut time), 1.0);
/// ```
pub trait InstrumentBank {
    /// Picks the instrument for a program; the drum flag selects the
    /// percussion variant. `None` makes the note-on a no-op.
    fn resolve(&self, program: u8, is_drum: bool) -> Option<InstrumentId>;

    /// Envelope lengths for `note` played on `id`, fixed for the voice's life.
    fn envelope(&self, id: InstrumentId, note: u8) -> EnvelopeSamples;

    /// Raw sample of `note` on output `channel` at `time` seconds.
    ///
    /// `sample_rate` is the voice's current (pitch-bent) rate. The instrument
    /// may rewrite `time`, e.g. to wrap a sample loop; the voice advances it
    /// afterwards.
    fn sample_at(
        &mut self,
        id: InstrumentId,
        note: u8,
        channel: usize,
        sample_rate: f64,
        time: &mut f64,
    ) -> f32;

    /// True when the instrument produces distinct left and right samples.
    fn is_stereo(&self, _id: InstrumentId) -> bool {
        false
    }
}
