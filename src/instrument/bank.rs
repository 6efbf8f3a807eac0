//! A small programmable instrument bank built from basic waveforms.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;

use super::{EnvelopeSamples, InstrumentBank, InstrumentId, Waveform};
use crate::midi::note_to_frequency;

/// One instrument of a [`SynthBank`]: a waveform and its envelope in seconds.
///
/// # Examples
///
/// ```
/// use humdrum::instrument::{Patch, Waveform};
///
/// // Plucked sound: fast attack, fades out by itself within a second
/// let pluck = Patch::new(Waveform::Triangle)
///     .with_attack(0.002)
///     .with_decay(0.8)
///     .with_release(0.05);
///
/// // Detuned saw, rendered with distinct left and right channels
/// let lead = Patch::new(Waveform::Sawtooth).with_stereo_detune(7.0);
/// assert!(lead.is_stereo());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub waveform: Waveform,
    pub attack: f64,
    pub hold: f64,
    /// Natural decay to silence; `None` sustains until released.
    pub decay: Option<f64>,
    pub release: f64,
    /// Right channel detune in cents; `Some` makes the patch stereo.
    pub stereo_detune: Option<f64>,
}

impl Patch {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            attack: 0.01,
            hold: 0.0,
            decay: None,
            release: 0.2,
            stereo_detune: None,
        }
    }

    pub fn with_attack(mut self, seconds: f64) -> Self {
        self.attack = seconds;
        self
    }

    pub fn with_hold(mut self, seconds: f64) -> Self {
        self.hold = seconds;
        self
    }

    pub fn with_decay(mut self, seconds: f64) -> Self {
        self.decay = Some(seconds);
        self
    }

    pub fn with_release(mut self, seconds: f64) -> Self {
        self.release = seconds;
        self
    }

    pub fn with_stereo_detune(mut self, cents: f64) -> Self {
        self.stereo_detune = Some(cents);
        self
    }

    pub fn is_stereo(&self) -> bool {
        self.stereo_detune.is_some()
    }
}

/// An [`InstrumentBank`] of [`Patch`]es with a program table.
///
/// Every melodic program maps to a patch index; percussion (the drum channel)
/// maps to a single separate patch. Noise is drawn from the random generator
/// the bank was built with, so renders are reproducible with a seeded RNG.
///
/// # Examples
///
/// ```
/// use humdrum::instrument::{InstrumentBank, Patch, SynthBank, Waveform};
/// use rand::SeedableRng;
///
/// let rng = rand::rngs::StdRng::seed_from_u64(7);
/// let mut bank = SynthBank::with_rng(44_100, rng);
/// let organ = bank.add_patch(Patch::new(Waveform::Square));
/// bank.assign_program(16, organ);
///
/// assert_eq!(bank.resolve(16, false), Some(organ));
/// assert!(bank.resolve(16, true).is_some()); // drum kit
/// ```
#[derive(Debug, Clone)]
pub struct SynthBank<R: Rng = StdRng> {
    sample_rate: f64,
    patches: Vec<Patch>,
    programs: [usize; 128],
    drums: usize,
    rng: R,
}

impl SynthBank<StdRng> {
    /// Creates the default bank seeded from system entropy.
    pub fn new(sample_rate: u32) -> Self {
        Self::with_rng(sample_rate, StdRng::from_entropy())
    }
}

impl<R: Rng> SynthBank<R> {
    /// Creates the default bank using `rng` for noise.
    ///
    /// The default set has four melodic patches and a noise drum kit. The
    /// General MIDI program families (groups of eight) cycle through them:
    /// sine keys, square organ, detuned saw lead and triangle pad.
    pub fn with_rng(sample_rate: u32, rng: R) -> Self {
        let patches = vec![
            Patch::new(Waveform::Sine)
                .with_attack(0.005)
                .with_decay(2.5)
                .with_release(0.3),
            Patch::new(Waveform::Square)
                .with_attack(0.01)
                .with_release(0.1),
            Patch::new(Waveform::Sawtooth)
                .with_attack(0.02)
                .with_release(0.25)
                .with_stereo_detune(8.0),
            Patch::new(Waveform::Triangle)
                .with_attack(0.3)
                .with_hold(0.2)
                .with_release(0.8),
            Patch::new(Waveform::Noise)
                .with_attack(0.0)
                .with_decay(0.25)
                .with_release(0.05),
        ];

        let mut programs = [0; 128];
        for (program, slot) in programs.iter_mut().enumerate() {
            *slot = (program / 8) % 4;
        }

        Self {
            sample_rate: f64::from(sample_rate),
            patches,
            programs,
            drums: 4,
            rng,
        }
    }

    /// Appends a patch and returns its handle. It is not assigned to any
    /// program until [`assign_program`](Self::assign_program) is called.
    pub fn add_patch(&mut self, patch: Patch) -> InstrumentId {
        self.patches.push(patch);
        InstrumentId(self.patches.len() - 1)
    }

    /// Points `program` at an existing patch. Unknown programs or handles
    /// are ignored.
    pub fn assign_program(&mut self, program: u8, id: InstrumentId) {
        if id.0 < self.patches.len() {
            if let Some(slot) = self.programs.get_mut(usize::from(program)) {
                *slot = id.0;
            }
        }
    }

    /// Uses an existing patch for the drum channel. Unknown handles are ignored.
    pub fn assign_drums(&mut self, id: InstrumentId) {
        if id.0 < self.patches.len() {
            self.drums = id.0;
        }
    }

    pub fn patch(&self, id: InstrumentId) -> Option<&Patch> {
        self.patches.get(id.0)
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }
}

impl<R: Rng> InstrumentBank for SynthBank<R> {
    fn resolve(&self, program: u8, is_drum: bool) -> Option<InstrumentId> {
        if is_drum {
            return Some(InstrumentId(self.drums));
        }
        self.programs
            .get(usize::from(program))
            .map(|&index| InstrumentId(index))
    }

    fn envelope(&self, id: InstrumentId, _note: u8) -> EnvelopeSamples {
        self.patches.get(id.0).map_or_else(EnvelopeSamples::default, |p| {
            EnvelopeSamples::from_seconds(p.attack, p.hold, p.decay, p.release, self.sample_rate)
        })
    }

    fn sample_at(
        &mut self,
        id: InstrumentId,
        note: u8,
        channel: usize,
        _sample_rate: f64,
        time: &mut f64,
    ) -> f32 {
        let Some(patch) = self.patches.get(id.0) else {
            return 0.0;
        };

        let mut frequency = note_to_frequency(note);
        if channel == 1 {
            if let Some(cents) = patch.stereo_detune {
                frequency *= 2.0_f64.powf(cents / 1200.0);
            }
        }
        patch.waveform.evaluate(*time * frequency, &mut self.rng)
    }

    fn is_stereo(&self, id: InstrumentId) -> bool {
        self.patches.get(id.0).is_some_and(Patch::is_stereo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> SynthBank {
        SynthBank::with_rng(48_000, StdRng::seed_from_u64(3))
    }

    #[test]
    fn test_program_families() {
        let bank = bank();
        assert_eq!(bank.resolve(0, false), Some(InstrumentId(0)));
        assert_eq!(bank.resolve(8, false), Some(InstrumentId(1)));
        assert_eq!(bank.resolve(16, false), Some(InstrumentId(2)));
        assert_eq!(bank.resolve(24, false), Some(InstrumentId(3)));
        assert_eq!(bank.resolve(32, false), Some(InstrumentId(0)));
        assert_eq!(bank.resolve(127, false), Some(InstrumentId(3)));
    }

    #[test]
    fn test_drums_resolve_to_noise() {
        let bank = bank();
        let drums = bank.resolve(0, true).unwrap();
        assert_eq!(bank.patch(drums).unwrap().waveform, Waveform::Noise);
    }

    #[test]
    fn test_envelope_in_samples() {
        let bank = bank();
        let env = bank.envelope(InstrumentId(4), 38);
        assert_eq!(env, EnvelopeSamples::new(0, 0, 12_000, 2_400));

        // Organ sustains
        assert_eq!(bank.envelope(InstrumentId(1), 60).decay, 0);
    }

    #[test]
    fn test_unknown_instrument_is_silent() {
        let mut bank = bank();
        let mut time = 0.123;
        let unknown = InstrumentId(99);
        assert_eq!(bank.sample_at(unknown, 60, 0, 48_000.0, &mut time), 0.0);
        assert_eq!(bank.envelope(unknown, 60), EnvelopeSamples::default());
        assert!(!bank.is_stereo(unknown));
    }

    #[test]
    fn test_stereo_patch_detunes_right_channel() {
        let mut bank = bank();
        let lead = InstrumentId(2);
        assert!(bank.is_stereo(lead));

        let mut time = 0.01;
        let left = bank.sample_at(lead, 69, 0, 48_000.0, &mut time);
        let right = bank.sample_at(lead, 69, 1, 48_000.0, &mut time);
        assert_ne!(left, right);
        assert_eq!(time, 0.01);
    }

    #[test]
    fn test_assign_program_ignores_unknown_patch() {
        let mut bank = bank();
        bank.assign_program(5, InstrumentId(42));
        assert_eq!(bank.resolve(5, false), Some(InstrumentId(0)));

        let id = bank.add_patch(Patch::new(Waveform::Square));
        bank.assign_program(5, id);
        bank.assign_drums(id);
        assert_eq!(bank.resolve(5, false), Some(id));
        assert_eq!(bank.resolve(5, true), Some(id));
        assert_eq!(bank.patch_count(), 6);
    }
}
