//! Sample-counted amplitude envelope.
//!
//! Every phase is measured in processed samples rather than seconds, so the
//! envelope of a voice cannot drift when the voice is pitch-bent or the host
//! changes buffer sizes.
//!
//! ```text
//!            start                    stop
//!              │                        │
//!   None ──► Attack ──► Sustain ────────┼──► Hold ──► Release ──► None
//!              │  (fade = 0)  │         │  (hold > 0)  (fade = 0)   (fade = 0)
//!              │              │         └────────────► Release
//!              │              │               (hold = 0)
//!              └──────────────┴── decay counter reaches 0 ──► None
//! ```
//!
//! The decay counter runs from the end of the attack until the voice dies.
//! Sustain, Hold and Release all follow it, which is how percussive notes fade
//! out while held and why a release can only ever get quieter.

use crate::instrument::{DEFAULT_DECAY_SAMPLES, EnvelopeSamples};

/// Phase of an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeState {
    /// Finished or never started; silent.
    #[default]
    None,
    Attack,
    Sustain,
    Hold,
    Release,
}

/// Envelope state machine driven one sample at a time.
///
/// # Examples
///
/// ```
/// use humdrum::instrument::EnvelopeSamples;
/// use humdrum::voice::envelope::{Envelope, EnvelopeState};
///
/// let mut env = Envelope::new();
/// env.start(EnvelopeSamples::new(4, 0, 0, 2));
/// assert_eq!(env.state(), EnvelopeState::Attack);
///
/// let attack: Vec<f32> = (0..4).map(|_| env.step()).collect();
/// assert_eq!(attack, vec![0.25, 0.5, 0.75, 1.0]);
/// assert_eq!(env.state(), EnvelopeState::Sustain);
///
/// env.stop();
/// env.step();
/// env.step();
/// assert!(!env.is_active());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    state: EnvelopeState,
    attack: u32,
    hold: u32,
    decay: u32,
    release: u32,
    /// Countdown within Attack, Hold or Release.
    fade_counter: u32,
    /// Countdown to forced silence.
    decay_counter: u32,
    fade_multiplier: f32,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            state: EnvelopeState::None,
            attack: 0,
            hold: 0,
            decay: DEFAULT_DECAY_SAMPLES,
            release: 0,
            fade_counter: 0,
            decay_counter: 0,
            fade_multiplier: 0.0,
        }
    }

    /// Restarts the envelope with new phase lengths.
    ///
    /// A decay of 0 means the note never fades on its own.
    pub fn start(&mut self, samples: EnvelopeSamples) {
        self.attack = samples.attack;
        self.hold = samples.hold;
        self.release = samples.release;
        self.decay = if samples.decay == 0 {
            DEFAULT_DECAY_SAMPLES
        } else {
            samples.decay
        };
        self.decay_counter = self.decay;

        if self.attack > 0 {
            self.state = EnvelopeState::Attack;
            self.fade_counter = self.attack;
            self.fade_multiplier = 0.0;
        } else {
            self.state = EnvelopeState::Sustain;
            self.fade_counter = 0;
            self.fade_multiplier = 1.0;
        }
    }

    /// Graceful note-off: Hold if the instrument has one, otherwise Release.
    ///
    /// Has no effect once the envelope is already holding, releasing or done.
    pub fn stop(&mut self) {
        match self.state {
            EnvelopeState::Attack | EnvelopeState::Sustain => {
                if self.hold > 0 {
                    self.state = EnvelopeState::Hold;
                    self.fade_counter = self.hold;
                } else {
                    self.enter_release();
                }
            }
            EnvelopeState::Hold | EnvelopeState::Release | EnvelopeState::None => {}
        }
    }

    /// Cuts the envelope to silence without a ramp.
    pub fn stop_immediately(&mut self) {
        self.finish();
    }

    /// Advances one sample and returns the gain for it.
    pub fn step(&mut self) -> f32 {
        match self.state {
            EnvelopeState::None => {}
            EnvelopeState::Attack => {
                self.fade_counter = self.fade_counter.saturating_sub(1);
                if self.fade_counter == 0 {
                    self.state = EnvelopeState::Sustain;
                    self.fade_multiplier = 1.0;
                } else {
                    self.fade_multiplier = 1.0 - ratio(self.fade_counter, self.attack);
                }
            }
            EnvelopeState::Sustain => {
                self.decay_counter = self.decay_counter.saturating_sub(1);
                if self.decay_counter == 0 {
                    self.finish();
                } else {
                    self.fade_multiplier = ratio(self.decay_counter, self.decay);
                }
            }
            EnvelopeState::Hold => {
                self.fade_counter = self.fade_counter.saturating_sub(1);
                self.decay_counter = self.decay_counter.saturating_sub(1);
                if self.decay_counter == 0 {
                    self.finish();
                } else {
                    self.fade_multiplier = ratio(self.decay_counter, self.decay);
                    if self.fade_counter == 0 {
                        self.enter_release();
                    }
                }
            }
            EnvelopeState::Release => {
                self.fade_counter = self.fade_counter.saturating_sub(1);
                self.decay_counter = self.decay_counter.saturating_sub(1);
                if self.fade_counter == 0 || self.decay_counter == 0 {
                    self.finish();
                } else {
                    self.fade_multiplier = ratio(self.decay_counter, self.decay)
                        * ratio(self.fade_counter, self.release);
                }
            }
        }
        self.fade_multiplier
    }

    /// True from `start` until the envelope reaches [`EnvelopeState::None`].
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::None
    }

    #[inline]
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Gain produced by the last step.
    #[inline]
    pub fn fade_multiplier(&self) -> f32 {
        self.fade_multiplier
    }

    /// Phase lengths the envelope was started with (decay already defaulted).
    pub fn samples(&self) -> EnvelopeSamples {
        EnvelopeSamples::new(self.attack, self.hold, self.decay, self.release)
    }

    fn enter_release(&mut self) {
        if self.release == 0 {
            self.finish();
        } else {
            self.state = EnvelopeState::Release;
            self.fade_counter = self.release;
        }
    }

    fn finish(&mut self) {
        self.state = EnvelopeState::None;
        self.fade_counter = 0;
        self.decay_counter = 0;
        self.fade_multiplier = 0.0;
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn ratio(counter: u32, total: u32) -> f32 {
    (f64::from(counter) / f64::from(total)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(attack: u32, hold: u32, decay: u32, release: u32) -> Envelope {
        let mut env = Envelope::new();
        env.start(EnvelopeSamples::new(attack, hold, decay, release));
        env
    }

    #[test]
    fn test_new_envelope_is_idle() {
        let mut env = Envelope::new();
        assert!(!env.is_active());
        assert_eq!(env.step(), 0.0);
    }

    #[test]
    fn test_zero_attack_starts_in_sustain() {
        let env = started(0, 0, 0, 10);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.fade_multiplier(), 1.0);
    }

    #[test]
    fn test_attack_is_non_decreasing() {
        let mut env = started(100, 0, 0, 10);
        let mut previous = 0.0;
        while env.state() == EnvelopeState::Attack {
            let level = env.step();
            assert!(level >= previous);
            assert!(level <= 1.0);
            previous = level;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn test_natural_decay_ends_after_exact_length() {
        let mut env = started(0, 0, 50, 0);
        for _ in 0..49 {
            env.step();
            assert!(env.is_active());
        }
        env.step();
        assert!(!env.is_active());
    }

    #[test]
    fn test_sustain_follows_decay_curve() {
        let mut env = started(0, 0, 4, 0);
        assert_eq!(env.step(), 0.75);
        assert_eq!(env.step(), 0.5);
        assert_eq!(env.step(), 0.25);
    }

    #[test]
    fn test_release_ramps_to_silence() {
        let mut env = started(0, 0, 0, 4);
        env.step();
        env.stop();
        assert_eq!(env.state(), EnvelopeState::Release);

        let mut previous = env.fade_multiplier();
        let mut steps = 0;
        while env.is_active() {
            let level = env.step();
            assert!(level <= previous);
            assert!(level >= 0.0);
            previous = level;
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_release_multiplies_decay() {
        let mut env = started(0, 0, 10, 4);
        env.step(); // decay 9/10
        env.stop();
        // decay 8/10, release 3/4
        assert!((env.step() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_stop_during_attack_releases_from_decay_level() {
        let mut env = started(10, 0, 20, 4);
        for _ in 0..3 {
            env.step();
        }
        assert!((env.fade_multiplier() - 0.3).abs() < 1e-6);

        env.stop();
        assert_eq!(env.state(), EnvelopeState::Release);
        // Attack leaves the decay counter untouched: 19/20 * 3/4
        assert!((env.step() - 0.7125).abs() < 1e-6);
        assert!((env.step() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_hold_then_release() {
        let mut env = started(0, 3, 0, 2);
        env.stop();
        assert_eq!(env.state(), EnvelopeState::Hold);

        env.step();
        env.step();
        assert_eq!(env.state(), EnvelopeState::Hold);
        env.step();
        assert_eq!(env.state(), EnvelopeState::Release);
        env.step();
        assert!(env.is_active());
        env.step();
        assert!(!env.is_active());
    }

    #[test]
    fn test_decay_ends_hold_early() {
        let mut env = started(0, 100, 5, 100);
        env.stop();
        let mut steps = 0;
        while env.is_active() {
            env.step();
            steps += 1;
        }
        assert_eq!(steps, 5);
    }

    #[test]
    fn test_stop_without_release_is_silent_at_once() {
        let mut env = started(0, 0, 0, 0);
        env.stop();
        assert!(!env.is_active());
    }

    #[test]
    fn test_stop_is_ignored_while_releasing() {
        let mut env = started(0, 0, 0, 10);
        env.stop();
        env.step();
        env.stop();
        assert_eq!(env.state(), EnvelopeState::Release);
    }

    #[test]
    fn test_stop_immediately() {
        let mut env = started(10, 10, 10, 10);
        env.step();
        env.stop_immediately();
        assert!(!env.is_active());
        assert_eq!(env.fade_multiplier(), 0.0);
    }
}
