//! Voices and the machinery that hands them out.
//!
//! A [`Voice`] plays one note of one instrument. Voices live in a fixed
//! [`VoicePool`](pool::VoicePool) arena and are referred to by [`VoiceId`];
//! the [`VoiceRegistry`](registry::VoiceRegistry) maps sounding notes to the
//! voices playing them, and the [`VoiceAllocator`](allocator::VoiceAllocator)
//! ties the two together with the stealing rules.

pub mod allocator;
pub mod envelope;
pub mod pool;
pub mod registry;

pub use allocator::VoiceAllocator;
pub use envelope::{Envelope, EnvelopeState};
pub use pool::VoicePool;
pub use registry::VoiceRegistry;

use crate::buffer::AudioBuffer;
use crate::channel::{ChannelState, pan_gains};
use crate::instrument::{EnvelopeSamples, InstrumentBank, InstrumentId};
use crate::midi::NoteKey;

/// Index of a voice in its pool. Stable for the life of the pool.
pub type VoiceId = usize;

/// Fixed per-voice gain so a handful of full-velocity voices stay below
/// clipping before the master volume is applied.
pub const VOICE_GAIN: f32 = 0.3;

/// One sounding note.
///
/// A voice reads its channel's pan, volume and pitch bend at the start of
/// every [`process`](Self::process) call, so controller changes take effect
/// at the next render span rather than mid-span.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    channel: u8,
    note: u8,
    velocity: u8,
    instrument: InstrumentId,
    envelope: Envelope,
    /// Instrument-relative time in seconds.
    time: f64,
    /// Sample rate after pitch bend; time advances by its reciprocal.
    variable_sample_rate: f64,
    pan: f32,
    left_gain: f32,
    right_gain: f32,
}

impl Voice {
    pub fn new(id: VoiceId) -> Self {
        Self {
            id,
            channel: 0,
            note: 0,
            velocity: 0,
            instrument: InstrumentId::default(),
            envelope: Envelope::new(),
            time: 0.0,
            variable_sample_rate: 0.0,
            pan: 0.0,
            left_gain: 1.0,
            right_gain: 1.0,
        }
    }

    /// Binds the voice to a note and restarts its envelope and clock.
    pub fn start(
        &mut self,
        channel: u8,
        note: u8,
        velocity: u8,
        instrument: InstrumentId,
        envelope: EnvelopeSamples,
    ) {
        self.channel = channel;
        self.note = note;
        self.velocity = velocity;
        self.instrument = instrument;
        self.time = 0.0;
        self.envelope.start(envelope);
    }

    /// Graceful note-off.
    pub fn stop(&mut self) {
        self.envelope.stop();
    }

    pub fn stop_immediately(&mut self) {
        self.envelope.stop_immediately();
    }

    /// True while the envelope is running.
    #[inline]
    pub fn in_use(&self) -> bool {
        self.envelope.is_active()
    }

    /// Renders frames `from..to` additively into `buffer`.
    ///
    /// Stops early, leaving the rest of the span untouched, as soon as the
    /// envelope finishes. Mono buffers take the raw signal on channel 0;
    /// stereo buffers get it through the channel's pan gains, with stereo
    /// instruments supplying separate left and right samples.
    pub fn process<B: InstrumentBank + ?Sized>(
        &mut self,
        buffer: &mut AudioBuffer,
        from: usize,
        to: usize,
        channels: &ChannelState,
        bank: &mut B,
        sample_rate: f64,
    ) {
        if !self.in_use() {
            return;
        }

        let ch = usize::from(self.channel);
        self.variable_sample_rate =
            sample_rate * 2.0_f64.powf(-f64::from(channels.pitch_bend(ch)) / 12.0);
        self.set_pan(channels.pan(ch));

        let level = f32::from(self.velocity) / 127.0 * channels.volume(ch) * VOICE_GAIN;
        let stereo_out = buffer.channels() >= 2;
        let stereo_source = stereo_out && bank.is_stereo(self.instrument);
        let step = 1.0 / self.variable_sample_rate;
        let to = to.min(buffer.frames());

        for frame in from..to {
            let fade = self.envelope.step();
            if !self.envelope.is_active() {
                break;
            }
            let gain = level * fade;

            if stereo_source {
                let mut right_time = self.time;
                let left = bank.sample_at(
                    self.instrument,
                    self.note,
                    0,
                    self.variable_sample_rate,
                    &mut self.time,
                );
                let right = bank.sample_at(
                    self.instrument,
                    self.note,
                    1,
                    self.variable_sample_rate,
                    &mut right_time,
                );
                buffer.add(0, frame, left * gain * self.left_gain);
                buffer.add(1, frame, right * gain * self.right_gain);
            } else {
                let value = bank.sample_at(
                    self.instrument,
                    self.note,
                    0,
                    self.variable_sample_rate,
                    &mut self.time,
                ) * gain;
                if stereo_out {
                    buffer.add(0, frame, value * self.left_gain);
                    buffer.add(1, frame, value * self.right_gain);
                } else {
                    buffer.add(0, frame, value);
                }
            }

            self.time += step;
        }
    }

    fn set_pan(&mut self, pan: f32) {
        if pan != self.pan {
            self.pan = pan;
            (self.left_gain, self.right_gain) = pan_gains(pan);
        }
    }

    #[inline]
    pub fn id(&self) -> VoiceId {
        self.id
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    #[inline]
    pub fn note(&self) -> u8 {
        self.note
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    #[inline]
    pub fn key(&self) -> NoteKey {
        NoteKey::new(self.channel, self.note)
    }

    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    /// Seconds of instrument time played so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Pitch-bent sample rate from the most recent render span.
    pub fn variable_sample_rate(&self) -> f64 {
        self.variable_sample_rate
    }

    pub fn gains(&self) -> (f32, f32) {
        (self.left_gain, self.right_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Constant 1.0 on the left, 0.5 on the right.
    struct Dc {
        stereo: bool,
    }

    impl InstrumentBank for Dc {
        fn resolve(&self, _program: u8, _is_drum: bool) -> Option<InstrumentId> {
            Some(InstrumentId(0))
        }

        fn envelope(&self, _id: InstrumentId, _note: u8) -> EnvelopeSamples {
            EnvelopeSamples::new(0, 0, 0, 0)
        }

        fn sample_at(
            &mut self,
            _id: InstrumentId,
            _note: u8,
            channel: usize,
            _sample_rate: f64,
            _time: &mut f64,
        ) -> f32 {
            if channel == 1 { 0.5 } else { 1.0 }
        }

        fn is_stereo(&self, _id: InstrumentId) -> bool {
            self.stereo
        }
    }

    fn playing(velocity: u8, envelope: EnvelopeSamples) -> Voice {
        let mut voice = Voice::new(0);
        voice.start(0, 60, velocity, InstrumentId(0), envelope);
        voice
    }

    #[test]
    fn test_idle_voice_renders_nothing() {
        let mut voice = Voice::new(3);
        let mut buffer = AudioBuffer::new(2, 8);
        voice.process(
            &mut buffer,
            0,
            8,
            &ChannelState::new(),
            &mut Dc { stereo: false },
            44_100.0,
        );
        assert!(buffer.is_silent());
        assert_eq!(voice.id(), 3);
    }

    #[test]
    fn test_full_velocity_centre_pan() {
        let mut voice = playing(127, EnvelopeSamples::default());
        let mut buffer = AudioBuffer::new(2, 4);
        voice.process(
            &mut buffer,
            0,
            4,
            &ChannelState::new(),
            &mut Dc { stereo: false },
            44_100.0,
        );

        for frame in 0..4 {
            assert!((buffer.get(0, frame) - VOICE_GAIN).abs() < 1e-6);
            assert!((buffer.get(1, frame) - VOICE_GAIN).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mono_buffer_ignores_pan() {
        let mut channels = ChannelState::new();
        channels.set_pan(0, -1.0);
        let mut voice = playing(127, EnvelopeSamples::default());
        let mut buffer = AudioBuffer::new(1, 4);
        voice.process(
            &mut buffer,
            0,
            4,
            &channels,
            &mut Dc { stereo: true },
            44_100.0,
        );

        assert!((buffer.get(0, 0) - VOICE_GAIN).abs() < 1e-6);
    }

    #[test]
    fn test_pan_and_volume_apply() {
        let mut channels = ChannelState::new();
        channels.set_pan(0, 0.5);
        channels.set_volume(0, 0.5);
        let mut voice = playing(127, EnvelopeSamples::default());
        let mut buffer = AudioBuffer::new(2, 1);
        voice.process(
            &mut buffer,
            0,
            1,
            &channels,
            &mut Dc { stereo: false },
            44_100.0,
        );

        let expected = 0.5 * VOICE_GAIN;
        assert!((buffer.get(0, 0) - expected).abs() < 1e-6);
        assert!((buffer.get(1, 0) - expected * 0.5).abs() < 1e-6);
        assert_eq!(voice.gains(), (1.0, 0.5));
    }

    #[test]
    fn test_stereo_instrument_feeds_both_sides() {
        let mut voice = playing(127, EnvelopeSamples::default());
        let mut buffer = AudioBuffer::new(2, 1);
        voice.process(
            &mut buffer,
            0,
            1,
            &ChannelState::new(),
            &mut Dc { stereo: true },
            44_100.0,
        );

        assert!((buffer.get(0, 0) - VOICE_GAIN).abs() < 1e-6);
        assert!((buffer.get(1, 0) - 0.5 * VOICE_GAIN).abs() < 1e-6);
    }

    #[test]
    fn test_stops_mid_span_when_envelope_ends() {
        let mut voice = playing(127, EnvelopeSamples::new(0, 0, 3, 0));
        let mut buffer = AudioBuffer::new(1, 8);
        voice.process(
            &mut buffer,
            0,
            8,
            &ChannelState::new(),
            &mut Dc { stereo: false },
            44_100.0,
        );

        assert!(!voice.in_use());
        assert!(buffer.get(0, 1) > 0.0);
        assert_eq!(buffer.get(0, 2), 0.0);
        assert_eq!(buffer.get(0, 7), 0.0);
    }

    #[test]
    fn test_time_advances_with_pitch_bend() {
        let mut channels = ChannelState::new();
        channels.set_pitch_bend(0, 12.0);
        let mut voice = playing(100, EnvelopeSamples::default());
        let mut buffer = AudioBuffer::new(2, 10);
        voice.process(
            &mut buffer,
            0,
            10,
            &channels,
            &mut Dc { stereo: false },
            1_000.0,
        );

        // One octave up halves the rate, doubling how fast time passes
        assert!((voice.variable_sample_rate() - 500.0).abs() < 1e-9);
        assert!((voice.time() - 10.0 / 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_renders_only_requested_span() {
        let mut voice = playing(127, EnvelopeSamples::default());
        let mut buffer = AudioBuffer::new(1, 8);
        voice.process(
            &mut buffer,
            3,
            5,
            &ChannelState::new(),
            &mut Dc { stereo: false },
            44_100.0,
        );

        assert_eq!(buffer.get(0, 2), 0.0);
        assert!(buffer.get(0, 3) > 0.0);
        assert!(buffer.get(0, 4) > 0.0);
        assert_eq!(buffer.get(0, 5), 0.0);
    }
}
