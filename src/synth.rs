//! The synthesizer: voice allocation, event interleaving and buffer output.

use log::debug;

use crate::buffer::AudioBuffer;
use crate::channel::ChannelState;
use crate::config::SynthConfig;
use crate::effects::{Effect, EffectChain};
use crate::error::SynthError;
use crate::instrument::{InstrumentBank, InstrumentId};
use crate::midi::{CHANNEL_COUNT, DRUM_CHANNEL, MidiEvent, PITCH_BEND_CENTER, controller};
use crate::output::{OutputSink, write_interleaved};
use crate::sequencer::{Sequencer, TimedEvent};
use crate::voice::{Voice, VoiceAllocator};

/// Scratch events reserved up front so a typical buffer never allocates.
const EVENT_CAPACITY: usize = 256;

/// A polyphonic, pull-driven synthesizer.
///
/// The host calls [`next_buffer`](Self::next_buffer) whenever it needs more
/// audio. Each call renders exactly `samples_per_buffer` frames, applying any
/// sequencer events at the sample they are scheduled for, runs the effect
/// chain and writes interleaved samples into the destination.
///
/// Notes can also be driven directly with [`note_on`](Self::note_on) and
/// friends; those take effect at the start of the next buffer.
///
/// # Examples
///
/// ```
/// use humdrum::instrument::SynthBank;
/// use humdrum::{SynthConfig, Synthesizer};
///
/// let config = SynthConfig::new(44_100).with_samples_per_buffer(512);
/// let mut synth = Synthesizer::new(config, SynthBank::new(44_100));
///
/// synth.note_on(0, 60, 100);
/// let mut out = vec![0.0f32; 512 * 2];
/// synth.next_buffer(&mut out[..]).unwrap();
/// assert!(out.iter().any(|&s| s != 0.0));
///
/// synth.note_off(0, 60);
/// assert_eq!(synth.active_voice_count(), 1); // still releasing
/// ```
pub struct Synthesizer<B: InstrumentBank> {
    config: SynthConfig,
    bank: B,
    channels: ChannelState,
    voices: VoiceAllocator,
    effects: EffectChain,
    sequencer: Option<Box<dyn Sequencer + Send>>,
    buffer: AudioBuffer,
    events: Vec<TimedEvent>,
    master_volume: f32,
}

impl<B: InstrumentBank> Synthesizer<B> {
    /// Creates a synthesizer. The configuration is validated first; see
    /// [`SynthConfig::validated`].
    pub fn new(config: SynthConfig, bank: B) -> Self {
        let config = config.validated();
        Self {
            bank,
            channels: ChannelState::new(),
            voices: VoiceAllocator::new(config.polyphony, config.max_polyphony_per_note),
            effects: EffectChain::new(),
            sequencer: None,
            buffer: AudioBuffer::new(config.channels, config.samples_per_buffer),
            events: Vec::with_capacity(EVENT_CAPACITY),
            master_volume: 1.0,
            config,
        }
    }

    /// Starts `note` on `channel` with the channel's current program.
    ///
    /// Channel 9 plays the bank's percussion. Notes whose program the bank
    /// cannot resolve, and out-of-range arguments, are ignored.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        if usize::from(channel) >= CHANNEL_COUNT || note > 127 || velocity > 127 {
            return;
        }
        let program = self.channels.program(usize::from(channel));
        match self.bank.resolve(program, channel == DRUM_CHANNEL) {
            Some(instrument) => self.note_on_instrument(channel, note, velocity, instrument),
            None => debug!(
                "no instrument for program {} on channel {}, ignoring note {}",
                program, channel, note
            ),
        }
    }

    /// Starts `note` on `channel` with an explicit instrument.
    pub fn note_on_instrument(
        &mut self,
        channel: u8,
        note: u8,
        velocity: u8,
        instrument: InstrumentId,
    ) {
        if usize::from(channel) >= CHANNEL_COUNT || note > 127 || velocity > 127 {
            return;
        }
        if self
            .voices
            .note_on(channel, note, velocity, instrument, &self.bank)
            .is_none()
        {
            debug!(
                "no voices available for note {} on channel {}",
                note, channel
            );
        }
    }

    /// Releases the oldest voice playing `note` on `channel`, if any.
    pub fn note_off(&mut self, channel: u8, note: u8) {
        self.voices.note_off(channel, note);
    }

    /// Releases every voice; `immediate` cuts them off instead.
    pub fn note_off_all(&mut self, immediate: bool) {
        self.voices.note_off_all(immediate);
    }

    pub fn set_pan(&mut self, channel: u8, pan: f32) {
        self.channels.set_pan(usize::from(channel), pan);
    }

    pub fn set_volume(&mut self, channel: u8, volume: f32) {
        self.channels.set_volume(usize::from(channel), volume);
    }

    /// Sets the channel's pitch bend in semitones, within ±12.
    pub fn set_pitch_bend(&mut self, channel: u8, semitones: f32) {
        self.channels.set_pitch_bend(usize::from(channel), semitones);
    }

    pub fn set_program(&mut self, channel: u8, program: u8) {
        self.channels.set_program(usize::from(channel), program);
    }

    pub fn pan(&self, channel: u8) -> f32 {
        self.channels.pan(usize::from(channel))
    }

    pub fn volume(&self, channel: u8) -> f32 {
        self.channels.volume(usize::from(channel))
    }

    pub fn pitch_bend(&self, channel: u8) -> f32 {
        self.channels.pitch_bend(usize::from(channel))
    }

    pub fn program(&self, channel: u8) -> u8 {
        self.channels.program(usize::from(channel))
    }

    /// Restores pan, volume and pitch bend on every channel.
    pub fn reset_channels(&mut self) {
        self.channels.reset();
    }

    /// Applies a MIDI message immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use humdrum::instrument::SynthBank;
    /// use humdrum::{MidiEvent, SynthConfig, Synthesizer};
    ///
    /// let mut synth = Synthesizer::new(SynthConfig::default(), SynthBank::new(44_100));
    /// synth.apply_event(MidiEvent::ControlChange { channel: 2, controller: 10, value: 127 });
    /// synth.apply_event(MidiEvent::PitchBend { channel: 2, value: 0 });
    ///
    /// assert_eq!(synth.pan(2), 1.0);
    /// assert_eq!(synth.pitch_bend(2), -2.0);
    /// ```
    pub fn apply_event(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity: 0,
            } => self.note_off(channel, note),
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => self.note_on(channel, note, velocity),
            MidiEvent::NoteOff { channel, note } => self.note_off(channel, note),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(channel, controller, value),
            MidiEvent::ProgramChange { channel, program } => self.set_program(channel, program),
            MidiEvent::PitchBend { channel, value } => {
                let amount = (f32::from(value) - f32::from(PITCH_BEND_CENTER))
                    / f32::from(PITCH_BEND_CENTER);
                self.set_pitch_bend(channel, amount * self.config.pitch_bend_range);
            }
        }
    }

    fn control_change(&mut self, channel: u8, number: u8, value: u8) {
        match number {
            controller::VOLUME => self.set_volume(channel, f32::from(value) / 127.0),
            controller::PAN => {
                let pan = ((f32::from(value) - 64.0) / 63.0).clamp(-1.0, 1.0);
                self.set_pan(channel, pan);
            }
            controller::ALL_SOUND_OFF => self.note_off_all(true),
            controller::RESET_ALL_CONTROLLERS => self.channels.reset_channel(usize::from(channel)),
            controller::ALL_NOTES_OFF => self.note_off_all(false),
            _ => {}
        }
    }

    /// Appends an effect to the end of the chain.
    pub fn add_effect<E: Effect + Send + 'static>(&mut self, effect: E) {
        self.effects.add(effect);
    }

    /// Removes the effect at `index` in the chain.
    pub fn remove_effect(&mut self, index: usize) -> Option<Box<dyn Effect + Send>> {
        self.effects.remove(index)
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Installs `sequencer` as the event source, returning the previous one.
    pub fn attach_sequencer<S: Sequencer + Send + 'static>(
        &mut self,
        sequencer: S,
    ) -> Option<Box<dyn Sequencer + Send>> {
        self.sequencer.replace(Box::new(sequencer))
    }

    pub fn detach_sequencer(&mut self) -> Option<Box<dyn Sequencer + Send>> {
        self.sequencer.take()
    }

    pub fn sequencer_mut(&mut self) -> Option<&mut (dyn Sequencer + Send + 'static)> {
        self.sequencer.as_deref_mut()
    }

    /// Renders the next buffer into `out` as interleaved frames.
    ///
    /// `out` should hold `samples_per_buffer × channels` samples; a mismatch
    /// is logged and only the samples that fit are written.
    ///
    /// # Errors
    ///
    /// Returns an error when the attached sequencer emits an event before an
    /// already-rendered position or past the end of the buffer. The buffer is
    /// abandoned and `out` is left untouched.
    pub fn next_buffer<O: OutputSink + ?Sized>(&mut self, out: &mut O) -> Result<(), SynthError> {
        self.fill()?;
        self.effects.apply(&mut self.buffer);
        write_interleaved(&self.buffer, self.master_volume, out);
        Ok(())
    }

    fn fill(&mut self) -> Result<(), SynthError> {
        self.buffer.clear();
        let samples = self.config.samples_per_buffer;

        let playing = self.sequencer.as_ref().is_some_and(|s| s.is_playing());
        if !playing {
            self.render(0, samples);
            return Ok(());
        }

        let mut events = std::mem::take(&mut self.events);
        events.clear();
        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.process(samples, &mut events);
        }
        let result = self.interleave(&events, samples);
        self.events = events;
        result?;

        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.advance(samples);
        }
        Ok(())
    }

    /// Renders voices up to each event, applies it, and renders the tail.
    fn interleave(&mut self, events: &[TimedEvent], samples: usize) -> Result<(), SynthError> {
        let mut processed = 0;
        for timed in events {
            if timed.delta < processed {
                return Err(SynthError::EventOutOfOrder {
                    delta: timed.delta,
                    processed,
                });
            }
            if timed.delta > samples {
                return Err(SynthError::EventOutOfRange {
                    delta: timed.delta,
                    samples_per_buffer: samples,
                });
            }
            if timed.delta > processed {
                self.render(processed, timed.delta);
                processed = timed.delta;
            }
            self.apply_event(timed.event);
        }
        if processed < samples {
            self.render(processed, samples);
        }
        Ok(())
    }

    fn render(&mut self, from: usize, to: usize) {
        self.voices.render(
            &mut self.buffer,
            from,
            to,
            &self.channels,
            &mut self.bank,
            f64::from(self.config.sample_rate),
        );
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Sets the output gain, clamped to `[0, 1]`.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Silences every voice and restores channel defaults. Effects and the
    /// sequencer are kept.
    pub fn reset(&mut self) {
        self.voices.note_off_all(true);
        self.channels.reset();
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    pub fn free_voice_count(&self) -> usize {
        self.voices.free_count()
    }

    /// True while `note` is held on `channel` (started and not yet released).
    pub fn is_note_playing(&self, channel: u8, note: u8) -> bool {
        self.voices.is_note_playing(channel, note)
    }

    /// Active voices, oldest first.
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.active_voices()
    }

    pub fn voices(&self) -> &VoiceAllocator {
        &self.voices
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }
}

impl<B: InstrumentBank + std::fmt::Debug> std::fmt::Debug for Synthesizer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("config", &self.config)
            .field("bank", &self.bank)
            .field("voices", &self.voices)
            .field("effects", &self.effects)
            .field("sequencer", &self.sequencer.is_some())
            .field("master_volume", &self.master_volume)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::EnvelopeSamples;
    use crate::sequencer::EventSequencer;

    /// Constant 1.0 with an envelope chosen per test.
    struct Dc {
        envelope: EnvelopeSamples,
        programs: bool,
    }

    impl Dc {
        fn new(envelope: EnvelopeSamples) -> Self {
            Self {
                envelope,
                programs: true,
            }
        }
    }

    impl InstrumentBank for Dc {
        fn resolve(&self, program: u8, is_drum: bool) -> Option<InstrumentId> {
            if !self.programs {
                return None;
            }
            Some(InstrumentId(if is_drum { 1 } else { usize::from(program) + 2 }))
        }

        fn envelope(&self, _id: InstrumentId, _note: u8) -> EnvelopeSamples {
            self.envelope
        }

        fn sample_at(
            &mut self,
            _id: InstrumentId,
            _note: u8,
            _channel: usize,
            _sample_rate: f64,
            _time: &mut f64,
        ) -> f32 {
            1.0
        }
    }

    fn synth(frames: usize, envelope: EnvelopeSamples) -> Synthesizer<Dc> {
        let config = SynthConfig::new(44_100)
            .with_channels(1)
            .with_samples_per_buffer(frames)
            .with_polyphony(4);
        Synthesizer::new(config, Dc::new(envelope))
    }

    fn note_on(note: u8) -> MidiEvent {
        MidiEvent::NoteOn {
            channel: 0,
            note,
            velocity: 127,
        }
    }

    #[test]
    fn test_config_is_validated() {
        let config = SynthConfig::new(1).with_channels(6);
        let synth = Synthesizer::new(config, Dc::new(EnvelopeSamples::default()));
        assert_eq!(synth.config().sample_rate, 44_100);
        assert_eq!(synth.config().channels, 2);
    }

    #[test]
    fn test_drum_channel_resolves_percussion() {
        let mut synth = synth(8, EnvelopeSamples::default());
        synth.set_program(DRUM_CHANNEL, 5);
        synth.note_on(DRUM_CHANNEL, 38, 100);
        synth.set_program(0, 5);
        synth.note_on(0, 60, 100);

        let instruments: Vec<InstrumentId> =
            synth.active_voices().map(Voice::instrument).collect();
        assert_eq!(instruments, vec![InstrumentId(1), InstrumentId(7)]);
    }

    #[test]
    fn test_unresolved_program_is_ignored() {
        let mut synth = synth(8, EnvelopeSamples::default());
        synth.bank_mut().programs = false;
        synth.note_on(0, 60, 100);
        assert_eq!(synth.active_voice_count(), 0);
    }

    #[test]
    fn test_out_of_range_note_on_is_ignored() {
        let mut synth = synth(8, EnvelopeSamples::default());
        synth.note_on(16, 60, 100);
        synth.note_on(0, 128, 100);
        synth.note_on(0, 60, 128);
        assert_eq!(synth.active_voice_count(), 0);
    }

    #[test]
    fn test_velocity_zero_note_on_releases() {
        let mut synth = synth(8, EnvelopeSamples::new(0, 0, 0, 100));
        synth.apply_event(note_on(60));
        synth.apply_event(MidiEvent::NoteOn {
            channel: 0,
            note: 60,
            velocity: 0,
        });
        assert!(!synth.is_note_playing(0, 60));
        assert_eq!(synth.active_voice_count(), 1);
    }

    #[test]
    fn test_controllers() {
        let mut synth = synth(8, EnvelopeSamples::default());
        let cc = |controller, value| MidiEvent::ControlChange {
            channel: 3,
            controller,
            value,
        };

        synth.apply_event(cc(controller::VOLUME, 0));
        synth.apply_event(cc(controller::PAN, 0));
        assert_eq!(synth.volume(3), 0.0);
        assert_eq!(synth.pan(3), -1.0);

        synth.apply_event(cc(controller::PAN, 64));
        assert_eq!(synth.pan(3), 0.0);

        synth.apply_event(cc(controller::RESET_ALL_CONTROLLERS, 0));
        assert_eq!(synth.volume(3), 1.0);
    }

    #[test]
    fn test_all_sound_off_frees_voices() {
        let mut synth = synth(8, EnvelopeSamples::new(0, 0, 0, 1_000));
        synth.note_on(0, 60, 100);
        synth.note_on(1, 62, 100);
        synth.apply_event(MidiEvent::ControlChange {
            channel: 0,
            controller: controller::ALL_SOUND_OFF,
            value: 0,
        });
        assert_eq!(synth.active_voice_count(), 0);
        assert_eq!(synth.free_voice_count(), 4);
    }

    #[test]
    fn test_pitch_bend_uses_range() {
        let config = SynthConfig::default().with_pitch_bend_range(12.0);
        let mut synth = Synthesizer::new(config, Dc::new(EnvelopeSamples::default()));
        synth.apply_event(MidiEvent::PitchBend {
            channel: 0,
            value: 12_288,
        });
        assert_eq!(synth.pitch_bend(0), 6.0);
    }

    #[test]
    fn test_program_change() {
        let mut synth = synth(8, EnvelopeSamples::default());
        synth.apply_event(MidiEvent::ProgramChange {
            channel: 4,
            program: 33,
        });
        assert_eq!(synth.program(4), 33);
    }

    #[test]
    fn test_sequenced_event_starts_mid_buffer() {
        let mut synth = synth(10, EnvelopeSamples::default());
        let mut seq = EventSequencer::new(44_100);
        seq.add_event(4, note_on(60));
        seq.play();
        synth.attach_sequencer(seq);

        let mut out = [0.0f32; 10];
        synth.next_buffer(&mut out[..]).unwrap();
        assert!(out[..4].iter().all(|&s| s == 0.0));
        assert!(out[4..].iter().all(|&s| s > 0.0));
    }

    #[test]
    fn test_event_at_buffer_end_is_applied() {
        let mut synth = synth(10, EnvelopeSamples::default());
        let mut seq = EventSequencer::new(44_100);
        seq.add_event(0, note_on(60));
        seq.play();
        synth.attach_sequencer(seq);

        struct AtEnd;
        impl Sequencer for AtEnd {
            fn is_playing(&self) -> bool {
                true
            }
            fn process(&mut self, samples: usize, events: &mut Vec<TimedEvent>) {
                events.push(TimedEvent::new(
                    samples,
                    MidiEvent::NoteOff {
                        channel: 0,
                        note: 60,
                    },
                ));
            }
            fn advance(&mut self, _samples: usize) {}
        }

        let mut out = [0.0f32; 10];
        synth.next_buffer(&mut out[..]).unwrap();
        synth.attach_sequencer(AtEnd);
        synth.next_buffer(&mut out[..]).unwrap();

        assert!(out.iter().all(|&s| s > 0.0));
        assert!(!synth.is_note_playing(0, 60));
    }

    #[test]
    fn test_out_of_range_event_is_an_error() {
        struct TooLate;
        impl Sequencer for TooLate {
            fn is_playing(&self) -> bool {
                true
            }
            fn process(&mut self, samples: usize, events: &mut Vec<TimedEvent>) {
                events.push(TimedEvent::new(
                    samples + 1,
                    MidiEvent::NoteOff {
                        channel: 0,
                        note: 1,
                    },
                ));
            }
            fn advance(&mut self, _samples: usize) {}
        }

        let mut synth = synth(10, EnvelopeSamples::default());
        synth.attach_sequencer(TooLate);
        let mut out = [0.0f32; 10];
        assert_eq!(
            synth.next_buffer(&mut out[..]),
            Err(SynthError::EventOutOfRange {
                delta: 11,
                samples_per_buffer: 10
            })
        );
    }

    #[test]
    fn test_effects_run_before_output() {
        let mut synth = synth(4, EnvelopeSamples::default());
        synth.add_effect(|buffer: &mut AudioBuffer| buffer.add(0, 2, 0.5));
        assert_eq!(synth.effect_count(), 1);

        let mut out = [0.0f32; 4];
        synth.next_buffer(&mut out[..]).unwrap();
        assert_eq!(out, [0.0, 0.0, 0.5, 0.0]);

        synth.clear_effects();
        synth.next_buffer(&mut out[..]).unwrap();
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_master_volume_is_clamped() {
        let mut synth = synth(4, EnvelopeSamples::default());
        synth.set_master_volume(3.0);
        assert_eq!(synth.master_volume(), 1.0);
        synth.set_master_volume(-1.0);
        assert_eq!(synth.master_volume(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut synth = synth(4, EnvelopeSamples::new(0, 0, 0, 1_000));
        synth.set_volume(0, 0.3);
        synth.note_on(0, 60, 100);
        synth.reset();

        assert_eq!(synth.active_voice_count(), 0);
        assert_eq!(synth.volume(0), 1.0);
    }

    #[test]
    fn test_detach_sequencer() {
        let mut synth = synth(4, EnvelopeSamples::default());
        let previous = synth.attach_sequencer(EventSequencer::new(44_100));
        assert!(previous.is_none());
        assert!(synth.sequencer_mut().is_some());
        assert!(synth.detach_sequencer().is_some());
        assert!(synth.sequencer_mut().is_none());
    }
}
