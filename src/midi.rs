//! MIDI identities and channel events understood by the synthesizer.

/// Number of MIDI channels the synthesizer keeps mixing state for.
pub const CHANNEL_COUNT: usize = 16;

/// The General MIDI percussion channel (channel 10, zero-based 9).
pub const DRUM_CHANNEL: u8 = 9;

/// Controller numbers handled by [`crate::Synthesizer::apply_event`].
pub mod controller {
    /// Channel volume (coarse).
    pub const VOLUME: u8 = 7;
    /// Pan position (coarse), 64 is centre.
    pub const PAN: u8 = 10;
    /// Silence every voice immediately.
    pub const ALL_SOUND_OFF: u8 = 120;
    /// Restore pan, volume and pitch bend of the channel.
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    /// Release every voice.
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Centre value of a 14-bit pitch-bend message.
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Identity of a sounding note: which channel played which key.
///
/// Used as the key of the voice registry so that a note-off releases the
/// voices started by the matching note-on and nothing else.
///
/// # Examples
///
/// ```
/// use humdrum::NoteKey;
///
/// let a = NoteKey::new(0, 60);
/// assert_eq!(a, NoteKey { channel: 0, note: 60 });
/// assert_ne!(a, NoteKey::new(1, 60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteKey {
    pub channel: u8,
    pub note: u8,
}

impl NoteKey {
    pub fn new(channel: u8, note: u8) -> Self {
        Self { channel, note }
    }
}

/// A channel message as delivered by a sequencer or a MIDI input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    ProgramChange { channel: u8, program: u8 },
    /// 14-bit bend value, [`PITCH_BEND_CENTER`] is no bend.
    PitchBend { channel: u8, value: u16 },
}

impl MidiEvent {
    /// Returns the channel the event is addressed to.
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel,
        }
    }
}

/// Converts a MIDI note number to its equal-tempered frequency in Hz.
///
/// Note 69 (A4) is 440 Hz.
///
/// # Examples
///
/// ```
/// use humdrum::midi::note_to_frequency;
///
/// assert!((note_to_frequency(69) - 440.0).abs() < 1e-9);
/// assert!((note_to_frequency(60) - 261.63).abs() < 0.01);
/// ```
pub fn note_to_frequency(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((f64::from(note) - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_note_key_hashing() {
        let mut keys = HashSet::new();
        keys.insert(NoteKey::new(0, 60));
        keys.insert(NoteKey::new(0, 60));
        keys.insert(NoteKey::new(9, 60));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_event_channel() {
        let events = [
            MidiEvent::NoteOn {
                channel: 3,
                note: 60,
                velocity: 100,
            },
            MidiEvent::NoteOff {
                channel: 3,
                note: 60,
            },
            MidiEvent::ControlChange {
                channel: 3,
                controller: controller::PAN,
                value: 0,
            },
            MidiEvent::ProgramChange {
                channel: 3,
                program: 12,
            },
            MidiEvent::PitchBend {
                channel: 3,
                value: PITCH_BEND_CENTER,
            },
        ];
        assert!(events.iter().all(|e| e.channel() == 3));
    }

    #[test]
    fn test_octave_doubles_frequency() {
        let a4 = note_to_frequency(69);
        let a5 = note_to_frequency(81);
        assert!((a5 - 2.0 * a4).abs() < 1e-9);
    }
}
