//! Per-MIDI-channel mixing state.

use log::trace;

use crate::midi::CHANNEL_COUNT;

pub const DEFAULT_PAN: f32 = 0.0;
pub const DEFAULT_VOLUME: f32 = 1.0;
pub const DEFAULT_PITCH_BEND: f32 = 0.0;
pub const MAX_PITCH_BEND: f32 = 12.0;

/// Pan, volume, pitch bend and program for each of the 16 MIDI channels.
///
/// Setters take the documented range only: a value outside it, or a channel
/// index past 15, leaves the state untouched. Nothing is clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pan: [f32; CHANNEL_COUNT],
    volume: [f32; CHANNEL_COUNT],
    pitch_bend: [f32; CHANNEL_COUNT],
    program: [u8; CHANNEL_COUNT],
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            pan: [DEFAULT_PAN; CHANNEL_COUNT],
            volume: [DEFAULT_VOLUME; CHANNEL_COUNT],
            pitch_bend: [DEFAULT_PITCH_BEND; CHANNEL_COUNT],
            program: [0; CHANNEL_COUNT],
        }
    }

    /// Restores pan, volume and pitch bend of every channel. Programs are kept.
    pub fn reset(&mut self) {
        for ch in 0..CHANNEL_COUNT {
            self.reset_channel(ch);
        }
    }

    /// Restores pan, volume and pitch bend of one channel.
    pub fn reset_channel(&mut self, channel: usize) {
        if channel < CHANNEL_COUNT {
            self.pan[channel] = DEFAULT_PAN;
            self.volume[channel] = DEFAULT_VOLUME;
            self.pitch_bend[channel] = DEFAULT_PITCH_BEND;
        }
    }

    pub fn set_pan(&mut self, channel: usize, pan: f32) {
        if channel < CHANNEL_COUNT && (-1.0..=1.0).contains(&pan) {
            self.pan[channel] = pan;
        } else {
            trace!("ignoring pan {} on channel {}", pan, channel);
        }
    }

    pub fn set_volume(&mut self, channel: usize, volume: f32) {
        if channel < CHANNEL_COUNT && (0.0..=1.0).contains(&volume) {
            self.volume[channel] = volume;
        } else {
            trace!("ignoring volume {} on channel {}", volume, channel);
        }
    }

    pub fn set_pitch_bend(&mut self, channel: usize, semitones: f32) {
        if channel < CHANNEL_COUNT && (-MAX_PITCH_BEND..=MAX_PITCH_BEND).contains(&semitones) {
            self.pitch_bend[channel] = semitones;
        } else {
            trace!("ignoring pitch bend {} on channel {}", semitones, channel);
        }
    }

    pub fn set_program(&mut self, channel: usize, program: u8) {
        if channel < CHANNEL_COUNT && program < 128 {
            self.program[channel] = program;
        } else {
            trace!("ignoring program {} on channel {}", program, channel);
        }
    }

    // Readers fall back to the defaults for channels past 15 so a voice can
    // never index out of bounds.

    pub fn pan(&self, channel: usize) -> f32 {
        self.pan.get(channel).copied().unwrap_or(DEFAULT_PAN)
    }

    pub fn volume(&self, channel: usize) -> f32 {
        self.volume.get(channel).copied().unwrap_or(DEFAULT_VOLUME)
    }

    pub fn pitch_bend(&self, channel: usize) -> f32 {
        self.pitch_bend
            .get(channel)
            .copied()
            .unwrap_or(DEFAULT_PITCH_BEND)
    }

    pub fn program(&self, channel: usize) -> u8 {
        self.program.get(channel).copied().unwrap_or(0)
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Left and right gains for a pan position.
///
/// The law is linear with no centre compensation: the side the sound is
/// panned towards stays at unity and the other side is attenuated, so a
/// centred sound plays at unity on both sides.
///
/// # Examples
///
/// ```
/// use humdrum::channel::pan_gains;
///
/// assert_eq!(pan_gains(0.0), (1.0, 1.0));
/// assert_eq!(pan_gains(1.0), (1.0, 0.0));
/// assert_eq!(pan_gains(-1.0), (0.0, 1.0));
/// assert_eq!(pan_gains(0.25), (1.0, 0.75));
/// ```
pub fn pan_gains(pan: f32) -> (f32, f32) {
    if pan > 0.0 {
        (1.0, 1.0 - pan)
    } else if pan < 0.0 {
        (1.0 + pan, 1.0)
    } else {
        (1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ChannelState::new();
        for ch in 0..CHANNEL_COUNT {
            assert_eq!(state.pan(ch), 0.0);
            assert_eq!(state.volume(ch), 1.0);
            assert_eq!(state.pitch_bend(ch), 0.0);
            assert_eq!(state.program(ch), 0);
        }
    }

    #[test]
    fn test_out_of_range_values_are_ignored() {
        let mut state = ChannelState::new();
        state.set_pan(0, 0.5);
        state.set_pan(0, 1.5);
        state.set_volume(0, -0.1);
        state.set_pitch_bend(0, 12.5);
        state.set_pan(16, 0.5);

        assert_eq!(state.pan(0), 0.5);
        assert_eq!(state.volume(0), 1.0);
        assert_eq!(state.pitch_bend(0), 0.0);
    }

    #[test]
    fn test_range_edges_are_accepted() {
        let mut state = ChannelState::new();
        state.set_pan(3, -1.0);
        state.set_volume(3, 0.0);
        state.set_pitch_bend(3, -12.0);

        assert_eq!(state.pan(3), -1.0);
        assert_eq!(state.volume(3), 0.0);
        assert_eq!(state.pitch_bend(3), -12.0);
    }

    #[test]
    fn test_reset_keeps_programs() {
        let mut state = ChannelState::new();
        state.set_program(2, 40);
        state.set_volume(2, 0.2);
        state.reset();

        assert_eq!(state.volume(2), 1.0);
        assert_eq!(state.program(2), 40);
    }

    #[test]
    fn test_pan_law_is_linear() {
        let (left, right) = pan_gains(-0.5);
        assert_eq!(left, 0.5);
        assert_eq!(right, 1.0);
    }
}
