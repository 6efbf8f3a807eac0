//! Sample-accurate event sources.
//!
//! The synthesizer pulls events from a [`Sequencer`] one buffer at a time.
//! Each batch covers exactly the samples of the next buffer, and each event
//! carries its offset into that buffer so the synthesizer can render up to
//! the event, apply it, and carry on from there.

use crate::midi::MidiEvent;

/// An event and its offset, in samples, from the start of the current buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub delta: usize,
    pub event: MidiEvent,
}

impl TimedEvent {
    pub fn new(delta: usize, event: MidiEvent) -> Self {
        Self { delta, event }
    }
}

/// Source of timed events for the synthesizer.
///
/// Per buffer, the synthesizer calls [`process`](Self::process) to collect
/// the events of the next `samples` samples, renders them, then calls
/// [`advance`](Self::advance) with the same count.
///
/// # Examples
///
/// A sequencer that strikes middle C at the start of every buffer:
///
/// ```
/// use humdrum::midi::MidiEvent;
/// use humdrum::sequencer::{Sequencer, TimedEvent};
///
/// struct Pulse;
///
/// impl Sequencer for Pulse {
///     fn is_playing(&self) -> bool {
///         true
///     }
///
///     fn process(&mut self, _samples: usize, events: &mut Vec<TimedEvent>) {
///         let note_on = MidiEvent::NoteOn { channel: 0, note: 60, velocity: 90 };
///         events.push(TimedEvent::new(0, note_on));
///     }
///
///     fn advance(&mut self, _samples: usize) {}
/// }
///
/// let mut events = Vec::new();
/// Pulse.process(256, &mut events);
/// assert_eq!(events[0].delta, 0);
/// ```
pub trait Sequencer {
    fn is_playing(&self) -> bool;

    /// Appends the events falling in the next `samples` samples, in
    /// non-decreasing `delta` order with every `delta <= samples`. The
    /// position must not move.
    fn process(&mut self, samples: usize, events: &mut Vec<TimedEvent>);

    /// Moves the position forward by `samples`.
    fn advance(&mut self, samples: usize);
}

/// Playback state of an [`EventSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// A list of events at absolute sample positions.
///
/// Events are kept sorted by time; events added at the same time play in the
/// order they were added. Once every event has been emitted the sequencer
/// stops itself, leaving any sounding voices to release on their own.
///
/// # Examples
///
/// ```
/// use humdrum::sequencer::{EventSequencer, Sequencer};
///
/// let mut seq = EventSequencer::new(44_100);
/// seq.add_note(0, 60, 100, 0.0, 0.5);
/// seq.add_note(0, 64, 100, 0.5, 0.5);
/// seq.play();
///
/// let mut events = Vec::new();
/// seq.process(1024, &mut events);
/// assert_eq!(events.len(), 1); // the first note-on
/// seq.advance(1024);
/// ```
#[derive(Debug, Clone)]
pub struct EventSequencer {
    sample_rate: u32,
    events: Vec<(u64, MidiEvent)>,
    /// Index of the next event to emit.
    cursor: usize,
    position: u64,
    state: PlayState,
}

impl EventSequencer {
    /// Creates an empty, stopped sequencer.
    ///
    /// # Examples
    ///
    /// ```
    /// use humdrum::sequencer::{EventSequencer, PlayState};
    ///
    /// let seq = EventSequencer::new(48_000);
    /// assert_eq!(seq.state(), PlayState::Stopped);
    /// assert!(seq.is_empty());
    /// ```
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            events: Vec::new(),
            cursor: 0,
            position: 0,
            state: PlayState::Stopped,
        }
    }

    /// Schedules `event` at absolute sample `at`.
    ///
    /// Events scheduled before the current position are kept for the next
    /// [`rewind`](Self::rewind) but not played now.
    pub fn add_event(&mut self, at: u64, event: MidiEvent) {
        let index = self.events.partition_point(|&(time, _)| time <= at);
        if index < self.cursor || at < self.position {
            self.cursor += 1;
        }
        self.events.insert(index, (at, event));
    }

    /// Schedules `event` at `seconds` from the start.
    ///
    /// # Examples
    ///
    /// ```
    /// use humdrum::midi::MidiEvent;
    /// use humdrum::sequencer::EventSequencer;
    ///
    /// let mut seq = EventSequencer::new(1_000);
    /// seq.add_event_at(0.25, MidiEvent::ProgramChange { channel: 0, program: 16 });
    /// assert_eq!(seq.events()[0].0, 250);
    /// ```
    pub fn add_event_at(&mut self, seconds: f64, event: MidiEvent) {
        let at = (seconds.max(0.0) * f64::from(self.sample_rate)).round() as u64;
        self.add_event(at, event);
    }

    /// Schedules a note-on at `start` seconds and its note-off `duration`
    /// seconds later.
    pub fn add_note(&mut self, channel: u8, note: u8, velocity: u8, start: f64, duration: f64) {
        self.add_event_at(
            start,
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            },
        );
        let end = start + duration.max(0.0);
        self.add_event_at(end, MidiEvent::NoteOff { channel, note });
    }

    /// Starts or resumes playback.
    pub fn play(&mut self) {
        self.state = PlayState::Playing;
    }

    /// Pauses playback; the position is kept.
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
    }

    /// Moves back to sample 0 without changing the play state.
    ///
    /// # Examples
    ///
    /// ```
    /// use humdrum::sequencer::{EventSequencer, Sequencer};
    ///
    /// let mut seq = EventSequencer::new(44_100);
    /// seq.play();
    /// seq.advance(512);
    /// seq.rewind();
    /// assert_eq!(seq.position(), 0);
    /// ```
    pub fn rewind(&mut self) {
        self.position = 0;
        self.cursor = 0;
    }

    /// Removes every event and rewinds.
    pub fn clear(&mut self) {
        self.events.clear();
        self.rewind();
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Current position in samples.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// All scheduled events in playback order.
    pub fn events(&self) -> &[(u64, MidiEvent)] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True once every event has been emitted.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }
}

impl Sequencer for EventSequencer {
    fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    fn process(&mut self, samples: usize, events: &mut Vec<TimedEvent>) {
        if !self.is_playing() {
            return;
        }
        let end = self.position + samples as u64;
        let mut cursor = self.cursor;
        while let Some(&(at, event)) = self.events.get(cursor) {
            if at >= end {
                break;
            }
            let delta = at.saturating_sub(self.position) as usize;
            events.push(TimedEvent::new(delta, event));
            cursor += 1;
        }
        self.cursor = cursor;
    }

    fn advance(&mut self, samples: usize) {
        if !self.is_playing() {
            return;
        }
        self.position += samples as u64;
        if self.is_finished() {
            self.state = PlayState::Stopped;
        }
    }
}
