//! Voice allocator for polyphonic playback.
//!
//! # Design Overview
//!
//! The `VoiceAllocator` owns a [`VoicePool`] and a [`VoiceRegistry`] and keeps
//! them consistent while notes start, stop and die out.
//!
//! ## Allocation
//!
//! A note-on takes the most recently freed voice. When none is free the
//! oldest active voice is stolen: it is cut off without a release, dropped
//! from the registry and immediately restarted for the new note.
//!
//! ## Per-note limit
//!
//! A single `(channel, note)` may sound on at most `max_per_note` voices.
//! Retriggering a key that is already at the limit releases its oldest voice
//! gracefully, so fast repeated notes overlap instead of piling up.
//!
//! ## Reclamation
//!
//! Voices are never freed while they still sound. [`render`](VoiceAllocator::render)
//! returns a voice to the pool the moment its envelope finishes, which is the
//! only way a released voice becomes free again.
//!
//! # Examples
//!
//! ```
//! use humdrum::instrument::{EnvelopeSamples, InstrumentBank, InstrumentId};
//! use humdrum::voice::VoiceAllocator;
//! # struct Click;
//! # impl InstrumentBank for Click {
//! #     fn resolve(&self, _: u8, _: bool) -> Option<InstrumentId> { Some(InstrumentId(0)) }
//! #     fn envelope(&self, _: InstrumentId, _: u8) -> EnvelopeSamples {
//! #         EnvelopeSamples::default()
//! #     }
//! #     fn sample_at(&mut self, _: InstrumentId, _: u8, _: usize, _: f64, _: &mut f64) -> f32 {
//! #         1.0
//! #     }
//! # }
//!
//! let bank = Click;
//! let mut voices = VoiceAllocator::new(2, 2);
//!
//! voices.note_on(0, 60, 100, InstrumentId(0), &bank);
//! voices.note_on(0, 64, 100, InstrumentId(0), &bank);
//! voices.note_on(0, 67, 100, InstrumentId(0), &bank); // steals the C
//!
//! assert_eq!(voices.active_count(), 2);
//! assert!(!voices.is_note_playing(0, 60));
//! assert!(voices.is_note_playing(0, 67));
//! ```

use log::debug;

use super::{Voice, VoiceId, VoicePool, VoiceRegistry};
use crate::buffer::AudioBuffer;
use crate::channel::ChannelState;
use crate::instrument::{InstrumentBank, InstrumentId};
use crate::midi::NoteKey;

#[derive(Debug, Clone)]
pub struct VoiceAllocator {
    pool: VoicePool,
    registry: VoiceRegistry,
    max_per_note: usize,
}

impl VoiceAllocator {
    /// Creates an allocator with `polyphony` voices, at most `max_per_note`
    /// of them on any single key.
    pub fn new(polyphony: usize, max_per_note: usize) -> Self {
        Self {
            pool: VoicePool::new(polyphony),
            registry: VoiceRegistry::with_capacity(polyphony, max_per_note.min(polyphony)),
            max_per_note,
        }
    }

    /// Starts `note` on a voice and returns the voice used.
    ///
    /// Returns `None` only when the pool has no voices at all.
    pub fn note_on<B: InstrumentBank + ?Sized>(
        &mut self,
        channel: u8,
        note: u8,
        velocity: u8,
        instrument: InstrumentId,
        bank: &B,
    ) -> Option<VoiceId> {
        let id = match self.pool.pop_free() {
            Some(id) => id,
            None => self.steal()?,
        };

        let key = NoteKey::new(channel, note);
        if self.registry.count(key) >= self.max_per_note {
            if let Some(evicted) = self.registry.pop_oldest(key) {
                debug!("releasing voice {} to make room on {:?}", evicted, key);
                if let Some(voice) = self.pool.voice_mut(evicted) {
                    voice.stop();
                }
            }
        }

        let envelope = bank.envelope(instrument, note);
        let voice = self.pool.voice_mut(id)?;
        voice.start(channel, note, velocity, instrument, envelope);
        self.pool.activate(id);
        self.registry.register(key, id);
        Some(id)
    }

    /// Gracefully releases the oldest voice playing `note` on `channel`.
    ///
    /// The voice keeps sounding through its release and is reclaimed by a
    /// later [`render`](Self::render).
    pub fn note_off(&mut self, channel: u8, note: u8) -> Option<VoiceId> {
        let id = self.registry.pop_oldest(NoteKey::new(channel, note))?;
        if let Some(voice) = self.pool.voice_mut(id) {
            voice.stop();
        }
        Some(id)
    }

    /// Stops every active voice. `immediate` cuts them off and frees them at
    /// once; otherwise they release and are reclaimed by later renders.
    pub fn note_off_all(&mut self, immediate: bool) {
        for index in 0..self.pool.active_count() {
            let id = self.pool.active()[index];
            if let Some(voice) = self.pool.voice_mut(id) {
                if immediate {
                    voice.stop_immediately();
                } else {
                    voice.stop();
                }
            }
        }
        self.registry.clear();
        if immediate {
            self.pool.retire_all();
        }
    }

    /// Renders frames `from..to` of every active voice into `buffer`, oldest
    /// first, and reclaims the voices that finished.
    pub fn render<B: InstrumentBank + ?Sized>(
        &mut self,
        buffer: &mut AudioBuffer,
        from: usize,
        to: usize,
        channels: &ChannelState,
        bank: &mut B,
        sample_rate: f64,
    ) {
        let mut index = 0;
        while index < self.pool.active_count() {
            let id = self.pool.active()[index];
            let finished = match self.pool.voice_mut(id) {
                Some(voice) => {
                    voice.process(buffer, from, to, channels, bank, sample_rate);
                    !voice.in_use()
                }
                None => true,
            };

            if finished {
                self.reclaim(index);
            } else {
                index += 1;
            }
        }
    }

    fn steal(&mut self) -> Option<VoiceId> {
        let id = self.pool.steal_oldest()?;
        if let Some(voice) = self.pool.voice_mut(id) {
            let key = voice.key();
            voice.stop_immediately();
            self.registry.remove(key, id);
            debug!("stealing voice {} from {:?}", id, key);
        }
        Some(id)
    }

    fn reclaim(&mut self, index: usize) {
        if let Some(id) = self.pool.retire_at(index) {
            if let Some(key) = self.pool.voice(id).map(Voice::key) {
                self.registry.remove(key, id);
            }
        }
    }

    /// Total number of voices.
    pub fn polyphony(&self) -> usize {
        self.pool.capacity()
    }

    pub fn max_per_note(&self) -> usize {
        self.max_per_note
    }

    /// Voices that have been started and not yet reclaimed.
    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    /// True while `note` has a registered voice, i.e. it is held and not yet
    /// released.
    pub fn is_note_playing(&self, channel: u8, note: u8) -> bool {
        self.registry.count(NoteKey::new(channel, note)) > 0
    }

    /// Registered voices for a key, oldest first.
    pub fn voices_for(&self, channel: u8, note: u8) -> Vec<VoiceId> {
        self.registry.voices(NoteKey::new(channel, note)).collect()
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.pool.voice(id)
    }

    /// Active voices, oldest first.
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.pool.active_voices()
    }
}
