//! Fixed arena of voices.

use super::{Voice, VoiceId};

/// Owns every voice the synthesizer will ever use.
///
/// Each voice is in exactly one of two lists: `free`, a stack whose top is
/// the next voice handed out, or `active`, ordered oldest allocation first.
/// Nothing is allocated after construction.
///
/// # Examples
///
/// ```
/// use humdrum::voice::VoicePool;
///
/// let mut pool = VoicePool::new(2);
/// let a = pool.pop_free().unwrap();
/// pool.activate(a);
/// let b = pool.pop_free().unwrap();
/// pool.activate(b);
///
/// assert!(pool.pop_free().is_none());
/// assert_eq!(pool.active(), &[a, b]);
/// assert_eq!(pool.steal_oldest(), Some(a));
/// ```
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
    free: Vec<VoiceId>,
    active: Vec<VoiceId>,
}

impl VoicePool {
    pub fn new(polyphony: usize) -> Self {
        Self {
            voices: (0..polyphony).map(Voice::new).collect(),
            // Reversed so voice 0 is handed out first
            free: (0..polyphony).rev().collect(),
            active: Vec::with_capacity(polyphony),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Takes the most recently freed voice.
    pub fn pop_free(&mut self) -> Option<VoiceId> {
        self.free.pop()
    }

    /// Appends `id` as the newest active voice.
    pub fn activate(&mut self, id: VoiceId) {
        self.active.push(id);
    }

    /// Removes and returns the oldest active voice without freeing it.
    pub fn steal_oldest(&mut self) -> Option<VoiceId> {
        if self.active.is_empty() {
            None
        } else {
            Some(self.active.remove(0))
        }
    }

    /// Moves the active voice at `index` back onto the free stack.
    pub fn retire_at(&mut self, index: usize) -> Option<VoiceId> {
        if index >= self.active.len() {
            return None;
        }
        let id = self.active.remove(index);
        self.free.push(id);
        Some(id)
    }

    /// Frees every active voice, oldest first.
    pub fn retire_all(&mut self) {
        for id in self.active.drain(..) {
            self.free.push(id);
        }
    }

    /// Active voice ids, oldest first.
    #[inline]
    pub fn active(&self) -> &[VoiceId] {
        &self.active
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.get_mut(id)
    }

    /// Active voices, oldest first.
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.active.iter().filter_map(|&id| self.voices.get(id))
    }
}
