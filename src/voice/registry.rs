//! Which voices are currently playing which note.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::VoiceId;
use crate::midi::NoteKey;

/// Maps a `(channel, note)` pair to its sounding voices, oldest first.
///
/// A voice is registered on note-on and unregistered when it is released,
/// evicted, stolen or reclaimed, so a key never lists a voice that has gone
/// back to the free pool. Keys whose list becomes empty are dropped and the
/// list goes back to a spare stack for the next key that needs one.
#[derive(Debug, Clone, Default)]
pub struct VoiceRegistry {
    notes: FxHashMap<NoteKey, VecDeque<VoiceId>>,
    spare: Vec<VecDeque<VoiceId>>,
    list_capacity: usize,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that can track `keys` distinct keys holding up to
    /// `per_key` voices each without allocating.
    ///
    /// # Examples
    ///
    /// ```
    /// use humdrum::midi::NoteKey;
    /// use humdrum::voice::VoiceRegistry;
    ///
    /// let mut registry = VoiceRegistry::with_capacity(8, 2);
    /// registry.register(NoteKey::new(0, 60), 3);
    /// assert_eq!(registry.spare_lists(), 7);
    ///
    /// registry.pop_oldest(NoteKey::new(0, 60));
    /// assert_eq!(registry.spare_lists(), 8);
    /// ```
    pub fn with_capacity(keys: usize, per_key: usize) -> Self {
        let list_capacity = per_key.max(1);
        let mut notes = FxHashMap::default();
        notes.reserve(keys);
        Self {
            notes,
            spare: (0..keys)
                .map(|_| VecDeque::with_capacity(list_capacity))
                .collect(),
            list_capacity,
        }
    }

    /// Appends `id` as the newest voice for `key`.
    pub fn register(&mut self, key: NoteKey, id: VoiceId) {
        if let Some(list) = self.notes.get_mut(&key) {
            list.push_back(id);
            return;
        }
        let mut list = self
            .spare
            .pop()
            .unwrap_or_else(|| VecDeque::with_capacity(self.list_capacity));
        list.push_back(id);
        self.notes.insert(key, list);
    }

    /// Number of voices registered for `key`.
    pub fn count(&self, key: NoteKey) -> usize {
        self.notes.get(&key).map_or(0, VecDeque::len)
    }

    pub fn oldest(&self, key: NoteKey) -> Option<VoiceId> {
        self.notes.get(&key).and_then(|list| list.front().copied())
    }

    /// Unregisters and returns the oldest voice for `key`.
    pub fn pop_oldest(&mut self, key: NoteKey) -> Option<VoiceId> {
        let list = self.notes.get_mut(&key)?;
        let id = list.pop_front();
        if list.is_empty() {
            self.recycle(key);
        }
        id
    }

    /// Unregisters `id` from `key`. Returns false if it was not registered.
    pub fn remove(&mut self, key: NoteKey, id: VoiceId) -> bool {
        let Some(list) = self.notes.get_mut(&key) else {
            return false;
        };
        let Some(position) = list.iter().position(|&v| v == id) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            self.recycle(key);
        }
        true
    }

    /// Voices for `key`, oldest first.
    pub fn voices(&self, key: NoteKey) -> impl Iterator<Item = VoiceId> + '_ {
        self.notes.get(&key).into_iter().flatten().copied()
    }

    pub fn clear(&mut self) {
        for (_, mut list) in self.notes.drain() {
            list.clear();
            self.spare.push(list);
        }
    }

    /// Number of distinct keys with at least one voice.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Emptied lists waiting to be handed to a new key.
    pub fn spare_lists(&self) -> usize {
        self.spare.len()
    }

    fn recycle(&mut self, key: NoteKey) {
        if let Some(list) = self.notes.remove(&key) {
            self.spare.push(list);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_order() {
        let mut registry = VoiceRegistry::new();
        let key = NoteKey::new(0, 60);
        registry.register(key, 4);
        registry.register(key, 1);

        assert_eq!(registry.count(key), 2);
        assert_eq!(registry.oldest(key), Some(4));
        assert_eq!(registry.voices(key).collect::<Vec<_>>(), vec![4, 1]);
    }

    #[test]
    fn test_channels_are_separate_keys() {
        let mut registry = VoiceRegistry::new();
        registry.register(NoteKey::new(0, 60), 0);
        registry.register(NoteKey::new(1, 60), 1);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.count(NoteKey::new(0, 60)), 1);
    }

    #[test]
    fn test_pop_oldest_drops_empty_keys() {
        let mut registry = VoiceRegistry::new();
        let key = NoteKey::new(2, 40);
        registry.register(key, 7);

        assert_eq!(registry.pop_oldest(key), Some(7));
        assert_eq!(registry.pop_oldest(key), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_specific_voice() {
        let mut registry = VoiceRegistry::new();
        let key = NoteKey::new(0, 60);
        registry.register(key, 1);
        registry.register(key, 2);
        registry.register(key, 3);

        assert!(registry.remove(key, 2));
        assert!(!registry.remove(key, 2));
        assert!(!registry.remove(NoteKey::new(5, 5), 1));
        assert_eq!(registry.voices(key).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_emptied_lists_are_reused() {
        let mut registry = VoiceRegistry::with_capacity(1, 4);
        let key = NoteKey::new(0, 60);

        registry.register(key, 0);
        assert_eq!(registry.spare_lists(), 0);
        registry.remove(key, 0);
        assert_eq!(registry.spare_lists(), 1);

        registry.register(key, 1);
        assert_eq!(registry.spare_lists(), 0);
        assert!(registry.notes[&key].capacity() >= 4);
    }

    #[test]
    fn test_clear_returns_lists_to_spare() {
        let mut registry = VoiceRegistry::with_capacity(3, 1);
        registry.register(NoteKey::new(0, 60), 0);
        registry.register(NoteKey::new(0, 62), 1);
        registry.register(NoteKey::new(1, 60), 2);
        assert_eq!(registry.spare_lists(), 0);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.spare_lists(), 3);
    }
}
