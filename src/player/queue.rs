//! Play queue
//!
//! Ordered, duplicate-free list of tracks with a pointer to the entry the
//! engine currently owns. All index arithmetic for removal and reordering
//! lives here so the controller only decides what to load.

use super::track::{Track, TrackId};

/// What `Queue::remove` did to the current pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// No entry with that id
    NotFound,
    /// Removed entry was not the current one; the pointer still names the same track
    Kept,
    /// Current entry removed; playback continues with the entry at `index`
    Replaced { index: usize },
    /// Current entry removed and nothing is left
    Emptied,
}

#[derive(Debug, Clone, Default)]
pub struct Queue {
    entries: Vec<Track>,
    current: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Track] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.entries.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.entries.get(i))
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.entries.iter().position(|t| t.id == id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.position(id).is_some()
    }

    /// Point at `index`, or clear the pointer; out-of-range indices clear it
    pub fn set_current(&mut self, index: Option<usize>) {
        self.current = index.filter(|&i| i < self.entries.len());
    }

    /// Append unless already queued; returns the track's position either way
    pub fn push(&mut self, track: Track) -> usize {
        if let Some(index) = self.position(track.id) {
            return index;
        }
        self.entries.push(track);
        self.entries.len() - 1
    }

    /// Append every track not yet queued; returns how many were added
    pub fn extend_unique(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let before = self.entries.len();
        for track in tracks {
            self.push(track);
        }
        self.entries.len() - before
    }

    /// Replace the whole queue, dropping duplicates; the pointer is cleared
    pub fn replace(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.entries.clear();
        self.current = None;
        self.extend_unique(tracks);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    /// Index after the current one, if it exists
    ///
    /// With no current entry the queue is positioned before its first entry.
    pub fn next_index(&self) -> Option<usize> {
        let next = self.current.map_or(0, |i| i + 1);
        (next < self.entries.len()).then_some(next)
    }

    /// Index before the current one, if it exists
    pub fn previous_index(&self) -> Option<usize> {
        self.current.and_then(|i| i.checked_sub(1))
    }

    pub fn remove(&mut self, id: TrackId) -> Removal {
        let Some(index) = self.position(id) else {
            return Removal::NotFound;
        };
        self.entries.remove(index);

        // An empty queue has nothing to play, whether or not the pointer was set
        if self.entries.is_empty() {
            self.current = None;
            return Removal::Emptied;
        }

        match self.current {
            Some(current) if index < current => {
                self.current = Some(current - 1);
                Removal::Kept
            }
            Some(current) if index == current => {
                // Entry that slid into the slot, else the new last one
                let replacement = current.min(self.entries.len() - 1);
                self.current = Some(replacement);
                Removal::Replaced { index: replacement }
            }
            _ => Removal::Kept,
        }
    }

    /// Adopt a new order; the pointer follows the current track by identity
    ///
    /// Ids missing from `order` are dropped from the queue, unknown ids and
    /// duplicates in `order` are ignored.
    pub fn reorder(&mut self, order: &[TrackId]) {
        let current_id = self.current().map(|t| t.id);
        let mut remaining = std::mem::take(&mut self.entries);

        for id in order {
            if let Some(pos) = remaining.iter().position(|t| t.id == *id) {
                self.entries.push(remaining.swap_remove(pos));
            }
        }
        if !remaining.is_empty() {
            tracing::debug!("Reorder dropped {} queue entries", remaining.len());
        }

        self.current = current_id.and_then(|id| self.position(id));
    }

    /// Move one entry; expressed through `reorder` so the pointer follows identity
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        if from >= self.entries.len() || to >= self.entries.len() {
            return false;
        }
        let mut order: Vec<TrackId> = self.entries.iter().map(|t| t.id).collect();
        let id = order.remove(from);
        order.insert(to, id);
        self.reorder(&order);
        true
    }

    /// Write a decoded duration back into the matching entry
    pub fn update_duration(&mut self, id: TrackId, duration: Option<f64>) {
        if let Some(track) = self.entries.iter_mut().find(|t| t.id == id) {
            track.duration = duration;
        }
    }

    pub fn set_crossfade(&mut self, id: TrackId, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|t| t.id == id) {
            Some(track) => {
                track.crossfade = enabled;
                true
            }
            None => false,
        }
    }
}
