use std::sync::Arc;

use super::surface::Geometry;
use crate::api::{EntryPayload, EntryPk, EntryState, FeedPk};
use crate::util::{render_entry, RenderedEntry};

/// A loaded entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub pk: EntryPk,
    pub feed: FeedPk,
    pub state: EntryState,
    pub html: Arc<str>,
    /// Title, body text and permalink parsed from `html` once at load time.
    pub content: RenderedEntry,
}

impl Entry {
    pub fn link(&self) -> Option<&str> {
        self.content.link.as_deref()
    }
}

impl From<EntryPayload> for Entry {
    fn from(payload: EntryPayload) -> Self {
        let content = render_entry(&payload.html);
        Self {
            pk: payload.pk,
            feed: payload.feed,
            state: payload.state,
            html: payload.html,
            content,
        }
    }
}

/// Loaded entries in fetch order, with the bottom edge of each as last laid out.
#[derive(Debug, Default)]
pub struct EntryCollection {
    entries: Vec<Entry>,
    bottoms: Vec<i64>,
}

impl EntryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bottoms.clear();
    }

    /// Re-read the bottom edge of every entry from the surface.
    pub fn recompute_positions(&mut self, geometry: &impl Geometry) {
        self.bottoms = (0..self.entries.len())
            .map(|i| geometry.entry_bottom(i))
            .collect();
    }

    /// First entry whose bottom edge lies below `cutoff`.
    pub fn first_below(&self, cutoff: i64) -> Option<usize> {
        // Bottoms grow monotonically down the list
        let idx = self.bottoms.partition_point(|&bottom| bottom <= cutoff);
        (idx < self.bottoms.len()).then_some(idx)
    }

    /// Bottom edge of the last entry, 0 when nothing is loaded.
    pub fn last_bottom(&self) -> i64 {
        self.bottoms.last().copied().unwrap_or(0)
    }

    pub fn bottom(&self, index: usize) -> Option<i64> {
        self.bottoms.get(index).copied()
    }

    pub fn pks(&self) -> Vec<EntryPk> {
        self.entries.iter().map(|e| e.pk).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
