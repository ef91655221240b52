use std::collections::{HashMap, HashSet};

use crate::api::{FeedInfo, FeedPk};

/// A subscribed feed as shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub pk: FeedPk,
    pub title: String,
    pub unread: i64,
}

impl Feed {
    pub fn has_unread(&self) -> bool {
        self.unread != 0
    }
}

/// Feeds of the signed-in user with their unread counts.
///
/// Counts only change from numbers the server returns; the client never
/// recomputes them from the entries it has loaded.
#[derive(Debug, Clone, Default)]
pub struct FeedIndex {
    feeds: Vec<Feed>,
    by_pk: HashMap<FeedPk, usize>,
    total_unread: i64,
}

impl FeedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from feed titles and a count map. Feeds missing from `counts`
    /// start at zero.
    pub fn from_counts(
        titles: impl IntoIterator<Item = (FeedPk, String)>,
        counts: &HashMap<FeedPk, i64>,
    ) -> Self {
        let feeds = titles
            .into_iter()
            .map(|(pk, title)| Feed {
                pk,
                title,
                unread: counts.get(&pk).copied().unwrap_or(0),
            })
            .collect();
        Self::from_feeds(feeds)
    }

    pub fn from_infos(infos: Vec<FeedInfo>) -> Self {
        let feeds = infos
            .into_iter()
            .map(|info| Feed {
                pk: info.pk,
                title: info.title,
                unread: info.unread.unwrap_or(0),
            })
            .collect();
        Self::from_feeds(feeds)
    }

    fn from_feeds(mut feeds: Vec<Feed>) -> Self {
        feeds.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.pk.cmp(&b.pk))
        });
        let mut seen = HashSet::new();
        feeds.retain(|f| seen.insert(f.pk));
        let by_pk = feeds.iter().enumerate().map(|(i, f)| (f.pk, i)).collect();
        let total_unread = feeds.iter().map(|f| f.unread).sum();
        Self {
            feeds,
            by_pk,
            total_unread,
        }
    }

    /// Store a server-provided unread count. Returns `false` for unknown feeds.
    pub fn apply_unread(&mut self, pk: FeedPk, count: i64) -> bool {
        let Some(&idx) = self.by_pk.get(&pk) else {
            tracing::debug!(feed = %pk, count, "Unread count for unknown feed ignored");
            return false;
        };
        let feed = &mut self.feeds[idx];
        self.total_unread += count - feed.unread;
        feed.unread = count;
        true
    }

    pub fn apply_bulk(&mut self, counts: &HashMap<FeedPk, i64>) {
        for (&pk, &count) in counts {
            self.apply_unread(pk, count);
        }
    }

    pub fn get(&self, pk: FeedPk) -> Option<&Feed> {
        self.by_pk.get(&pk).map(|&i| &self.feeds[i])
    }

    pub fn title_of(&self, pk: FeedPk) -> Option<&str> {
        self.get(pk).map(|f| f.title.as_str())
    }

    /// Feeds in display order (by title).
    pub fn iter(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter()
    }

    /// Feed at a display position.
    pub fn at(&self, position: usize) -> Option<&Feed> {
        self.feeds.get(position)
    }

    pub fn position_of(&self, pk: FeedPk) -> Option<usize> {
        self.by_pk.get(&pk).copied()
    }

    pub fn total_unread(&self) -> i64 {
        self.total_unread
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
