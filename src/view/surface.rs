use serde::Deserialize;

use super::entries::Entry;
use crate::api::EntryState;

/// How entries are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Continuous list of titles and bodies.
    #[default]
    Expanded,
    /// Titles only; one entry is open at a time.
    List,
}

impl DisplayMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "expanded" => Some(DisplayMode::Expanded),
            "list" => Some(DisplayMode::List),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Expanded => DisplayMode::List,
            DisplayMode::List => DisplayMode::Expanded,
        }
    }
}

/// Layout measurements, in rows from the top of the list.
pub trait Geometry {
    /// Bottom edge of the entry at `index` as currently laid out.
    fn entry_bottom(&self, index: usize) -> i64;
    fn viewport_height(&self) -> i64;
    /// Current scroll offset of the viewport.
    fn scroll_top(&self) -> i64;
    /// Height of a collapsed row in list mode.
    fn list_item_height(&self) -> i64;
}

/// Where entries are drawn. Indices match the view's entry collection.
pub trait Surface: Geometry {
    fn append(&mut self, entry: &Entry);
    fn clear(&mut self);
    fn set_active(&mut self, index: usize, active: bool);
    /// Expand `index` in list mode and collapse every other entry.
    fn set_open(&mut self, index: Option<usize>);
    fn set_state(&mut self, index: usize, state: EntryState);
    /// Scroll so the entry starts at the top of the viewport.
    fn scroll_to(&mut self, index: usize);
    fn scroll_to_top(&mut self);
    fn set_mode(&mut self, mode: DisplayMode);
    /// Replace the list with a placeholder message.
    fn show_empty(&mut self, message: &str);
}
