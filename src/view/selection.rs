/// Which entry is current and, in list mode, which one is expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<usize>,
    open: Option<usize>,
}

impl Selection {
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn open(&self) -> Option<usize> {
        self.open
    }

    /// Make `index` current, returning the previously current entry.
    pub fn set_current(&mut self, index: usize) -> Option<usize> {
        self.current.replace(index)
    }

    pub fn set_open(&mut self, index: Option<usize>) {
        self.open = index;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Index `select_next` moves to, if any. Nothing selected counts as -1.
pub fn next_index(current: Option<usize>, len: usize) -> Option<usize> {
    let next = current.map_or(0, |c| c + 1);
    (next < len).then_some(next)
}

/// Index `select_previous` moves to, if any.
pub fn previous_index(current: Option<usize>) -> Option<usize> {
    current.and_then(|c| c.checked_sub(1))
}

/// Whether the viewport has scrolled close enough to the end of the loaded
/// entries to fetch the next page.
pub fn near_end(scroll_top: i64, viewport_height: i64, margin: i64, last_bottom: i64) -> bool {
    scroll_top + viewport_height + margin >= last_bottom
}
