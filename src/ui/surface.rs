//! Terminal implementation of the view's drawing surface.
//!
//! Entries are laid out as rows of text: a title row, the wrapped body and a
//! blank separator. Layout is cached as cumulative bottoms and rebuilt when
//! entries, the open entry, the mode or the viewport width change. Only the
//! rows inside the viewport are materialised for drawing.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::api::EntryState;
use crate::util::{truncate_to_width, wrap_line, wrapped_height};
use crate::view::{DisplayMode, Entry, Geometry, Surface};

struct Item {
    title: String,
    body: Vec<String>,
    state: EntryState,
    active: bool,
}

/// Row-based surface for the entry panel.
pub struct TerminalSurface {
    items: Vec<Item>,
    /// Cumulative bottom row of each item.
    bottoms: Vec<i64>,
    width: u16,
    height: u16,
    scroll_top: i64,
    mode: DisplayMode,
    open: Option<usize>,
    empty: Option<String>,
}

impl TerminalSurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            items: Vec::new(),
            bottoms: Vec::new(),
            width,
            height,
            scroll_top: 0,
            mode: DisplayMode::Expanded,
            open: None,
            empty: None,
        }
    }

    /// Record the size of the entry panel. Returns true when it changed.
    pub fn set_viewport(&mut self, width: u16, height: u16) -> bool {
        if (width, height) == (self.width, self.height) {
            return false;
        }
        let relayout = width != self.width;
        self.width = width;
        self.height = height;
        if relayout {
            self.relayout();
        }
        self.clamp_scroll();
        true
    }

    /// Scroll by `delta` rows. Returns true when the offset moved.
    pub fn scroll_by(&mut self, delta: i64) -> bool {
        let before = self.scroll_top;
        self.scroll_top += delta;
        self.clamp_scroll();
        self.scroll_top != before
    }

    pub fn page_down(&mut self) -> bool {
        self.scroll_by(self.page_step())
    }

    pub fn page_up(&mut self) -> bool {
        self.scroll_by(-self.page_step())
    }

    /// Keep one row of context across a page jump.
    fn page_step(&self) -> i64 {
        (i64::from(self.height) - 1).max(1)
    }

    pub fn total_height(&self) -> i64 {
        self.bottoms.last().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn empty_message(&self) -> Option<&str> {
        self.empty.as_deref()
    }

    fn max_scroll(&self) -> i64 {
        (self.total_height() - i64::from(self.height)).max(0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.clamp(0, self.max_scroll());
    }

    fn top_of(&self, index: usize) -> i64 {
        match index {
            0 => 0,
            i => self.bottoms.get(i - 1).copied().unwrap_or_else(|| self.total_height()),
        }
    }

    fn shows_body(&self, index: usize) -> bool {
        self.mode == DisplayMode::Expanded || self.open == Some(index)
    }

    fn body_width(&self) -> usize {
        usize::from(self.width).max(1)
    }

    fn item_height(&self, index: usize, item: &Item) -> i64 {
        if !self.shows_body(index) {
            return 1;
        }
        let width = self.body_width();
        let body: usize = item.body.iter().map(|l| wrapped_height(l, width)).sum();
        // title + body + separator
        (body + 2) as i64
    }

    fn relayout(&mut self) {
        let mut bottom = 0;
        let bottoms = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                bottom += self.item_height(i, item);
                bottom
            })
            .collect();
        self.bottoms = bottoms;
    }

    /// Styled rows currently inside the viewport.
    pub fn visible_lines(&self) -> Vec<Line<'static>> {
        let height = i64::from(self.height);
        let first = self.bottoms.partition_point(|&b| b <= self.scroll_top);
        let mut lines = Vec::with_capacity(usize::from(self.height));

        let mut row = self.top_of(first);
        for (index, item) in self.items.iter().enumerate().skip(first) {
            for line in self.item_lines(index, item) {
                if row >= self.scroll_top {
                    lines.push(line);
                }
                row += 1;
                if row >= self.scroll_top + height {
                    return lines;
                }
            }
        }
        lines
    }

    fn item_lines(&self, index: usize, item: &Item) -> Vec<Line<'static>> {
        let width = self.body_width();
        let mut lines = vec![self.title_line(item, width)];
        if self.shows_body(index) {
            let body_style = Style::default();
            for logical in &item.body {
                for row in wrap_line(logical, width) {
                    lines.push(Line::from(Span::styled(row, body_style)));
                }
            }
            lines.push(Line::from(""));
        }
        lines
    }

    fn title_line(&self, item: &Item, width: usize) -> Line<'static> {
        let marker = match item.state {
            EntryState::Unread => "● ",
            EntryState::Read => "  ",
            EntryState::Saved => "★ ",
        };
        let mut style = match item.state {
            EntryState::Unread => Style::default().add_modifier(Modifier::BOLD),
            EntryState::Read => Style::default().fg(Color::Gray),
            EntryState::Saved => Style::default().fg(Color::Yellow),
        };
        if item.active {
            style = style.bg(Color::DarkGray).fg(Color::White);
        }
        let title = truncate_to_width(&item.title, width.saturating_sub(2)).into_owned();
        Line::from(vec![
            Span::styled(marker, style),
            Span::styled(title, style),
        ])
    }
}

impl Geometry for TerminalSurface {
    fn entry_bottom(&self, index: usize) -> i64 {
        self.bottoms
            .get(index)
            .copied()
            .unwrap_or_else(|| self.total_height())
    }

    fn viewport_height(&self) -> i64 {
        i64::from(self.height)
    }

    fn scroll_top(&self) -> i64 {
        self.scroll_top
    }

    fn list_item_height(&self) -> i64 {
        1
    }
}

impl Surface for TerminalSurface {
    fn append(&mut self, entry: &Entry) {
        self.empty = None;
        let item = Item {
            title: entry.content.title.clone(),
            body: entry.content.body.clone(),
            state: entry.state,
            active: false,
        };
        let bottom = self.total_height() + self.item_height(self.items.len(), &item);
        self.items.push(item);
        self.bottoms.push(bottom);
    }

    fn clear(&mut self) {
        self.items.clear();
        self.bottoms.clear();
        self.open = None;
        self.empty = None;
        self.scroll_top = 0;
    }

    fn set_active(&mut self, index: usize, active: bool) {
        if let Some(item) = self.items.get_mut(index) {
            item.active = active;
        }
    }

    fn set_open(&mut self, index: Option<usize>) {
        if self.open != index {
            self.open = index;
            self.relayout();
            self.clamp_scroll();
        }
    }

    fn set_state(&mut self, index: usize, state: EntryState) {
        if let Some(item) = self.items.get_mut(index) {
            item.state = state;
        }
    }

    fn scroll_to(&mut self, index: usize) {
        self.scroll_top = self.top_of(index);
        self.clamp_scroll();
    }

    fn scroll_to_top(&mut self) {
        self.scroll_top = 0;
    }

    fn set_mode(&mut self, mode: DisplayMode) {
        if self.mode != mode {
            self.mode = mode;
            self.relayout();
            self.clamp_scroll();
        }
    }

    fn show_empty(&mut self, message: &str) {
        self.empty = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntryPayload, EntryPk, FeedPk};
    use pretty_assertions::assert_eq;

    fn entry(pk: i64, body_lines: usize) -> Entry {
        let body: String = (0..body_lines).map(|i| format!("<p>line {}</p>", i)).collect();
        Entry::from(EntryPayload {
            pk: EntryPk(pk),
            feed: FeedPk(1),
            state: EntryState::Unread,
            html: format!("<h2>Entry {}</h2>{}", pk, body).into(),
        })
    }

    /// Each `<p>` is followed by a blank separator line, except the last.
    fn expanded_height(body_lines: usize) -> i64 {
        let body = if body_lines == 0 { 0 } else { body_lines * 2 - 1 };
        (body + 2) as i64
    }

    #[test]
    fn test_expanded_layout_accumulates_bottoms() {
        let mut surface = TerminalSurface::new(40, 10);
        surface.append(&entry(1, 1));
        surface.append(&entry(2, 2));
        assert_eq!(surface.entry_bottom(0), expanded_height(1));
        assert_eq!(
            surface.entry_bottom(1),
            expanded_height(1) + expanded_height(2)
        );
    }

    #[test]
    fn test_list_mode_rows_and_open_entry() {
        let mut surface = TerminalSurface::new(40, 10);
        surface.set_mode(DisplayMode::List);
        for pk in 1..=3 {
            surface.append(&entry(pk, 2));
        }
        assert_eq!(surface.total_height(), 3);

        surface.set_open(Some(1));
        assert_eq!(surface.entry_bottom(0), 1);
        assert_eq!(surface.entry_bottom(1), 1 + expanded_height(2));
        assert_eq!(surface.total_height(), 2 + expanded_height(2));

        surface.set_open(None);
        assert_eq!(surface.total_height(), 3);
    }

    #[test]
    fn test_narrow_width_wraps_body() {
        let mut surface = TerminalSurface::new(40, 10);
        surface.append(&entry(1, 1));
        let wide = surface.total_height();
        assert!(surface.set_viewport(3, 10));
        assert!(surface.total_height() > wide);
        assert!(!surface.set_viewport(3, 10));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut surface = TerminalSurface::new(40, 4);
        surface.set_mode(DisplayMode::List);
        for pk in 1..=6 {
            surface.append(&entry(pk, 0));
        }
        assert!(!surface.scroll_by(-5));
        assert!(surface.page_down());
        assert_eq!(surface.scroll_top(), 2);
        assert!(!surface.page_down());
        surface.scroll_to(5);
        assert_eq!(surface.scroll_top(), 2);
        surface.scroll_to(1);
        assert_eq!(surface.scroll_top(), 1);
    }

    #[test]
    fn test_visible_lines_window() {
        let mut surface = TerminalSurface::new(40, 2);
        surface.set_mode(DisplayMode::List);
        for pk in 1..=5 {
            surface.append(&entry(pk, 0));
        }
        surface.scroll_to(2);
        let lines = surface.visible_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].to_string().contains("Entry 3"));
        assert!(lines[1].to_string().contains("Entry 4"));
    }

    #[test]
    fn test_empty_message_cleared_by_append() {
        let mut surface = TerminalSurface::new(40, 10);
        surface.show_empty("No items");
        assert_eq!(surface.empty_message(), Some("No items"));
        surface.append(&entry(1, 0));
        assert_eq!(surface.empty_message(), None);
    }
}
