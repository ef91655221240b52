use crate::app::{App, Focus};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the feed sidebar. Row 0 is "All feeds".
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Feeds;
    let shown = app.view.feed();

    let total = app.feeds.total_unread();
    let all_row = ("All feeds".to_string(), total, total != 0, shown.is_none());
    let rows = std::iter::once(all_row).chain(app.feeds.iter().map(|feed| {
        (
            feed.title.clone(),
            feed.unread,
            feed.has_unread(),
            shown == Some(feed.pk),
        )
    }));

    let items: Vec<ListItem> = rows
        .enumerate()
        .map(|(i, (title, unread, has_unread, is_shown))| {
            let unread_text = if has_unread {
                format!(" ({})", unread)
            } else {
                String::new()
            };

            let mut style = if is_focused && i == app.sidebar_selected {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if has_unread {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if is_shown {
                style = style.fg(Color::Cyan);
            }

            ListItem::new(Line::from(vec![
                Span::styled(title, style),
                Span::styled(unread_text, style),
            ]))
        })
        .collect();

    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let title = format!("Feeds ({})", app.feeds.len());
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );

    // ListState keeps the cursor row scrolled into view
    let mut state = ListState::default().with_selected(Some(app.sidebar_selected));
    f.render_stateful_widget(list, area, &mut state);
}
