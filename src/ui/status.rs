use crate::app::{App, Focus};
use crate::view::StatusKind;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    let status = &app.view.status;
    let text: Cow<'_, str> = match status.message() {
        Some(msg) => Cow::Borrowed(msg),
        // Static keybinding hints - zero allocation
        None => match app.focus {
            Focus::Entries => Cow::Borrowed(
                "[j/k]move [r]ead [s]ave [A]ll read [v]open [m]ode [1/2/3]filter [f]eeds [?]help [q]uit",
            ),
            Focus::Feeds => Cow::Borrowed("[j/k]move [Enter]show feed [Tab]back [?]help [q]uit"),
        },
    };

    let style = match status.kind() {
        Some(StatusKind::Error) => Style::default().bg(Color::Red).fg(Color::White),
        _ => Style::default().bg(Color::DarkGray).fg(Color::White),
    };

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
