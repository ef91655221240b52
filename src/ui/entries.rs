use crate::api::Order;
use crate::app::{App, Focus};
use crate::view::DisplayMode;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the entry panel
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if app.focus == Focus::Entries {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
        .title(panel_title(app));
    let inner = block.inner(area);

    // The view measures entries against this size
    if app
        .view
        .surface_mut()
        .set_viewport(inner.width, inner.height)
    {
        app.layout_changed = true;
    }

    f.render_widget(block, area);

    let surface = app.view.surface();
    if surface.is_empty() {
        let text = surface
            .empty_message()
            .map(str::to_string)
            .unwrap_or_else(|| {
                if app.view.is_loading() {
                    "Loading...".to_string()
                } else {
                    String::new()
                }
            });
        f.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    f.render_widget(Paragraph::new(surface.visible_lines()), inner);
}

/// "Rust Blog - Unread items [list] [oldest first] 12/40"
fn panel_title(app: &App) -> String {
    let mode = match app.view.mode() {
        DisplayMode::Expanded => "",
        DisplayMode::List => " [list]",
    };
    let order = match app.view.order() {
        Order::Desc => "",
        Order::Asc => " [oldest first]",
    };
    let total = app.view.total();
    let position = match app.view.current() {
        Some(index) => format!(" {}/{}", index + 1, total),
        None if total > 0 => format!(" {}", total),
        None => String::new(),
    };
    format!(
        " {}{}{}{} ",
        app.view.title(&app.feeds),
        mode,
        order,
        position
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpApi;
    use crate::view::ViewOptions;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_panel_title_shows_mode_and_order() {
        let api = HttpApi::new(None, None, Duration::from_secs(1)).unwrap();
        let (tx, _rx) = mpsc::channel(32);
        let mut app = App::new(Arc::new(api), tx, ViewOptions::default(), true);
        assert_eq!(panel_title(&app), " All items ");

        app.view.switch_mode(DisplayMode::List);
        app.toggle_order();
        assert_eq!(panel_title(&app), " All items [list] [oldest first] ");
    }
}
