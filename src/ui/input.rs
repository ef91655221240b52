//! Input handling for the TUI.
//!
//! Keys are resolved through the keybinding registry for the focused panel
//! and dispatched to the list view or the sidebar.

use crate::api::EntryState;
use crate::app::{App, Focus};
use crate::keybindings::Action as KbAction;
use crate::view::Geometry;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<Action> {
    // Help overlay captures all keys while visible
    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    let action = app.keybindings.action_for_key(code, modifiers, app.context());
    let Some(action) = action else {
        return Ok(Action::Continue);
    };

    match action {
        KbAction::Quit => return Ok(Action::Quit),
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        KbAction::ToggleFeeds => app.toggle_feeds(),
        KbAction::FocusFeeds => app.cycle_focus(),
        KbAction::SwitchMode => {
            let mode = app.view.mode().toggled();
            app.view.switch_mode(mode);
        }
        KbAction::ToggleOrder => app.toggle_order(),
        KbAction::ShowUnread => app.view.set_state_filter(Some(EntryState::Unread)),
        KbAction::ShowAll => app.view.set_state_filter(None),
        KbAction::ShowSaved => app.view.set_state_filter(Some(EntryState::Saved)),
        KbAction::MarkAllRead => app.view.mark_all_read(),
        _ if app.focus == Focus::Feeds => handle_feeds_action(app, action),
        _ => handle_entries_action(app, action),
    }

    Ok(Action::Continue)
}

fn handle_entries_action(app: &mut App, action: KbAction) {
    match action {
        KbAction::NextEntry => app.view.select_next(),
        KbAction::PrevEntry => app.view.select_previous(),
        KbAction::OpenLink => app.open_current_link(),
        KbAction::ToggleOpen => match app.view.current() {
            Some(index) => app.view.toggle_open(index),
            None => app.view.select_next(),
        },
        KbAction::ToggleRead => app.toggle_current(EntryState::Read),
        KbAction::ToggleSaved => app.toggle_current(EntryState::Saved),
        KbAction::PageDown => {
            // Followed even at the bottom so the loader gets a nudge
            app.view.surface_mut().page_down();
            scrolled(app);
        }
        KbAction::PageUp => {
            if app.view.surface_mut().page_up() {
                scrolled(app);
            }
        }
        _ => {}
    }
}

fn handle_feeds_action(app: &mut App, action: KbAction) {
    match action {
        KbAction::FeedDown => app.sidebar_down(),
        KbAction::FeedUp => app.sidebar_up(),
        KbAction::SelectFeed => app.select_sidebar_feed(),
        _ => {}
    }
}

/// A user scroll moved the viewport; let the view follow it.
fn scrolled(app: &mut App) {
    let top = app.view.surface().scroll_top();
    app.view.on_scroll(top);
}

/// Handle input while the help overlay is visible.
///
/// Captures all keys: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        _ => {}
    }
    Action::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpApi, Order};
    use crate::view::{DisplayMode, ViewOptions};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let api = HttpApi::new(None, None, Duration::from_secs(1)).unwrap();
        let (tx, _rx) = mpsc::channel(32);
        App::new(Arc::new(api), tx, ViewOptions::default(), true)
    }

    fn press(app: &mut App, c: char) -> Action {
        handle_input(app, KeyCode::Char(c), KeyModifiers::NONE).unwrap()
    }

    #[tokio::test]
    async fn test_quit_key() {
        let mut app = test_app();
        assert!(matches!(press(&mut app, 'q'), Action::Quit));
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let mut app = test_app();
        press(&mut app, '?');
        assert!(app.show_help);
        // q closes the overlay instead of quitting
        assert!(matches!(press(&mut app, 'q'), Action::Continue));
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_mode_and_order_keys() {
        let mut app = test_app();
        press(&mut app, 'm');
        assert_eq!(app.view.mode(), DisplayMode::List);
        handle_input(&mut app, KeyCode::Char('O'), KeyModifiers::SHIFT).unwrap();
        assert_eq!(app.view.order(), Order::Asc);
        assert_eq!(app.view.status.message(), Some("Loading all feeds..."));
    }

    #[tokio::test]
    async fn test_filter_keys() {
        let mut app = test_app();
        press(&mut app, '1');
        assert_eq!(app.view.state_filter(), Some(EntryState::Unread));
        press(&mut app, '3');
        assert_eq!(app.view.state_filter(), Some(EntryState::Saved));
        press(&mut app, '2');
        assert_eq!(app.view.state_filter(), None);
    }

    #[tokio::test]
    async fn test_sidebar_keys_when_focused() {
        let mut app = test_app();
        handle_input(&mut app, KeyCode::Tab, KeyModifiers::NONE).unwrap();
        assert_eq!(app.focus, Focus::Feeds);
        // No feeds loaded: the cursor stays on "All feeds"
        press(&mut app, 'j');
        assert_eq!(app.sidebar_selected, 0);
        handle_input(&mut app, KeyCode::Enter, KeyModifiers::NONE).unwrap();
        assert_eq!(app.focus, Focus::Entries);
        assert_eq!(app.view.feed(), None);
    }
}
