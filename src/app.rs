use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ApiError, EntryApi, EntryState, FeedInfo, FeedPk, HttpApi, Order};
use crate::keybindings::{Context, KeybindingRegistry};
use crate::ui::TerminalSurface;
use crate::util::{catch_task_panic, validate_link};
use crate::view::{FeedIndex, ListView, ViewEvent, ViewOptions};

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Entries,
    Feeds,
}

/// Results of application-level background tasks. Entry list requests report
/// through [`ViewEvent`] instead.
#[derive(Debug)]
pub enum AppEvent {
    /// Feed titles and unread counts for the sidebar.
    FeedsLoaded(Result<FeedIndex, ApiError>),
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked { task: &'static str, error: String },
}

/// Application state for the terminal client.
pub struct App {
    pub view: ListView<HttpApi, TerminalSurface>,
    pub feeds: FeedIndex,
    api: Arc<HttpApi>,
    pub keybindings: KeybindingRegistry,
    pub focus: Focus,
    pub show_feeds: bool,
    /// Highlighted sidebar row. Row 0 is "All feeds", row `n` is feed `n - 1`.
    pub sidebar_selected: usize,
    pub show_help: bool,
    /// Scroll offset in the help screen for long keybinding lists.
    pub help_scroll_offset: usize,
    /// PERF-010: Dirty flag to skip unnecessary frame renders
    pub needs_redraw: bool,
    /// Set by the renderer when the entry panel changed size; the loop then
    /// lets the view re-measure.
    pub layout_changed: bool,
    feeds_handle: Option<JoinHandle<()>>,
    /// Unread counts that arrived while the feed directory was loading. They
    /// are newer than the directory's own counts.
    pending_counts: Option<HashMap<FeedPk, i64>>,
}

impl App {
    pub fn new(
        api: Arc<HttpApi>,
        view_tx: mpsc::Sender<ViewEvent>,
        options: ViewOptions,
        show_feeds: bool,
    ) -> Self {
        let surface = TerminalSurface::new(0, 0);
        Self {
            view: ListView::new(Arc::clone(&api), surface, view_tx, options),
            feeds: FeedIndex::new(),
            api,
            keybindings: KeybindingRegistry::new(),
            focus: Focus::Entries,
            show_feeds,
            sidebar_selected: 0,
            show_help: false,
            help_scroll_offset: 0,
            needs_redraw: true,
            layout_changed: false,
            feeds_handle: None,
            pending_counts: None,
        }
    }

    /// Keybinding context for the focused panel.
    pub fn context(&self) -> Context {
        match self.focus {
            Focus::Entries => Context::Entries,
            Focus::Feeds => Context::Feeds,
        }
    }

    // ========================================================================
    // Feed Directory
    // ========================================================================

    /// Fetch feed titles for the sidebar.
    ///
    /// `feed/get` needs explicit pks, so the ids are taken from the unread
    /// counts of an all-feeds `feed/pks` call first.
    pub fn load_feed_directory(&mut self, event_tx: &mpsc::Sender<AppEvent>) {
        if let Some(handle) = self.feeds_handle.take() {
            handle.abort();
        }
        self.pending_counts = Some(HashMap::new());
        let api = Arc::clone(&self.api);
        let tx = event_tx.clone();
        self.feeds_handle = Some(tokio::spawn(async move {
            let event = match catch_task_panic(fetch_feed_directory(api)).await {
                Ok(result) => AppEvent::FeedsLoaded(result),
                Err(error) => {
                    tracing::error!(error = %error, "Feed directory task panicked");
                    AppEvent::TaskPanicked {
                        task: "load_feeds",
                        error,
                    }
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Channel send failed (receiver dropped)");
            }
        }));
    }

    pub fn handle_view_event(&mut self, event: ViewEvent) {
        if let (Some(pending), Some(counts)) =
            (self.pending_counts.as_mut(), event.feed_unread())
        {
            pending.extend(counts.iter().map(|(&pk, &count)| (pk, count)));
        }
        self.view.handle_event(event, &mut self.feeds);
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::FeedsLoaded(Ok(mut index)) => {
                if let Some(pending) = self.pending_counts.take() {
                    index.apply_bulk(&pending);
                }
                tracing::info!(
                    feeds = index.len(),
                    unread = index.total_unread(),
                    "Feed directory loaded"
                );
                let highlighted = self.sidebar_feed();
                self.feeds = index;
                self.sidebar_selected = highlighted
                    .and_then(|pk| self.feeds.position_of(pk))
                    .map_or(0, |pos| pos + 1);
            }
            AppEvent::FeedsLoaded(Err(e)) => {
                self.pending_counts = None;
                tracing::warn!(error = %e, "Failed to load feed directory");
                self.view
                    .status
                    .set_error(format!("Failed to load feeds: {}", e));
            }
            AppEvent::TaskPanicked { task, error } => {
                self.pending_counts = None;
                self.view
                    .status
                    .set_error(format!("Internal error in {}: {}", task, error));
            }
        }
    }

    // ========================================================================
    // Sidebar
    // ========================================================================

    /// Feed under the sidebar cursor; `None` is the "All feeds" row.
    pub fn sidebar_feed(&self) -> Option<FeedPk> {
        match self.sidebar_selected {
            0 => None,
            row => self.feeds.at(row - 1).map(|feed| feed.pk),
        }
    }

    pub fn sidebar_down(&mut self) {
        if self.sidebar_selected < self.feeds.len() {
            self.sidebar_selected += 1;
        }
    }

    pub fn sidebar_up(&mut self) {
        self.sidebar_selected = self.sidebar_selected.saturating_sub(1);
    }

    /// Show the highlighted feed in the entry list and return focus to it.
    pub fn select_sidebar_feed(&mut self) {
        let feed = self.sidebar_feed();
        self.focus = Focus::Entries;
        self.view.load_feed(feed);
    }

    pub fn toggle_feeds(&mut self) {
        self.show_feeds = !self.show_feeds;
        if !self.show_feeds {
            self.focus = Focus::Entries;
        }
        self.layout_changed = true;
    }

    /// Tab: move focus between the entry list and the sidebar.
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Entries => {
                if !self.show_feeds {
                    self.show_feeds = true;
                    self.layout_changed = true;
                }
                self.sidebar_selected = self
                    .view
                    .feed()
                    .and_then(|pk| self.feeds.position_of(pk))
                    .map_or(0, |pos| pos + 1);
                Focus::Feeds
            }
            Focus::Feeds => Focus::Entries,
        };
    }

    // ========================================================================
    // Entry Actions
    // ========================================================================

    pub fn toggle_current(&mut self, state: EntryState) {
        match self.view.current() {
            Some(index) => self.view.change_state(index, state),
            None => self.view.status.set("No entry selected"),
        }
    }

    /// Flip the sort order. The entry panel title shows the order; the
    /// status line keeps the view's loading message.
    pub fn toggle_order(&mut self) {
        let order = self.view.order().toggled();
        self.view.set_order(order);
    }

    /// Open the current entry's permalink in the system browser.
    pub fn open_current_link(&mut self) {
        let Some(link) = self.view.current_link() else {
            self.view.status.set("No link to open");
            return;
        };
        // SEC: Validate URL before open::that() to prevent command injection
        match validate_link(link, self.api.base_url()) {
            Ok(url) => {
                tracing::debug!(url = %url, "Opening link");
                if let Err(e) = open::that(url.as_str()) {
                    self.view
                        .status
                        .set_error(format!("Failed to open browser: {}", e));
                }
            }
            Err(e) => self.view.status.set_error(e.to_string()),
        }
    }

    /// Clear expired status messages. Returns true if one was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        self.view.status.clear_expired()
    }
}

async fn fetch_feed_directory(api: Arc<HttpApi>) -> Result<FeedIndex, ApiError> {
    let listing = api.get_feeds_pks(Vec::new(), None, Order::Desc).await?;
    let mut pks: Vec<FeedPk> = listing.feed_unread.keys().copied().collect();
    if pks.is_empty() {
        return Ok(FeedIndex::new());
    }
    pks.sort();
    let infos: Vec<FeedInfo> = api.get_feeds(pks).await?;
    Ok(FeedIndex::from_counts(
        infos.into_iter().map(|info| (info.pk, info.title)),
        &listing.feed_unread,
    ))
}

// ============================================================================
// Resource Cleanup
// ============================================================================

/// RES-002: Abort in-flight tasks on App drop. The list view aborts its own
/// load task when it is dropped.
impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.feeds_handle.take() {
            handle.abort();
            tracing::debug!("Aborted feed directory task on App drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FeedInfo;
    use std::time::Duration;

    fn test_app() -> App {
        let api = HttpApi::new(None, None, Duration::from_secs(1)).unwrap();
        let (tx, _rx) = mpsc::channel(32);
        App::new(Arc::new(api), tx, ViewOptions::default(), true)
    }

    fn feed(pk: i64, title: &str, unread: i64) -> FeedInfo {
        FeedInfo {
            pk: FeedPk(pk),
            title: title.to_string(),
            unread: Some(unread),
        }
    }

    #[tokio::test]
    async fn test_sidebar_navigation_is_clamped() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::FeedsLoaded(Ok(FeedIndex::from_infos(vec![
            feed(1, "Beta", 0),
            feed(2, "Alpha", 3),
        ]))));

        assert_eq!(app.sidebar_feed(), None);
        app.sidebar_up();
        assert_eq!(app.sidebar_selected, 0);

        app.sidebar_down();
        assert_eq!(app.sidebar_feed(), Some(FeedPk(2)));
        app.sidebar_down();
        app.sidebar_down();
        assert_eq!(app.sidebar_selected, 2);
        assert_eq!(app.sidebar_feed(), Some(FeedPk(1)));
    }

    #[tokio::test]
    async fn test_reloaded_directory_keeps_highlighted_feed() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::FeedsLoaded(Ok(FeedIndex::from_infos(vec![
            feed(1, "Beta", 0),
        ]))));
        app.sidebar_down();
        assert_eq!(app.sidebar_feed(), Some(FeedPk(1)));

        app.handle_app_event(AppEvent::FeedsLoaded(Ok(FeedIndex::from_infos(vec![
            feed(1, "Beta", 0),
            feed(2, "Alpha", 0),
        ]))));
        assert_eq!(app.sidebar_selected, 2);
        assert_eq!(app.sidebar_feed(), Some(FeedPk(1)));
    }

    #[tokio::test]
    async fn test_counts_arriving_during_directory_load_win() {
        use crate::api::StateChange;
        use crate::view::ViewEvent;

        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(4);
        app.load_feed_directory(&tx);

        // Saved while the directory request is still out
        app.handle_view_event(ViewEvent::StateSaved {
            pk: crate::api::EntryPk(10),
            state: EntryState::Read,
            result: Ok(StateChange {
                msg: String::new(),
                feed_unread: HashMap::from([(FeedPk(1), 4)]),
            }),
        });
        app.handle_app_event(AppEvent::FeedsLoaded(Ok(FeedIndex::from_infos(vec![
            feed(1, "Beta", 5),
            feed(2, "Alpha", 2),
        ]))));

        assert_eq!(app.feeds.get(FeedPk(1)).map(|f| f.unread), Some(4));
        assert_eq!(app.feeds.get(FeedPk(2)).map(|f| f.unread), Some(2));
        assert_eq!(app.feeds.total_unread(), 6);
    }

    #[tokio::test]
    async fn test_feed_directory_failure_sets_error() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::FeedsLoaded(Err(ApiError::Disabled)));
        assert_eq!(
            app.view.status.message(),
            Some("Failed to load feeds: API not available")
        );
    }

    #[tokio::test]
    async fn test_toggle_feeds_returns_focus_to_entries() {
        let mut app = test_app();
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Feeds);
        assert_eq!(app.context(), Context::Feeds);

        app.toggle_feeds();
        assert!(!app.show_feeds);
        assert_eq!(app.focus, Focus::Entries);
        assert!(app.layout_changed);

        // Tab reopens a hidden sidebar
        app.cycle_focus();
        assert!(app.show_feeds);
        assert_eq!(app.focus, Focus::Feeds);
    }

    #[tokio::test]
    async fn test_select_sidebar_feed_loads_feed() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::FeedsLoaded(Ok(FeedIndex::from_infos(vec![
            feed(7, "Only", 2),
        ]))));
        app.cycle_focus();
        app.sidebar_down();
        app.select_sidebar_feed();

        assert_eq!(app.focus, Focus::Entries);
        assert_eq!(app.view.feed(), Some(FeedPk(7)));
        assert!(app.view.is_loading());
        assert_eq!(app.view.title(&app.feeds), "Only - All items");
    }

    #[tokio::test]
    async fn test_actions_without_entries_report_status() {
        let mut app = test_app();
        app.toggle_current(EntryState::Read);
        assert_eq!(app.view.status.message(), Some("No entry selected"));
        app.open_current_link();
        assert_eq!(app.view.status.message(), Some("No link to open"));
    }

    #[tokio::test]
    async fn test_feed_directory_disabled_api() {
        let mut app = test_app();
        let (tx, mut rx) = mpsc::channel(4);
        app.load_feed_directory(&tx);
        match rx.recv().await {
            Some(AppEvent::FeedsLoaded(Err(ApiError::Disabled))) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
