use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::entries::{Entry, EntryCollection};
use super::feeds::FeedIndex;
use super::loader::{list_fill_count, viewport_gap, LoadCoordinator};
use super::queue::PkQueue;
use super::selection::{near_end, next_index, previous_index, Selection};
use super::status::StatusLine;
use super::surface::{DisplayMode, Surface};
use crate::api::{
    ApiError, EntryApi, EntryPayload, EntryPk, EntryState, FeedPk, FeedPks, Order, StateChange,
};
use crate::util::catch_task_panic;

// ============================================================================
// Events and Options
// ============================================================================

/// What to do once a page of entries has been appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    None,
    /// Keep loading pages until the viewport is covered or the queue runs dry.
    FillViewport,
}

/// Results of spawned API requests, delivered back to the UI task.
#[derive(Debug)]
pub enum ViewEvent {
    /// A page of entries came back.
    ///
    /// Fields:
    /// - `generation`: load generation captured when the request was issued
    /// - `pks`: the ids that were requested, returned to the queue on failure
    EntriesLoaded {
        generation: u64,
        pks: Vec<EntryPk>,
        result: Result<Vec<EntryPayload>, ApiError>,
        follow_up: FollowUp,
    },
    /// The id list of a feed view came back.
    PksLoaded {
        generation: u64,
        result: Result<FeedPks, ApiError>,
    },
    /// A single entry state change was saved (or not).
    StateSaved {
        pk: EntryPk,
        state: EntryState,
        result: Result<StateChange, ApiError>,
    },
    AllMarkedRead {
        pks: Vec<EntryPk>,
        result: Result<StateChange, ApiError>,
    },
    /// A request task panicked. `generation` is set for load tasks.
    TaskPanicked {
        task: &'static str,
        generation: Option<u64>,
        error: String,
    },
}

impl ViewEvent {
    /// Server unread counts carried by a successful response.
    pub fn feed_unread(&self) -> Option<&HashMap<FeedPk, i64>> {
        match self {
            ViewEvent::PksLoaded { result: Ok(pks), .. } => Some(&pks.feed_unread),
            ViewEvent::StateSaved {
                result: Ok(change), ..
            }
            | ViewEvent::AllMarkedRead {
                result: Ok(change), ..
            } => Some(&change.feed_unread),
            _ => None,
        }
    }
}

/// Tunables of a list view, normally taken from the config file and CLI.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Entries fetched per request when no count is given.
    pub page_length: usize,
    /// Rows below the top of the viewport an entry must reach past to become current.
    pub scroll_switch_margin: i64,
    /// Rows beyond the viewport bottom at which the next page is fetched.
    pub scroll_infinite_margin: i64,
    pub mark_read_on_open: bool,
    pub status_timeout: Duration,
    pub mode: DisplayMode,
    pub order: Order,
    pub state: Option<EntryState>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_length: 5,
            scroll_switch_margin: 3,
            scroll_infinite_margin: 10,
            mark_read_on_open: true,
            status_timeout: Duration::from_secs(3),
            mode: DisplayMode::Expanded,
            order: Order::Desc,
            state: None,
        }
    }
}

// ============================================================================
// List View
// ============================================================================

/// An infinitely scrolling list of entries for one feed/state/order view.
///
/// Loaded entries and the ids still to fetch partition the view. Scrolling
/// moves the current entry; reaching the end fetches the next page. State
/// changes are applied locally first and then saved through the API.
///
/// Requests run in spawned tasks and report back as [`ViewEvent`]s, which the
/// owner feeds to [`ListView::handle_event`].
pub struct ListView<A: EntryApi, S: Surface> {
    api: Arc<A>,
    event_tx: mpsc::Sender<ViewEvent>,
    surface: S,
    queue: PkQueue,
    entries: EntryCollection,
    selection: Selection,
    loader: LoadCoordinator,
    options: ViewOptions,
    mode: DisplayMode,
    order: Order,
    state: Option<EntryState>,
    feed: Option<FeedPk>,
    pub status: StatusLine,
}

impl<A: EntryApi, S: Surface> ListView<A, S> {
    pub fn new(
        api: Arc<A>,
        mut surface: S,
        event_tx: mpsc::Sender<ViewEvent>,
        options: ViewOptions,
    ) -> Self {
        surface.set_mode(options.mode);
        Self {
            api,
            event_tx,
            surface,
            queue: PkQueue::default(),
            entries: EntryCollection::new(),
            selection: Selection::default(),
            loader: LoadCoordinator::new(),
            mode: options.mode,
            order: options.order,
            state: options.state,
            feed: None,
            status: StatusLine::new(options.status_timeout),
            options,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn entries(&self) -> &EntryCollection {
        &self.entries
    }

    pub fn queue(&self) -> &PkQueue {
        &self.queue
    }

    pub fn current(&self) -> Option<usize> {
        self.selection.current()
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.entries.get(self.selection.current()?)
    }

    /// Entry expanded in list mode.
    pub fn open_entry(&self) -> Option<usize> {
        self.selection.open()
    }

    /// Number of entries in the view: loaded, being fetched and queued.
    pub fn total(&self) -> usize {
        self.entries.len() + self.loader.in_flight().len() + self.queue.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn generation(&self) -> u64 {
        self.loader.generation()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn state_filter(&self) -> Option<EntryState> {
        self.state
    }

    pub fn feed(&self) -> Option<FeedPk> {
        self.feed
    }

    /// Heading for the view, e.g. "Rust Blog - Unread items".
    pub fn title(&self, feeds: &FeedIndex) -> String {
        let base = match self.state {
            None => "All items",
            Some(EntryState::Unread) => "Unread items",
            Some(EntryState::Read) => "Read items",
            Some(EntryState::Saved) => "Saved items",
        };
        match self.feed.and_then(|pk| feeds.title_of(pk)) {
            Some(feed_title) => format!("{} - {}", feed_title, base),
            None => base.to_string(),
        }
    }

    fn empty_message(&self) -> &'static str {
        match self.state {
            None => "No items",
            Some(EntryState::Unread) => "No unread items",
            Some(EntryState::Read) => "No read items",
            Some(EntryState::Saved) => "No saved items",
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Fetch the next `count` queued entries (`0` means one page).
    ///
    /// Ignored while a load is in flight, so repeated triggers from scrolling
    /// produce a single request.
    pub fn load_next(&mut self, count: usize, follow_up: FollowUp) {
        if self.loader.is_loading() {
            tracing::debug!(generation = self.loader.generation(), "Load in progress, skipping");
            return;
        }

        if self.queue.is_empty() {
            if self.entries.is_empty() {
                let msg = self.empty_message();
                self.status.set(msg);
                self.surface.show_empty(msg);
            } else {
                self.status.set("No more entries to load");
            }
            return;
        }

        let count = if count == 0 {
            self.options.page_length
        } else {
            count
        };
        let pks = self.queue.take_next(count);
        if pks.is_empty() {
            return;
        }

        let generation = self.loader.begin_page(&pks);
        self.status.set("Loading...");
        tracing::debug!(generation, count = pks.len(), "Loading entries");

        let api = Arc::clone(&self.api);
        let order = self.order;
        let handle = self.spawn_request("load_entries", Some(generation), async move {
            let result = api.get_entries(pks.clone(), order).await;
            ViewEvent::EntriesLoaded {
                generation,
                pks,
                result,
                follow_up,
            }
        });
        self.loader.track(handle);
    }

    /// Replace the view with a new id list and start filling the viewport.
    pub fn reload(&mut self, pks: Vec<EntryPk>) {
        self.loader.supersede();
        self.queue = PkQueue::new(&pks, &[]);
        self.entries.clear();
        self.selection.clear();
        self.surface.clear();
        self.surface.scroll_to_top();
        self.entries_resized();
        tracing::debug!(
            generation = self.loader.generation(),
            total = self.queue.len(),
            "View reloaded"
        );
        self.ensure_viewport_filled();
    }

    /// Fetch the id list for `feed` (`None` for every feed) under the current
    /// state filter and order, then reload with it.
    pub fn load_feed(&mut self, feed: Option<FeedPk>) {
        self.feed = feed;
        self.status.set(if feed.is_some() {
            "Loading feed..."
        } else {
            "Loading all feeds..."
        });
        self.deselect();

        self.loader.supersede();
        let generation = self.loader.begin();
        tracing::info!(
            feed = ?feed.map(|pk| pk.0),
            state = ?self.state,
            order = self.order.as_str(),
            generation,
            "Loading feed"
        );

        let api = Arc::clone(&self.api);
        let (state, order) = (self.state, self.order);
        let handle = self.spawn_request("load_feed", Some(generation), async move {
            let result = api
                .get_feeds_pks(feed.into_iter().collect(), state, order)
                .await;
            ViewEvent::PksLoaded { generation, result }
        });
        self.loader.track(handle);
    }

    pub fn set_order(&mut self, order: Order) {
        if order == self.order {
            return;
        }
        self.order = order;
        self.load_feed(self.feed);
    }

    pub fn set_state_filter(&mut self, state: Option<EntryState>) {
        if state == self.state {
            return;
        }
        self.state = state;
        self.load_feed(self.feed);
    }

    /// Apply the result of a spawned request.
    pub fn handle_event(&mut self, event: ViewEvent, feeds: &mut FeedIndex) {
        match event {
            ViewEvent::EntriesLoaded {
                generation,
                pks,
                result,
                follow_up,
            } => self.on_entries_loaded(generation, pks, result, follow_up),
            ViewEvent::PksLoaded { generation, result } => {
                self.on_pks_loaded(generation, result, feeds)
            }
            ViewEvent::StateSaved { pk, state, result } => match result {
                Ok(change) => {
                    feeds.apply_bulk(&change.feed_unread);
                    self.status.set(change.msg);
                }
                Err(e) => {
                    tracing::warn!(
                        pk = %pk,
                        state = ?state,
                        error = %e,
                        "Failed to save entry state; local state kept"
                    );
                    self.status.set_error(format!("Failed to update entry: {}", e));
                }
            },
            ViewEvent::AllMarkedRead { pks, result } => self.on_all_marked_read(pks, result, feeds),
            ViewEvent::TaskPanicked {
                task,
                generation,
                error,
            } => {
                if generation.is_some_and(|g| self.loader.is_current(g)) {
                    let pks = self.loader.take_in_flight();
                    self.loader.finish();
                    if !pks.is_empty() {
                        tracing::warn!(
                            count = pks.len(),
                            "Returning ids of panicked load to the queue"
                        );
                        self.queue.restore_front(pks);
                    }
                }
                self.status
                    .set_error(format!("Internal error in {}: {}", task, error));
            }
        }
    }

    fn on_entries_loaded(
        &mut self,
        generation: u64,
        pks: Vec<EntryPk>,
        result: Result<Vec<EntryPayload>, ApiError>,
        follow_up: FollowUp,
    ) {
        if !self.loader.is_current(generation) {
            tracing::debug!(
                expected = self.loader.generation(),
                got = generation,
                "Ignoring stale entry load (generation mismatch)"
            );
            return;
        }
        self.loader.finish();

        match result {
            Ok(payloads) => {
                let requested = pks.len();
                let received = payloads.len();
                for payload in payloads {
                    let entry = Entry::from(payload);
                    self.surface.append(&entry);
                    self.entries.push(entry);
                }
                self.entries_resized();
                self.status.clear();
                tracing::debug!(generation, requested, received, "Entries loaded");

                if follow_up == FollowUp::FillViewport && !self.queue.is_empty() {
                    self.ensure_viewport_filled();
                }
            }
            Err(e) => {
                tracing::warn!(generation, count = pks.len(), error = %e, "Failed to load entries");
                self.queue.restore_front(pks);
                self.status.set_error(format!("Failed to load entries: {}", e));
            }
        }
    }

    fn on_pks_loaded(
        &mut self,
        generation: u64,
        result: Result<FeedPks, ApiError>,
        feeds: &mut FeedIndex,
    ) {
        if !self.loader.is_current(generation) {
            tracing::debug!(
                expected = self.loader.generation(),
                got = generation,
                "Ignoring stale feed load (generation mismatch)"
            );
            return;
        }
        self.loader.finish();

        match result {
            Ok(FeedPks { pks, feed_unread }) => {
                tracing::info!(feed = ?self.feed.map(|pk| pk.0), entries = pks.len(), "Feed loaded");
                feeds.apply_bulk(&feed_unread);
                self.reload(pks);
            }
            Err(e) => {
                tracing::warn!(feed = ?self.feed.map(|pk| pk.0), error = %e, "Failed to load feed");
                self.status.set_error(format!("Failed to load feed: {}", e));
            }
        }
    }

    // ========================================================================
    // Entry State
    // ========================================================================

    pub fn mark_read(&mut self, index: usize) {
        self.set_entry_state(index, EntryState::Read);
    }

    pub fn mark_unread(&mut self, index: usize) {
        self.set_entry_state(index, EntryState::Unread);
    }

    pub fn mark_saved(&mut self, index: usize) {
        self.set_entry_state(index, EntryState::Saved);
    }

    /// Checkbox semantics: toggling read on a read entry makes it unread,
    /// toggling saved on a saved entry makes it read.
    pub fn change_state(&mut self, index: usize, toggled: EntryState) {
        let Some(entry) = self.entries.get(index) else {
            return;
        };
        let target = match toggled {
            EntryState::Read if entry.state == EntryState::Read => EntryState::Unread,
            EntryState::Saved if entry.state == EntryState::Saved => EntryState::Read,
            other => other,
        };
        self.set_entry_state(index, target);
    }

    /// Update local state and the surface now, save through the API after.
    fn set_entry_state(&mut self, index: usize, state: EntryState) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        if entry.state == state {
            return;
        }
        entry.state = state;
        let pk = entry.pk;
        self.surface.set_state(index, state);
        tracing::debug!(pk = %pk, state = ?state, "Saving entry state");

        let api = Arc::clone(&self.api);
        // Not tracked: state changes are never superseded
        self.spawn_request("set_state", None, async move {
            let result = api.set_entries(vec![pk], state, None).await;
            ViewEvent::StateSaved { pk, state, result }
        });
    }

    /// Mark every entry of the view read, loaded or not, in one request.
    pub fn mark_all_read(&mut self) {
        let mut pks = self.entries.pks();
        pks.extend_from_slice(self.loader.in_flight());
        pks.extend(self.queue.ids());
        if pks.is_empty() {
            self.status.set("No entries to mark");
            return;
        }

        self.status.set("Marking all as read...");
        tracing::debug!(count = pks.len(), "Marking all entries read");

        let api = Arc::clone(&self.api);
        self.spawn_request("mark_all_read", None, async move {
            let result = api
                .set_entries(pks.clone(), EntryState::Read, Some(EntryState::Unread))
                .await;
            ViewEvent::AllMarkedRead { pks, result }
        });
    }

    fn on_all_marked_read(
        &mut self,
        pks: Vec<EntryPk>,
        result: Result<StateChange, ApiError>,
        feeds: &mut FeedIndex,
    ) {
        match result {
            Ok(change) => {
                feeds.apply_bulk(&change.feed_unread);
                let requested: HashSet<EntryPk> = pks.into_iter().collect();
                for index in 0..self.entries.len() {
                    if let Some(entry) = self.entries.get_mut(index) {
                        if entry.state == EntryState::Unread && requested.contains(&entry.pk) {
                            entry.state = EntryState::Read;
                            self.surface.set_state(index, EntryState::Read);
                        }
                    }
                }
                if change.msg.is_empty() {
                    self.status.set("Marked all as read");
                } else {
                    self.status.set(change.msg);
                }
            }
            Err(e) => {
                tracing::warn!(count = pks.len(), error = %e, "Failed to mark all read");
                self.status.set_error(format!("Failed to mark all read: {}", e));
            }
        }
    }

    // ========================================================================
    // Selection and Scrolling
    // ========================================================================

    /// Make `index` current and open it. Selecting the last loaded entry
    /// fetches the next page ahead of time.
    pub fn select_entry(&mut self, index: usize) {
        if index >= self.entries.len() {
            return;
        }

        if let Some(previous) = self.selection.set_current(index) {
            if previous != index {
                self.surface.set_active(previous, false);
            }
        }
        self.surface.set_active(index, true);

        if self.mode == DisplayMode::List && self.selection.open() != Some(index) {
            self.selection.set_open(Some(index));
            self.surface.set_open(Some(index));
            self.entries_resized();
        }

        let unread = self
            .entries
            .get(index)
            .is_some_and(|e| e.state == EntryState::Unread);
        if unread && self.options.mark_read_on_open {
            self.mark_read(index);
        }

        if index + 1 == self.entries.len() {
            self.load_next(0, FollowUp::None);
        }
    }

    pub fn select_next(&mut self) {
        if let Some(next) = next_index(self.selection.current(), self.entries.len()) {
            self.select_entry(next);
            self.surface.scroll_to(next);
        }
    }

    pub fn select_previous(&mut self) {
        if let Some(previous) = previous_index(self.selection.current()) {
            self.select_entry(previous);
            self.surface.scroll_to(previous);
        }
    }

    /// Follow a scroll of the viewport to `scroll_top`.
    ///
    /// In expanded mode the first entry reaching past the switch margin
    /// becomes current. Near the end of the loaded entries the next page is
    /// fetched.
    pub fn on_scroll(&mut self, scroll_top: i64) {
        match self.mode {
            DisplayMode::Expanded => {
                let cutoff = scroll_top + self.options.scroll_switch_margin;
                if let Some(index) = self.entries.first_below(cutoff) {
                    if self.selection.current() != Some(index) {
                        self.select_entry(index);
                    }
                }
            }
            DisplayMode::List => {
                if self.selection.current().is_none() && !self.entries.is_empty() {
                    self.select_entry(0);
                }
            }
        }

        if !self.entries.is_empty()
            && near_end(
                scroll_top,
                self.surface.viewport_height(),
                self.options.scroll_infinite_margin,
                self.entries.last_bottom(),
            )
        {
            self.load_next(0, FollowUp::None);
        }
    }

    /// Load enough entries to cover the viewport plus the infinite-scroll margin.
    pub fn ensure_viewport_filled(&mut self) {
        let gap = viewport_gap(
            self.surface.viewport_height(),
            self.options.scroll_infinite_margin,
            self.entries.last_bottom(),
        );
        if gap < 0 {
            return;
        }
        match self.mode {
            DisplayMode::List => {
                let count = list_fill_count(gap, self.surface.list_item_height());
                self.load_next(count, FollowUp::None);
            }
            DisplayMode::Expanded => {
                self.load_next(self.options.page_length, FollowUp::FillViewport);
            }
        }
    }

    /// List mode: close an open entry, otherwise select it and scroll to it.
    pub fn toggle_open(&mut self, index: usize) {
        if self.mode != DisplayMode::List || index >= self.entries.len() {
            return;
        }
        if self.selection.open() == Some(index) {
            self.selection.set_open(None);
            self.surface.set_open(None);
            self.entries_resized();
        } else {
            self.select_entry(index);
            self.surface.scroll_to(index);
        }
    }

    /// Permalink of the current entry while it is visible.
    pub fn current_link(&self) -> Option<&str> {
        let index = self.selection.current()?;
        let visible = self.mode == DisplayMode::Expanded || self.selection.open() == Some(index);
        if !visible {
            return None;
        }
        self.entries.get(index)?.link()
    }

    pub fn switch_mode(&mut self, mode: DisplayMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.selection.set_open(None);
        self.surface.set_mode(mode);
        self.surface.set_open(None);
        self.surface.scroll_to_top();
        self.entries_resized();
        tracing::debug!(mode = ?mode, "Display mode switched");
        self.ensure_viewport_filled();
    }

    pub fn on_resize(&mut self) {
        self.entries_resized();
        self.ensure_viewport_filled();
        self.on_scroll(self.surface.scroll_top());
    }

    /// Re-read entry positions after anything that changes layout.
    pub fn entries_resized(&mut self) {
        self.entries.recompute_positions(&self.surface);
    }

    fn deselect(&mut self) {
        if let Some(current) = self.selection.current() {
            self.surface.set_active(current, false);
        }
        if self.selection.open().is_some() {
            self.surface.set_open(None);
        }
        self.selection.clear();
    }

    /// Run a request off the UI task and deliver its event. Panics inside the
    /// request arrive as [`ViewEvent::TaskPanicked`].
    fn spawn_request<F>(
        &self,
        task: &'static str,
        generation: Option<u64>,
        request: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = ViewEvent> + Send + 'static,
    {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match catch_task_panic(request).await {
                Ok(event) => event,
                Err(error) => {
                    tracing::error!(task, error = %error, "Background task panicked");
                    ViewEvent::TaskPanicked {
                        task,
                        generation,
                        error,
                    }
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
            }
        })
    }
}
