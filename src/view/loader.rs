use tokio::task::JoinHandle;

use crate::api::EntryPk;

/// Bookkeeping for paginated loads of a single view.
///
/// Every load issued bumps the generation and captures the new value. A
/// response is applied only while its generation is still the latest, so a
/// late answer to a superseded request is dropped on arrival.
#[derive(Debug, Default)]
pub struct LoadCoordinator {
    loading: bool,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    /// Ids of the page being fetched. They have left the queue but are not
    /// loaded yet.
    in_flight: Vec<EntryPk>,
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark a load as in flight and return its generation.
    pub fn begin(&mut self) -> u64 {
        self.loading = true;
        self.generation += 1;
        self.generation
    }

    /// Like [`begin`](Self::begin) for a page of entries; `pks` stay on
    /// record until the load is answered or superseded.
    pub fn begin_page(&mut self, pks: &[EntryPk]) -> u64 {
        let generation = self.begin();
        self.in_flight = pks.to_vec();
        generation
    }

    pub fn in_flight(&self) -> &[EntryPk] {
        &self.in_flight
    }

    /// Hand back the ids of the current page load, leaving none on record.
    pub fn take_in_flight(&mut self) -> Vec<EntryPk> {
        std::mem::take(&mut self.in_flight)
    }

    /// Remember the task serving the current load so it can be aborted later.
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// The current load has been answered.
    pub fn finish(&mut self) {
        self.loading = false;
        self.handle = None;
        self.in_flight.clear();
    }

    /// Invalidate whatever is in flight: abort its task, clear `loading` and
    /// move to a new generation so queued responses are rejected too.
    pub fn supersede(&mut self) {
        self.abort();
        self.loading = false;
        self.in_flight.clear();
        self.generation += 1;
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(generation = self.generation, "Aborted superseded load task");
        }
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Rows still to fill below the last entry, viewport plus margin. Negative
/// when the loaded entries already reach past it.
pub fn viewport_gap(viewport_height: i64, margin: i64, last_bottom: i64) -> i64 {
    viewport_height + margin - last_bottom
}

/// Entries needed to cover `gap` with collapsed list rows.
pub fn list_fill_count(gap: i64, list_item_height: i64) -> usize {
    if gap <= 0 {
        return 0;
    }
    let height = list_item_height.max(1);
    usize::try_from((gap + height - 1) / height).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_increase() {
        let mut loader = LoadCoordinator::new();
        assert_eq!(loader.generation(), 0);
        let first = loader.begin();
        assert!(loader.is_loading());
        assert!(loader.is_current(first));

        loader.supersede();
        assert!(!loader.is_loading());
        assert!(!loader.is_current(first));

        let second = loader.begin();
        assert!(second > first);
        loader.finish();
        assert!(!loader.is_loading());
        assert!(loader.is_current(second));
    }

    #[test]
    fn test_in_flight_page_is_cleared_when_answered_or_superseded() {
        let mut loader = LoadCoordinator::new();
        loader.begin_page(&[EntryPk(1), EntryPk(2)]);
        assert_eq!(loader.in_flight(), &[EntryPk(1), EntryPk(2)]);
        loader.finish();
        assert!(loader.in_flight().is_empty());

        loader.begin_page(&[EntryPk(3)]);
        loader.supersede();
        assert!(loader.in_flight().is_empty());

        loader.begin_page(&[EntryPk(4)]);
        assert_eq!(loader.take_in_flight(), vec![EntryPk(4)]);
        assert!(loader.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_supersede_aborts_task() {
        tokio::time::pause();
        let mut loader = LoadCoordinator::new();
        loader.begin();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        loader.track(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            let _ = tx.send(());
        }));
        loader.supersede();
        // An aborted task drops its sender without sending
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_gap_and_fill_count() {
        assert_eq!(viewport_gap(20, 10, 0), 30);
        assert_eq!(viewport_gap(20, 10, 45), -15);
        assert_eq!(list_fill_count(30, 1), 30);
        assert_eq!(list_fill_count(7, 2), 4);
        assert_eq!(list_fill_count(-3, 1), 0);
        assert_eq!(list_fill_count(5, 0), 5);
    }
}
