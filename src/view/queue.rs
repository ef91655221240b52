use std::collections::{HashSet, VecDeque};

use crate::api::EntryPk;

/// Entry ids of the current view that have not been fetched yet.
///
/// The server decides order and filtering; the queue only hands ids out from
/// the front, each at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PkQueue {
    unloaded: VecDeque<EntryPk>,
}

impl PkQueue {
    /// Queue every id of `full` that is not in `loaded`, keeping `full`'s order.
    ///
    /// Repeated ids in `full` are queued once.
    pub fn new(full: &[EntryPk], loaded: &[EntryPk]) -> Self {
        let mut seen: HashSet<EntryPk> = loaded.iter().copied().collect();
        let unloaded = full.iter().copied().filter(|pk| seen.insert(*pk)).collect();
        Self { unloaded }
    }

    /// Remove and return up to `n` ids from the front.
    pub fn take_next(&mut self, n: usize) -> Vec<EntryPk> {
        let n = n.min(self.unloaded.len());
        self.unloaded.drain(..n).collect()
    }

    /// Put ids back at the front, in the order given.
    pub fn restore_front(&mut self, ids: Vec<EntryPk>) {
        for pk in ids.into_iter().rev() {
            self.unloaded.push_front(pk);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryPk> + '_ {
        self.unloaded.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.unloaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unloaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pks(ids: &[i64]) -> Vec<EntryPk> {
        ids.iter().copied().map(EntryPk).collect()
    }

    #[test]
    fn test_new_excludes_loaded_and_keeps_order() {
        let queue = PkQueue::new(&pks(&[5, 4, 3, 2, 1]), &pks(&[4, 2]));
        assert_eq!(queue.ids().collect::<Vec<_>>(), pks(&[5, 3, 1]));
    }

    #[test]
    fn test_new_drops_duplicates() {
        let queue = PkQueue::new(&pks(&[1, 2, 1, 3]), &[]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_take_next_short_queue() {
        let mut queue = PkQueue::new(&pks(&[1, 2, 3]), &[]);
        assert_eq!(queue.take_next(2), pks(&[1, 2]));
        assert_eq!(queue.take_next(5), pks(&[3]));
        assert!(queue.take_next(5).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_zero() {
        let mut queue = PkQueue::new(&pks(&[1]), &[]);
        assert!(queue.take_next(0).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_restore_front_preserves_order() {
        let mut queue = PkQueue::new(&pks(&[1, 2, 3, 4]), &[]);
        let taken = queue.take_next(2);
        queue.restore_front(taken);
        assert_eq!(queue.ids().collect::<Vec<_>>(), pks(&[1, 2, 3, 4]));
    }
}
