//! Property tests for the id queue and paging helpers.
//!
//! 1. `take_next(n)` never returns more than `n` ids.
//! 2. Draining the queue never repeats an id.
//! 3. Loaded ids and queued ids partition the view.
//! 4. A failed page put back at the front is handed out again first.
//! 5. `list_fill_count` rows cover the gap.

use std::collections::HashSet;

use feedview::api::EntryPk;
use feedview::view::{list_fill_count, PkQueue};
use proptest::prelude::*;

fn ids_strategy() -> impl Strategy<Value = Vec<EntryPk>> {
    prop::collection::vec(0i64..200, 0..80).prop_map(|v| v.into_iter().map(EntryPk).collect())
}

proptest! {
    #[test]
    fn take_next_respects_count(full in ids_strategy(), n in 0usize..20) {
        let mut queue = PkQueue::new(&full, &[]);
        let before = queue.len();
        let page = queue.take_next(n);
        prop_assert!(page.len() <= n);
        prop_assert_eq!(page.len(), n.min(before));
        prop_assert_eq!(queue.len(), before - page.len());
    }

    #[test]
    fn draining_never_repeats(full in ids_strategy(), n in 1usize..10) {
        let mut queue = PkQueue::new(&full, &[]);
        let mut seen = HashSet::new();
        while !queue.is_empty() {
            for pk in queue.take_next(n) {
                prop_assert!(seen.insert(pk), "id {} handed out twice", pk);
            }
        }
        let distinct: HashSet<EntryPk> = full.iter().copied().collect();
        prop_assert_eq!(seen, distinct);
    }

    #[test]
    fn loaded_and_queued_partition_view(full in ids_strategy(), split in 0usize..80) {
        let loaded: Vec<EntryPk> = full.iter().copied().take(split).collect();
        let queue = PkQueue::new(&full, &loaded);

        let queued: HashSet<EntryPk> = queue.ids().collect();
        let loaded_set: HashSet<EntryPk> = loaded.iter().copied().collect();
        prop_assert!(queued.is_disjoint(&loaded_set));

        let union: HashSet<EntryPk> = queued.union(&loaded_set).copied().collect();
        let view: HashSet<EntryPk> = full.iter().copied().collect();
        prop_assert_eq!(union, view);
    }

    #[test]
    fn restored_page_comes_back_first(full in ids_strategy(), n in 1usize..10) {
        let mut queue = PkQueue::new(&full, &[]);
        let snapshot: Vec<EntryPk> = queue.ids().collect();
        let page = queue.take_next(n);
        queue.restore_front(page.clone());
        prop_assert_eq!(queue.ids().collect::<Vec<_>>(), snapshot);
        prop_assert_eq!(queue.take_next(n), page);
    }

    #[test]
    fn list_fill_covers_gap(gap in -50i64..500, height in 1i64..5) {
        let count = list_fill_count(gap, height) as i64;
        if gap <= 0 {
            prop_assert_eq!(count, 0);
        } else {
            prop_assert!(count * height >= gap);
            prop_assert!((count - 1) * height < gap);
        }
    }
}
