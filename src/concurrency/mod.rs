/// Background work started by scripts.
///
/// `core.async` registers a future in the [`TaskTable`] and hands back a
/// numeric handle for `core.await`. `time.timeout` and `time.interval`
/// schedule callbacks in the [`TimerTable`], cancellable by handle.
/// Handles are random positive integers, unique among live entries.
pub mod tasks;
pub mod timers;

use dashmap::{mapref::entry::Entry, DashMap};
use rand::Rng;

pub use tasks::{TaskError, TaskTable};
pub use timers::{TimerError, TimerKind, TimerTable};

pub type Handle = i64;

/// Inserts `value` under a fresh random handle.
pub(crate) fn allocate_handle<V>(table: &DashMap<Handle, V>, value: V) -> Handle {
    let mut rng = rand::thread_rng();
    loop {
        let handle = rng.gen_range(1..i64::MAX);
        if let Entry::Vacant(slot) = table.entry(handle) {
            slot.insert(value);
            return handle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_positive_and_unique() {
        let table = DashMap::new();
        for _ in 0..100 {
            let handle = allocate_handle(&table, ());
            assert!(handle > 0);
        }
        assert_eq!(table.len(), 100);
    }
}
