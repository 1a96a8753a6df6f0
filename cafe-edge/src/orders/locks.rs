//! Per-table locks
//!
//! One mutex per table number. A mutation holds its table's lock for the full
//! read-modify-write against the store; transfers take both locks in
//! ascending table order so two opposite transfers cannot deadlock.

use parking_lot::{Mutex, MutexGuard};
use shared::order::TableNumber;

pub struct TableLocks {
    locks: Vec<Mutex<()>>,
}

/// Guards for a two-table operation, released together on drop
pub struct PairGuard<'a> {
    _first: MutexGuard<'a, ()>,
    _second: MutexGuard<'a, ()>,
}

impl TableLocks {
    pub fn new(table_count: u32) -> Self {
        Self {
            locks: (0..table_count).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Callers validate the table range first
    fn slot(&self, table: TableNumber) -> &Mutex<()> {
        let idx = (table.get() as usize).saturating_sub(1);
        &self.locks[idx.min(self.locks.len().saturating_sub(1))]
    }

    pub fn lock(&self, table: TableNumber) -> MutexGuard<'_, ()> {
        self.slot(table).lock()
    }

    /// Lock two distinct tables, lowest number first
    pub fn lock_pair(&self, a: TableNumber, b: TableNumber) -> PairGuard<'_> {
        debug_assert_ne!(a, b, "lock_pair needs two distinct tables");
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let first = self.slot(low).lock();
        let second = self.slot(high).lock();
        PairGuard {
            _first: first,
            _second: second,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_is_per_table() {
        let locks = TableLocks::new(10);
        let _a = locks.lock(TableNumber(1));
        // a different table is free
        assert!(locks.slot(TableNumber(2)).try_lock().is_some());
        assert!(locks.slot(TableNumber(1)).try_lock().is_none());
    }

    #[test]
    fn test_opposite_pairs_do_not_deadlock() {
        let locks = Arc::new(TableLocks::new(10));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = locks.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let (a, b) = if i % 2 == 0 {
                            (TableNumber(3), TableNumber(7))
                        } else {
                            (TableNumber(7), TableNumber(3))
                        };
                        let _g = locks.lock_pair(a, b);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(locks.len(), 10);
    }
}
