//! Observer-side mirror of the table state
//!
//! `MirrorView` folds table events and snapshots into a map of active orders.
//! It is a cache: nothing should ever decide whether an operation is legal by
//! looking at it.

use super::event::TableEvent;
use super::snapshot::TableOrder;
use super::types::TableNumber;
use crate::message::MirrorPayload;
use std::collections::BTreeMap;

/// Result of feeding one mirror payload into the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Applied in sequence
    Applied,
    /// Already covered by a newer snapshot, ignored
    Stale,
    /// Applied, but at least one event was missed; ask for a snapshot
    Gap,
    /// Full state replaced
    Replaced,
}

#[derive(Debug, Clone, Default)]
pub struct MirrorView {
    orders: BTreeMap<TableNumber, TableOrder>,
    last_sequence: u64,
}

impl MirrorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single table event
    pub fn apply(&mut self, event: &TableEvent) {
        match event {
            TableEvent::Created { order } | TableEvent::Grown { order, .. } => {
                self.orders.insert(order.table_number, order.clone());
            }
            TableEvent::Closed { order } => {
                self.orders.remove(&order.table_number);
            }
            TableEvent::Transferred {
                source,
                target,
                order,
            } => {
                self.orders.remove(source);
                self.orders.insert(*target, order.clone());
            }
        }
    }

    /// Replace the whole view with a snapshot
    pub fn replace(&mut self, orders: impl IntoIterator<Item = TableOrder>) {
        self.orders = orders
            .into_iter()
            .filter(|o| o.active)
            .map(|o| (o.table_number, o))
            .collect();
    }

    /// Feed a sequenced payload received from the mirror
    pub fn apply_payload(&mut self, payload: &MirrorPayload) -> ApplyOutcome {
        match payload {
            MirrorPayload::Snapshot {
                sequence, orders, ..
            } => {
                self.replace(orders.iter().cloned());
                self.last_sequence = *sequence;
                ApplyOutcome::Replaced
            }
            MirrorPayload::Event { sequence, event } => {
                if *sequence <= self.last_sequence {
                    return ApplyOutcome::Stale;
                }
                let gap = *sequence > self.last_sequence + 1;
                self.apply(event);
                self.last_sequence = *sequence;
                if gap {
                    ApplyOutcome::Gap
                } else {
                    ApplyOutcome::Applied
                }
            }
        }
    }

    pub fn get(&self, table: TableNumber) -> Option<&TableOrder> {
        self.orders.get(&table)
    }

    pub fn is_occupied(&self, table: TableNumber) -> bool {
        self.orders.contains_key(&table)
    }

    pub fn occupied_tables(&self) -> Vec<TableNumber> {
        self.orders.keys().copied().collect()
    }

    pub fn orders(&self) -> &BTreeMap<TableNumber, TableOrder> {
        &self.orders
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SnapshotReason;
    use crate::order::OrderLine;
    use rust_decimal::Decimal;

    fn order(table: u32, qty: u32) -> TableOrder {
        TableOrder::new(
            format!("o-{}", table),
            TableNumber(table),
            vec![OrderLine {
                product_id: 1,
                name: "Coffee".to_string(),
                category_id: 1,
                size: None,
                quantity: qty,
                unit_price: Decimal::from(30),
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_apply_lifecycle() {
        let mut view = MirrorView::new();
        view.apply(&TableEvent::Created { order: order(12, 2) });
        assert!(view.is_occupied(TableNumber(12)));

        let mut moved = view.get(TableNumber(12)).unwrap().clone();
        moved.table_number = TableNumber(7);
        view.apply(&TableEvent::Transferred {
            source: TableNumber(12),
            target: TableNumber(7),
            order: moved.clone(),
        });
        assert!(!view.is_occupied(TableNumber(12)));
        assert_eq!(view.get(TableNumber(7)), Some(&moved));

        view.apply(&TableEvent::Closed { order: moved });
        assert!(view.is_empty());
    }

    #[test]
    fn test_snapshot_then_events() {
        let mut view = MirrorView::new();
        let outcome = view.apply_payload(&MirrorPayload::Snapshot {
            sequence: 5,
            reason: SnapshotReason::Connect,
            orders: vec![order(1, 1), order(2, 1)],
        });
        assert_eq!(outcome, ApplyOutcome::Replaced);
        assert_eq!(view.occupied_tables(), vec![TableNumber(1), TableNumber(2)]);

        // covered by the snapshot
        let stale = MirrorPayload::Event {
            sequence: 5,
            event: TableEvent::Closed { order: order(1, 1) },
        };
        assert_eq!(view.apply_payload(&stale), ApplyOutcome::Stale);
        assert_eq!(view.len(), 2);

        let next = MirrorPayload::Event {
            sequence: 6,
            event: TableEvent::Closed { order: order(1, 1) },
        };
        assert_eq!(view.apply_payload(&next), ApplyOutcome::Applied);
        assert_eq!(view.len(), 1);

        let skipped = MirrorPayload::Event {
            sequence: 9,
            event: TableEvent::Created { order: order(3, 1) },
        };
        assert_eq!(view.apply_payload(&skipped), ApplyOutcome::Gap);
        assert_eq!(view.last_sequence(), 9);
    }

    #[test]
    fn test_replace_drops_inactive() {
        let mut view = MirrorView::new();
        let mut closed = order(4, 1);
        closed.active = false;
        view.replace(vec![order(3, 1), closed]);
        assert_eq!(view.occupied_tables(), vec![TableNumber(3)]);
    }
}
