//! TableOrderManager - business rules for the table order lifecycle
//!
//! # State machine (per table)
//!
//! ```text
//! Empty    --open_or_grow--> Occupied (Created)
//! Occupied --open_or_grow--> Occupied (Grown)
//! Occupied --close-------->  Empty
//! Occupied(src) + Empty(dst) --transfer--> Empty(src) + Occupied(dst)
//! ```
//!
//! Illegal transitions fail without touching the store.
//!
//! # Mutation flow
//!
//! ```text
//! open_or_grow(table, lines, total)
//!     ├─ 1. Validate input (no lock)
//!     ├─ 2. Lock table
//!     ├─ 3. Read active order
//!     ├─ 4. Create or append (one store transaction)
//!     ├─ 5. Emit TableEvent (still under lock)
//!     └─ 6. Unlock, return snapshot
//! ```
//!
//! Emitting under the lock makes per-table event order equal commit order.
//! The broadcast send never blocks and having no receivers is fine.

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::locks::TableLocks;
use super::storage::OrderStorage;
use super::store::OrderStore;
use super::validation::{validate_lines, validate_table};
use rust_decimal::Decimal;
use shared::order::{OrderLine, TableEvent, TableNumber, TableOrder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
pub const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// Whether `open_or_grow` created a new order or grew an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpenOrGrowKind {
    Created,
    Grown,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpenOrGrow {
    pub kind: OpenOrGrowKind,
    pub order: TableOrder,
}

pub struct TableOrderManager<S: OrderStore = OrderStorage> {
    store: Arc<S>,
    locks: TableLocks,
    event_tx: broadcast::Sender<TableEvent>,
    table_count: u32,
}

impl<S: OrderStore> std::fmt::Debug for TableOrderManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableOrderManager")
            .field("store", &"<OrderStore>")
            .field("table_count", &self.table_count)
            .field("receivers", &self.event_tx.receiver_count())
            .finish()
    }
}

impl<S: OrderStore> TableOrderManager<S> {
    pub fn new(store: Arc<S>, table_count: u32) -> Self {
        let table_count = table_count.max(1);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            locks: TableLocks::new(table_count),
            event_tx,
            table_count,
        }
    }

    /// Subscribe to table events
    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.event_tx.subscribe()
    }

    pub fn table_count(&self) -> u32 {
        self.table_count
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn emit(&self, event: TableEvent) {
        tracing::debug!(kind = %event.kind(), tables = ?event.tables(), "Table event");
        // no receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Send lines to a table: opens an order on an empty table, appends to
    /// the active one otherwise.
    pub fn open_or_grow(
        &self,
        table: TableNumber,
        lines: Vec<OrderLine>,
        total: Decimal,
    ) -> OrderResult<OpenOrGrow> {
        validate_table(table, self.table_count)?;
        validate_lines(&lines, total)?;

        let _guard = self.locks.lock(table);
        match self.store.get_active_order(table)? {
            None => {
                let order = self.store.create_active_order(table, lines, total)?;
                tracing::info!(table = %table, order_id = %order.order_id, total = %order.total, "Table opened");
                self.emit(TableEvent::Created {
                    order: order.clone(),
                });
                Ok(OpenOrGrow {
                    kind: OpenOrGrowKind::Created,
                    order,
                })
            }
            Some(active) => {
                if active.total.checked_add(total).is_none() {
                    return Err(OrderError::Validation(format!(
                        "table {} total would be out of range",
                        table
                    )));
                }
                let added = lines.clone();
                let order = self.store.append_lines(&active.order_id, lines, total)?;
                tracing::info!(table = %table, order_id = %order.order_id, added = %total, total = %order.total, "Lines added to table");
                self.emit(TableEvent::Grown {
                    order: order.clone(),
                    added,
                });
                Ok(OpenOrGrow {
                    kind: OpenOrGrowKind::Grown,
                    order,
                })
            }
        }
    }

    /// Close the table's active order. Returns the closed order, which is
    /// what a sale is recorded from.
    pub fn close(&self, table: TableNumber) -> OrderResult<TableOrder> {
        self.close_with(table, |_| Ok::<_, OrderError>(()))
            .map(|(order, ())| order)
    }

    /// Close the table after `check` accepted its active order.
    ///
    /// `check` runs under the table lock, so the order it sees is exactly the
    /// order that gets closed. If it fails nothing changes.
    pub fn close_with<T, E, F>(&self, table: TableNumber, check: F) -> Result<(TableOrder, T), E>
    where
        E: From<OrderError>,
        F: FnOnce(&TableOrder) -> Result<T, E>,
    {
        validate_table(table, self.table_count)?;

        let _guard = self.locks.lock(table);
        let Some(active) = self.store.get_active_order(table).map_err(OrderError::from)? else {
            return Err(OrderError::NotFound(format!("table {} has no active order", table)).into());
        };
        let accepted = check(&active)?;

        let order = self.store.deactivate_order(table).map_err(OrderError::from)?;
        tracing::info!(table = %table, order_id = %order.order_id, total = %order.total, "Table closed");
        self.emit(TableEvent::Closed {
            order: order.clone(),
        });
        Ok((order, accepted))
    }

    /// Move the active order of `source` to the empty table `target`
    pub fn transfer(&self, source: TableNumber, target: TableNumber) -> OrderResult<TableOrder> {
        validate_table(source, self.table_count)?;
        validate_table(target, self.table_count)?;
        let reject = |reason| OrderError::InvalidTransfer {
            from: source,
            to: target,
            reason,
        };
        if source == target {
            return Err(reject(TransferRejection::SameTable));
        }

        let _guard = self.locks.lock_pair(source, target);
        if self.store.get_active_order(source)?.is_none() {
            return Err(reject(TransferRejection::SourceEmpty));
        }
        if self.store.get_active_order(target)?.is_some() {
            return Err(reject(TransferRejection::TargetOccupied));
        }

        let order = self.store.transfer_order(source, target).map_err(|e| match e {
            super::store::StoreError::NotFound(_) => reject(TransferRejection::SourceEmpty),
            super::store::StoreError::Conflict(_) => reject(TransferRejection::TargetOccupied),
            other => OrderError::from(other),
        })?;
        tracing::info!(source = %source, target = %target, order_id = %order.order_id, "Table transferred");
        self.emit(TableEvent::Transferred {
            source,
            target,
            order: order.clone(),
        });
        Ok(order)
    }

    /// Authoritative view of every active order
    pub fn snapshot(&self) -> OrderResult<BTreeMap<TableNumber, TableOrder>> {
        Ok(self.store.list_active_orders()?)
    }

    pub fn get(&self, table: TableNumber) -> OrderResult<Option<TableOrder>> {
        validate_table(table, self.table_count)?;
        Ok(self.store.get_active_order(table)?)
    }
}
