//! Order store contract
//!
//! Durable keyed storage of per-table active orders. Every operation is one
//! atomic unit: it either commits completely or leaves the store untouched.
//! The store enforces "at most one active order per table" on its own, so a
//! caller that skipped the manager's lock still cannot create a duplicate.

use crate::db::StorageError;
use rust_decimal::Decimal;
use shared::order::{OrderLine, TableNumber, TableOrder};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Table already has an active order / target occupied
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No active order for the table / order id
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write would push an order total out of range; nothing committed
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Backend failure; the operation did not commit and may be retried
    #[error("Store unavailable: {0}")]
    Unavailable(#[from] StorageError),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait OrderStore: Send + Sync {
    fn get_active_order(&self, table: TableNumber) -> StoreResult<Option<TableOrder>>;

    /// Fails with `Conflict` when the table already has an active order
    fn create_active_order(
        &self,
        table: TableNumber,
        lines: Vec<OrderLine>,
        total: Decimal,
    ) -> StoreResult<TableOrder>;

    /// Append lines to an active order and add `total_delta` to its total
    fn append_lines(
        &self,
        order_id: &str,
        lines: Vec<OrderLine>,
        total_delta: Decimal,
    ) -> StoreResult<TableOrder>;

    /// Close the table's active order and move it to history
    fn deactivate_order(&self, table: TableNumber) -> StoreResult<TableOrder>;

    fn list_active_orders(&self) -> StoreResult<BTreeMap<TableNumber, TableOrder>>;

    /// Move the active order of `source` to `target` in one transaction
    fn transfer_order(&self, source: TableNumber, target: TableNumber) -> StoreResult<TableOrder>;
}
