//! redb-based storage for table orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `active_orders` | `table_number` | `TableOrder` (JSON) | One active order per table |
//! | `active_order_index` | `order_id` | `table_number` | Locate an active order by id |
//! | `order_history` | `order_id` | `TableOrder` (JSON) | Closed orders, never reactivated |
//!
//! Keying active orders by table number makes "one active order per table"
//! a property of the schema. Every public operation is a single write
//! transaction.

use super::store::{OrderStore, StoreError, StoreResult};
use crate::db::{self, StorageError, StorageResult};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use shared::order::{OrderLine, TableNumber, TableOrder};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// key = table number, value = JSON-serialized TableOrder
const ACTIVE_ORDERS_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("active_orders");

/// key = order_id, value = table number
const ACTIVE_INDEX_TABLE: TableDefinition<&str, u32> = TableDefinition::new("active_order_index");

/// key = order_id, value = JSON-serialized TableOrder (inactive)
const HISTORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("order_history");

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Use a shared database handle, creating the order tables if missing
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_INDEX_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Open or create a standalone database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::new(db::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::new(db::open_in_memory()?)
    }

    fn read_active(txn: &WriteTransaction, table: TableNumber) -> StorageResult<Option<TableOrder>> {
        let active = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let value = active.get(table.get())?.map(|guard| guard.value().to_vec());
        match value {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_active(txn: &WriteTransaction, order: &TableOrder) -> StorageResult<()> {
        let value = serde_json::to_vec(order)?;
        let mut active = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        active.insert(order.table_number.get(), value.as_slice())?;
        let mut index = txn.open_table(ACTIVE_INDEX_TABLE)?;
        index.insert(order.order_id.as_str(), order.table_number.get())?;
        Ok(())
    }

    fn remove_active(txn: &WriteTransaction, order: &TableOrder) -> StorageResult<()> {
        let mut active = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        active.remove(order.table_number.get())?;
        let mut index = txn.open_table(ACTIVE_INDEX_TABLE)?;
        index.remove(order.order_id.as_str())?;
        Ok(())
    }

    /// Get a closed order from history
    pub fn get_history(&self, order_id: &str) -> StorageResult<Option<TableOrder>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Number of closed orders kept in history
    pub fn history_len(&self) -> StorageResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

impl OrderStore for OrderStorage {
    fn get_active_order(&self, table: TableNumber) -> StoreResult<Option<TableOrder>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let active = read_txn
            .open_table(ACTIVE_ORDERS_TABLE)
            .map_err(StorageError::from)?;
        let guard = active.get(table.get()).map_err(StorageError::from)?;
        match guard {
            Some(g) => Ok(Some(
                serde_json::from_slice(g.value()).map_err(StorageError::from)?,
            )),
            None => Ok(None),
        }
    }

    fn create_active_order(
        &self,
        table: TableNumber,
        lines: Vec<OrderLine>,
        total: Decimal,
    ) -> StoreResult<TableOrder> {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        if Self::read_active(&txn, table)?.is_some() {
            // dropping the transaction aborts it
            return Err(StoreError::Conflict(format!(
                "table {} already has an active order",
                table
            )));
        }

        let mut order = TableOrder::new(uuid::Uuid::new_v4().to_string(), table, lines)
            .map_err(|e| StoreError::OutOfRange(format!("table {}: {}", table, e)))?;
        order.total = total;
        Self::write_active(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(order)
    }

    fn append_lines(
        &self,
        order_id: &str,
        lines: Vec<OrderLine>,
        total_delta: Decimal,
    ) -> StoreResult<TableOrder> {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let table = {
            let index = txn
                .open_table(ACTIVE_INDEX_TABLE)
                .map_err(StorageError::from)?;
            let guard = index.get(order_id).map_err(StorageError::from)?;
            guard.map(|g| TableNumber(g.value()))
        };
        let Some(table) = table else {
            return Err(StoreError::NotFound(format!(
                "order {} is not active",
                order_id
            )));
        };
        let Some(mut order) = Self::read_active(&txn, table)? else {
            return Err(StoreError::NotFound(format!(
                "order {} is not active",
                order_id
            )));
        };

        let out_of_range = || StoreError::OutOfRange(format!("order {} total is out of range", order_id));
        let stored_total = order.total;
        order.append(&lines).map_err(|_| out_of_range())?;
        order.total = stored_total.checked_add(total_delta).ok_or_else(out_of_range)?;
        Self::write_active(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(order)
    }

    fn deactivate_order(&self, table: TableNumber) -> StoreResult<TableOrder> {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let Some(mut order) = Self::read_active(&txn, table)? else {
            return Err(StoreError::NotFound(format!(
                "table {} has no active order",
                table
            )));
        };

        Self::remove_active(&txn, &order)?;
        order.active = false;
        order.updated_at = shared::util::now_millis();
        {
            let value = serde_json::to_vec(&order).map_err(StorageError::from)?;
            let mut history = txn.open_table(HISTORY_TABLE).map_err(StorageError::from)?;
            history
                .insert(order.order_id.as_str(), value.as_slice())
                .map_err(StorageError::from)?;
        }
        txn.commit().map_err(StorageError::from)?;
        Ok(order)
    }

    fn list_active_orders(&self) -> StoreResult<BTreeMap<TableNumber, TableOrder>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let active = read_txn
            .open_table(ACTIVE_ORDERS_TABLE)
            .map_err(StorageError::from)?;

        let mut orders = BTreeMap::new();
        for entry in active.iter().map_err(StorageError::from)? {
            let (key, value) = entry.map_err(StorageError::from)?;
            let order: TableOrder =
                serde_json::from_slice(value.value()).map_err(StorageError::from)?;
            orders.insert(TableNumber(key.value()), order);
        }
        Ok(orders)
    }

    fn transfer_order(&self, source: TableNumber, target: TableNumber) -> StoreResult<TableOrder> {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let Some(mut order) = Self::read_active(&txn, source)? else {
            return Err(StoreError::NotFound(format!(
                "table {} has no active order",
                source
            )));
        };
        if Self::read_active(&txn, target)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "table {} already has an active order",
                target
            )));
        }

        Self::remove_active(&txn, &order)?;
        order.table_number = target;
        order.updated_at = shared::util::now_millis();
        Self::write_active(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(order)
    }
}
