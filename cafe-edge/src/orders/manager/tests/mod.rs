use super::*;
use crate::db::StorageError;
use crate::orders::store::{StoreError, StoreResult};
use std::sync::atomic::{AtomicU32, Ordering};

fn create_test_manager() -> TableOrderManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    TableOrderManager::new(Arc::new(storage), 50)
}

fn line(product_id: i64, name: &str, quantity: u32, price: i64) -> OrderLine {
    OrderLine {
        product_id,
        name: name.to_string(),
        category_id: 1,
        size: None,
        quantity,
        unit_price: Decimal::from(price),
    }
}

fn coffee(quantity: u32) -> OrderLine {
    line(1, "Coffee", quantity, 30)
}

fn cake(quantity: u32) -> OrderLine {
    line(2, "Cake", quantity, 45)
}

/// Send lines with their correct total
fn send(manager: &TableOrderManager<impl OrderStore>, table: u32, lines: Vec<OrderLine>) -> OrderResult<OpenOrGrow> {
    let total = shared::order::lines_total(&lines).unwrap();
    manager.open_or_grow(TableNumber(table), lines, total)
}

fn drain(rx: &mut broadcast::Receiver<TableEvent>) -> Vec<TableEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ========================================================================
// Fault injection: a store whose writes fail while `failures` > 0
// ========================================================================

struct FlakyStore {
    inner: OrderStorage,
    failures: AtomicU32,
    write_calls: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: OrderStorage::open_in_memory().unwrap(),
            failures: AtomicU32::new(failures),
            write_calls: AtomicU32::new(0),
        }
    }

    fn maybe_fail(&self) -> StoreResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(StorageError::Io(
                std::io::Error::other("injected failure"),
            )));
        }
        Ok(())
    }
}

impl OrderStore for FlakyStore {
    fn get_active_order(&self, table: TableNumber) -> StoreResult<Option<TableOrder>> {
        self.inner.get_active_order(table)
    }

    fn create_active_order(
        &self,
        table: TableNumber,
        lines: Vec<OrderLine>,
        total: Decimal,
    ) -> StoreResult<TableOrder> {
        self.maybe_fail()?;
        self.inner.create_active_order(table, lines, total)
    }

    fn append_lines(
        &self,
        order_id: &str,
        lines: Vec<OrderLine>,
        total_delta: Decimal,
    ) -> StoreResult<TableOrder> {
        self.maybe_fail()?;
        self.inner.append_lines(order_id, lines, total_delta)
    }

    fn deactivate_order(&self, table: TableNumber) -> StoreResult<TableOrder> {
        self.maybe_fail()?;
        self.inner.deactivate_order(table)
    }

    fn list_active_orders(&self) -> StoreResult<BTreeMap<TableNumber, TableOrder>> {
        self.inner.list_active_orders()
    }

    fn transfer_order(&self, source: TableNumber, target: TableNumber) -> StoreResult<TableOrder> {
        self.maybe_fail()?;
        self.inner.transfer_order(source, target)
    }
}

mod test_concurrency;
mod test_core;
mod test_property;
