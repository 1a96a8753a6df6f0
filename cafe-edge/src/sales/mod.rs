//! 销售记录
//!
//! A [`Sale`] is written once when a payment completes and never changes
//! afterwards. Every finalization path (direct checkout, table settlement,
//! customer tab settlement) ends in [`SaleSink::record_sale`].
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `sales` | `sale_id` | `Sale` (JSON) |
//! | `sale_order_index` | `order_id` | `sale_id` |
//!
//! Recording is idempotent by sale id: a table settlement derives its sale id
//! from the order, so recording the same settlement twice stores one sale.
//! A different sale under a taken id is refused with [`SaleError::IdConflict`].

use crate::db::{self, StorageError, StorageResult};
use crate::orders::Retryable;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::error::{AppError, ErrorCode};
use shared::models::Sale;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const SALES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("sales");

const SALE_ORDER_INDEX: TableDefinition<&str, i64> = TableDefinition::new("sale_order_index");

/// Upper bound for `list_recent`
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum SaleError {
    #[error("Sale store unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("Order {order_id} already settled by sale {existing}")]
    AlreadySettled { order_id: String, existing: i64 },

    #[error("Sale {0} not found")]
    NotFound(i64),

    #[error("Sale id {0} is already taken by a different sale")]
    IdConflict(i64),

    #[error("Recording sale timed out after {0:?}")]
    Timeout(Duration),
}

impl Retryable for SaleError {
    fn is_retryable(&self) -> bool {
        matches!(self, SaleError::Storage(_))
    }

    fn timed_out(timeout: Duration) -> Self {
        SaleError::Timeout(timeout)
    }
}

impl From<SaleError> for AppError {
    fn from(err: SaleError) -> Self {
        let message = err.to_string();
        match err {
            SaleError::Storage(_) => AppError::with_message(ErrorCode::StoreUnavailable, message),
            SaleError::AlreadySettled { order_id, existing } => {
                AppError::with_message(ErrorCode::AlreadyExists, message)
                    .with_detail("order_id", order_id)
                    .with_detail("sale_id", existing)
            }
            SaleError::NotFound(id) => {
                AppError::with_message(ErrorCode::SaleNotFound, message).with_detail("sale_id", id)
            }
            SaleError::IdConflict(id) => {
                AppError::with_message(ErrorCode::AlreadyExists, message).with_detail("sale_id", id)
            }
            SaleError::Timeout(_) => AppError::with_message(ErrorCode::TimeoutError, message),
        }
    }
}

/// Where finalized sales go
pub trait SaleSink: Send + Sync {
    fn record_sale(&self, sale: &Sale) -> Result<(), SaleError>;
}

/// Sales backed by redb
#[derive(Clone)]
pub struct SalesStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for SalesStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesStorage").finish_non_exhaustive()
    }
}

impl SalesStorage {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SALES_TABLE)?;
            let _ = write_txn.open_table(SALE_ORDER_INDEX)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::new(db::open_in_memory()?)
    }

    pub fn get(&self, sale_id: i64) -> Result<Sale, SaleError> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(SALES_TABLE).map_err(StorageError::from)?;
        let guard = table.get(sale_id).map_err(StorageError::from)?;
        match guard {
            Some(g) => Ok(serde_json::from_slice(g.value()).map_err(StorageError::from)?),
            None => Err(SaleError::NotFound(sale_id)),
        }
    }

    /// Sale that settled the given table order, if any
    pub fn find_by_order(&self, order_id: &str) -> Result<Option<Sale>, SaleError> {
        let sale_id = {
            let read_txn = self.db.begin_read().map_err(StorageError::from)?;
            let index = read_txn
                .open_table(SALE_ORDER_INDEX)
                .map_err(StorageError::from)?;
            let guard = index.get(order_id).map_err(StorageError::from)?;
            guard.map(|g| g.value())
        };
        match sale_id {
            Some(id) => self.get(id).map(Some),
            None => Ok(None),
        }
    }

    /// Newest first. Sale ids are time ordered.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Sale>, SaleError> {
        let limit = limit.min(MAX_LIST_LIMIT);
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(SALES_TABLE).map_err(StorageError::from)?;

        let mut sales = Vec::with_capacity(limit);
        for entry in table.iter().map_err(StorageError::from)?.rev().take(limit) {
            let (_, value) = entry.map_err(StorageError::from)?;
            sales.push(serde_json::from_slice(value.value()).map_err(StorageError::from)?);
        }
        Ok(sales)
    }
}

impl SaleSink for SalesStorage {
    fn record_sale(&self, sale: &Sale) -> Result<(), SaleError> {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut sales = txn.open_table(SALES_TABLE).map_err(StorageError::from)?;
            let stored = sales
                .get(sale.sale_id)
                .map_err(StorageError::from)?
                .map(|g| serde_json::from_slice::<Sale>(g.value()))
                .transpose()
                .map_err(StorageError::from)?;
            if let Some(stored) = stored {
                if stored.same_record(sale) {
                    tracing::debug!(sale_id = sale.sale_id, "Sale already recorded");
                    return Ok(());
                }
                tracing::warn!(
                    sale_id = sale.sale_id,
                    stored_total = %stored.total,
                    total = %sale.total,
                    "Sale id already taken by a different sale"
                );
                return Err(SaleError::IdConflict(sale.sale_id));
            }

            if let Some(order_id) = &sale.order_id {
                let mut index = txn
                    .open_table(SALE_ORDER_INDEX)
                    .map_err(StorageError::from)?;
                let existing = index
                    .get(order_id.as_str())
                    .map_err(StorageError::from)?
                    .map(|g| g.value());
                if let Some(existing) = existing {
                    return Err(SaleError::AlreadySettled {
                        order_id: order_id.clone(),
                        existing,
                    });
                }
                index
                    .insert(order_id.as_str(), sale.sale_id)
                    .map_err(StorageError::from)?;
            }

            let value = serde_json::to_vec(sale).map_err(StorageError::from)?;
            sales
                .insert(sale.sale_id, value.as_slice())
                .map_err(StorageError::from)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            sale_id = sale.sale_id,
            source = ?sale.source,
            total = %sale.total,
            method = ?sale.payment.method,
            "Sale recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{Payment, PaymentInput, SaleSource};
    use shared::order::OrderLine;

    fn sale(sale_id: i64, order_id: Option<&str>) -> Sale {
        let items = vec![OrderLine {
            product_id: 1,
            name: "Coffee".to_string(),
            category_id: 1,
            size: None,
            quantity: 2,
            unit_price: Decimal::from(30),
        }];
        let payment = Payment::settle(&PaymentInput::Card, Decimal::from(60)).unwrap();
        let mut sale = Sale::new(sale_id, SaleSource::Direct, items, payment);
        sale.order_id = order_id.map(str::to_string);
        sale
    }

    #[test]
    fn test_record_and_get() {
        let storage = SalesStorage::open_in_memory().unwrap();
        let s = sale(100, None);
        storage.record_sale(&s).unwrap();
        assert_eq!(storage.get(100).unwrap(), s);
        assert!(matches!(storage.get(7), Err(SaleError::NotFound(7))));
    }

    #[test]
    fn test_record_same_sale_twice_is_idempotent() {
        let storage = SalesStorage::open_in_memory().unwrap();
        let s = sale(100, Some("order-1"));
        storage.record_sale(&s).unwrap();
        storage.record_sale(&s).unwrap();
        assert_eq!(storage.list_recent(10).unwrap().len(), 1);
        assert_eq!(storage.find_by_order("order-1").unwrap(), Some(s));
    }

    #[test]
    fn test_different_sale_under_taken_id_is_refused() {
        let storage = SalesStorage::open_in_memory().unwrap();
        let first = sale(42, None);
        storage.record_sale(&first).unwrap();

        let mut other = sale(42, None);
        other.payment = Payment::settle(&PaymentInput::Card, Decimal::from(45)).unwrap();
        other.total = Decimal::from(45);
        let err = storage.record_sale(&other).unwrap_err();
        assert!(matches!(err, SaleError::IdConflict(42)));
        assert!(!err.is_retryable());
        assert_eq!(storage.get(42).unwrap(), first);

        // a later copy of the same sale is still accepted
        let mut again = first.clone();
        again.created_at += 1;
        storage.record_sale(&again).unwrap();
        assert_eq!(storage.get(42).unwrap(), first);

        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::AlreadyExists);
    }

    #[test]
    fn test_order_settles_once() {
        let storage = SalesStorage::open_in_memory().unwrap();
        storage.record_sale(&sale(100, Some("order-1"))).unwrap();
        let err = storage.record_sale(&sale(101, Some("order-1"))).unwrap_err();
        assert!(matches!(err, SaleError::AlreadySettled { existing: 100, .. }));
        assert!(matches!(storage.get(101), Err(SaleError::NotFound(_))));
    }

    #[test]
    fn test_list_recent_newest_first() {
        let storage = SalesStorage::open_in_memory().unwrap();
        for id in [10, 30, 20] {
            storage.record_sale(&sale(id, None)).unwrap();
        }
        let ids: Vec<_> = storage
            .list_recent(2)
            .unwrap()
            .iter()
            .map(|s| s.sale_id)
            .collect();
        assert_eq!(ids, vec![30, 20]);
    }

    #[test]
    fn test_error_codes() {
        let err: AppError = SaleError::NotFound(5).into();
        assert_eq!(err.code, ErrorCode::SaleNotFound);
        assert_eq!(err.http_status(), http::StatusCode::NOT_FOUND);
        assert!(SaleError::Storage(StorageError::Io(std::io::Error::other("x"))).is_retryable());
        assert!(!SaleError::NotFound(1).is_retryable());
    }
}
