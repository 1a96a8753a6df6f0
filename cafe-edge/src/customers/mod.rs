//! 挂账客户
//!
//! Customers with a tab: a cart can be put on a customer's tab instead of
//! being paid (an unpaid [`CustomerOrder`]), and settled later. Settling
//! records a [`Sale`] and marks the order paid.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `customers` | `customer_id` | `Customer` (JSON) |
//! | `customer_orders` | `order_id` | `CustomerOrder` (JSON) |
//! | `customer_order_index` | `(customer_id, order_id)` | `()` |

use crate::db::{self, StorageError, StorageResult};
use crate::orders::OrderError;
use crate::orders::validation::validate_lines;
use crate::sales::{SaleError, SaleSink};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Customer, CustomerCreate, CustomerOrder, CustomerOrderStatus, Payment, PaymentError,
    PaymentInput, Sale, SaleSource,
};
use shared::order::OrderLine;
use shared::util::{now_millis, snowflake_id, stable_id};
use std::sync::Arc;
use thiserror::Error;

const CUSTOMERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("customers");

const CUSTOMER_ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("customer_orders");

const CUSTOMER_ORDER_INDEX: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("customer_order_index");

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Customer {0} not found")]
    CustomerNotFound(i64),

    #[error("Customer order {0} not found")]
    OrderNotFound(i64),

    #[error("Customer order {0} is already paid")]
    AlreadyPaid(i64),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Sale(#[from] SaleError),

    #[error("Customer store unavailable: {0}")]
    Storage(#[from] StorageError),
}

impl From<CustomerError> for AppError {
    fn from(err: CustomerError) -> Self {
        let message = err.to_string();
        match err {
            CustomerError::Validation(_) => AppError::validation(message),
            CustomerError::CustomerNotFound(id) => {
                AppError::with_message(ErrorCode::CustomerNotFound, message)
                    .with_detail("customer_id", id)
            }
            CustomerError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::CustomerOrderNotFound, message)
                    .with_detail("order_id", id)
            }
            CustomerError::AlreadyPaid(id) => {
                AppError::with_message(ErrorCode::CustomerOrderAlreadyPaid, message)
                    .with_detail("order_id", id)
            }
            CustomerError::Payment(e) => e.into(),
            CustomerError::Sale(e) => e.into(),
            CustomerError::Storage(_) => AppError::with_message(ErrorCode::StoreUnavailable, message),
        }
    }
}

/// Customer-tab collaborator used by the cart
pub trait CustomerTabs: Send + Sync {
    /// Put lines on a customer's tab as an unpaid order
    fn add_customer_order(
        &self,
        customer_id: i64,
        lines: Vec<OrderLine>,
        total: Decimal,
    ) -> Result<CustomerOrder, CustomerError>;
}

#[derive(Clone)]
pub struct CustomerStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for CustomerStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerStorage").finish_non_exhaustive()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CustomerError> {
    Ok(serde_json::from_slice(bytes).map_err(StorageError::from)?)
}

impl CustomerStorage {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CUSTOMERS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMER_ORDER_INDEX)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::new(db::open_in_memory()?)
    }

    pub fn create_customer(&self, data: CustomerCreate) -> Result<Customer, CustomerError> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(CustomerError::Validation("customer name is required".to_string()));
        }
        let customer = Customer {
            id: snowflake_id(),
            name: name.to_string(),
            phone: data.phone.filter(|p| !p.trim().is_empty()),
            created_at: now_millis(),
        };

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = txn.open_table(CUSTOMERS_TABLE).map_err(StorageError::from)?;
            let value = serde_json::to_vec(&customer).map_err(StorageError::from)?;
            table
                .insert(customer.id, value.as_slice())
                .map_err(StorageError::from)?;
        }
        txn.commit().map_err(StorageError::from)?;
        tracing::info!(customer_id = customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    pub fn get_customer(&self, customer_id: i64) -> Result<Customer, CustomerError> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn
            .open_table(CUSTOMERS_TABLE)
            .map_err(StorageError::from)?;
        let guard = table.get(customer_id).map_err(StorageError::from)?;
        match guard {
            Some(g) => read_json(g.value()),
            None => Err(CustomerError::CustomerNotFound(customer_id)),
        }
    }

    /// All customers, by name
    pub fn list_customers(&self) -> Result<Vec<Customer>, CustomerError> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn
            .open_table(CUSTOMERS_TABLE)
            .map_err(StorageError::from)?;
        let mut customers = Vec::new();
        for entry in table.iter().map_err(StorageError::from)? {
            let (_, value) = entry.map_err(StorageError::from)?;
            customers.push(read_json::<Customer>(value.value())?);
        }
        customers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(customers)
    }

    pub fn get_order(&self, order_id: i64) -> Result<CustomerOrder, CustomerError> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn
            .open_table(CUSTOMER_ORDERS_TABLE)
            .map_err(StorageError::from)?;
        let guard = table.get(order_id).map_err(StorageError::from)?;
        match guard {
            Some(g) => read_json(g.value()),
            None => Err(CustomerError::OrderNotFound(order_id)),
        }
    }

    /// A customer's orders, oldest first
    pub fn list_orders(&self, customer_id: i64) -> Result<Vec<CustomerOrder>, CustomerError> {
        self.get_customer(customer_id)?;

        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let index = read_txn
            .open_table(CUSTOMER_ORDER_INDEX)
            .map_err(StorageError::from)?;
        let orders = read_txn
            .open_table(CUSTOMER_ORDERS_TABLE)
            .map_err(StorageError::from)?;

        let mut result = Vec::new();
        let range = index
            .range((customer_id, i64::MIN)..=(customer_id, i64::MAX))
            .map_err(StorageError::from)?;
        for entry in range {
            let (key, _) = entry.map_err(StorageError::from)?;
            let (_, order_id) = key.value();
            if let Some(g) = orders.get(order_id).map_err(StorageError::from)? {
                result.push(read_json::<CustomerOrder>(g.value())?);
            }
        }
        Ok(result)
    }

    /// Sum of a customer's unpaid orders
    pub fn outstanding(&self, customer_id: i64) -> Result<Decimal, CustomerError> {
        self.list_orders(customer_id)?
            .iter()
            .filter(|o| !o.is_paid())
            .try_fold(Decimal::ZERO, |acc, o| acc.checked_add(o.total))
            .ok_or_else(|| {
                CustomerError::Validation(format!(
                    "outstanding balance of customer {} is out of range",
                    customer_id
                ))
            })
    }

    /// Settle an unpaid tab order: record the sale, then mark the order paid.
    ///
    /// The sale id is derived from the order, so a settle that failed after
    /// the sale was written can be repeated with the same payment.
    pub fn settle(
        &self,
        order_id: i64,
        input: &PaymentInput,
        sales: &dyn SaleSink,
    ) -> Result<(CustomerOrder, Sale), CustomerError> {
        let order = self.get_order(order_id)?;
        if order.is_paid() {
            return Err(CustomerError::AlreadyPaid(order_id));
        }

        let payment = Payment::settle(input, order.total)?;
        let sale_id = stable_id(&format!("customer-order-{}", order.id), order.created_at);
        let mut sale = Sale::new(sale_id, SaleSource::CustomerTab, order.lines.clone(), payment);
        sale.customer_id = Some(order.customer_id);
        sales.record_sale(&sale)?;

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let paid = {
            let mut table = txn
                .open_table(CUSTOMER_ORDERS_TABLE)
                .map_err(StorageError::from)?;
            let current = table
                .get(order_id)
                .map_err(StorageError::from)?
                .map(|g| g.value().to_vec());
            let Some(bytes) = current else {
                return Err(CustomerError::OrderNotFound(order_id));
            };
            let mut current: CustomerOrder = read_json(&bytes)?;
            if current.is_paid() {
                return Err(CustomerError::AlreadyPaid(order_id));
            }
            current.status = CustomerOrderStatus::Paid;
            current.paid_at = Some(now_millis());
            current.sale_id = Some(sale.sale_id);
            let value = serde_json::to_vec(&current).map_err(StorageError::from)?;
            table
                .insert(order_id, value.as_slice())
                .map_err(StorageError::from)?;
            current
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id, customer_id = paid.customer_id, sale_id = sale.sale_id, total = %paid.total, "Customer order settled");
        Ok((paid, sale))
    }
}

impl CustomerTabs for CustomerStorage {
    fn add_customer_order(
        &self,
        customer_id: i64,
        lines: Vec<OrderLine>,
        total: Decimal,
    ) -> Result<CustomerOrder, CustomerError> {
        validate_lines(&lines, total).map_err(|e| match e {
            OrderError::Validation(msg) => CustomerError::Validation(msg),
            other => CustomerError::Validation(other.to_string()),
        })?;
        self.get_customer(customer_id)?;

        let order = CustomerOrder {
            id: snowflake_id(),
            customer_id,
            lines,
            total,
            status: CustomerOrderStatus::Unpaid,
            created_at: now_millis(),
            paid_at: None,
            sale_id: None,
        };

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            // customer may have been removed between the check and here
            let customers = txn
                .open_table(CUSTOMERS_TABLE)
                .map_err(StorageError::from)?;
            if customers
                .get(customer_id)
                .map_err(StorageError::from)?
                .is_none()
            {
                return Err(CustomerError::CustomerNotFound(customer_id));
            }

            let mut orders = txn
                .open_table(CUSTOMER_ORDERS_TABLE)
                .map_err(StorageError::from)?;
            let value = serde_json::to_vec(&order).map_err(StorageError::from)?;
            orders
                .insert(order.id, value.as_slice())
                .map_err(StorageError::from)?;

            let mut index = txn
                .open_table(CUSTOMER_ORDER_INDEX)
                .map_err(StorageError::from)?;
            index
                .insert((customer_id, order.id), ())
                .map_err(StorageError::from)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(customer_id, order_id = order.id, total = %order.total, "Order added to customer tab");
        Ok(order)
    }
}
