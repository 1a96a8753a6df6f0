//! 桌台结账
//!
//! ```text
//! settle_table(table, payment)
//!     ├─ 1. Lock table, settle payment against the order total
//!     ├─ 2. Close the table (same lock, payment already accepted)
//!     └─ 3. Record the sale (retried; id derived from the order)
//! ```
//!
//! A rejected payment leaves the table open. Once the table is closed the
//! sale id is fixed, so recording it again is harmless.

use super::CartError;
use crate::orders::{OrderStorage, OrderStore, RetryPolicy, TableOrderManager};
use crate::sales::SaleSink;
use shared::models::{Payment, PaymentInput, Sale, SaleSource};
use shared::order::{TableNumber, TableOrder};
use shared::util::stable_id;
use std::sync::Arc;

pub struct Checkout<S: OrderStore = OrderStorage> {
    manager: Arc<TableOrderManager<S>>,
    sales: Arc<dyn SaleSink>,
    retry: RetryPolicy,
}

impl<S: OrderStore> std::fmt::Debug for Checkout<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("manager", &self.manager)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Sale id of a closed table order
pub fn table_sale_id(order: &TableOrder) -> i64 {
    stable_id(&order.order_id, order.start_time)
}

impl<S: OrderStore> Checkout<S> {
    pub fn new(manager: Arc<TableOrderManager<S>>, sales: Arc<dyn SaleSink>, retry: RetryPolicy) -> Self {
        Self {
            manager,
            sales,
            retry,
        }
    }

    /// Pay for and close a table
    pub async fn settle_table(
        &self,
        table: TableNumber,
        input: &PaymentInput,
    ) -> Result<Sale, CartError> {
        let (order, payment) = self.manager.close_with(table, |order| {
            Payment::settle(input, order.total).map_err(CartError::from)
        })?;

        let mut sale = Sale::new(table_sale_id(&order), SaleSource::Table, order.lines.clone(), payment);
        sale.order_id = Some(order.order_id.clone());
        sale.table_number = Some(table.get());

        if let Err(e) = self.retry.run(|| self.sales.record_sale(&sale)).await {
            // 桌台已关闭但销售未落盘
            tracing::error!(
                table = %table,
                order_id = %order.order_id,
                sale_id = sale.sale_id,
                total = %sale.total,
                error = %e,
                "Table closed but sale was not recorded"
            );
            return Err(e.into());
        }

        tracing::info!(table = %table, order_id = %order.order_id, sale_id = sale.sale_id, "Table settled");
        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderError;
    use crate::sales::{SaleError, SalesStorage};
    use rust_decimal::Decimal;
    use shared::models::PaymentError;
    use shared::order::OrderLine;

    fn line(product_id: i64, name: &str, price: i64, quantity: u32) -> OrderLine {
        OrderLine {
            product_id,
            name: name.to_string(),
            category_id: 1,
            size: None,
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    fn setup() -> (Arc<TableOrderManager>, Arc<SalesStorage>, Checkout) {
        let store = Arc::new(OrderStorage::open_in_memory().unwrap());
        let manager = Arc::new(TableOrderManager::new(store, 50));
        let sales = Arc::new(SalesStorage::open_in_memory().unwrap());
        let checkout = Checkout::new(manager.clone(), sales.clone(), RetryPolicy::none());
        (manager, sales, checkout)
    }

    #[tokio::test]
    async fn test_settle_closes_table_and_records_sale() {
        let (manager, sales, checkout) = setup();
        manager
            .open_or_grow(TableNumber(7), vec![line(1, "Coffee", 30, 2)], Decimal::from(60))
            .unwrap();
        manager
            .open_or_grow(TableNumber(7), vec![line(2, "Cake", 45, 1)], Decimal::from(45))
            .unwrap();

        let sale = checkout
            .settle_table(TableNumber(7), &PaymentInput::Cash { tendered: Decimal::from(200) })
            .await
            .unwrap();

        assert_eq!(sale.total, Decimal::from(105));
        assert_eq!(sale.payment.change, Decimal::from(95));
        assert_eq!(sale.source, SaleSource::Table);
        assert_eq!(sale.table_number, Some(7));
        assert!(manager.get(TableNumber(7)).unwrap().is_none());

        let order_id = sale.order_id.clone().unwrap();
        assert_eq!(sales.find_by_order(&order_id).unwrap(), Some(sale));
    }

    #[tokio::test]
    async fn test_rejected_payment_keeps_table_open() {
        let (manager, sales, checkout) = setup();
        manager
            .open_or_grow(TableNumber(3), vec![line(1, "Coffee", 30, 2)], Decimal::from(60))
            .unwrap();

        let err = checkout
            .settle_table(TableNumber(3), &PaymentInput::Cash { tendered: Decimal::from(50) })
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Payment(PaymentError::InsufficientCash { .. })));
        assert!(manager.get(TableNumber(3)).unwrap().is_some());
        assert!(sales.list_recent(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settle_empty_table() {
        let (_manager, _sales, checkout) = setup();
        let err = checkout
            .settle_table(TableNumber(4), &PaymentInput::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Order(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sale_id_is_stable_per_order() {
        let (manager, sales, checkout) = setup();
        manager
            .open_or_grow(TableNumber(9), vec![line(1, "Coffee", 30, 1)], Decimal::from(30))
            .unwrap();
        let sale = checkout
            .settle_table(TableNumber(9), &PaymentInput::Card)
            .await
            .unwrap();

        // recording the same settlement again stores nothing new
        sales.record_sale(&sale).unwrap();
        assert_eq!(sales.list_recent(10).unwrap().len(), 1);

        let order_id = sale.order_id.clone().unwrap();
        let mut other = sale.clone();
        other.sale_id += 1;
        assert!(matches!(
            sales.record_sale(&other),
            Err(SaleError::AlreadySettled { existing, .. }) if existing == sale.sale_id
        ));
        assert_eq!(sales.find_by_order(&order_id).unwrap().unwrap().sale_id, sale.sale_id);
    }
}
