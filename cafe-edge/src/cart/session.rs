//! 购物车会话
//!
//! A cart collects lines at one terminal until it is finalized by exactly one
//! of three paths:
//!
//! ```text
//! Open --checkout_direct----> Finalized  (Sale, source Direct)
//! Open --send_to_table------> Finalized  (table order created or grown)
//! Open --attach_to_customer-> Finalized  (unpaid customer order)
//! ```
//!
//! A failed finalization leaves the cart as it was.

use super::CartError;
use crate::customers::CustomerTabs;
use crate::orders::{OpenOrGrow, OrderStore, RetryPolicy, TableOrderManager};
use crate::sales::{SaleError, SaleSink};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{CustomerOrder, Payment, PaymentInput, Product, Sale, SaleSource};
use shared::order::{LineKey, OrderLine, TableNumber, lines_total};
use shared::util::snowflake_id;

/// Fresh ids tried before a direct checkout gives up on an id collision
const DIRECT_SALE_ID_ATTEMPTS: u32 = 3;

/// Serializable view of a cart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub item_count: u32,
    pub finalized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CartSession {
    lines: Vec<OrderLine>,
    finalized: bool,
}

impl CartSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        if self.finalized {
            return Err(CartError::Finalized);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), CartError> {
        self.ensure_open()?;
        if self.lines.is_empty() {
            return Err(CartError::Empty);
        }
        Ok(())
    }

    fn total_in_range(&self) -> Result<(), CartError> {
        lines_total(&self.lines)
            .map(|_| ())
            .ok_or(CartError::TotalOutOfRange)
    }

    fn finish(&mut self) {
        self.lines.clear();
        self.finalized = true;
    }

    /// Add `quantity` of a product. The size picks the unit price and is part
    /// of the line identity.
    pub fn add_item(
        &mut self,
        product: &Product,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<&OrderLine, CartError> {
        self.ensure_open()?;
        if !product.is_active {
            return Err(CartError::ProductInactive(product.id));
        }
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        let unit_price = product
            .price_for(size)
            .ok_or_else(|| CartError::UnknownSize {
                product_id: product.id,
                size: size.unwrap_or_default().to_string(),
            })?;

        let key = LineKey::new(product.id, size.map(str::to_string));
        let index = match self.lines.iter().position(|l| l.matches(&key)) {
            Some(index) => {
                let previous = self.lines[index].quantity;
                self.lines[index].quantity = previous
                    .checked_add(quantity)
                    .ok_or(CartError::InvalidQuantity(i64::from(quantity)))?;
                if let Err(e) = self.total_in_range() {
                    self.lines[index].quantity = previous;
                    return Err(e);
                }
                index
            }
            None => {
                self.lines.push(OrderLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    category_id: product.category_id,
                    size: key.size,
                    quantity,
                    unit_price,
                });
                if let Err(e) = self.total_in_range() {
                    self.lines.pop();
                    return Err(e);
                }
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[index])
    }

    pub fn remove_line(&mut self, key: &LineKey) -> Result<OrderLine, CartError> {
        self.ensure_open()?;
        let index = self
            .lines
            .iter()
            .position(|l| l.matches(key))
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;
        Ok(self.lines.remove(index))
    }

    /// Set a line's quantity; zero or less removes the line.
    /// Returns the updated line, `None` when it was removed.
    pub fn set_quantity(
        &mut self,
        key: &LineKey,
        quantity: i64,
    ) -> Result<Option<&OrderLine>, CartError> {
        self.ensure_open()?;
        if quantity <= 0 {
            self.remove_line(key)?;
            return Ok(None);
        }
        let quantity = u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;
        let index = self
            .lines
            .iter()
            .position(|l| l.matches(key))
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;
        let previous = std::mem::replace(&mut self.lines[index].quantity, quantity);
        if let Err(e) = self.total_in_range() {
            self.lines[index].quantity = previous;
            return Err(e);
        }
        Ok(Some(&self.lines[index]))
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        self.ensure_open()?;
        self.lines.clear();
        Ok(())
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Every mutation keeps the total within range
    pub fn total(&self) -> Decimal {
        lines_total(&self.lines).unwrap_or_default()
    }

    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn view(&self) -> CartView {
        CartView {
            lines: self.lines.clone(),
            total: self.total(),
            item_count: self.item_count(),
            finalized: self.finalized,
        }
    }

    // ========== Finalization ==========

    /// 直接结账: settle the payment and record a sale
    pub fn checkout_direct(
        &mut self,
        input: &PaymentInput,
        sales: &dyn SaleSink,
    ) -> Result<Sale, CartError> {
        self.ensure_ready()?;
        let payment = Payment::settle(input, self.total())?;
        let mut sale = Sale::new(snowflake_id(), SaleSource::Direct, self.lines.clone(), payment);
        let mut attempt = 1;
        loop {
            match sales.record_sale(&sale) {
                Ok(()) => break,
                Err(SaleError::IdConflict(taken)) if attempt < DIRECT_SALE_ID_ATTEMPTS => {
                    sale.sale_id = snowflake_id();
                    tracing::warn!(taken, sale_id = sale.sale_id, "Sale id taken, retrying with a fresh id");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.finish();
        Ok(sale)
    }

    /// 送单到桌台: open the table or add to its running order
    pub async fn send_to_table<S: OrderStore>(
        &mut self,
        table: TableNumber,
        manager: &TableOrderManager<S>,
        retry: &RetryPolicy,
    ) -> Result<OpenOrGrow, CartError> {
        self.ensure_ready()?;
        let total = self.total();
        let lines = &self.lines;
        let result = retry
            .run(|| manager.open_or_grow(table, lines.clone(), total))
            .await?;

        self.finish();
        Ok(result)
    }

    /// 挂账: put the cart on a customer's tab as an unpaid order
    pub fn attach_to_customer(
        &mut self,
        customer_id: i64,
        tabs: &dyn CustomerTabs,
    ) -> Result<CustomerOrder, CartError> {
        self.ensure_ready()?;
        let order = tabs.add_customer_order(customer_id, self.lines.clone(), self.total())?;

        self.finish();
        Ok(order)
    }
}
