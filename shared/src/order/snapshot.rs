//! Table order snapshot
//!
//! A `TableOrder` is the full state of one table's order. It is what the
//! store persists, what the manager returns, and what observers mirror.

use super::types::{OrderLine, TableNumber, TotalOverflow, lines_total};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOrder {
    /// Order ID (UUID v4, assigned on creation, kept across transfers)
    pub order_id: String,
    pub table_number: TableNumber,
    pub lines: Vec<OrderLine>,
    /// Always Σ line totals
    pub total: Decimal,
    /// 开台时间
    pub start_time: i64,
    pub updated_at: i64,
    pub active: bool,
}

impl TableOrder {
    pub fn new(
        order_id: impl Into<String>,
        table_number: TableNumber,
        lines: Vec<OrderLine>,
    ) -> Result<Self, TotalOverflow> {
        let now = crate::util::now_millis();
        let total = lines_total(&lines).ok_or(TotalOverflow)?;
        Ok(Self {
            order_id: order_id.into(),
            table_number,
            lines,
            total,
            start_time: now,
            updated_at: now,
            active: true,
        })
    }

    /// Append lines and recompute the total. On overflow nothing changes.
    pub fn append(&mut self, lines: &[OrderLine]) -> Result<(), TotalOverflow> {
        let added = lines_total(lines).ok_or(TotalOverflow)?;
        self.total = self.total.checked_add(added).ok_or(TotalOverflow)?;
        self.lines.extend_from_slice(lines);
        self.updated_at = crate::util::now_millis();
        Ok(())
    }

    /// Whether the stored total matches the lines
    pub fn is_consistent(&self) -> bool {
        lines_total(&self.lines) == Some(self.total)
    }

    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |n, l| n.saturating_add(l.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: u32, price: i64) -> OrderLine {
        OrderLine {
            product_id,
            name: format!("P{}", product_id),
            category_id: 1,
            size: None,
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    #[test]
    fn test_new_computes_total() {
        let order = TableOrder::new("o-1", TableNumber(12), vec![line(1, 2, 30)]).unwrap();
        assert_eq!(order.total, Decimal::from(60));
        assert!(order.active);
        assert_eq!(order.start_time, order.updated_at);
        assert!(order.is_consistent());
    }

    #[test]
    fn test_append_keeps_total_consistent() {
        let mut order = TableOrder::new("o-1", TableNumber(12), vec![line(1, 2, 30)]).unwrap();
        let start = order.start_time;
        order.append(&[line(2, 1, 45)]).unwrap();
        assert_eq!(order.total, Decimal::from(105));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.start_time, start);
        assert!(order.is_consistent());
    }

    #[test]
    fn test_append_overflow_leaves_order_untouched() {
        let mut order = TableOrder::new("o-1", TableNumber(12), vec![line(1, 1, 30)]).unwrap();
        let mut huge = line(2, 1, 0);
        huge.unit_price = Decimal::MAX;
        assert_eq!(order.append(&[huge.clone()]), Err(TotalOverflow));
        assert_eq!(order.total, Decimal::from(30));
        assert_eq!(order.lines.len(), 1);

        assert_eq!(
            TableOrder::new("o-2", TableNumber(3), vec![huge.clone(), huge]).unwrap_err(),
            TotalOverflow
        );
    }
}
