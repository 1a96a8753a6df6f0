//! Shared order value types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Table Number
// ============================================================================

/// 桌号. Valid range is `1..=table_count`, checked by the order manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableNumber(pub u32);

impl TableNumber {
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn in_range(self, table_count: u32) -> bool {
        (1..=table_count).contains(&self.0)
    }
}

impl fmt::Display for TableNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableNumber {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

// ============================================================================
// Order Line
// ============================================================================

/// Line identity: the same product at two sizes is two lines
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl LineKey {
    pub fn new(product_id: i64, size: Option<String>) -> Self {
        Self { product_id, size }
    }
}

/// One line of a cart or table order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub category_id: i64,
    /// Size variant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: u32,
    /// Unit price captured when the line was added
    pub unit_price: Decimal,
}

impl OrderLine {
    /// `unit_price × quantity`, `None` when it does not fit a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.size.clone())
    }

    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size
    }
}

/// An order total that no longer fits a `Decimal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order total is out of range")]
pub struct TotalOverflow;

/// Σ line totals, `None` on overflow
pub fn lines_total(lines: &[OrderLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
}
