//! Sale and payment models
//!
//! A [`Sale`] is the immutable record of a completed transaction. It is produced
//! by one of three paths: a direct cart checkout, a table settlement, or a
//! customer tab settlement.

use crate::order::OrderLine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// 现金 + 刷卡混合
    Mixed,
}

/// What the cashier entered at the payment screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentInput {
    Cash { tendered: Decimal },
    Card,
    Mixed { cash: Decimal, card: Decimal },
}

/// Settled payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub cash_amount: Decimal,
    pub card_amount: Decimal,
    /// Cash handed over by the customer
    pub tendered: Decimal,
    /// Change returned (找零)
    pub change: Decimal,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    #[error("Payment total must be positive, got {0}")]
    NonPositiveTotal(Decimal),

    #[error("Tendered cash {tendered} is less than total {total}")]
    InsufficientCash { tendered: Decimal, total: Decimal },

    #[error("Mixed payment requires both cash and card parts to be positive")]
    InvalidSplit,

    #[error("Mixed payment {cash} + {card} does not match total {total}")]
    SplitMismatch {
        cash: Decimal,
        card: Decimal,
        total: Decimal,
    },
}

impl From<PaymentError> for crate::error::AppError {
    fn from(err: PaymentError) -> Self {
        use crate::error::ErrorCode;
        let code = match err {
            PaymentError::NonPositiveTotal(_) => ErrorCode::ValueOutOfRange,
            PaymentError::InsufficientCash { .. } => ErrorCode::PaymentInsufficientAmount,
            PaymentError::InvalidSplit => ErrorCode::PaymentInvalidMethod,
            PaymentError::SplitMismatch { .. } => ErrorCode::PaymentSplitMismatch,
        };
        Self::with_message(code, err.to_string())
    }
}

impl Payment {
    /// Settle a payment input against a total
    pub fn settle(input: &PaymentInput, total: Decimal) -> Result<Self, PaymentError> {
        if total <= Decimal::ZERO {
            return Err(PaymentError::NonPositiveTotal(total));
        }

        match *input {
            PaymentInput::Cash { tendered } => {
                if tendered < total {
                    return Err(PaymentError::InsufficientCash { tendered, total });
                }
                Ok(Self {
                    method: PaymentMethod::Cash,
                    cash_amount: total,
                    card_amount: Decimal::ZERO,
                    tendered,
                    change: tendered - total,
                })
            }
            PaymentInput::Card => Ok(Self {
                method: PaymentMethod::Card,
                cash_amount: Decimal::ZERO,
                card_amount: total,
                tendered: Decimal::ZERO,
                change: Decimal::ZERO,
            }),
            PaymentInput::Mixed { cash, card } => {
                if cash <= Decimal::ZERO || card <= Decimal::ZERO {
                    return Err(PaymentError::InvalidSplit);
                }
                if cash.checked_add(card) != Some(total) {
                    return Err(PaymentError::SplitMismatch { cash, card, total });
                }
                Ok(Self {
                    method: PaymentMethod::Mixed,
                    cash_amount: cash,
                    card_amount: card,
                    tendered: cash,
                    change: Decimal::ZERO,
                })
            }
        }
    }

    /// Amount actually kept by the shop
    pub fn collected(&self) -> Decimal {
        self.cash_amount + self.card_amount
    }
}

/// Where a sale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleSource {
    /// 收银台直接结账
    Direct,
    /// 桌台结账
    Table,
    /// 客户挂账结清
    CustomerTab,
}

/// Immutable sale record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub sale_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub payment: Payment,
    pub source: SaleSource,
    pub created_at: i64,
}

impl Sale {
    /// Build a sale; the total is what the payment settled
    pub fn new(sale_id: i64, source: SaleSource, items: Vec<OrderLine>, payment: Payment) -> Self {
        let total = payment.collected();
        Self {
            sale_id,
            order_id: None,
            table_number: None,
            customer_id: None,
            items,
            total,
            payment,
            source,
            created_at: crate::util::now_millis(),
        }
    }

    /// Same transaction, ignoring when this copy was built
    pub fn same_record(&self, other: &Sale) -> bool {
        self.sale_id == other.sale_id
            && self.order_id == other.order_id
            && self.table_number == other.table_number
            && self.customer_id == other.customer_id
            && self.items == other.items
            && self.total == other.total
            && self.payment == other.payment
            && self.source == other.source
    }
}
