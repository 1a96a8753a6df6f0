//! 收银台购物车与结账
//!
//! - [`session`] - One terminal's cart and its three finalization paths
//! - [`registry`] - Carts by terminal id
//! - [`checkout`] - Table settlement (close + sale)

pub mod checkout;
pub mod registry;
pub mod session;

pub use checkout::Checkout;
pub use registry::CartRegistry;
pub use session::{CartSession, CartView};

use crate::catalog::CatalogError;
use crate::customers::CustomerError;
use crate::orders::{OrderError, Retryable};
use crate::sales::SaleError;
use shared::error::{AppError, ErrorCode};
use shared::models::PaymentError;
use shared::order::LineKey;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart has already been finalized")]
    Finalized,

    #[error("Cart is empty")]
    Empty,

    #[error("No line for product {} (size {:?})", .0.product_id, .0.size)]
    LineNotFound(LineKey),

    #[error("Product {product_id} has no size '{size}'")]
    UnknownSize { product_id: i64, size: String },

    #[error("Product {0} is not available")]
    ProductInactive(i64),

    #[error("Invalid quantity {0}")]
    InvalidQuantity(i64),

    #[error("Cart total is out of range")]
    TotalOutOfRange,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Sale(#[from] SaleError),

    #[error(transparent)]
    Customer(#[from] CustomerError),
}

impl Retryable for CartError {
    fn is_retryable(&self) -> bool {
        match self {
            CartError::Order(e) => e.is_retryable(),
            CartError::Sale(e) => Retryable::is_retryable(e),
            _ => false,
        }
    }

    fn timed_out(timeout: Duration) -> Self {
        CartError::Order(OrderError::Timeout(timeout))
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        let message = err.to_string();
        match err {
            CartError::Finalized => AppError::with_message(ErrorCode::CartFinalized, message),
            CartError::Empty => AppError::with_message(ErrorCode::CartEmpty, message),
            CartError::LineNotFound(key) => {
                let app = AppError::with_message(ErrorCode::CartLineNotFound, message)
                    .with_detail("product_id", key.product_id);
                match key.size {
                    Some(size) => app.with_detail("size", size),
                    None => app,
                }
            }
            CartError::UnknownSize { product_id, size } => {
                AppError::with_message(ErrorCode::ProductSizeNotFound, message)
                    .with_detail("product_id", product_id)
                    .with_detail("size", size)
            }
            CartError::ProductInactive(id) => {
                AppError::with_message(ErrorCode::ProductInactive, message).with_detail("product_id", id)
            }
            CartError::InvalidQuantity(_) | CartError::TotalOutOfRange => AppError::validation(message),
            CartError::Catalog(e) => e.into(),
            CartError::Order(e) => e.into(),
            CartError::Payment(e) => e.into(),
            CartError::Sale(e) => e.into(),
            CartError::Customer(e) => e.into(),
        }
    }
}
