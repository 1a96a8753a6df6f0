use super::super::store::StoreError;
use shared::error::{AppError, ErrorCode};
use shared::order::TableNumber;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a transfer was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferRejection {
    SameTable,
    SourceEmpty,
    TargetOccupied,
}

impl fmt::Display for TransferRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameTable => write!(f, "source and target are the same table"),
            Self::SourceEmpty => write!(f, "source table has no active order"),
            Self::TargetOccupied => write!(f, "target table is occupied"),
        }
    }
}

/// Error class, used by callers to decide what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    StoreUnavailable,
}

/// Table order errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 桌台忙: the table already has an active order
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot transfer table {from} to {to}: {reason}")]
    InvalidTransfer {
        from: TableNumber,
        to: TableNumber,
        reason: TransferRejection,
    },

    #[error("Order store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Order submission timed out after {0:?}")]
    Timeout(Duration),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransfer { reason, .. } => match reason {
                TransferRejection::SameTable => ErrorKind::Validation,
                TransferRejection::SourceEmpty => ErrorKind::NotFound,
                TransferRejection::TargetOccupied => ErrorKind::Conflict,
            },
            Self::StoreUnavailable(_) | Self::Timeout(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Only a backend failure that did not commit is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::OutOfRange(msg) => Self::Validation(msg),
            unavailable @ StoreError::Unavailable(_) => Self::StoreUnavailable(unavailable),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::Validation(_) => AppError::with_message(ErrorCode::ValidationFailed, message),
            OrderError::Conflict(_) => AppError::with_message(ErrorCode::TableOccupied, message),
            OrderError::NotFound(_) => AppError::with_message(ErrorCode::TableEmpty, message),
            OrderError::InvalidTransfer { from, to, reason } => {
                let code = match reason {
                    TransferRejection::SameTable => ErrorCode::InvalidTransfer,
                    TransferRejection::SourceEmpty => ErrorCode::TableEmpty,
                    TransferRejection::TargetOccupied => ErrorCode::TableOccupied,
                };
                AppError::with_message(code, message)
                    .with_detail("source", from.get())
                    .with_detail("target", to.get())
            }
            OrderError::StoreUnavailable(_) => {
                tracing::error!(error = %message, "Order store unavailable");
                AppError::with_message(ErrorCode::StoreUnavailable, message)
            }
            OrderError::Timeout(_) => AppError::with_message(ErrorCode::TimeoutError, message),
        }
    }
}
