//! 桌台订单
//!
//! # 模块结构
//!
//! - [`store`] - Order store contract (`OrderStore`)
//! - [`storage`] - redb implementation (`OrderStorage`)
//! - [`manager`] - Business rules, per-table locking, event emission
//! - [`locks`] - Per-table mutexes
//! - [`retry`] - Caller-side retry policy
//! - [`validation`] - Input checks run before any lock is taken

pub mod locks;
pub mod manager;
pub mod retry;
pub mod storage;
pub mod store;
pub mod validation;

pub use manager::{
    ErrorKind, OpenOrGrow, OpenOrGrowKind, OrderError, OrderResult, TableOrderManager,
    TransferRejection,
};
pub use retry::{RetryPolicy, Retryable};
pub use storage::OrderStorage;
pub use store::{OrderStore, StoreError, StoreResult};
