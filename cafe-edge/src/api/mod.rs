//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`catalog`] - 菜单 (只读)
//! - [`tables`] - 桌台订单: 送单、关台、结账、转台
//! - [`carts`] - 收银终端购物车
//! - [`sales`] - 销售记录
//! - [`customers`] - 挂账客户
//!
//! Errors leave every handler as [`AppError`](crate::utils::AppError), which
//! renders as an `ApiResponse` envelope with the matching HTTP status.

pub mod carts;
pub mod catalog;
pub mod customers;
pub mod health;
pub mod sales;
pub mod tables;

use axum::Router;

use crate::core::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};

/// All routes, no middleware, no state
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(catalog::router())
        .merge(tables::router())
        .merge(carts::router())
        .merge(sales::router())
        .merge(customers::router())
}
