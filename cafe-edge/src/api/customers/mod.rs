//! Customer Tab API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/customers | GET | 客户列表 |
//! | /api/customers | POST | 新建客户 |
//! | /api/customers/{id}/orders | GET | 客户挂账单 + 未结金额 |
//! | /api/customers/orders/{id}/settle | POST | 结清一张挂账单 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/customers", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}/orders", get(handler::list_orders))
        .route("/orders/{id}/settle", post(handler::settle))
}
