//! Cart API 模块
//!
//! One cart per terminal id (`pos-1`, `tablet-3`, ...).
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/carts/{terminal} | GET | 当前购物车 |
//! | /api/carts/{terminal} | DELETE | 清空 |
//! | /api/carts/{terminal}/items | POST | 加商品 |
//! | /api/carts/{terminal}/lines | PUT | 改数量 (<= 0 删除) |
//! | /api/carts/{terminal}/lines | DELETE | 删除行 |
//! | /api/carts/{terminal}/checkout | POST | 结账 / 送单 / 挂账 |

mod handler;

pub use handler::{CheckoutRequest, CheckoutResponse};

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/carts", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{terminal}", get(handler::get_cart).delete(handler::clear))
        .route("/{terminal}/items", post(handler::add_item))
        .route(
            "/{terminal}/lines",
            axum::routing::put(handler::set_quantity).delete(handler::remove_line),
        )
        .route("/{terminal}/checkout", post(handler::checkout))
}
