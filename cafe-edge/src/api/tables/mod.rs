//! Table Order API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/tables | GET | 所有在用桌台 |
//! | /api/tables/{n} | GET | 单桌状态 |
//! | /api/tables/{n}/lines | POST | 送单 (开台或加菜) |
//! | /api/tables/{n}/close | POST | 关台 (不产生销售) |
//! | /api/tables/{n}/settle | POST | 结账 (关台 + 销售) |
//! | /api/tables/transfer | POST | 转台 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/transfer", post(handler::transfer))
        .route("/{n}", get(handler::get_by_number))
        .route("/{n}/lines", post(handler::add_lines))
        .route("/{n}/close", post(handler::close))
        .route("/{n}/settle", post(handler::settle))
}
