//! Catalog API 模块 (只读)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/catalog", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/categories", get(handler::list_categories))
        .route("/products", get(handler::list_products))
        .route("/products/{id}", get(handler::get_product))
}
