//! Catalog API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{Category, Product};

use crate::catalog::Catalog;
use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<i64>,
}

/// GET /api/catalog/categories - 按排序返回分类
pub async fn list_categories(State(state): State<ServerState>) -> Json<Vec<Category>> {
    Json(state.catalog.list_categories())
}

/// GET /api/catalog/products?category_id= - 商品列表
pub async fn list_products(
    State(state): State<ServerState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    let products = match query.category_id {
        Some(category_id) => state.catalog.get_products_by_category(category_id),
        None => state.catalog.list_products(),
    };
    Json(products)
}

/// GET /api/catalog/products/{id}
pub async fn get_product(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.catalog.get_product(id)?))
}
