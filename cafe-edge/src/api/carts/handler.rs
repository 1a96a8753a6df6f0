//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::models::{CustomerOrder, PaymentInput, Sale};
use shared::order::{LineKey, TableNumber};

use crate::cart::{CartError, CartView};
use crate::catalog::Catalog;
use crate::core::ServerState;
use crate::orders::OpenOrGrow;
use crate::utils::AppResult;

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub product_id: i64,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i64,
}

/// 结账方式
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutRequest {
    /// 直接收款
    Sale { payment: PaymentInput },
    /// 送到桌台
    Table { table: TableNumber },
    /// 挂到客户账上
    Customer { customer_id: i64 },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutResponse {
    Sale { sale: Sale },
    Table { result: OpenOrGrow },
    Customer { order: CustomerOrder },
}

/// GET /api/carts/{terminal}
pub async fn get_cart(
    State(state): State<ServerState>,
    Path(terminal): Path<String>,
) -> Json<CartView> {
    Json(state.carts.open(&terminal).await.view())
}

/// DELETE /api/carts/{terminal} - 清空购物车
pub async fn clear(
    State(state): State<ServerState>,
    Path(terminal): Path<String>,
) -> AppResult<Json<CartView>> {
    let mut cart = state.carts.open(&terminal).await;
    cart.clear()?;
    Ok(Json(cart.view()))
}

/// POST /api/carts/{terminal}/items
pub async fn add_item(
    State(state): State<ServerState>,
    Path(terminal): Path<String>,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<CartView>> {
    let product = state
        .catalog
        .get_product(payload.product_id)
        .map_err(CartError::from)?;

    let mut cart = state.carts.open(&terminal).await;
    cart.add_item(&product, payload.size.as_deref(), payload.quantity)?;
    Ok(Json(cart.view()))
}

/// PUT /api/carts/{terminal}/lines - 改数量
pub async fn set_quantity(
    State(state): State<ServerState>,
    Path(terminal): Path<String>,
    Json(payload): Json<SetQuantityRequest>,
) -> AppResult<Json<CartView>> {
    let key = LineKey::new(payload.product_id, payload.size);
    let mut cart = state.carts.open(&terminal).await;
    cart.set_quantity(&key, payload.quantity)?;
    Ok(Json(cart.view()))
}

/// DELETE /api/carts/{terminal}/lines
pub async fn remove_line(
    State(state): State<ServerState>,
    Path(terminal): Path<String>,
    Json(key): Json<LineKey>,
) -> AppResult<Json<CartView>> {
    let mut cart = state.carts.open(&terminal).await;
    cart.remove_line(&key)?;
    Ok(Json(cart.view()))
}

/// POST /api/carts/{terminal}/checkout
pub async fn checkout(
    State(state): State<ServerState>,
    Path(terminal): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutResponse>> {
    let mut cart = state.carts.open(&terminal).await;

    let response = match request {
        CheckoutRequest::Sale { payment } => CheckoutResponse::Sale {
            sale: cart.checkout_direct(&payment, state.sales.as_ref())?,
        },
        CheckoutRequest::Table { table } => CheckoutResponse::Table {
            result: cart.send_to_table(table, &*state.orders, &state.retry).await?,
        },
        CheckoutRequest::Customer { customer_id } => CheckoutResponse::Customer {
            order: cart.attach_to_customer(customer_id, state.customers.as_ref())?,
        },
    };

    tracing::info!(terminal = %terminal, "Cart finalized");
    Ok(Json(response))
}
