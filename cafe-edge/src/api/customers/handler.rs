//! Customer Tab API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Customer, CustomerCreate, CustomerOrder, PaymentInput, Sale};

use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct CustomerOrders {
    pub customer: Customer,
    pub orders: Vec<CustomerOrder>,
    /// 未结金额
    pub outstanding: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub order: CustomerOrder,
    pub sale: Sale,
}

/// GET /api/customers
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list_customers()?))
}

/// POST /api/customers
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CustomerCreate>,
) -> AppResult<Json<Customer>> {
    Ok(Json(state.customers.create_customer(payload)?))
}

/// GET /api/customers/{id}/orders
pub async fn list_orders(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CustomerOrders>> {
    let customer = state.customers.get_customer(id)?;
    let orders = state.customers.list_orders(id)?;
    let outstanding = state.customers.outstanding(id)?;
    Ok(Json(CustomerOrders {
        customer,
        orders,
        outstanding,
    }))
}

/// POST /api/customers/orders/{id}/settle - 结清挂账单
pub async fn settle(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payment): Json<PaymentInput>,
) -> AppResult<Json<SettleResponse>> {
    let (order, sale) = state
        .customers
        .settle(id, &payment, state.sales.as_ref())?;
    Ok(Json(SettleResponse { order, sale }))
}
