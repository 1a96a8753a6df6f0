//! Table Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{PaymentInput, Sale};
use shared::order::{OrderLine, TableNumber, TableOrder};

use crate::core::ServerState;
use crate::orders::OpenOrGrow;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct TablesOverview {
    pub table_count: u32,
    pub orders: Vec<TableOrder>,
}

#[derive(Debug, Serialize)]
pub struct TableStatus {
    pub table: TableNumber,
    pub occupied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<TableOrder>,
}

#[derive(Debug, Deserialize)]
pub struct AddLinesRequest {
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub source: TableNumber,
    pub target: TableNumber,
}

/// GET /api/tables - 所有在用桌台 (按桌号)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<TablesOverview>> {
    let orders = state.orders.snapshot()?;
    Ok(Json(TablesOverview {
        table_count: state.orders.table_count(),
        orders: orders.into_values().collect(),
    }))
}

/// GET /api/tables/{n}
pub async fn get_by_number(
    State(state): State<ServerState>,
    Path(n): Path<u32>,
) -> AppResult<Json<TableStatus>> {
    let table = TableNumber(n);
    let order = state.orders.get(table)?;
    Ok(Json(TableStatus {
        table,
        occupied: order.is_some(),
        order,
    }))
}

/// POST /api/tables/{n}/lines - 开台或加菜
pub async fn add_lines(
    State(state): State<ServerState>,
    Path(n): Path<u32>,
    Json(payload): Json<AddLinesRequest>,
) -> AppResult<Json<OpenOrGrow>> {
    let table = TableNumber(n);
    let AddLinesRequest { lines, total } = payload;
    let result = state
        .retry
        .run(|| state.orders.open_or_grow(table, lines.clone(), total))
        .await?;
    Ok(Json(result))
}

/// POST /api/tables/{n}/close - 关台 (作废，不记销售)
pub async fn close(
    State(state): State<ServerState>,
    Path(n): Path<u32>,
) -> AppResult<Json<TableOrder>> {
    let order = state.orders.close(TableNumber(n))?;
    Ok(Json(order))
}

/// POST /api/tables/{n}/settle - 结账
pub async fn settle(
    State(state): State<ServerState>,
    Path(n): Path<u32>,
    Json(payment): Json<PaymentInput>,
) -> AppResult<Json<Sale>> {
    let sale = state.checkout.settle_table(TableNumber(n), &payment).await?;
    Ok(Json(sale))
}

/// POST /api/tables/transfer - 转台
pub async fn transfer(
    State(state): State<ServerState>,
    Json(payload): Json<TransferRequest>,
) -> AppResult<Json<TableOrder>> {
    let order = state.orders.transfer(payload.source, payload.target)?;
    Ok(Json(order))
}
