//! Sales API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::Sale;

use crate::core::ServerState;
use crate::utils::AppResult;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// GET /api/sales?limit= - 最近的销售 (新的在前)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    let sales = state
        .sales
        .list_recent(query.limit.unwrap_or(DEFAULT_LIMIT))?;
    Ok(Json(sales))
}

/// GET /api/sales/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Sale>> {
    Ok(Json(state.sales.get(id)?))
}
