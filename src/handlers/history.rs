//! Trading plan history handlers
//!
//! GET /history and GET /history/today

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::models::trading_plan::{ErrorResponse, HistoryEntry, HistoryQuery, HistoryResponse};
use crate::services::history::{query_history, query_today};
use crate::store::StoreError;
use crate::AppState;

type HistoryResult = Result<Json<HistoryResponse>, (StatusCode, Json<ErrorResponse>)>;

/// GET /history
///
/// # Query Parameters
/// - `skip`: rows to skip (default 0)
/// - `limit`: page size (default 50, max 500)
/// - `stock_name`: case-insensitive substring filter on the symbol
///
/// # Response
/// - 200: `{trading_plans, skip, limit, count}`, newest first
/// - 500: Database error
pub async fn get_history(State(state): State<AppState>, Query(query): Query<HistoryQuery>) -> HistoryResult {
    info!(skip = query.skip, limit = ?query.limit, stock_name = ?query.stock_name, "Fetching trading plan history");

    let entries = query_history(state.store.as_ref(), &query, None)
        .await
        .map_err(database_error)?;

    Ok(respond(&query, entries))
}

/// GET /history/today
///
/// Same as `/history`, restricted to the current UTC+7 calendar day. The
/// `previous` revision of each plan is looked up within the same day.
pub async fn get_history_today(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> HistoryResult {
    info!(skip = query.skip, limit = ?query.limit, stock_name = ?query.stock_name, "Fetching today's trading plans");

    let entries = query_today(state.store.as_ref(), &query)
        .await
        .map_err(database_error)?;

    Ok(respond(&query, entries))
}

fn respond(query: &HistoryQuery, entries: Vec<HistoryEntry>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        count: entries.len(),
        trading_plans: entries,
        skip: query.skip,
        limit: query.limit(),
    })
}

fn database_error(e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    error!(error = %e, "Database error fetching history");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Database error: {}", e),
            code: Some("DATABASE_ERROR".to_string()),
        }),
    )
}
