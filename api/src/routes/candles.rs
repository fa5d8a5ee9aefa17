//! Candle query endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use shared::CandleResponse;

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleParams {
    pub limit: Option<u64>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub exchange: Option<String>,
}

/// GET /api/v1/candles/:pair/:interval
pub async fn get_candles(
    State(state): State<AppState>,
    Path((pair, interval)): Path<(String, String)>,
    Query(params): Query<CandleParams>,
) -> ApiResult<Json<Vec<CandleResponse>>> {
    let candles = state
        .query
        .get_candles(
            &pair,
            &interval,
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.start_time,
            params.end_time,
            params.exchange.as_deref(),
        )
        .await?;
    Ok(Json(candles))
}

/// GET /api/v1/candles/:pair
pub async fn get_intervals(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let intervals = state.query.get_available_intervals(&pair).await?;
    Ok(Json(intervals))
}
