//! Fetch triggers; each answers as soon as the request is queued

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use market::services::{BACKFILL_LIMIT, DOWNLOAD_LIMIT};
use market::MarketError;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::FetchRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub pair: String,
    pub interval: String,
    pub exchange: Option<String>,
    pub limit: Option<u32>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

/// A malformed interval on a trigger is the caller's input error.
fn input_error(e: MarketError) -> ApiError {
    match e {
        MarketError::InvalidInterval(code) => ApiError(MarketError::InvalidRequest(format!(
            "Invalid candle interval code: {code}"
        ))),
        other => ApiError(other),
    }
}

fn accepted(request: &FetchRequest, message: String) -> Json<Value> {
    Json(json!({
        "status": "accepted",
        "message": message,
        "requestId": request.request_id,
    }))
}

async fn submit(state: &AppState, body: DownloadRequest, default_limit: u32) -> ApiResult<FetchRequest> {
    state
        .trigger
        .submit(
            &body.pair,
            &body.interval,
            body.limit.unwrap_or(default_limit),
            body.exchange.as_deref(),
            body.start_time,
            body.end_time,
        )
        .await
        .map_err(input_error)
}

/// POST /api/v1/download
pub async fn download(
    State(state): State<AppState>,
    Json(body): Json<DownloadRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request = submit(&state, body, DOWNLOAD_LIMIT).await?;
    let message = format!(
        "Download queued for {} {} on {}",
        request.pair, request.interval, request.exchange
    );
    Ok((StatusCode::ACCEPTED, accepted(&request, message)))
}

/// POST /api/v1/download/backfill
pub async fn backfill(
    State(state): State<AppState>,
    Json(body): Json<DownloadRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request = submit(&state, body, BACKFILL_LIMIT).await?;
    let message = format!(
        "Backfill of {} candles queued for {} {} on {}",
        request.limit, request.pair, request.interval, request.exchange
    );
    Ok((StatusCode::ACCEPTED, accepted(&request, message)))
}

/// GET /api/v1/cache/refresh/:pair/:interval/:limit
pub async fn refresh(
    State(state): State<AppState>,
    Path((pair, interval, limit)): Path<(String, String, u32)>,
) -> ApiResult<Json<Value>> {
    let request = state
        .trigger
        .refresh(&pair, &interval, limit)
        .await
        .map_err(input_error)?;
    let message = format!("Refresh queued for {} {}", request.pair, request.interval);
    Ok(accepted(&request, message))
}
