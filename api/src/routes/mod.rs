pub mod candles;
pub mod download;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/download", post(download::download))
        .route("/api/v1/download/backfill", post(download::backfill))
        .route("/api/v1/cache/refresh/:pair/:interval/:limit", get(download::refresh))
        .route("/api/v1/candles/:pair", get(candles::get_intervals))
        .route("/api/v1/candles/:pair/:interval", get(candles::get_candles))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use chrono::DateTime;
    use market::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use shared::{SchedulerConfig, SchedulerInterval, SchedulerPair};
    use tower::ServiceExt;

    use super::router;
    use crate::state::AppState;

    struct StaticConfig(Option<SchedulerConfig>);

    #[async_trait]
    impl ConfigSource for StaticConfig {
        async fn fetch_config(&self) -> market::Result<SchedulerConfig> {
            self.0
                .clone()
                .ok_or_else(|| MarketError::ConfigUnavailable("config service down".into()))
        }
    }

    fn btc_config() -> SchedulerConfig {
        SchedulerConfig {
            pairs: vec![SchedulerPair {
                symbol: "BTCUSDT".into(),
                base_asset: "BTC".into(),
                quote_asset: "USDT".into(),
            }],
            intervals: vec![SchedulerInterval {
                interval_code: "1m".into(),
            }],
        }
    }

    struct Harness {
        state: AppState,
        store: Arc<MemoryCandleStore>,
        queue: Arc<MemoryQueue>,
    }

    fn harness(config: Option<SchedulerConfig>) -> Harness {
        let store = Arc::new(MemoryCandleStore::new());
        let cache = Arc::new(MemoryCache::new());
        let queue = Arc::new(MemoryQueue::new(2));
        let state = AppState {
            query: Arc::new(CandleQueryService::new(
                store.clone(),
                cache,
                Arc::new(StaticConfig(config)),
                Duration::from_secs(30),
            )),
            trigger: Arc::new(TriggerService::new(queue.clone(), "binance")),
        };
        Harness { state, store, queue }
    }

    async fn seed(store: &MemoryCandleStore, open_time_ms: i64) {
        let price = Decimal::new(100, 0);
        let candle = Candle::new(
            CandleInterval::OneMinute,
            DateTime::from_timestamp_millis(open_time_ms).unwrap(),
            price,
            price,
            price,
            price,
            Decimal::ONE,
        );
        let stored = StoredCandle::from_candle(&candle, "BTCUSDT", "1m", "binance");
        store.insert(stored).await.unwrap();
    }

    async fn call(state: AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn queued(queue: &MemoryQueue) -> usize {
        let mut total = 0;
        for partition in 0..queue.partitions() {
            total += queue.pending(partition).await;
        }
        total
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let h = harness(None);
        let (status, body) = call(h.state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn candles_are_returned_newest_first() {
        let h = harness(Some(btc_config()));
        seed(&h.store, 60_000).await;
        seed(&h.store, 120_000).await;

        let (status, body) = call(h.state, Method::GET, "/api/v1/candles/btcusdt/1m?limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        let candles = body.as_array().unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0]["openTime"], 120_000);
        assert_eq!(candles[0]["symbol"], "BTCUSDT");
        assert_eq!(candles[1]["closeTime"], 120_000);
    }

    #[tokio::test]
    async fn candle_range_and_exchange_filters_apply() {
        let h = harness(Some(btc_config()));
        for minute in 1..=4 {
            seed(&h.store, minute * 60_000).await;
        }

        let uri = "/api/v1/candles/BTCUSDT/1m?startTime=120000&endTime=180000&exchange=binance";
        let (status, body) = call(h.state.clone(), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = call(h.state, Method::GET, "/api/v1/candles/BTCUSDT/1m?exchange=mexc", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn disabled_pair_and_interval_are_not_found() {
        let h = harness(Some(btc_config()));
        let (status, body) = call(h.state.clone(), Method::GET, "/api/v1/candles/ETHUSDT/1m", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ETHUSDT"));

        let (status, _) = call(h.state, Method::GET, "/api/v1/candles/BTCUSDT/1h", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unavailable_config_fails_closed() {
        let h = harness(None);
        let (status, _) = call(h.state.clone(), Method::GET, "/api/v1/candles/BTCUSDT/1m", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(h.state, Method::GET, "/api/v1/candles/BTCUSDT", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn available_intervals_listed() {
        let h = harness(Some(btc_config()));
        seed(&h.store, 60_000).await;
        let (status, body) = call(h.state, Method::GET, "/api/v1/candles/BTCUSDT", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["1m"]));
    }

    #[tokio::test]
    async fn download_is_accepted_and_queued() {
        let h = harness(None);
        let body = json!({ "pair": "ethusdt", "interval": "5m", "exchange": "MEXC" });
        let (status, response) = call(h.state, Method::POST, "/api/v1/download", Some(body)).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(response["status"], "accepted");
        assert!(!response["requestId"].as_str().unwrap().is_empty());
        assert_eq!(queued(&h.queue).await, 1);

        let partition = partition_for("ETHUSDT", 2);
        let request = &h.queue.peek(partition).await[0];
        assert_eq!(request.limit, 100);
        assert_eq!(request.exchange, "mexc");
    }

    #[tokio::test]
    async fn backfill_defaults_to_larger_limit() {
        let h = harness(None);
        let body = json!({ "pair": "BTCUSDT", "interval": "1h", "startTime": 0, "endTime": 3_600_000 });
        let (status, _) = call(h.state, Method::POST, "/api/v1/download/backfill", Some(body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let request = &h.queue.peek(partition_for("BTCUSDT", 2)).await[0];
        assert_eq!(request.limit, 500);
        assert_eq!(request.exchange, "binance");
        assert_eq!(request.end_time, Some(3_600_000));
    }

    #[tokio::test]
    async fn invalid_trigger_is_bad_request() {
        let h = harness(None);
        let body = json!({ "pair": "BTCUSDT", "interval": "7m" });
        let (status, response) = call(h.state.clone(), Method::POST, "/api/v1/download", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].as_str().unwrap().contains("7m"));

        let (status, _) = call(h.state, Method::GET, "/api/v1/cache/refresh/BTCUSDT/1m/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(queued(&h.queue).await, 0);
    }

    #[tokio::test]
    async fn refresh_queues_on_default_exchange() {
        let h = harness(None);
        let (status, response) = call(h.state, Method::GET, "/api/v1/cache/refresh/BTCUSDT/1m/5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["status"], "accepted");

        let request = &h.queue.peek(partition_for("BTCUSDT", 2)).await[0];
        assert_eq!(request.limit, 5);
        assert_eq!(request.exchange, "binance");
    }
}
