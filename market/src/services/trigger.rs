//! Ad-hoc fetch requests from the HTTP API

use std::sync::Arc;

use shared::FetchRequest;
use tracing::info;

use crate::data::CandleInterval;
use crate::exchange::MAX_CANDLE_LIMIT;
use crate::queue::FetchQueue;
use crate::{MarketError, Result};

pub const DOWNLOAD_LIMIT: u32 = 100;
pub const BACKFILL_LIMIT: u32 = 500;

/// Validates and enqueues fetch requests; never waits for the fetch itself.
pub struct TriggerService {
    queue: Arc<dyn FetchQueue>,
    default_exchange: String,
}

impl TriggerService {
    pub fn new(queue: Arc<dyn FetchQueue>, default_exchange: impl Into<String>) -> Self {
        Self {
            queue,
            default_exchange: default_exchange.into(),
        }
    }

    /// Enqueues one request and returns it as submitted.
    pub async fn submit(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
        exchange: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<FetchRequest> {
        let pair = pair.trim().to_uppercase();
        if pair.is_empty() {
            return Err(MarketError::InvalidRequest("pair is required".into()));
        }
        if limit == 0 || limit > MAX_CANDLE_LIMIT {
            return Err(MarketError::InvalidRequest(format!(
                "limit must be between 1 and {MAX_CANDLE_LIMIT}"
            )));
        }
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if start > end {
                return Err(MarketError::InvalidRequest("startTime is after endTime".into()));
            }
        }
        let interval = CandleInterval::parse_code(interval)?;
        let exchange = exchange
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(self.default_exchange.as_str())
            .to_lowercase();

        let request = FetchRequest::new(pair, interval.code(), limit, exchange)
            .with_range(start_time, end_time);
        self.queue.enqueue(&request).await?;
        info!(
            request_id = %request.request_id,
            pair = %request.pair,
            interval = %request.interval,
            exchange = %request.exchange,
            limit,
            "accepted fetch request"
        );
        Ok(request)
    }

    /// Re-fetch of the latest candles on the default exchange.
    pub async fn refresh(&self, pair: &str, interval: &str, limit: u32) -> Result<FetchRequest> {
        self.submit(pair, interval, limit, None, None, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{partition_for, MemoryQueue};

    fn service() -> (TriggerService, Arc<MemoryQueue>) {
        let queue = Arc::new(MemoryQueue::new(3));
        (TriggerService::new(queue.clone(), "binance"), queue)
    }

    #[tokio::test]
    async fn submit_normalises_and_enqueues() {
        let (trigger, queue) = service();
        let request = trigger
            .submit("ethusdt", "1H", 50, Some("MEXC"), Some(1), Some(2))
            .await
            .unwrap();

        assert_eq!(request.pair, "ETHUSDT");
        assert_eq!(request.interval, "1h");
        assert_eq!(request.exchange, "mexc");
        assert_eq!(request.start_time, Some(1));

        let queued = queue.peek(partition_for("ETHUSDT", 3)).await;
        assert_eq!(queued, vec![request]);
    }

    #[tokio::test]
    async fn refresh_uses_default_exchange() {
        let (trigger, _) = service();
        let request = trigger.refresh("BTCUSDT", "1m", 5).await.unwrap();
        assert_eq!(request.exchange, "binance");
        assert_eq!(request.limit, 5);
    }

    #[tokio::test]
    async fn limit_up_to_exchange_maximum_is_accepted() {
        let (trigger, _) = service();
        let request = trigger
            .submit("BTCUSDT", "1m", MAX_CANDLE_LIMIT, None, None, None)
            .await
            .unwrap();
        assert_eq!(request.limit, 1_000);
        assert!(trigger.refresh("BTCUSDT", "1m", MAX_CANDLE_LIMIT + 1).await.is_err());
    }

    #[tokio::test]
    async fn invalid_input_is_not_enqueued() {
        let (trigger, queue) = service();
        assert!(matches!(
            trigger.submit("BTCUSDT", "7m", 10, None, None, None).await,
            Err(MarketError::InvalidInterval(_))
        ));
        assert!(matches!(
            trigger.submit("BTCUSDT", "1m", 0, None, None, None).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert!(matches!(
            trigger.submit("BTCUSDT", "1m", 10, None, Some(5), Some(1)).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert!(matches!(
            trigger.submit("BTCUSDT", "1m", u32::MAX, None, None, None).await,
            Err(MarketError::InvalidRequest(_))
        ));
        for partition in 0..3 {
            assert_eq!(queue.pending(partition).await, 0);
        }
    }
}
