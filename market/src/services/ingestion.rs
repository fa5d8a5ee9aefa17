//! Fetch-then-persist orchestration

use std::sync::Arc;

use shared::FetchRequest;
use tracing::{error, info, warn};

use crate::data::CandleInterval;
use crate::exchange::{CandleQuery, ProviderRegistry, MAX_CANDLE_LIMIT};
use crate::services::persistence::CandlePersistenceService;
use crate::services::retry::{retry_with_backoff, RetryPolicy};
use crate::{MarketError, Result};

pub struct IngestionService {
    registry: Arc<ProviderRegistry>,
    persistence: Arc<CandlePersistenceService>,
    retry: RetryPolicy,
    default_exchange: String,
}

impl IngestionService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        persistence: Arc<CandlePersistenceService>,
        retry: RetryPolicy,
        default_exchange: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            persistence,
            retry,
            default_exchange: default_exchange.into(),
        }
    }

    pub fn default_exchange(&self) -> &str {
        &self.default_exchange
    }

    /// Fetches the requested candles and stores the new ones, returning how many
    /// were written. Fetch and persist are retried together; an unknown exchange
    /// or interval fails at once.
    pub async fn download_and_persist(&self, request: &FetchRequest) -> Result<usize> {
        let exchange = if request.exchange.trim().is_empty() {
            self.default_exchange.as_str()
        } else {
            request.exchange.trim()
        };

        let result = self.run(request, exchange).await;
        match &result {
            Ok(saved) => info!(
                request_id = %request.request_id,
                pair = %request.pair,
                interval = %request.interval,
                exchange,
                saved,
                "fetch request completed"
            ),
            Err(e) => error!(
                request_id = %request.request_id,
                pair = %request.pair,
                interval = %request.interval,
                exchange,
                error = %e,
                "fetch request failed"
            ),
        }
        result
    }

    async fn run(&self, request: &FetchRequest, exchange: &str) -> Result<usize> {
        if request.limit == 0 || request.limit > MAX_CANDLE_LIMIT {
            return Err(MarketError::InvalidRequest(format!(
                "limit must be between 1 and {MAX_CANDLE_LIMIT}"
            )));
        }
        let interval = CandleInterval::parse_code(&request.interval)?;
        let provider = self.registry.resolve(exchange)?;
        let query = CandleQuery::new(request.pair.trim().to_uppercase(), interval, request.limit)
            .with_range(request.start_time, request.end_time);

        retry_with_backoff(&self.retry, MarketError::is_retriable, |attempt| {
            let provider = provider.clone();
            let query = &query;
            async move {
                if attempt > 1 {
                    warn!(request_id = %request.request_id, attempt, "retrying fetch request");
                }
                let candles = provider.get_candles(query).await?;
                self.persistence
                    .persist(&candles, &query.pair, interval.code(), exchange)
                    .await
            }
        })
        .await
    }
}
