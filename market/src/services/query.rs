//! Cache-aside candle reads

use std::sync::Arc;
use std::time::Duration;

use shared::{CandleResponse, SchedulerConfig};
use tracing::{debug, warn};

use crate::cache::{Cache, CANDLES_NAMESPACE};
use crate::services::config_client::ConfigSource;
use crate::store::{CandleFilter, CandleStore};
use crate::{MarketError, Result};

const DEFAULT_EXCHANGE_MARKER: &str = "default";

pub struct CandleQueryService {
    store: Arc<dyn CandleStore>,
    cache: Arc<dyn Cache>,
    config: Arc<dyn ConfigSource>,
    ttl: Duration,
}

impl CandleQueryService {
    pub fn new(
        store: Arc<dyn CandleStore>,
        cache: Arc<dyn Cache>,
        config: Arc<dyn ConfigSource>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            ttl,
        }
    }

    /// Stored candles for an enabled pair and interval, newest first.
    ///
    /// Results are cached per exact argument tuple; a cached answer is returned
    /// without consulting the scheduler config again.
    pub async fn get_candles(
        &self,
        pair: &str,
        interval_code: &str,
        limit: u64,
        start_time: Option<i64>,
        end_time: Option<i64>,
        exchange: Option<&str>,
    ) -> Result<Vec<CandleResponse>> {
        let symbol = pair.trim().to_uppercase();
        let interval_code = interval_code.trim();
        let exchange = exchange
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        let start = start_time.unwrap_or(0);
        let end = end_time.unwrap_or(i64::MAX);

        let key = cache_key(&symbol, interval_code, start, end, limit, exchange.as_deref());
        if let Some(hit) = self.cached(&key).await {
            debug!(%key, "candle cache hit");
            return Ok(hit);
        }

        if limit == 0 {
            return Err(MarketError::InvalidRequest("limit must be positive".into()));
        }
        let config = self.config.fetch_config().await?;
        ensure_pair_enabled(&config, &symbol)?;
        if !config.is_interval_enabled(interval_code) {
            return Err(MarketError::NotFound(format!(
                "Interval not found or disabled: {interval_code}"
            )));
        }

        let filter = CandleFilter {
            symbol,
            interval_code: interval_code.to_string(),
            start_time: start,
            end_time: end,
            exchange,
            limit,
        };
        let candles: Vec<CandleResponse> = self
            .store
            .find_range(&filter)
            .await?
            .into_iter()
            .map(CandleResponse::from)
            .collect();

        self.store_in_cache(&key, &candles).await;
        Ok(candles)
    }

    /// Interval codes that have stored candles for an enabled pair. Never cached.
    pub async fn get_available_intervals(&self, pair: &str) -> Result<Vec<String>> {
        let symbol = pair.trim().to_uppercase();
        let config = self.config.fetch_config().await?;
        ensure_pair_enabled(&config, &symbol)?;
        self.store.distinct_intervals(&symbol).await
    }

    async fn cached(&self, key: &str) -> Option<Vec<CandleResponse>> {
        match self.cache.get(CANDLES_NAMESPACE, key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| warn!(%key, error = %e, "discarding unreadable cached candles"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "candle cache read failed, reading store");
                None
            }
        }
    }

    async fn store_in_cache(&self, key: &str, candles: &[CandleResponse]) {
        let raw = match serde_json::to_string(candles) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%key, error = %e, "could not encode candles for cache");
                return;
            }
        };
        if let Err(e) = self.cache.put(CANDLES_NAMESPACE, key, &raw, self.ttl).await {
            warn!(%key, error = %e, "candle cache write failed");
        }
    }
}

fn ensure_pair_enabled(config: &SchedulerConfig, symbol: &str) -> Result<()> {
    if config.is_pair_enabled(symbol) {
        Ok(())
    } else {
        Err(MarketError::NotFound(format!("Pair not found or disabled: {symbol}")))
    }
}

/// `pair:interval:start:end:limit:exchange`, with `default` for no exchange filter.
pub fn cache_key(
    symbol: &str,
    interval_code: &str,
    start: i64,
    end: i64,
    limit: u64,
    exchange: Option<&str>,
) -> String {
    format!(
        "{symbol}:{interval_code}:{start}:{end}:{limit}:{}",
        exchange.unwrap_or(DEFAULT_EXCHANGE_MARKER)
    )
}
