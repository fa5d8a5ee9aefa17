//! Idempotent candle persistence

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{Cache, CANDLES_NAMESPACE};
use crate::data::{Candle, StoredCandle};
use crate::store::{CandleStore, InsertOutcome};
use crate::Result;

pub struct CandlePersistenceService {
    store: Arc<dyn CandleStore>,
    cache: Arc<dyn Cache>,
}

impl CandlePersistenceService {
    pub fn new(store: Arc<dyn CandleStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Stores every candle whose key is not present yet and returns how many were
    /// written. Existing rows are never overwritten. On success the whole candle
    /// query cache is dropped.
    pub async fn persist(
        &self,
        candles: &[Candle],
        symbol: &str,
        interval_code: &str,
        exchange: &str,
    ) -> Result<usize> {
        let mut saved = 0;
        let mut skipped = 0;

        for candle in candles {
            let record = StoredCandle::from_candle(candle, symbol, interval_code, exchange);
            if self.store.exists(&record.key()).await? {
                skipped += 1;
                continue;
            }
            match self.store.insert(record).await? {
                InsertOutcome::Inserted => saved += 1,
                InsertOutcome::Duplicate => skipped += 1,
            }
        }

        self.cache.clear(CANDLES_NAMESPACE).await?;

        if saved > 0 {
            info!(symbol, interval = interval_code, exchange, saved, skipped, "persisted candles");
        } else {
            debug!(symbol, interval = interval_code, exchange, skipped, "no new candles");
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::data::{CandleInterval, CandleKey};
    use crate::store::{CandleFilter, MemoryCandleStore};
    use async_trait::async_trait;
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn candle(open_time_ms: i64, close: i64) -> Candle {
        Candle::new(
            CandleInterval::OneMinute,
            DateTime::from_timestamp_millis(open_time_ms).unwrap(),
            Decimal::from(100),
            Decimal::from(120),
            Decimal::from(90),
            Decimal::from(close),
            Decimal::from(7),
        )
    }

    /// Misses every existence check, as if a concurrent writer got there
    /// between the check and the insert.
    struct RacingStore(MemoryCandleStore);

    #[async_trait]
    impl CandleStore for RacingStore {
        async fn exists(&self, _key: &CandleKey) -> Result<bool> {
            Ok(false)
        }

        async fn insert(&self, candle: StoredCandle) -> Result<InsertOutcome> {
            self.0.insert(candle).await
        }

        async fn find_range(&self, filter: &CandleFilter) -> Result<Vec<StoredCandle>> {
            self.0.find_range(filter).await
        }

        async fn distinct_intervals(&self, symbol: &str) -> Result<Vec<String>> {
            self.0.distinct_intervals(symbol).await
        }
    }

    fn service() -> (CandlePersistenceService, Arc<MemoryCandleStore>, Arc<MemoryCache>) {
        let store = Arc::new(MemoryCandleStore::new());
        let cache = Arc::new(MemoryCache::new());
        let service = CandlePersistenceService::new(store.clone(), cache.clone());
        (service, store, cache)
    }

    #[tokio::test]
    async fn second_persist_saves_nothing() {
        let (service, store, _) = service();
        let candles = vec![candle(0, 110), candle(60_000, 115)];

        assert_eq!(service.persist(&candles, "btcusdt", "1m", "Binance").await.unwrap(), 2);
        assert_eq!(service.persist(&candles, "BTCUSDT", "1m", "binance").await.unwrap(), 0);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn exchange_is_part_of_the_key() {
        let (service, store, _) = service();
        let candles = vec![candle(0, 110)];

        assert_eq!(service.persist(&candles, "BTCUSDT", "1m", "binance").await.unwrap(), 1);
        assert_eq!(service.persist(&candles, "BTCUSDT", "1m", "mexc").await.unwrap(), 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn changed_prices_do_not_overwrite() {
        let (service, store, _) = service();
        service.persist(&[candle(0, 110)], "BTCUSDT", "1m", "binance").await.unwrap();
        let saved = service.persist(&[candle(0, 95)], "BTCUSDT", "1m", "binance").await.unwrap();
        assert_eq!(saved, 0);

        let key = StoredCandle::from_candle(&candle(0, 0), "BTCUSDT", "1m", "binance").key();
        let kept = store.get(&key).await.unwrap();
        assert_eq!(kept.close_price, Decimal::from(110));
        assert_eq!(kept.close_time, 60_000);
    }

    #[tokio::test]
    async fn lost_insert_race_counts_as_duplicate() {
        let store = Arc::new(RacingStore(MemoryCandleStore::new()));
        let cache = Arc::new(MemoryCache::new());
        let service = CandlePersistenceService::new(store.clone(), cache.clone());
        let winner = StoredCandle::from_candle(&candle(0, 110), "BTCUSDT", "1m", "binance");
        store.0.insert(winner).await.unwrap();
        cache
            .put(CANDLES_NAMESPACE, "BTCUSDT:1m", "[]", Duration::from_secs(60))
            .await
            .unwrap();

        let saved = service
            .persist(&[candle(0, 95), candle(60_000, 115)], "BTCUSDT", "1m", "binance")
            .await
            .unwrap();

        assert_eq!(saved, 1);
        assert_eq!(store.0.len().await, 2);
        let key = StoredCandle::from_candle(&candle(0, 0), "BTCUSDT", "1m", "binance").key();
        assert_eq!(store.0.get(&key).await.unwrap().close_price, Decimal::from(110));
        assert_eq!(cache.len(CANDLES_NAMESPACE).await, 0);
    }

    #[tokio::test]
    async fn persist_clears_candle_cache() {
        let (service, _, cache) = service();
        let ttl = Duration::from_secs(60);
        cache.put(CANDLES_NAMESPACE, "BTCUSDT:1m", "[]", ttl).await.unwrap();
        cache.put("schedulerConfig", "config", "{}", ttl).await.unwrap();

        service.persist(&[candle(0, 110)], "BTCUSDT", "1m", "binance").await.unwrap();

        assert_eq!(cache.len(CANDLES_NAMESPACE).await, 0);
        assert_eq!(cache.len("schedulerConfig").await, 1);
    }
}
