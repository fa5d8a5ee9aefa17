//! In-memory candle storage

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::data::{CandleKey, StoredCandle};
use crate::store::{CandleFilter, CandleStore, InsertOutcome};
use crate::Result;

/// Candle storage kept in process memory, keyed like the durable table.
#[derive(Debug, Default)]
pub struct MemoryCandleStore {
    candles: RwLock<BTreeMap<CandleKey, StoredCandle>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of stored candles
    pub async fn len(&self) -> usize {
        self.candles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.candles.read().await.is_empty()
    }

    pub async fn get(&self, key: &CandleKey) -> Option<StoredCandle> {
        self.candles.read().await.get(key).cloned()
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn exists(&self, key: &CandleKey) -> Result<bool> {
        Ok(self.candles.read().await.contains_key(key))
    }

    async fn insert(&self, candle: StoredCandle) -> Result<InsertOutcome> {
        let mut candles = self.candles.write().await;
        let key = candle.key();
        if candles.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        candles.insert(key, candle);
        Ok(InsertOutcome::Inserted)
    }

    async fn find_range(&self, filter: &CandleFilter) -> Result<Vec<StoredCandle>> {
        let candles = self.candles.read().await;
        let mut found: Vec<StoredCandle> = candles
            .values()
            .filter(|c| c.symbol == filter.symbol && c.interval_code == filter.interval_code)
            .filter(|c| c.open_time >= filter.start_time && c.open_time <= filter.end_time)
            .filter(|c| filter.exchange.as_ref().map_or(true, |e| &c.exchange == e))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.open_time.cmp(&a.open_time));
        found.truncate(usize::try_from(filter.limit).unwrap_or(usize::MAX));
        Ok(found)
    }

    async fn distinct_intervals(&self, symbol: &str) -> Result<Vec<String>> {
        let candles = self.candles.read().await;
        let intervals: BTreeSet<String> = candles
            .values()
            .filter(|c| c.symbol == symbol)
            .map(|c| c.interval_code.clone())
            .collect();
        Ok(intervals.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn stored(open_time: i64, exchange: &str, close: i64) -> StoredCandle {
        StoredCandle {
            symbol: "BTCUSDT".into(),
            interval_code: "1m".into(),
            open_time,
            open_price: Decimal::from(100),
            high_price: Decimal::from(120),
            low_price: Decimal::from(90),
            close_price: Decimal::from(close),
            volume: Decimal::from(5),
            close_time: open_time + 60_000,
            exchange: exchange.into(),
        }
    }

    #[tokio::test]
    async fn duplicate_key_keeps_original_row() {
        let store = MemoryCandleStore::new();
        assert_eq!(store.insert(stored(0, "binance", 110)).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(stored(0, "binance", 95)).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(store.insert(stored(0, "mexc", 95)).await.unwrap(), InsertOutcome::Inserted);

        let original = store.get(&stored(0, "binance", 0).key()).await.unwrap();
        assert_eq!(original.close_price, Decimal::from(110));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn range_is_filtered_sorted_and_limited() {
        let store = MemoryCandleStore::new();
        for i in 0..5 {
            store.insert(stored(i * 60_000, "binance", 110)).await.unwrap();
        }
        store.insert(stored(0, "mexc", 110)).await.unwrap();

        let filter = CandleFilter {
            symbol: "BTCUSDT".into(),
            interval_code: "1m".into(),
            start_time: 60_000,
            end_time: i64::MAX,
            exchange: Some("binance".into()),
            limit: 3,
        };
        let found = store.find_range(&filter).await.unwrap();
        let times: Vec<i64> = found.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![240_000, 180_000, 120_000]);

        assert_eq!(store.distinct_intervals("BTCUSDT").await.unwrap(), vec!["1m".to_string()]);
        assert!(store.distinct_intervals("ETHUSDT").await.unwrap().is_empty());
    }
}
