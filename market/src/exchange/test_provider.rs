//! Synthetic candles for environments without exchange access

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::data::Candle;
use crate::exchange::{CandleQuery, ExchangeKind, ExchangeProvider, MAX_CANDLE_LIMIT};
use crate::{MarketError, Result};

const PRICE_SCALE: u32 = 8;

/// Random walk around a per-symbol base price.
///
/// Each candle moves at most 0.5% from the previous close and its wicks reach
/// at most 0.3% beyond the body.
pub struct TestCandleProvider {
    rng: Mutex<StdRng>,
}

impl TestCandleProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible output for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn base_price(symbol: &str) -> Decimal {
        match symbol.trim().to_uppercase().as_str() {
            "BTCUSDT" => Decimal::from(42_000),
            "ETHUSDT" => Decimal::from(2_200),
            "SOLUSDT" => Decimal::from(100),
            "XRPUSDT" => Decimal::new(55, 2),
            "ADAUSDT" => Decimal::new(45, 2),
            _ => Decimal::ONE,
        }
    }

    fn generate(&self, query: &CandleQuery, anchor_secs: i64) -> Vec<Candle> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let interval = query.interval;
        let aligned = interval.align_seconds(anchor_secs);
        let limit = i64::from(query.limit.min(MAX_CANDLE_LIMIT));
        let mut price = Self::base_price(&query.pair);

        (0..limit)
            .filter_map(|i| {
                let open_secs = aligned - (limit - i) * interval.seconds();
                let open_time = DateTime::from_timestamp(open_secs, 0)?;

                let open = price;
                let step = Decimal::new(rng.gen_range(-50..=50), 4);
                let close = (open + open * step).round_dp(PRICE_SCALE);
                let upper_wick = Decimal::new(rng.gen_range(0..=30), 4);
                let lower_wick = Decimal::new(rng.gen_range(0..=30), 4);

                let body_high = open.max(close);
                let body_low = open.min(close);
                let mut high = (body_high + body_high * upper_wick).round_dp(PRICE_SCALE);
                let mut low = (body_low - body_low * lower_wick).round_dp(PRICE_SCALE);
                if high < body_high {
                    high = body_high;
                }
                if low > body_low {
                    low = body_low;
                }

                let volume = Decimal::new(rng.gen_range(10_000..=1_000_000), 2);
                price = close;
                Some(Candle::new(interval, open_time, open, high, low, close, volume))
            })
            .collect()
    }
}

impl Default for TestCandleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeProvider for TestCandleProvider {
    fn exchange(&self) -> ExchangeKind {
        ExchangeKind::Test
    }

    async fn get_candles(&self, query: &CandleQuery) -> Result<Vec<Candle>> {
        if query.pair.trim().is_empty() {
            return Err(MarketError::provider(ExchangeKind::Test.code(), "empty pair"));
        }
        let anchor_secs = query
            .end_time
            .map(|ms| ms.div_euclid(1_000))
            .unwrap_or_else(|| Utc::now().timestamp());
        Ok(self.generate(query, anchor_secs))
    }
}
