//! OHLCV candle data structures

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::CandleInterval;

/// Canonical OHLCV candle, as produced by every exchange adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Aggregation period
    pub interval: CandleInterval,
    /// Start of the period
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        interval: CandleInterval,
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            interval,
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn open_time_millis(&self) -> i64 {
        self.open_time.timestamp_millis()
    }

    /// Open time plus the interval length.
    pub fn close_time_millis(&self) -> i64 {
        self.open_time_millis() + self.interval.millis()
    }

    /// `high >= max(open, close)` and `low <= min(open, close)`.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}
