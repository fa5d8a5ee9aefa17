//! Durable candle record

use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use shared::entity::candle_data;
use shared::CandleResponse;

use crate::data::Candle;

/// De-duplication key of a stored candle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandleKey {
    pub symbol: String,
    pub interval_code: String,
    pub open_time: i64,
    pub exchange: String,
}

/// A candle as it is persisted: upper-cased symbol, lower-cased exchange, epoch millis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCandle {
    pub symbol: String,
    pub interval_code: String,
    pub open_time: i64,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
    pub exchange: String,
}

impl StoredCandle {
    pub fn from_candle(candle: &Candle, symbol: &str, interval_code: &str, exchange: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            interval_code: interval_code.to_string(),
            open_time: candle.open_time_millis(),
            open_price: candle.open,
            high_price: candle.high,
            low_price: candle.low,
            close_price: candle.close,
            volume: candle.volume,
            close_time: candle.close_time_millis(),
            exchange: exchange.trim().to_lowercase(),
        }
    }

    pub fn key(&self) -> CandleKey {
        CandleKey {
            symbol: self.symbol.clone(),
            interval_code: self.interval_code.clone(),
            open_time: self.open_time,
            exchange: self.exchange.clone(),
        }
    }

    pub fn into_active_model(self) -> candle_data::ActiveModel {
        candle_data::ActiveModel {
            id: NotSet,
            symbol: Set(self.symbol),
            interval_code: Set(self.interval_code),
            open_time: Set(self.open_time),
            open_price: Set(self.open_price),
            high_price: Set(self.high_price),
            low_price: Set(self.low_price),
            close_price: Set(self.close_price),
            volume: Set(self.volume),
            close_time: Set(self.close_time),
            exchange: Set(self.exchange),
        }
    }
}

impl From<candle_data::Model> for StoredCandle {
    fn from(m: candle_data::Model) -> Self {
        Self {
            symbol: m.symbol,
            interval_code: m.interval_code,
            open_time: m.open_time,
            open_price: m.open_price,
            high_price: m.high_price,
            low_price: m.low_price,
            close_price: m.close_price,
            volume: m.volume,
            close_time: m.close_time,
            exchange: m.exchange,
        }
    }
}

impl From<StoredCandle> for CandleResponse {
    fn from(c: StoredCandle) -> Self {
        Self {
            symbol: c.symbol,
            interval_code: c.interval_code,
            open_time: c.open_time,
            open_price: c.open_price,
            high_price: c.high_price,
            low_price: c.low_price,
            close_price: c.close_price,
            volume: c.volume,
            close_time: c.close_time,
            exchange: c.exchange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CandleInterval;
    use chrono::DateTime;

    #[test]
    fn normalises_symbol_and_exchange() {
        let candle = Candle::new(
            CandleInterval::FiveMinutes,
            DateTime::from_timestamp_millis(1_700_000_100_000).unwrap(),
            Decimal::from(1),
            Decimal::from(2),
            Decimal::from(1),
            Decimal::from(2),
            Decimal::from(3),
        );
        let stored = StoredCandle::from_candle(&candle, "ethusdt", "5m", " MEXC ");
        assert_eq!(stored.symbol, "ETHUSDT");
        assert_eq!(stored.exchange, "mexc");
        assert_eq!(stored.close_time - stored.open_time, 300_000);

        let response = CandleResponse::from(stored.clone());
        assert_eq!(response.open_time, stored.open_time);
        assert_eq!(response.exchange, "mexc");
    }
}
