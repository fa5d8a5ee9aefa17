use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::candle_data;

/// Queue payload asking for one pair/interval to be fetched and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub request_id: String,
    pub pair: String,
    pub interval: String,
    pub limit: u32,
    /// Exchange code; blank means "use the configured default".
    #[serde(default)]
    pub exchange: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub submitted_at: DateTime<Utc>,
}

impl FetchRequest {
    pub fn new(pair: impl Into<String>, interval: impl Into<String>, limit: u32, exchange: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            pair: pair.into(),
            interval: interval.into(),
            limit,
            exchange: exchange.into(),
            start_time: None,
            end_time: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_range(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }
}

/// Public shape of a stored candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleResponse {
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

impl From<candle_data::Model> for CandleResponse {
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

/// Snapshot of enabled pairs and intervals as served by the config authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub pairs: Vec<SchedulerPair>,
    #[serde(default)]
    pub intervals: Vec<SchedulerInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerPair {
    pub symbol: String,
    #[serde(default)]
    pub base_asset: String,
    #[serde(default)]
    pub quote_asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerInterval {
    pub interval_code: String,
}

impl SchedulerConfig {
    pub fn is_pair_enabled(&self, symbol: &str) -> bool {
        self.pairs.iter().any(|p| p.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Interval codes are compared exactly: "1m" and "1M" are different intervals.
    pub fn is_interval_enabled(&self, interval_code: &str) -> bool {
        self.intervals.iter().any(|i| i.interval_code == interval_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_request_json_shape() {
        let json = r#"{"requestId":"r1","pair":"ETHUSDT","interval":"5m","limit":50,"exchange":"binance","submittedAt":"2026-02-15T12:00:00Z"}"#;
        let parsed: FetchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.request_id, "r1");
        assert_eq!(parsed.pair, "ETHUSDT");
        assert_eq!(parsed.interval, "5m");
        assert_eq!(parsed.limit, 50);
        assert_eq!(parsed.start_time, None);

        let out = serde_json::to_value(&parsed).unwrap();
        assert!(out.get("startTime").is_none());
        assert_eq!(out["requestId"], "r1");
    }

    #[test]
    fn fetch_request_exchange_defaults_to_blank() {
        let json = r#"{"requestId":"r2","pair":"BTCUSDT","interval":"1m","limit":1,"submittedAt":"2026-02-15T12:00:00Z"}"#;
        let parsed: FetchRequest = serde_json::from_str(json).unwrap();
        assert!(parsed.exchange.is_empty());
    }

    #[test]
    fn scheduler_config_lookups() {
        let json = r#"{
            "pairs": [{"symbol": "BTCUSDT", "baseAsset": "BTC", "quoteAsset": "USDT"}],
            "intervals": [{"intervalCode": "1m"}, {"intervalCode": "1h"}]
        }"#;
        let config: SchedulerConfig = serde_json::from_str(json).unwrap();
        assert!(config.is_pair_enabled("btcusdt"));
        assert!(!config.is_pair_enabled("ETHUSDT"));
        assert!(config.is_interval_enabled("1m"));
        assert!(!config.is_interval_enabled("1M"));
        assert_eq!(config.pairs[0].base_asset, "BTC");
    }
}
