//! Positional kline parsing and the generic REST kline provider

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::data::{Candle, CandleInterval};
use crate::exchange::{CandleQuery, ExchangeKind, ExchangeProvider};
use crate::{MarketError, Result};

/// Kline tuples carry at least
/// `[open_time, open, high, low, close, volume, close_time]`.
pub const MIN_KLINE_FIELDS: usize = 7;

pub const KLINES_PATH: &str = "/api/v3/klines";

/// Exchange-specific wire differences on top of the shared kline layout.
pub trait KlineAdapter: Send + Sync + 'static {
    fn exchange(&self) -> ExchangeKind;

    /// The exchange's own code for `interval`.
    fn interval_code(&self, interval: CandleInterval) -> Result<&'static str>;

    fn to_candle(&self, interval: CandleInterval, raw: &[Value]) -> Result<Candle> {
        parse_kline(self.exchange(), interval, raw)
    }
}

/// Parses one positional kline tuple.
///
/// Prices may arrive as JSON strings or numbers. Short tuples and candles that
/// break the OHLC invariant are rejected as malformed.
pub fn parse_kline(exchange: ExchangeKind, interval: CandleInterval, raw: &[Value]) -> Result<Candle> {
    if raw.len() < MIN_KLINE_FIELDS {
        return Err(MarketError::provider(
            exchange.code(),
            format!(
                "malformed kline: expected at least {MIN_KLINE_FIELDS} fields, got {}",
                raw.len()
            ),
        ));
    }

    let open_time_ms = raw[0].as_i64().ok_or_else(|| {
        MarketError::provider(exchange.code(), format!("invalid open_time: {}", raw[0]))
    })?;
    let open_time = DateTime::from_timestamp_millis(open_time_ms).ok_or_else(|| {
        MarketError::provider(exchange.code(), format!("invalid open_time millis: {open_time_ms}"))
    })?;

    let candle = Candle::new(
        interval,
        open_time,
        decimal_field(exchange, &raw[1], "open")?,
        decimal_field(exchange, &raw[2], "high")?,
        decimal_field(exchange, &raw[3], "low")?,
        decimal_field(exchange, &raw[4], "close")?,
        decimal_field(exchange, &raw[5], "volume")?,
    );

    if !candle.is_consistent() {
        return Err(MarketError::provider(
            exchange.code(),
            format!("kline at {open_time_ms} violates high/low bounds"),
        ));
    }
    Ok(candle)
}

fn decimal_field(exchange: ExchangeKind, value: &Value, name: &str) -> Result<Decimal> {
    let parsed = match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MarketError::provider(exchange.code(), format!("failed to parse {name} '{value}'")))
}

/// Query parameters of a `klines` request.
#[derive(Debug, Clone, Serialize)]
pub struct KlineParams<'a> {
    pub symbol: &'a str,
    pub interval: &'a str,
    pub limit: u32,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

/// REST provider for exchanges serving the Binance-style `GET /api/v3/klines`.
pub struct RestKlineProvider<A> {
    client: reqwest::Client,
    base_url: String,
    adapter: A,
}

impl<A: KlineAdapter> RestKlineProvider<A> {
    pub fn new(base_url: impl Into<String>, timeout: Duration, adapter: A) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            adapter,
        })
    }

    fn fetch_error(&self, message: impl Into<String>) -> MarketError {
        MarketError::provider(self.adapter.exchange().code(), message)
    }
}

#[async_trait]
impl<A: KlineAdapter> ExchangeProvider for RestKlineProvider<A> {
    fn exchange(&self) -> ExchangeKind {
        self.adapter.exchange()
    }

    async fn get_candles(&self, query: &CandleQuery) -> Result<Vec<Candle>> {
        let symbol = query.pair.trim().to_uppercase();
        let params = KlineParams {
            symbol: &symbol,
            interval: self.adapter.interval_code(query.interval)?,
            limit: query.limit,
            start_time: query.start_time,
            end_time: query.end_time,
        };
        let url = format!("{}{}", self.base_url, KLINES_PATH);
        debug!(exchange = %self.exchange(), %url, ?params, "requesting klines");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.fetch_error(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.fetch_error(format!("failed to read body: {e}")))?;

        if status.is_client_error() || status.is_server_error() {
            return Err(self.fetch_error(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let rows: Vec<Vec<Value>> = serde_json::from_str(&body)
            .map_err(|e| self.fetch_error(format!("malformed payload: {e}")))?;

        rows.iter()
            .map(|row| self.adapter.to_candle(query.interval, row))
            .collect()
    }
}
