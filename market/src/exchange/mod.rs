//! Exchange integration module
//!
//! One [`ExchangeProvider`] per exchange, selected at runtime through the
//! [`ProviderRegistry`].

pub mod binance;
pub mod kline;
pub mod mexc;
pub mod registry;
pub mod test_provider;

pub use binance::*;
pub use kline::*;
pub use mexc::*;
pub use registry::*;
pub use test_provider::*;

use std::fmt;

use async_trait::async_trait;

use crate::data::{Candle, CandleInterval};
use crate::Result;

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Binance,
    Mexc,
    /// Synthetic data for environments without exchange access.
    Test,
}

impl ExchangeKind {
    pub const ALL: [ExchangeKind; 3] = [Self::Binance, Self::Mexc, Self::Test];

    /// Lower-case identifier stored with every candle.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Mexc => "mexc",
            Self::Test => "test",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Binance => "Binance",
            Self::Mexc => "MEXC",
            Self::Test => "Test Exchange",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Most candles any exchange returns for one kline request.
pub const MAX_CANDLE_LIMIT: u32 = 1_000;

/// Parameters of one kline fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleQuery {
    pub pair: String,
    pub interval: CandleInterval,
    pub limit: u32,
    /// Epoch millis, forwarded to the exchange when set.
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl CandleQuery {
    pub fn new(pair: impl Into<String>, interval: CandleInterval, limit: u32) -> Self {
        Self {
            pair: pair.into(),
            interval,
            limit,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_range(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }
}

/// Fetches candles from one exchange.
///
/// Implementations do not retry; a failed call surfaces as
/// [`MarketError::ProviderFetch`](crate::MarketError::ProviderFetch).
#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    fn exchange(&self) -> ExchangeKind;

    /// Returns candles ordered oldest first.
    async fn get_candles(&self, query: &CandleQuery) -> Result<Vec<Candle>>;
}
