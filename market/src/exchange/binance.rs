//! Binance spot klines

use std::time::Duration;

use crate::data::CandleInterval;
use crate::exchange::{ExchangeKind, KlineAdapter, RestKlineProvider};
use crate::Result;

/// Binance serves every [`CandleInterval`] under its own code.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceAdapter;

impl KlineAdapter for BinanceAdapter {
    fn exchange(&self) -> ExchangeKind {
        ExchangeKind::Binance
    }

    fn interval_code(&self, interval: CandleInterval) -> Result<&'static str> {
        Ok(interval.code())
    }
}

pub type BinanceProvider = RestKlineProvider<BinanceAdapter>;

impl RestKlineProvider<BinanceAdapter> {
    pub fn binance(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::new(base_url, timeout, BinanceAdapter)
    }
}
