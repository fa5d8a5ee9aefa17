//! MEXC spot klines

use std::time::Duration;

use crate::data::CandleInterval;
use crate::exchange::{ExchangeKind, KlineAdapter, RestKlineProvider};
use crate::{MarketError, Result};

/// MEXC uses `60m` and `1W` and has no 3m or 2h candles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MexcAdapter;

impl KlineAdapter for MexcAdapter {
    fn exchange(&self) -> ExchangeKind {
        ExchangeKind::Mexc
    }

    fn interval_code(&self, interval: CandleInterval) -> Result<&'static str> {
        match interval {
            CandleInterval::OneMinute => Ok("1m"),
            CandleInterval::FiveMinutes => Ok("5m"),
            CandleInterval::FifteenMinutes => Ok("15m"),
            CandleInterval::ThirtyMinutes => Ok("30m"),
            CandleInterval::OneHour => Ok("60m"),
            CandleInterval::FourHours => Ok("4h"),
            CandleInterval::OneDay => Ok("1d"),
            CandleInterval::OneWeek => Ok("1W"),
            CandleInterval::OneMonth => Ok("1M"),
            CandleInterval::ThreeMinutes | CandleInterval::TwoHours => {
                Err(MarketError::InvalidInterval(format!("{interval} (not served by MEXC)")))
            }
        }
    }
}

pub type MexcProvider = RestKlineProvider<MexcAdapter>;

impl RestKlineProvider<MexcAdapter> {
    pub fn mexc(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::new(base_url, timeout, MexcAdapter)
    }
}
