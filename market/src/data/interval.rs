//! Candle aggregation periods

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarketError;

/// Supported candle intervals with their exchange codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

impl CandleInterval {
    pub const ALL: [CandleInterval; 11] = [
        Self::OneMinute,
        Self::ThreeMinutes,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::TwoHours,
        Self::FourHours,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1M",
        }
    }

    /// Length in seconds; a month is fixed at 30 days.
    pub fn seconds(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::ThreeMinutes => 180,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::ThirtyMinutes => 1_800,
            Self::OneHour => 3_600,
            Self::TwoHours => 7_200,
            Self::FourHours => 14_400,
            Self::OneDay => 86_400,
            Self::OneWeek => 604_800,
            Self::OneMonth => 2_592_000,
        }
    }

    pub fn millis(&self) -> i64 {
        self.seconds() * 1_000
    }

    /// Floors an epoch-seconds timestamp to the start of its interval.
    pub fn align_seconds(&self, epoch_seconds: i64) -> i64 {
        epoch_seconds.div_euclid(self.seconds()) * self.seconds()
    }

    /// Parses an interval code.
    ///
    /// `1m` (minute) and `1M` (month) are told apart by case; every other code is
    /// matched case-insensitively.
    pub fn parse_code(code: &str) -> Result<Self, MarketError> {
        let code = code.trim();
        if let Some(exact) = Self::ALL.iter().find(|i| i.code() == code) {
            return Ok(*exact);
        }
        Self::ALL
            .iter()
            .filter(|i| !matches!(i, Self::OneMinute | Self::OneMonth))
            .find(|i| i.code().eq_ignore_ascii_case(code))
            .copied()
            .ok_or_else(|| MarketError::InvalidInterval(code.to_string()))
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CandleInterval {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_code(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_and_month_are_distinct() {
        assert_eq!(CandleInterval::parse_code("1m").unwrap(), CandleInterval::OneMinute);
        assert_eq!(CandleInterval::parse_code("1M").unwrap(), CandleInterval::OneMonth);
    }

    #[test]
    fn other_codes_ignore_case() {
        assert_eq!(CandleInterval::parse_code("1H").unwrap(), CandleInterval::OneHour);
        assert_eq!(CandleInterval::parse_code("1W").unwrap(), CandleInterval::OneWeek);
        assert_eq!(CandleInterval::parse_code(" 15m ").unwrap(), CandleInterval::FifteenMinutes);
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = CandleInterval::parse_code("7m").unwrap_err();
        assert!(matches!(err, MarketError::InvalidInterval(code) if code == "7m"));
    }

    #[test]
    fn codes_round_trip() {
        for interval in CandleInterval::ALL {
            assert_eq!(interval.code().parse::<CandleInterval>().unwrap(), interval);
        }
    }

    #[test]
    fn align_floors_to_boundary() {
        let hour = CandleInterval::OneHour;
        assert_eq!(hour.align_seconds(7_199), 3_600);
        assert_eq!(hour.align_seconds(7_200), 7_200);
        assert_eq!(CandleInterval::OneMinute.millis(), 60_000);
    }
}
