//! Durable candle storage
//!
//! Records are unique on (symbol, interval code, open time, exchange) and are
//! never updated once written.

mod memory;
mod database;

pub use self::memory::MemoryCandleStore;
pub use self::database::SeaOrmCandleStore;

use async_trait::async_trait;

use crate::data::{CandleKey, StoredCandle};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key already existed; the stored row was left untouched.
    Duplicate,
}

/// Range query over one symbol and interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleFilter {
    pub symbol: String,
    pub interval_code: String,
    /// Inclusive bounds on open time, epoch millis.
    pub start_time: i64,
    pub end_time: i64,
    pub exchange: Option<String>,
    pub limit: u64,
}

#[async_trait]
pub trait CandleStore: Send + Sync {
    async fn exists(&self, key: &CandleKey) -> Result<bool>;

    /// Insert-if-absent. A unique-key collision is reported as
    /// [`InsertOutcome::Duplicate`], not as an error.
    async fn insert(&self, candle: StoredCandle) -> Result<InsertOutcome>;

    /// Matching records, newest open time first.
    async fn find_range(&self, filter: &CandleFilter) -> Result<Vec<StoredCandle>>;

    /// Interval codes with at least one record for `symbol`.
    async fn distinct_intervals(&self, symbol: &str) -> Result<Vec<String>>;
}
