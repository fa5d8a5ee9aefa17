//! Market: multi-exchange OHLCV ingestion and query pipeline
//!
//! - **Exchanges**: Binance and MEXC kline endpoints plus a synthetic test feed
//! - **Ingestion**: queue-driven fetch and idempotent persist with bounded retry
//! - **Query**: cache-aside reads gated by the remotely managed scheduler config
//! - **Scheduling**: cron timers that enqueue refreshes for every enabled pair
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use market::prelude::*;
//!
//! # async fn run() -> market::Result<()> {
//! let store = Arc::new(MemoryCandleStore::new());
//! let cache = Arc::new(MemoryCache::new());
//! let persistence = Arc::new(CandlePersistenceService::new(store, cache));
//! let registry = Arc::new(ProviderRegistry::new(
//!     vec![
//!         Arc::new(BinanceProvider::binance("https://api.binance.com", std::time::Duration::from_secs(10))?),
//!         Arc::new(MexcProvider::mexc("https://api.mexc.com", std::time::Duration::from_secs(10))?),
//!         Arc::new(TestCandleProvider::new()),
//!     ],
//!     false,
//! )?);
//! let ingestion = IngestionService::new(registry, persistence, RetryPolicy::default(), "binance");
//! let saved = ingestion
//!     .download_and_persist(&shared::FetchRequest::new("BTCUSDT", "1m", 10, "binance"))
//!     .await?;
//! println!("stored {saved} candles");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod data;
pub mod error;
pub mod exchange;
pub mod queue;
pub mod services;
pub mod store;

pub use error::{MarketError, Result};

// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::*;
    pub use crate::data::*;
    pub use crate::exchange::*;
    pub use crate::queue::*;
    pub use crate::services::*;
    pub use crate::store::*;

    pub use crate::{MarketError, Result};
}
