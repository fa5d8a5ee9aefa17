//! Error taxonomy shared by every stage of the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// Exchange call failed, answered 4xx/5xx, or returned a malformed payload.
    #[error("{exchange} fetch failed: {message}")]
    ProviderFetch { exchange: String, message: String },

    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),

    /// Pair or interval is absent or disabled in the current scheduler config.
    #[error("{0}")]
    NotFound(String),

    #[error("scheduler config unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Invalid candle interval code: {0}")]
    InvalidInterval(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("queue error: {0}")]
    Queue(String),

    /// Wiring mistakes detected at startup (registry, cron table).
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl MarketError {
    pub fn provider(exchange: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderFetch {
            exchange: exchange.into(),
            message: message.into(),
        }
    }

    /// Whether the ingestion retry loop should try again after this error.
    ///
    /// Caller mistakes (unknown exchange, bad interval, disabled pair) are final.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedExchange(_)
                | Self::InvalidInterval(_)
                | Self::InvalidRequest(_)
                | Self::NotFound(_)
                | Self::Configuration(_)
        )
    }
}

impl From<sea_orm::DbErr> for MarketError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<redis::RedisError> for MarketError {
    fn from(e: redis::RedisError) -> Self {
        Self::Cache(e.to_string())
    }
}

pub type Result<T, E = MarketError> = std::result::Result<T, E>;
