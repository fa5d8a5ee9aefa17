//! Client for the service that owns the enabled pairs and intervals

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::SchedulerConfig;
use tracing::{debug, warn};

use crate::cache::{Cache, SCHEDULER_CONFIG_KEY, SCHEDULER_CONFIG_NAMESPACE};
use crate::{MarketError, Result};

pub const SCHEDULER_CONFIG_PATH: &str = "/api/v1/internal/scheduler-config";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Source of the current [`SchedulerConfig`].
///
/// Any failure is reported as [`MarketError::ConfigUnavailable`]; callers treat
/// it as "nothing is enabled".
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch_config(&self) -> Result<SchedulerConfig>;
}

/// HTTP client with a shared-cache layer in front of the config authority.
pub struct RemoteConfigClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl RemoteConfigClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
        cache: Arc<dyn Cache>,
        ttl: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), SCHEDULER_CONFIG_PATH),
            api_key: api_key.into(),
            cache,
            ttl,
        })
    }

    async fn cached(&self) -> Option<SchedulerConfig> {
        match self.cache.get(SCHEDULER_CONFIG_NAMESPACE, SCHEDULER_CONFIG_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable cached scheduler config");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "scheduler config cache read failed");
                None
            }
        }
    }

    async fn fetch_remote(&self) -> Result<SchedulerConfig> {
        let unavailable = |msg: String| MarketError::ConfigUnavailable(msg);

        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("config service answered {status}")));
        }

        response
            .json::<SchedulerConfig>()
            .await
            .map_err(|e| unavailable(format!("malformed config: {e}")))
    }
}

#[async_trait]
impl ConfigSource for RemoteConfigClient {
    async fn fetch_config(&self) -> Result<SchedulerConfig> {
        if let Some(config) = self.cached().await {
            return Ok(config);
        }

        let config = self.fetch_remote().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "could not load scheduler config");
            e
        })?;
        debug!(
            pairs = config.pairs.len(),
            intervals = config.intervals.len(),
            "loaded scheduler config"
        );

        let raw = serde_json::to_string(&config)?;
        if let Err(e) = self
            .cache
            .put(SCHEDULER_CONFIG_NAMESPACE, SCHEDULER_CONFIG_KEY, &raw, self.ttl)
            .await
        {
            warn!(error = %e, "scheduler config cache write failed");
        }
        Ok(config)
    }
}
