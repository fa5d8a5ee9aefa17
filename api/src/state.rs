use std::sync::Arc;
use std::time::Duration;

use market::prelude::*;
use migration::{Migrator, MigratorTrait};
use shared::{connection_config, get_db_connection, get_redis_client, get_redis_connection, Config};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub query: Arc<CandleQueryService>,
    pub trigger: Arc<TriggerService>,
}

/// Everything the process runs: HTTP state plus the background workers.
pub struct Pipeline {
    pub state: AppState,
    pub consumer: Arc<QueueConsumer>,
    pub scheduler: Option<Arc<Scheduler>>,
}

impl Pipeline {
    pub async fn connect(config: &Config) -> Result<Self, anyhow::Error> {
        let db = Arc::new(get_db_connection(&config.database_url).await?);
        info!("Connected to database");
        Migrator::up(db.as_ref(), None).await?;
        info!("Database migrations applied");

        let redis_connect_timeout = Duration::from_millis(config.redis_connect_timeout_ms);
        let redis_response_timeout = Duration::from_millis(config.redis_response_timeout_ms);
        let redis = get_redis_client(&config.redis_url)?;
        let redis_conn = get_redis_connection(
            &redis,
            &connection_config(redis_connect_timeout, redis_response_timeout),
        )
        .await?;
        info!("Connected to redis");

        let store: Arc<dyn CandleStore> = Arc::new(SeaOrmCandleStore::new(db));
        let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(redis_conn, config.cache_prefix.as_str()));
        let mut stream_settings = StreamSettings::new(
            config.queue_topic.as_str(),
            config.queue_partitions,
            config.queue_consumer_group.as_str(),
            config.queue_consumer_name.as_str(),
        );
        stream_settings.max_len = config.queue_max_len;
        stream_settings.connect_timeout = redis_connect_timeout;
        stream_settings.response_timeout = redis_response_timeout;
        let queue: Arc<dyn FetchQueue> =
            Arc::new(RedisStreamQueue::connect(redis, stream_settings).await?);

        let timeout = Duration::from_secs(config.http_timeout_secs);
        if config.testing_mode {
            warn!("TESTING_MODE is on: every exchange id resolves to synthetic candles");
        }
        let registry = Arc::new(ProviderRegistry::new(
            vec![
                Arc::new(BinanceProvider::binance(config.binance_base_url.as_str(), timeout)?),
                Arc::new(MexcProvider::mexc(config.mexc_base_url.as_str(), timeout)?),
                Arc::new(TestCandleProvider::new()),
            ],
            config.testing_mode,
        )?);

        let config_source: Arc<dyn ConfigSource> = Arc::new(RemoteConfigClient::new(
            &config.config_service_url,
            config.internal_api_key.as_str(),
            timeout,
            cache.clone(),
            Duration::from_secs(config.config_cache_ttl_secs),
        )?);

        let persistence = Arc::new(CandlePersistenceService::new(store.clone(), cache.clone()));
        let retry = RetryPolicy::fixed(
            config.retry_max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        );
        let ingestion = Arc::new(IngestionService::new(
            registry,
            persistence,
            retry,
            config.default_exchange.as_str(),
        ));

        let scheduler = if config.scheduler_enabled {
            let table = schedule_table(&config.scheduler_cron_overrides)?;
            Some(Arc::new(Scheduler::new(
                config_source.clone(),
                queue.clone(),
                config.default_exchange.as_str(),
                table,
            )))
        } else {
            info!("Scheduler disabled");
            None
        };

        let state = AppState {
            query: Arc::new(CandleQueryService::new(
                store,
                cache,
                config_source,
                Duration::from_secs(config.candle_cache_ttl_secs),
            )),
            trigger: Arc::new(TriggerService::new(queue.clone(), config.default_exchange.as_str())),
        };

        Ok(Self {
            state,
            consumer: Arc::new(QueueConsumer::new(queue, ingestion)),
            scheduler,
        })
    }
}
