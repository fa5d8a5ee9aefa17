use std::sync::Arc;
use std::time::Duration;

use market::cache::{Cache, MemoryCache, SCHEDULER_CONFIG_KEY, SCHEDULER_CONFIG_NAMESPACE};
use market::services::{ConfigSource, RemoteConfigClient};
use market::MarketError;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn config_json() -> serde_json::Value {
    json!({
        "pairs": [
            {"symbol": "BTCUSDT", "baseAsset": "BTC", "quoteAsset": "USDT"},
            {"symbol": "ETHUSDT", "baseAsset": "ETH", "quoteAsset": "USDT"}
        ],
        "intervals": [{"intervalCode": "1m"}, {"intervalCode": "1h"}]
    })
}

fn client(server: &MockServer, cache: Arc<MemoryCache>) -> RemoteConfigClient {
    RemoteConfigClient::new(
        &server.uri(),
        "secret-key",
        Duration::from_secs(5),
        cache,
        Duration::from_secs(30),
    )
    .unwrap()
}

#[tokio::test]
async fn fetches_with_api_key_and_caches_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/internal/scheduler-config"))
        .and(header("X-API-Key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_json()))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let client = client(&server, cache.clone());

    let first = client.fetch_config().await.unwrap();
    let second = client.fetch_config().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.pairs.len(), 2);
    assert!(first.is_pair_enabled("ETHUSDT"));
    assert!(first.is_interval_enabled("1h"));
    assert!(cache
        .get(SCHEDULER_CONFIG_NAMESPACE, SCHEDULER_CONFIG_KEY)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn server_error_is_config_unavailable_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/internal/scheduler-config"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let client = client(&server, cache.clone());

    for _ in 0..2 {
        let err = client.fetch_config().await.unwrap_err();
        assert!(matches!(err, MarketError::ConfigUnavailable(_)));
    }
    assert_eq!(cache.len(SCHEDULER_CONFIG_NAMESPACE).await, 0);
}

#[tokio::test]
async fn rejected_api_key_is_config_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/internal/scheduler-config"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(MemoryCache::new()));
    assert!(matches!(
        client.fetch_config().await,
        Err(MarketError::ConfigUnavailable(_))
    ));
}

#[tokio::test]
async fn unreachable_authority_is_config_unavailable() {
    let client = RemoteConfigClient::new(
        "http://127.0.0.1:1",
        "secret-key",
        Duration::from_secs(1),
        Arc::new(MemoryCache::new()),
        Duration::from_secs(30),
    )
    .unwrap();
    assert!(matches!(
        client.fetch_config().await,
        Err(MarketError::ConfigUnavailable(_))
    ));
}
