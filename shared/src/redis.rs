use std::time::Duration;

use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::{AsyncConnectionConfig, Client};

pub type Redis = Client;

pub fn get_redis_client(redis_url: &str) -> Result<Redis> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Connection settings that bound both the handshake and every reply.
pub fn connection_config(connect_timeout: Duration, response_timeout: Duration) -> AsyncConnectionConfig {
    AsyncConnectionConfig::new()
        .set_connection_timeout(connect_timeout)
        .set_response_timeout(response_timeout)
}

/// Opens a multiplexed connection; clones share the same socket.
pub async fn get_redis_connection(
    client: &Redis,
    config: &AsyncConnectionConfig,
) -> Result<MultiplexedConnection> {
    let conn = client.get_multiplexed_async_connection_with_config(config).await?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn unresponsive_server_times_out() {
        // Accepts sockets but never answers the handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = get_redis_client(&format!("redis://{addr}")).unwrap();
        let config = connection_config(Duration::from_millis(200), Duration::from_millis(200));
        let attempt = tokio::time::timeout(
            Duration::from_secs(5),
            get_redis_connection(&client, &config),
        )
        .await;

        assert!(matches!(attempt, Ok(Err(_))), "connect should fail on its own deadline");
    }
}
