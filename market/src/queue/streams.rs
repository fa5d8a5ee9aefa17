//! Fetch-request queue on Redis Streams
//!
//! Every partition is its own stream, `<topic>:<n>`, read through one consumer
//! group. A consumer first drains its own pending entries (delivered before a
//! restart but never acknowledged), then blocks for new ones. Acknowledged
//! entries are deleted and every append trims the stream to roughly `max_len`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, Cmd, Pipeline, RedisError};
use shared::{connection_config, FetchRequest};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::queue::{partition_for, Delivery, FetchQueue};
use crate::{MarketError, Result};

const PAYLOAD_FIELD: &str = "payload";

/// Where the queue lives and how long any single Redis call may take.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub topic: String,
    pub partitions: usize,
    pub group: String,
    pub consumer: String,
    pub max_len: usize,
    /// How long a read waits for new entries.
    pub block: Duration,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl StreamSettings {
    pub fn new(
        topic: impl Into<String>,
        partitions: usize,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partitions,
            group: group.into(),
            consumer: consumer.into(),
            max_len: 10_000,
            block: Duration::from_millis(1_000),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(3),
        }
    }

    /// Blocking reads hold the reply for up to `block`, so their deadline is
    /// stretched by that much.
    fn reader_response_timeout(&self) -> Duration {
        self.response_timeout + self.block
    }
}

/// `XADD <key> MAXLEN ~ <max_len> * payload <json>`
fn append_command(key: &str, max_len: usize, payload: &str) -> Cmd {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(key)
        .arg(StreamMaxlen::Approx(max_len))
        .arg("*")
        .arg(PAYLOAD_FIELD)
        .arg(payload);
    cmd
}

/// Acknowledges and deletes one entry in a single round trip.
fn ack_pipeline(key: &str, group: &str, id: &str) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .xack(key, group, &[id])
        .ignore()
        .xdel(key, &[id])
        .ignore();
    pipe
}

struct PartitionReader {
    /// Dedicated connection, so a blocking read never stalls producers.
    conn: Mutex<Option<MultiplexedConnection>>,
    pending_drained: AtomicBool,
}

pub struct RedisStreamQueue {
    client: Client,
    producer: MultiplexedConnection,
    settings: StreamSettings,
    readers: Vec<PartitionReader>,
}

fn queue_err(e: RedisError) -> MarketError {
    MarketError::Queue(e.to_string())
}

impl RedisStreamQueue {
    /// Connects and makes sure every partition stream and its consumer group exist.
    pub async fn connect(client: Client, settings: StreamSettings) -> Result<Self> {
        let config = connection_config(settings.connect_timeout, settings.response_timeout);
        let producer = client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(queue_err)?;
        let queue = Self {
            client,
            producer,
            readers: (0..settings.partitions.max(1))
                .map(|_| PartitionReader {
                    conn: Mutex::new(None),
                    pending_drained: AtomicBool::new(false),
                })
                .collect(),
            settings,
        };
        queue.ensure_groups().await?;
        info!(
            topic = %queue.settings.topic,
            partitions = queue.readers.len(),
            group = %queue.settings.group,
            consumer = %queue.settings.consumer,
            max_len = queue.settings.max_len,
            "redis stream queue ready"
        );
        Ok(queue)
    }

    pub fn stream_key(&self, partition: usize) -> String {
        format!("{}:{}", self.settings.topic, partition)
    }

    async fn ensure_groups(&self) -> Result<()> {
        let mut conn = self.producer.clone();
        for partition in 0..self.readers.len() {
            let key = self.stream_key(partition);
            let created: std::result::Result<(), RedisError> =
                conn.xgroup_create_mkstream(&key, &self.settings.group, "0").await;
            match created {
                Ok(()) => debug!(stream = %key, group = %self.settings.group, "created consumer group"),
                Err(e) if e.code() == Some("BUSYGROUP") => {}
                Err(e) => return Err(queue_err(e)),
            }
        }
        Ok(())
    }

    async fn reader_connection(&self, reader: &PartitionReader) -> Result<MultiplexedConnection> {
        let mut slot = reader.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let config = connection_config(
            self.settings.connect_timeout,
            self.settings.reader_response_timeout(),
        );
        let conn = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(queue_err)?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn read_one(
        &self,
        conn: &mut MultiplexedConnection,
        key: &str,
        id: &str,
        block: Option<Duration>,
    ) -> Result<Option<StreamId>> {
        let mut options = StreamReadOptions::default()
            .group(&self.settings.group, &self.settings.consumer)
            .count(1);
        if let Some(block) = block {
            options = options.block(block.as_millis() as usize);
        }
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[key], &[id], &options)
            .await
            .map_err(queue_err)?;

        Ok(reply
            .and_then(|reply| reply.keys.into_iter().next())
            .and_then(|stream| stream.ids.into_iter().next()))
    }

    async fn ack_id(&self, conn: &mut MultiplexedConnection, key: &str, id: &str) -> Result<()> {
        ack_pipeline(key, &self.settings.group, id)
            .query_async::<()>(conn)
            .await
            .map_err(queue_err)
    }
}

#[async_trait]
impl FetchQueue for RedisStreamQueue {
    fn partitions(&self) -> usize {
        self.readers.len()
    }

    async fn enqueue(&self, request: &FetchRequest) -> Result<()> {
        let partition = partition_for(&request.pair, self.readers.len());
        let key = self.stream_key(partition);
        let payload = serde_json::to_string(request)?;

        let mut conn = self.producer.clone();
        let id: String = append_command(&key, self.settings.max_len, &payload)
            .query_async(&mut conn)
            .await
            .map_err(queue_err)?;
        debug!(
            stream = %key,
            entry_id = %id,
            request_id = %request.request_id,
            pair = %request.pair,
            interval = %request.interval,
            "enqueued fetch request"
        );
        Ok(())
    }

    async fn receive(&self, partition: usize) -> Result<Option<Delivery>> {
        let reader = self
            .readers
            .get(partition)
            .ok_or_else(|| MarketError::Queue(format!("no partition {partition}")))?;
        let key = self.stream_key(partition);
        let mut conn = self.reader_connection(reader).await?;

        loop {
            let replaying = !reader.pending_drained.load(Ordering::SeqCst);
            let entry = if replaying {
                let entry = self.read_one(&mut conn, &key, "0", None).await?;
                if entry.is_none() {
                    reader.pending_drained.store(true, Ordering::SeqCst);
                    continue;
                }
                entry
            } else {
                self.read_one(&mut conn, &key, ">", Some(self.settings.block)).await?
            };

            let Some(entry) = entry else {
                return Ok(None);
            };

            let payload: Option<String> = entry.get(PAYLOAD_FIELD);
            match payload.as_deref().map(serde_json::from_str::<FetchRequest>) {
                Some(Ok(request)) => {
                    if replaying {
                        info!(stream = %key, entry_id = %entry.id, request_id = %request.request_id, "redelivering pending fetch request");
                    }
                    return Ok(Some(Delivery {
                        partition,
                        id: entry.id,
                        request,
                    }));
                }
                Some(Err(e)) => {
                    warn!(stream = %key, entry_id = %entry.id, error = %e, "dropping undecodable fetch request");
                    self.ack_id(&mut conn, &key, &entry.id).await?;
                }
                None => {
                    warn!(stream = %key, entry_id = %entry.id, "dropping entry without payload");
                    self.ack_id(&mut conn, &key, &entry.id).await?;
                }
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let key = self.stream_key(delivery.partition);
        let mut conn = self.producer.clone();
        self.ack_id(&mut conn, &key, &delivery.id).await
    }
}
