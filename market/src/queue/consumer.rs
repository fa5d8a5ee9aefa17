//! Partition consumers feeding the ingestion service

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::queue::FetchQueue;
use crate::services::IngestionService;
use crate::Result;

const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Drains the queue, one task per partition.
///
/// A delivery is acknowledged once the ingestion service returns, whether it
/// succeeded or gave up after its retries; failures are already logged there.
pub struct QueueConsumer {
    queue: Arc<dyn FetchQueue>,
    ingestion: Arc<IngestionService>,
}

impl QueueConsumer {
    pub fn new(queue: Arc<dyn FetchQueue>, ingestion: Arc<IngestionService>) -> Self {
        Self { queue, ingestion }
    }

    /// Processes at most one delivery from `partition`. Returns whether one was
    /// received.
    pub async fn poll_once(&self, partition: usize) -> Result<bool> {
        let Some(delivery) = self.queue.receive(partition).await? else {
            return Ok(false);
        };

        if let Err(e) = self.ingestion.download_and_persist(&delivery.request).await {
            // Retries are exhausted; broker redelivery only covers crashes.
            warn!(
                partition,
                entry_id = %delivery.id,
                request_id = %delivery.request.request_id,
                error = %e,
                "dropping failed fetch request"
            );
        }
        self.queue.ack(&delivery).await?;
        Ok(true)
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.queue.partitions())
            .map(|partition| {
                let consumer = Arc::clone(&self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { consumer.run(partition, shutdown).await })
            })
            .collect()
    }

    async fn run(&self, partition: usize, mut shutdown: watch::Receiver<bool>) {
        info!(partition, "queue consumer started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                polled = self.poll_once(partition) => {
                    if let Err(e) = polled {
                        error!(partition, error = %e, "queue consumer error");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
        info!(partition, "queue consumer stopped");
    }
}
