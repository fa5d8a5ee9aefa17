//! In-process queue with the same partitioning and ack semantics as the broker

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shared::FetchRequest;
use tokio::sync::{Mutex, Notify};

use crate::queue::{partition_for, Delivery, FetchQueue};
use crate::{MarketError, Result};

const RECEIVE_WAIT: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Partition {
    ready: VecDeque<(String, FetchRequest)>,
    in_flight: HashMap<String, FetchRequest>,
}

pub struct MemoryQueue {
    partitions: Vec<Mutex<Partition>>,
    signals: Vec<Notify>,
    next_id: AtomicU64,
}

impl MemoryQueue {
    pub fn new(partitions: usize) -> Self {
        let partitions = partitions.max(1);
        Self {
            partitions: (0..partitions).map(|_| Mutex::new(Partition::default())).collect(),
            signals: (0..partitions).map(|_| Notify::new()).collect(),
            next_id: AtomicU64::new(0),
        }
    }

    fn partition(&self, partition: usize) -> Result<&Mutex<Partition>> {
        self.partitions
            .get(partition)
            .ok_or_else(|| MarketError::Queue(format!("no partition {partition}")))
    }

    /// Requests waiting for delivery on `partition`.
    pub async fn pending(&self, partition: usize) -> usize {
        match self.partitions.get(partition) {
            Some(p) => p.lock().await.ready.len(),
            None => 0,
        }
    }

    /// Delivered but not yet acknowledged.
    pub async fn in_flight(&self, partition: usize) -> usize {
        match self.partitions.get(partition) {
            Some(p) => p.lock().await.in_flight.len(),
            None => 0,
        }
    }

    /// Puts every unacknowledged delivery back in front of the partition, as a
    /// broker does for a consumer that went away.
    pub async fn redeliver_unacked(&self) {
        for (index, partition) in self.partitions.iter().enumerate() {
            let mut partition = partition.lock().await;
            let mut unacked: Vec<(String, FetchRequest)> = partition.in_flight.drain().collect();
            unacked.sort_by(|a, b| b.0.cmp(&a.0));
            for entry in unacked {
                partition.ready.push_front(entry);
            }
            if !partition.ready.is_empty() {
                self.signals[index].notify_one();
            }
        }
    }

    /// Snapshot of everything waiting on `partition`, oldest first.
    pub async fn peek(&self, partition: usize) -> Vec<FetchRequest> {
        match self.partitions.get(partition) {
            Some(p) => p.lock().await.ready.iter().map(|(_, r)| r.clone()).collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl FetchQueue for MemoryQueue {
    fn partitions(&self) -> usize {
        self.partitions.len()
    }

    async fn enqueue(&self, request: &FetchRequest) -> Result<()> {
        let index = partition_for(&request.pair, self.partitions.len());
        let id = format!("{:020}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.partition(index)?
            .lock()
            .await
            .ready
            .push_back((id, request.clone()));
        self.signals[index].notify_one();
        Ok(())
    }

    async fn receive(&self, partition: usize) -> Result<Option<Delivery>> {
        let slot = self.partition(partition)?;
        for attempt in 0..2 {
            {
                let mut guard = slot.lock().await;
                if let Some((id, request)) = guard.ready.pop_front() {
                    guard.in_flight.insert(id.clone(), request.clone());
                    return Ok(Some(Delivery {
                        partition,
                        id,
                        request,
                    }));
                }
            }
            if attempt == 0 {
                let _ = tokio::time::timeout(RECEIVE_WAIT, self.signals[partition].notified()).await;
            }
        }
        Ok(None)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        self.partition(delivery.partition)?
            .lock()
            .await
            .in_flight
            .remove(&delivery.id);
        Ok(())
    }
}
