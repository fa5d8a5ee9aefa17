//! Partitioned fetch-request queue
//!
//! Requests for one pair always land on the same partition, so a single
//! consumer sees them in submission order. Delivery is at-least-once.

mod consumer;
mod memory;
mod streams;

pub use self::consumer::QueueConsumer;
pub use self::memory::MemoryQueue;
pub use self::streams::{RedisStreamQueue, StreamSettings};

use async_trait::async_trait;
use shared::FetchRequest;

use crate::Result;

/// A received request, to be acknowledged once processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub partition: usize,
    /// Broker-assigned entry id.
    pub id: String,
    pub request: FetchRequest,
}

#[async_trait]
pub trait FetchQueue: Send + Sync {
    fn partitions(&self) -> usize;

    async fn enqueue(&self, request: &FetchRequest) -> Result<()>;

    /// Waits briefly for the next request on `partition`; `None` when idle.
    async fn receive(&self, partition: usize) -> Result<Option<Delivery>>;

    async fn ack(&self, delivery: &Delivery) -> Result<()>;
}

/// Stable partition for a pair: FNV-1a over the upper-cased symbol.
pub fn partition_for(pair: &str, partitions: usize) -> usize {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = pair
        .trim()
        .to_uppercase()
        .bytes()
        .fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME));
    (hash % partitions.max(1) as u64) as usize
}
