//! Producer: per-(topic, partition) batch accumulator with size/linger
//! triggers, retried sends and per-record offset acks, built on
//! [`crate::backoff::Backoff`] for the retry loop and [`crate::partitioner`]
//! for destination selection, talking to one broker at a time through
//! `connection::Messenger`'s single-outstanding-request discipline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Mutex};
use tracing::warn;

use crate::backoff::Backoff;
use crate::client::Client;
use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::offset::Offset;
use crate::partitioner::{HashRoundRobinPartitioner, Partitioner, PartitionerConfig};
use crate::protocol::messages::{Acks, ProducePartitionData, ProduceRequest, ProduceTopicData};
use crate::record::{ProduceRecord, RecordBatch};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_LINGER: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning knobs for a [`Producer`]. `linger` of [`Duration::ZERO`]
/// is treated as "use the default" rather than "never batch" -- see the
/// open question in `DESIGN.md`.
#[derive(Debug, Clone)]
pub struct ProducerOptions {
    pub batch_size: usize,
    pub linger: Duration,
    pub max_request_size: usize,
    pub timeout: Duration,
    pub compression: Compression,
    pub acks: Acks,
    pub partitioner: Arc<dyn Partitioner>,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            linger: DEFAULT_LINGER,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            timeout: DEFAULT_TIMEOUT,
            compression: Compression::None,
            acks: Acks::LEADER,
            partitioner: Arc::new(HashRoundRobinPartitioner::new()),
        }
    }
}

impl ProducerOptions {
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = if linger.is_zero() { DEFAULT_LINGER } else { linger };
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_acks(mut self, acks: Acks) -> Self {
        self.acks = acks;
        self
    }

    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }
}

struct PendingRecord {
    record: ProduceRecord,
    ack: oneshot::Sender<Result<Offset>>,
}

#[derive(Default)]
struct PartitionBatch {
    pending: Vec<PendingRecord>,
    size_bytes: usize,
    queued_at: Option<Instant>,
}

pub(super) struct ProducerInner {
    client: Client,
    topic: String,
    options: ProducerOptions,
    pending: Mutex<HashMap<i32, PartitionBatch>>,
}

/// A producer for one topic, obtained via [`Client::producer`]. Cheap to
/// clone -- every clone shares the same pending batches, which is what
/// lets a background linger flush (spawned internally) see records
/// enqueued by the caller's own task.
#[derive(Clone)]
pub struct Producer(Arc<ProducerInner>);

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("topic", &self.0.topic)
            .finish_non_exhaustive()
    }
}

impl Producer {
    pub(super) fn new(client: Client, topic: String, options: ProducerOptions) -> Self {
        Self(Arc::new(ProducerInner {
            client,
            topic,
            options,
            pending: Mutex::new(HashMap::new()),
        }))
    }

    /// Rewraps a previously-downgraded inner handle -- used by
    /// [`Client::close`] to flush a producer it only holds a `Weak` to.
    pub(super) fn from_inner(inner: Arc<ProducerInner>) -> Self {
        Self(inner)
    }

    /// A weak handle [`Client::producer`] registers so `close()` can find
    /// and flush this producer without keeping it alive on its own.
    pub(super) fn downgrade(&self) -> std::sync::Weak<ProducerInner> {
        Arc::downgrade(&self.0)
    }

    /// Enqueues `record`, returning the offset it was assigned once its
    /// batch is actually sent. A record whose value alone exceeds
    /// `max_request_size` fails immediately without being queued.
    pub async fn send(&self, record: ProduceRecord) -> Result<Offset> {
        if record.value.len() > self.0.options.max_request_size {
            return Err(Error::RecordTooLarge);
        }

        let partitions = self.0.client.partitions_for(&self.0.topic).await?;
        let partition = self.0.options.partitioner.partition(
            record.key.as_deref(),
            PartitionerConfig {
                partition_count: u32::try_from(partitions.len()).unwrap_or(u32::MAX),
                available_partitions: &partitions,
            },
        )?;

        // Appending this record to the existing batch would push it over
        // the cap: flush what's already queued (without this record)
        // before starting a fresh batch for it.
        let exceeds_cap = {
            let pending = self.0.pending.lock().await;
            pending.get(&partition).is_some_and(|batch| {
                !batch.pending.is_empty()
                    && batch.size_bytes + record.value.len() > self.0.options.max_request_size
            })
        };
        if exceeds_cap {
            self.flush_partition(partition).await?;
        }

        let (tx, rx) = oneshot::channel();
        let should_flush_now = {
            let mut pending = self.0.pending.lock().await;
            let batch = pending.entry(partition).or_default();
            let is_first = batch.pending.is_empty();
            batch.size_bytes += record.value.len();
            batch.pending.push(PendingRecord { record, ack: tx });
            if is_first {
                batch.queued_at = Some(Instant::now());
                self.spawn_linger_flush(partition);
            }
            batch.pending.len() >= self.0.options.batch_size
                || batch.size_bytes >= self.0.options.max_request_size
        };

        if should_flush_now {
            self.flush_partition(partition).await?;
        }

        rx.await.map_err(|_| Error::Cancelled)?
    }

    /// Enqueues every record in `records`, preserving submission order,
    /// and waits for all of them to be acknowledged.
    pub async fn send_batch(&self, records: Vec<ProduceRecord>) -> Result<Vec<Offset>> {
        let mut offsets = Vec::with_capacity(records.len());
        for record in records {
            offsets.push(self.send(record).await?);
        }
        Ok(offsets)
    }

    /// Flushes every partition with outstanding records.
    pub async fn flush(&self) -> Result<()> {
        let partitions: Vec<i32> = self.0.pending.lock().await.keys().copied().collect();
        for partition in partitions {
            self.flush_partition(partition).await?;
        }
        Ok(())
    }

    fn spawn_linger_flush(&self, partition: i32) {
        let producer = self.clone();
        let linger = self.0.options.linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            if let Err(e) = producer.flush_partition(partition).await {
                warn!(partition, error = %e, "linger flush failed");
            }
        });
    }

    /// Sends whatever is currently pending for `partition` as one
    /// [`ProduceRequest`], retrying transient failures, and resolves each
    /// waiting [`Producer::send`] call with its assigned offset (or the
    /// terminal error).
    async fn flush_partition(&self, partition: i32) -> Result<()> {
        let batch = self.0.pending.lock().await.remove(&partition);
        let Some(batch) = batch else {
            return Ok(());
        };
        if batch.pending.is_empty() {
            return Ok(());
        }

        let records: Vec<ProduceRecord> = batch.pending.iter().map(|p| p.record.clone()).collect();
        let base_timestamp = chrono::Utc::now().timestamp_millis();
        let record_batch = RecordBatch::from_produce_records(
            &records,
            base_timestamp,
            -1,
            -1,
            -1,
            self.0.options.compression,
        );

        let request = ProduceRequest {
            acks: self.0.options.acks,
            timeout_ms: i32::try_from(self.0.options.timeout.as_millis()).unwrap_or(i32::MAX),
            topic_data: vec![ProduceTopicData {
                topic: self.0.topic.clone(),
                partitions: vec![ProducePartitionData {
                    partition,
                    records: record_batch,
                }],
            }],
        };

        match self.send_with_retry(partition, &request).await {
            Ok(base_offset) => {
                for (i, pending) in batch.pending.into_iter().enumerate() {
                    let offset = base_offset + i as i64;
                    let _ = pending.ack.send(Ok(offset));
                }
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                for pending in batch.pending {
                    let _ = pending
                        .ack
                        .send(Err(Error::Malformed(format!("produce failed: {message}"))));
                }
                Err(e)
            }
        }
    }

    async fn send_with_retry(&self, partition: i32, request: &ProduceRequest) -> Result<Offset> {
        let mut backoff = Backoff::new(self.0.client.config().backoff);
        loop {
            let attempt = self.send_once(partition, request).await;
            match attempt {
                Ok(offset) => return Ok(offset),
                Err(e) if e.is_retriable() => match backoff.next_delay() {
                    Some(delay) => {
                        warn!(partition, error = %e, attempt = backoff.attempts(), "retrying produce");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, partition: i32, request: &ProduceRequest) -> Result<Offset> {
        let response = self
            .0
            .client
            .request_spu(&self.0.topic, partition, request, self.0.options.timeout)
            .await?;

        let topic = response
            .responses
            .into_iter()
            .find(|t| t.topic == self.0.topic)
            .ok_or_else(|| Error::Malformed("produce response missing topic".into()))?;
        let part = topic
            .partitions
            .into_iter()
            .find(|p| p.partition == partition)
            .ok_or_else(|| Error::Malformed("produce response missing partition".into()))?;

        match part.error {
            None => Ok(part.base_offset),
            Some(err) => Err(Error::from_api_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linger_zero_falls_back_to_default() {
        let options = ProducerOptions::default().with_linger(Duration::ZERO);
        assert_eq!(options.linger, DEFAULT_LINGER);
    }

    #[test]
    fn test_explicit_linger_is_kept() {
        let options = ProducerOptions::default().with_linger(Duration::from_millis(250));
        assert_eq!(options.linger, Duration::from_millis(250));
    }

    #[test]
    fn test_default_options() {
        let options = ProducerOptions::default();
        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(options.max_request_size, DEFAULT_MAX_REQUEST_SIZE);
        assert_eq!(options.acks, Acks::LEADER);
    }
}
