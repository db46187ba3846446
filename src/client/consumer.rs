//! Consumer: a bounded [`Consumer::fetch_batch`] and a pull-based,
//! restartable [`Consumer::stream`] over a single partition, built on
//! [`crate::protocol::messages::fetch`]/[`crate::protocol::messages::stream_fetch`]
//! for the two wire shapes and on [`crate::offset::resolve`] for
//! start-offset bookkeeping.

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::Stream;

use crate::backoff::Backoff;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::offset::{self, Offset, OffsetStrategy};
use crate::protocol::messages::{
    FetchRequest, FetchRequestPartition, FetchRequestTopic, StreamFetchRequest,
};
use crate::record::ConsumedRecord;

pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BYTES: i32 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    pub max_wait: Duration,
    pub max_bytes: i32,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// A consumer bound to a single `(topic, partition)`, obtained via
/// [`Client::consumer`].
#[derive(Debug, Clone)]
pub struct Consumer {
    client: Client,
    topic: String,
    partition: i32,
    options: ConsumerOptions,
}

impl Consumer {
    pub(super) fn new(client: Client, topic: String, partition: i32) -> Self {
        Self {
            client,
            topic,
            partition,
            options: ConsumerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConsumerOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolves `strategy`/`explicit` against `stored` (C7) to the offset
    /// a fetch should start at. A thin wrapper so callers don't need to
    /// import [`crate::offset`] separately.
    pub fn resolve_offset(
        &self,
        stored: Option<Offset>,
        strategy: OffsetStrategy,
        explicit: Option<Offset>,
    ) -> Offset {
        offset::resolve(stored, strategy, explicit)
    }

    /// A single bounded fetch starting at `offset`. Returns whatever the
    /// broker had ready within `max_bytes` (defaulting to
    /// [`ConsumerOptions::max_bytes`]) -- it may be fewer records than
    /// exist, and it may be empty if nothing is available yet.
    pub async fn fetch_batch(
        &self,
        offset: Offset,
        max_bytes: Option<i32>,
    ) -> Result<Vec<ConsumedRecord>> {
        let max_bytes = max_bytes.unwrap_or(self.options.max_bytes);

        let request = FetchRequest {
            max_wait_ms: i32::try_from(self.options.max_wait.as_millis()).unwrap_or(i32::MAX),
            min_bytes: 1,
            max_bytes,
            topics: vec![FetchRequestTopic {
                topic: self.topic.clone(),
                partitions: vec![FetchRequestPartition {
                    partition: self.partition,
                    fetch_offset: offset,
                    partition_max_bytes: max_bytes,
                }],
            }],
        };

        let response = self
            .client
            .request_spu(
                &self.topic,
                self.partition,
                &request,
                self.client.config().request_timeout,
            )
            .await?;
        let topic = response
            .responses
            .into_iter()
            .find(|t| t.topic == self.topic)
            .ok_or_else(|| Error::Malformed("fetch response missing topic".into()))?;
        let part = topic
            .partitions
            .into_iter()
            .find(|p| p.partition_index == self.partition)
            .ok_or_else(|| Error::Malformed("fetch response missing partition".into()))?;

        if let Some(err) = part.error_code {
            if matches!(
                err,
                crate::protocol::error::ApiError::UnknownTopicOrPartition
                    | crate::protocol::error::ApiError::LeaderNotAvailable
            ) {
                self.client.0.topology.invalidate_topic(&self.topic);
            }
            return Err(Error::from_api_error(err));
        }

        Ok(part
            .records
            .0
            .iter()
            .flat_map(|batch| batch.records_with_absolute_offsets())
            .collect())
    }

    /// A lazy, pull-based stream of records starting at `start_offset`.
    /// Each poll asks the broker to continue the previous Stream-Fetch
    /// session (`session_id`); a leadership change or a transient broker
    /// error is retried internally with backoff rather than ending the
    /// stream, so restarting simply means creating a new stream at
    /// `last_delivered_offset + 1`.
    pub fn stream(&self, start_offset: Offset) -> impl Stream<Item = Result<ConsumedRecord>> {
        let consumer = self.clone();
        futures::stream::unfold(
            StreamState {
                consumer,
                offset: start_offset,
                session_id: 0,
                buffer: VecDeque::new(),
                backoff: Backoff::new(crate::backoff::BackoffConfig::default()),
            },
            |mut state| async move {
                loop {
                    if let Some(record) = state.buffer.pop_front() {
                        state.offset = record.offset + 1;
                        return Some((Ok(record), state));
                    }

                    match state
                        .consumer
                        .stream_fetch_once(state.offset, state.session_id)
                        .await
                    {
                        Ok((records, session_id)) => {
                            state.session_id = session_id;
                            state.backoff = Backoff::new(crate::backoff::BackoffConfig::default());
                            if records.is_empty() {
                                tokio::time::sleep(Duration::from_millis(50)).await;
                                continue;
                            }
                            state.buffer.extend(records);
                        }
                        Err(e) if e.is_retriable() => match state.backoff.next_delay() {
                            Some(delay) => {
                                state.session_id = 0;
                                tokio::time::sleep(delay).await;
                            }
                            None => return Some((Err(e), state)),
                        },
                        Err(e) => return Some((Err(e), state)),
                    }
                }
            },
        )
    }

    async fn stream_fetch_once(
        &self,
        offset: Offset,
        session_id: i32,
    ) -> Result<(Vec<ConsumedRecord>, i32)> {
        let request = StreamFetchRequest {
            topic: self.topic.clone(),
            partition: self.partition,
            fetch_offset: offset,
            max_bytes: self.options.max_bytes,
            session_id,
        };

        let response = self
            .client
            .request_spu(
                &self.topic,
                self.partition,
                &request,
                self.client.config().request_timeout,
            )
            .await?;
        if let Some(err) = response.error {
            if matches!(
                err,
                crate::protocol::error::ApiError::UnknownTopicOrPartition
                    | crate::protocol::error::ApiError::LeaderNotAvailable
            ) {
                self.client.0.topology.invalidate_topic(&self.topic);
            }
            return Err(Error::from_api_error(err));
        }

        let records = response
            .records
            .0
            .iter()
            .flat_map(|batch| batch.records_with_absolute_offsets())
            .collect();
        Ok((records, response.session_id))
    }
}

struct StreamState {
    consumer: Consumer,
    offset: Offset,
    session_id: i32,
    buffer: VecDeque<ConsumedRecord>,
    backoff: Backoff,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_consumer_options() {
        let options = ConsumerOptions::default();
        assert_eq!(options.max_wait, DEFAULT_MAX_WAIT);
        assert_eq!(options.max_bytes, DEFAULT_MAX_BYTES);
    }
}
