//! Cluster admin operations: create/delete topic against the SC, wrapped
//! in the shared exponential-backoff retry loop. This protocol has no
//! consumer-group coordination, so `ControllerClient` carries only the
//! topic lifecycle; `create_topic`/`delete_topic` follow the same
//! retry-then-invalidate-cache shape as the rest of the admin surface.

use tracing::warn;

use crate::backoff::Backoff;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::protocol::messages::{
    CreateTopicRequest, CreateTopicsRequest, DeleteTopicsRequest,
};
use crate::topic::TopicSpec;

/// A client for cluster-wide admin operations, obtained via
/// [`Client::admin`].
#[derive(Debug, Clone)]
pub struct ControllerClient {
    client: Client,
}

impl ControllerClient {
    pub(super) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates `name` with `spec`, retrying transient failures per the
    /// client's [`crate::backoff::BackoffConfig`].
    pub async fn create_topic(&self, name: impl Into<String>, spec: &TopicSpec) -> Result<()> {
        let name = name.into();
        if !crate::topic::is_valid_topic_name(&name) {
            return Err(Error::Malformed(format!("invalid topic name: {name}")));
        }

        let request = CreateTopicsRequest {
            topics: vec![CreateTopicRequest {
                name: name.clone(),
                partitions: i32::try_from(spec.partitions).unwrap_or(-1),
                replication_factor: i16::try_from(spec.replication_factor).unwrap_or(-1),
                retention_ms: spec
                    .retention
                    .map(|d| i64::try_from(d.as_millis()).unwrap_or(-1))
                    .unwrap_or(-1),
                segment_bytes: spec.segment_size.map(|s| s as i64).unwrap_or(-1),
            }],
            timeout_ms: i32::try_from(self.client.config().request_timeout.as_millis())
                .unwrap_or(i32::MAX),
        };

        self.retry("create_topic", || async {
            let response = self.client.request_sc(&request).await?;
            let result = response
                .topics
                .into_iter()
                .find(|t| t.name == name)
                .ok_or_else(|| Error::Malformed("create_topic response missing topic".into()))?;

            match result.error {
                None => Ok(()),
                Some(err) => Err(Error::from_api_error(err)),
            }
        })
        .await?;

        let _ = self.client.refresh_topic(&name).await;
        Ok(())
    }

    /// Deletes `name`, retrying transient failures.
    pub async fn delete_topic(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let request = DeleteTopicsRequest {
            topic_names: vec![name.clone()],
            timeout_ms: i32::try_from(self.client.config().request_timeout.as_millis())
                .unwrap_or(i32::MAX),
        };

        self.retry("delete_topic", || async {
            let response = self.client.request_sc(&request).await?;
            let result = response
                .responses
                .into_iter()
                .find(|t| t.name == name)
                .ok_or_else(|| Error::Malformed("delete_topic response missing topic".into()))?;

            match result.error {
                None => Ok(()),
                Some(err) => Err(Error::from_api_error(err)),
            }
        })
        .await?;

        self.client.0.topology.invalidate_topic(&name);
        Ok(())
    }

    async fn retry<T, F, Fut>(&self, request_name: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut backoff = Backoff::new(self.client.config().backoff);
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retriable() => match backoff.next_delay() {
                    Some(delay) => {
                        warn!(request_name, error = %e, attempt = backoff.attempts(), "retrying after transient error");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}
