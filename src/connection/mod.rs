//! Connection plumbing: the wire frame on top of a [`transport::Transport`]
//! byte stream, and the broker topology cache that tells a
//! [`crate::client::Client`] which endpoint serves which partition.

pub mod topology;
pub mod transport;

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::protocol::messages::header::RequestHeader;
use crate::protocol::messages::RequestBody;
use crate::protocol::traits::{ReadType, WriteType};

pub use topology::{Broker, BrokerTopology, TopicMetadata};
pub use transport::Transport;

/// A connection to a single broker (SC or SPU).
///
/// Frames requests/responses per the wire format and serializes
/// concurrent callers through a mutex so at most one request is
/// outstanding at a time -- the simplest possible outstanding-correlation
/// discipline for a shared connection.
#[derive(Debug)]
pub struct Messenger {
    endpoint: String,
    stream: Mutex<Transport>,
    correlation_id: AtomicI32,
    client_id: Option<String>,
}

impl Messenger {
    pub async fn connect(
        endpoint: &str,
        client_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let stream = Transport::connect(endpoint, Some(timeout))
            .await
            .map_err(|e| Error::ConnectFailed {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            stream: Mutex::new(stream),
            correlation_id: AtomicI32::new(0),
            client_id,
        })
    }

    /// Issues `body` and waits for its typed response, honoring `timeout`
    /// as the per-request deadline.
    pub async fn request<R: RequestBody>(&self, body: &R, timeout: Duration) -> Result<R::ResponseBody> {
        tokio::time::timeout(timeout, self.request_inner(body))
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn request_inner<R: RequestBody>(&self, body: &R) -> Result<R::ResponseBody> {
        let correlation_id = self.correlation_id.fetch_add(1, Ordering::Relaxed);

        let header = RequestHeader {
            request_api_key: R::API_KEY,
            request_api_version: R::API_VERSION,
            correlation_id,
            client_id: self.client_id.clone(),
        };

        let mut payload = Vec::new();
        header.write(&mut payload)?;
        body.write(&mut payload)?;

        let size = i32::try_from(payload.len())
            .map_err(|_| Error::EncodingError("request payload exceeds i32::MAX".into()))?;

        let mut framed = Vec::with_capacity(4 + payload.len());
        size.write(&mut framed)?;
        framed.extend_from_slice(&payload);

        let mut stream = self.stream.lock().await;

        stream
            .write_all(&framed)
            .await
            .map_err(|_| Error::Disconnected {
                endpoint: self.endpoint.clone(),
            })?;

        let mut size_buf = [0u8; 4];
        stream
            .read_exact(&mut size_buf)
            .await
            .map_err(|_| Error::Disconnected {
                endpoint: self.endpoint.clone(),
            })?;
        let response_size = i32::from_be_bytes(size_buf);
        if response_size < 0 {
            return Err(Error::Malformed(format!(
                "negative response size: {response_size}"
            )));
        }

        let mut response_buf = vec![0u8; response_size as usize];
        stream
            .read_exact(&mut response_buf)
            .await
            .map_err(|_| Error::Disconnected {
                endpoint: self.endpoint.clone(),
            })?;
        drop(stream);

        let mut cursor = std::io::Cursor::new(response_buf);
        let response_header = crate::protocol::messages::ResponseHeader::read(&mut cursor)?;
        if response_header.correlation_id != correlation_id {
            return Err(Error::Malformed(format!(
                "correlation id mismatch: sent {correlation_id}, received {}",
                response_header.correlation_id
            )));
        }

        Ok(R::ResponseBody::read(&mut cursor)?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_header_round_trips_through_write_read() {
        let header = RequestHeader {
            request_api_key: crate::protocol::api_key::ApiKey::Produce,
            request_api_version: crate::protocol::api_version::ApiVersion(0),
            correlation_id: 5,
            client_id: Some("fluvio-core".into()),
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let restored = RequestHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored.correlation_id, 5);
    }
}
