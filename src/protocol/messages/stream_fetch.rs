//! Stream-Fetch: a long-lived, per-partition fetch continuation.
//!
//! Unlike [`crate::protocol::messages::fetch`]'s bounded, possibly
//! multi-topic/multi-partition `Fetch`, a stream is scoped to exactly one
//! partition and carries a `session_id` continuation token so the consumer
//! doesn't need to repeat the fetch offset bookkeeping: the broker picks up
//! where the previous response left off unless the client signals a new
//! start offset with `session_id = 0`.

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::ApiError,
    traits::{ReadError, ReadType, WriteError, WriteType},
};
use crate::record::Records;

use super::RequestBody;

#[derive(Debug, PartialEq, Eq)]
pub struct StreamFetchRequest {
    pub topic: String,
    pub partition: i32,
    pub fetch_offset: i64,
    pub max_bytes: i32,
    /// `0` starts a new session at `fetch_offset`; a nonzero value resumes
    /// a session previously returned in a [`StreamFetchResponse`].
    pub session_id: i32,
}

impl<W: Write> WriteType<W> for StreamFetchRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.topic.write(writer)?;
        self.partition.write(writer)?;
        self.fetch_offset.write(writer)?;
        self.max_bytes.write(writer)?;
        self.session_id.write(writer)
    }
}

impl RequestBody for StreamFetchRequest {
    type ResponseBody = StreamFetchResponse;

    const API_KEY: ApiKey = ApiKey::StreamFetch;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

#[derive(Debug, PartialEq, Eq)]
pub struct StreamFetchResponse {
    pub error: Option<ApiError>,
    pub high_watermark: i64,
    pub session_id: i32,
    pub records: Records,
}

impl<R: Read> ReadType<R> for StreamFetchResponse {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            error: ApiError::new(i16::read(reader)?),
            high_watermark: i64::read(reader)?,
            session_id: i32::read(reader)?,
            records: Records::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = StreamFetchRequest {
            topic: "orders".into(),
            partition: 0,
            fetch_offset: 10,
            max_bytes: 1_048_576,
            session_id: 0,
        };
        let mut buf = Vec::new();
        req.write(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(String::read(&mut cursor).unwrap(), "orders");
        assert_eq!(i32::read(&mut cursor).unwrap(), 0);
        assert_eq!(i64::read(&mut cursor).unwrap(), 10);
    }

    #[test]
    fn test_response_continuation_session_id() {
        let mut buf = Vec::new();
        0i16.write(&mut buf).unwrap();
        100i64.write(&mut buf).unwrap();
        77i32.write(&mut buf).unwrap();
        Records(vec![]).write(&mut buf).unwrap();

        let resp = StreamFetchResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(resp.session_id, 77);
        assert_eq!(resp.high_watermark, 100);
        assert_eq!(resp.error, None);
    }
}
