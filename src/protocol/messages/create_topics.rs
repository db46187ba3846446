use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::ApiError,
    traits::{ReadError, ReadType, WriteError, WriteType},
};

use super::{read_array, write_array, RequestBody};

/// `-1` means "use the broker's default", consistent with `partitions`/
/// `replication_factor` below.
#[derive(Debug, PartialEq, Eq)]
pub struct CreateTopicRequest {
    pub name: String,
    /// `-1` requests the broker's default partition count.
    pub partitions: i32,
    /// `-1` requests the broker's default replication factor.
    pub replication_factor: i16,
    /// Retention in milliseconds, `-1` for broker default.
    pub retention_ms: i64,
    /// Segment size in bytes, `-1` for broker default.
    pub segment_bytes: i64,
}

impl<R: Read> ReadType<R> for CreateTopicRequest {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            partitions: i32::read(reader)?,
            replication_factor: i16::read(reader)?,
            retention_ms: i64::read(reader)?,
            segment_bytes: i64::read(reader)?,
        })
    }
}

impl<W: Write> WriteType<W> for CreateTopicRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.name.write(writer)?;
        self.partitions.write(writer)?;
        self.replication_factor.write(writer)?;
        self.retention_ms.write(writer)?;
        self.segment_bytes.write(writer)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CreateTopicsRequest {
    pub topics: Vec<CreateTopicRequest>,
    pub timeout_ms: i32,
}

impl<W: Write> WriteType<W> for CreateTopicsRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        write_array(writer, &self.topics)?;
        self.timeout_ms.write(writer)
    }
}

impl RequestBody for CreateTopicsRequest {
    type ResponseBody = CreateTopicsResponse;

    const API_KEY: ApiKey = ApiKey::CreateTopics;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

#[derive(Debug, PartialEq, Eq)]
pub struct CreateTopicResult {
    pub name: String,
    pub error: Option<ApiError>,
}

impl<R: Read> ReadType<R> for CreateTopicResult {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            error: ApiError::new(i16::read(reader)?),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CreateTopicsResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<CreateTopicResult>,
}

impl<R: Read> ReadType<R> for CreateTopicsResponse {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            throttle_time_ms: i32::read(reader)?,
            topics: read_array(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = CreateTopicsRequest {
            topics: vec![CreateTopicRequest {
                name: "orders".into(),
                partitions: 3,
                replication_factor: 1,
                retention_ms: 604_800_000,
                segment_bytes: -1,
            }],
            timeout_ms: 5000,
        };

        let mut buf = Vec::new();
        req.write(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let topics = read_array::<CreateTopicRequest, _>(&mut cursor).unwrap();
        let timeout_ms = i32::read(&mut cursor).unwrap();
        assert_eq!(topics, req.topics);
        assert_eq!(timeout_ms, req.timeout_ms);
    }

    #[test]
    fn test_response_topic_already_exists() {
        let mut buf = Vec::new();
        0i32.write(&mut buf).unwrap(); // throttle_time_ms
        write_array(
            &mut buf,
            &[CreateTopicResult {
                name: "orders".into(),
                error: Some(ApiError::TopicAlreadyExists),
            }],
        )
        .unwrap();

        let resp = CreateTopicsResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(resp.topics[0].error, Some(ApiError::TopicAlreadyExists));
    }
}
