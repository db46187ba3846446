//! Bounded, possibly multi-topic/multi-partition Fetch, backing
//! [`crate::client::consumer::Consumer::fetch_batch`]. The long-lived,
//! single-partition variant is
//! [`crate::protocol::messages::stream_fetch`].

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::ApiError,
    traits::{ReadError, ReadType, WriteError, WriteType},
};
use crate::record::Records;

use super::{read_array, write_array, RequestBody};

#[derive(Debug, PartialEq, Eq)]
pub struct FetchRequestPartition {
    pub partition: i32,
    pub fetch_offset: i64,
    pub partition_max_bytes: i32,
}

impl<W: Write> WriteType<W> for FetchRequestPartition {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.partition.write(writer)?;
        self.fetch_offset.write(writer)?;
        self.partition_max_bytes.write(writer)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchRequestTopic {
    pub topic: String,
    pub partitions: Vec<FetchRequestPartition>,
}

impl<W: Write> WriteType<W> for FetchRequestTopic {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.topic.write(writer)?;
        write_array(writer, &self.partitions)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub topics: Vec<FetchRequestTopic>,
}

impl<W: Write> WriteType<W> for FetchRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.max_wait_ms.write(writer)?;
        self.min_bytes.write(writer)?;
        self.max_bytes.write(writer)?;
        write_array(writer, &self.topics)
    }
}

impl RequestBody for FetchRequest {
    type ResponseBody = FetchResponse;

    const API_KEY: ApiKey = ApiKey::Fetch;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchResponsePartition {
    pub partition_index: i32,
    pub error_code: Option<ApiError>,
    pub high_watermark: i64,
    pub records: Records,
}

impl<R: Read> ReadType<R> for FetchResponsePartition {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            partition_index: i32::read(reader)?,
            error_code: ApiError::new(i16::read(reader)?),
            high_watermark: i64::read(reader)?,
            records: Records::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchResponseTopic {
    pub topic: String,
    pub partitions: Vec<FetchResponsePartition>,
}

impl<R: Read> ReadType<R> for FetchResponseTopic {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            topic: String::read(reader)?,
            partitions: read_array(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub throttle_time_ms: i32,
    pub responses: Vec<FetchResponseTopic>,
}

impl<R: Read> ReadType<R> for FetchResponse {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            throttle_time_ms: i32::read(reader)?,
            responses: read_array(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = FetchRequest {
            max_wait_ms: 500,
            min_bytes: 1,
            max_bytes: 1_048_576,
            topics: vec![FetchRequestTopic {
                topic: "orders".into(),
                partitions: vec![FetchRequestPartition {
                    partition: 0,
                    fetch_offset: 10,
                    partition_max_bytes: 1_048_576,
                }],
            }],
        };

        let mut buf = Vec::new();
        req.write(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(i32::read(&mut cursor).unwrap(), 500);
        assert_eq!(i32::read(&mut cursor).unwrap(), 1);
        assert_eq!(i32::read(&mut cursor).unwrap(), 1_048_576);
    }

    #[test]
    fn test_response_offset_out_of_range() {
        let mut buf = Vec::new();
        0i32.write(&mut buf).unwrap();
        write_array(
            &mut buf,
            &[FetchResponseTopic {
                topic: "orders".into(),
                partitions: vec![FetchResponsePartition {
                    partition_index: 0,
                    error_code: Some(ApiError::OffsetOutOfRange),
                    high_watermark: 0,
                    records: Records(vec![]),
                }],
            }],
        )
        .unwrap();

        let resp = FetchResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(
            resp.responses[0].partitions[0].error_code,
            Some(ApiError::OffsetOutOfRange)
        );
    }
}
