use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::ApiError,
    traits::{ReadError, ReadType, WriteError, WriteType},
};
use crate::record::RecordBatch;

use super::{read_array, write_array, RequestBody};

/// Acknowledgement mode: `0` = none, `1` = leader, `-1` = all.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Acks(pub i16);

impl Acks {
    pub const NONE: Self = Self(0);
    pub const LEADER: Self = Self(1);
    pub const ALL: Self = Self(-1);
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProducePartitionData {
    pub partition: i32,
    pub records: RecordBatch,
}

impl<W: Write> WriteType<W> for ProducePartitionData {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.partition.write(writer)?;
        self.records.write(writer)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProduceTopicData {
    pub topic: String,
    pub partitions: Vec<ProducePartitionData>,
}

impl<W: Write> WriteType<W> for ProduceTopicData {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.topic.write(writer)?;
        write_array(writer, &self.partitions)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProduceRequest {
    pub acks: Acks,
    pub timeout_ms: i32,
    pub topic_data: Vec<ProduceTopicData>,
}

impl<W: Write> WriteType<W> for ProduceRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.acks.0.write(writer)?;
        self.timeout_ms.write(writer)?;
        write_array(writer, &self.topic_data)
    }
}

impl RequestBody for ProduceRequest {
    type ResponseBody = ProduceResponse;

    const API_KEY: ApiKey = ApiKey::Produce;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

/// One partition's result: the base offset assigned to the batch's first
/// record (invariant: caller-visible offsets for records `0..n-1` equal
/// `base_offset + i`).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProduceResponsePartition {
    pub partition: i32,
    pub error: Option<ApiError>,
    pub base_offset: i64,
    pub log_append_time: i64,
}

impl<R: Read> ReadType<R> for ProduceResponsePartition {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            partition: i32::read(reader)?,
            error: ApiError::new(i16::read(reader)?),
            base_offset: i64::read(reader)?,
            log_append_time: i64::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProduceResponseTopic {
    pub topic: String,
    pub partitions: Vec<ProduceResponsePartition>,
}

impl<R: Read> ReadType<R> for ProduceResponseTopic {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            topic: String::read(reader)?,
            partitions: read_array(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProduceResponse {
    pub responses: Vec<ProduceResponseTopic>,
    pub throttle_time_ms: i32,
}

impl<R: Read> ReadType<R> for ProduceResponse {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            responses: read_array(reader)?,
            throttle_time_ms: i32::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn batch() -> RecordBatch {
        RecordBatch {
            base_offset: 0,
            partition_leader_epoch: -1,
            magic: crate::record::MAGIC,
            attributes: 0,
            last_offset_delta: 0,
            base_timestamp: 0,
            max_timestamp: 0,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            records: vec![],
        }
    }

    #[test]
    fn test_request_roundtrip() {
        let req = ProduceRequest {
            acks: Acks::ALL,
            timeout_ms: 5000,
            topic_data: vec![ProduceTopicData {
                topic: "orders".into(),
                partitions: vec![ProducePartitionData {
                    partition: 0,
                    records: batch(),
                }],
            }],
        };

        let mut buf = Vec::new();
        req.write(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let acks = i16::read(&mut cursor).unwrap();
        let timeout_ms = i32::read(&mut cursor).unwrap();
        assert_eq!(acks, -1);
        assert_eq!(timeout_ms, 5000);
    }

    #[test]
    fn test_response_carries_base_offset() {
        let mut buf = Vec::new();
        write_array(
            &mut buf,
            &[ProduceResponseTopic {
                topic: "orders".into(),
                partitions: vec![ProduceResponsePartition {
                    partition: 0,
                    error: None,
                    base_offset: 42,
                    log_append_time: -1,
                }],
            }],
        )
        .unwrap();
        0i32.write(&mut buf).unwrap();

        let resp = ProduceResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(resp.responses[0].partitions[0].base_offset, 42);
    }

    #[test]
    fn test_response_record_too_large() {
        let mut buf = Vec::new();
        write_array(
            &mut buf,
            &[ProduceResponseTopic {
                topic: "orders".into(),
                partitions: vec![ProduceResponsePartition {
                    partition: 0,
                    error: Some(ApiError::RecordTooLarge),
                    base_offset: -1,
                    log_append_time: -1,
                }],
            }],
        )
        .unwrap();
        0i32.write(&mut buf).unwrap();

        let resp = ProduceResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(
            resp.responses[0].partitions[0].error,
            Some(ApiError::RecordTooLarge)
        );
    }
}
