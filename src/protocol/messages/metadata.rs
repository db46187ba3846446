use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::ApiError,
    traits::{ReadError, ReadType, WriteError, WriteType},
};

use super::{read_array, read_nullable_array, write_array, write_nullable_array, RequestBody};

/// `None` requests metadata for every topic; `Some(&[])` requests none.
#[derive(Debug, PartialEq, Eq)]
pub struct MetadataRequest {
    pub topics: Option<Vec<String>>,
}

impl<W: Write> WriteType<W> for MetadataRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        write_nullable_array(writer, self.topics.as_deref())
    }
}

impl RequestBody for MetadataRequest {
    type ResponseBody = MetadataResponse;

    const API_KEY: ApiKey = ApiKey::Metadata;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

/// An SC or SPU endpoint as advertised by the cluster.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponseBroker {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl<R: Read> ReadType<R> for MetadataResponseBroker {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            node_id: i32::read(reader)?,
            host: String::read(reader)?,
            port: i32::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponsePartition {
    pub error: Option<ApiError>,
    pub partition_index: i32,
    pub leader_id: i32,
    pub replica_nodes: Vec<i32>,
}

impl<R: Read> ReadType<R> for MetadataResponsePartition {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            error: ApiError::new(i16::read(reader)?),
            partition_index: i32::read(reader)?,
            leader_id: i32::read(reader)?,
            replica_nodes: Vec::<i32>::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponseTopic {
    pub error: Option<ApiError>,
    pub name: String,
    pub partitions: Vec<MetadataResponsePartition>,
}

impl<R: Read> ReadType<R> for MetadataResponseTopic {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            error: ApiError::new(i16::read(reader)?),
            name: String::read(reader)?,
            partitions: read_array(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponse {
    pub controller_id: i32,
    pub brokers: Vec<MetadataResponseBroker>,
    pub topics: Vec<MetadataResponseTopic>,
}

impl<R: Read> ReadType<R> for MetadataResponse {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            controller_id: i32::read(reader)?,
            brokers: read_array(reader)?,
            topics: read_array(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_all_topics_vs_no_topics() {
        let mut all = Vec::new();
        MetadataRequest { topics: None }.write(&mut all).unwrap();
        assert_eq!(all, vec![0xff, 0xff, 0xff, 0xff]);

        let mut none = Vec::new();
        MetadataRequest {
            topics: Some(vec![]),
        }
        .write(&mut none)
        .unwrap();
        assert_eq!(none, vec![0x00, 0x00, 0x00, 0x00]);

        assert_ne!(all, none);
    }

    #[test]
    fn test_response_roundtrip() {
        let mut buf = Vec::new();
        7i32.write(&mut buf).unwrap();
        write_array(
            &mut buf,
            &[MetadataResponseBroker {
                node_id: 1001,
                host: "spu-1001.cluster.local".into(),
                port: 9005,
            }],
        )
        .unwrap();
        write_array(
            &mut buf,
            &[MetadataResponseTopic {
                error: None,
                name: "orders".into(),
                partitions: vec![MetadataResponsePartition {
                    error: None,
                    partition_index: 0,
                    leader_id: 1001,
                    replica_nodes: vec![1001],
                }],
            }],
        )
        .unwrap();

        let resp = MetadataResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(resp.controller_id, 7);
        assert_eq!(resp.topics[0].partitions[0].leader_id, 1001);
    }
}
