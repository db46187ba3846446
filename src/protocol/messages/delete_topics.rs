use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::ApiError,
    traits::{ReadError, ReadType, WriteError, WriteType},
};

use super::{read_array, write_array, RequestBody};

#[derive(Debug, PartialEq, Eq)]
pub struct DeleteTopicsRequest {
    pub topic_names: Vec<String>,
    pub timeout_ms: i32,
}

impl<W: Write> WriteType<W> for DeleteTopicsRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.topic_names.write(writer)?;
        self.timeout_ms.write(writer)
    }
}

impl RequestBody for DeleteTopicsRequest {
    type ResponseBody = DeleteTopicsResponse;

    const API_KEY: ApiKey = ApiKey::DeleteTopics;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeleteTopicsResponseTopic {
    pub name: String,
    pub error: Option<ApiError>,
}

impl<R: Read> ReadType<R> for DeleteTopicsResponseTopic {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            error: ApiError::new(i16::read(reader)?),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeleteTopicsResponse {
    pub throttle_time_ms: i32,
    pub responses: Vec<DeleteTopicsResponseTopic>,
}

impl<R: Read> ReadType<R> for DeleteTopicsResponse {
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
        let req = DeleteTopicsRequest {
            topic_names: vec!["topic".into(), "other".into()],
            timeout_ms: 100,
        };
        let mut buf = Vec::new();
        req.write(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let names = Vec::<String>::read(&mut cursor).unwrap();
        let timeout_ms = i32::read(&mut cursor).unwrap();
        assert_eq!(names, req.topic_names);
        assert_eq!(timeout_ms, req.timeout_ms);
    }

    #[test]
    fn test_response_unknown_topic() {
        let mut buf = Vec::new();
        0i32.write(&mut buf).unwrap();
        write_array(
            &mut buf,
            &[DeleteTopicsResponseTopic {
                name: "ghost".into(),
                error: Some(ApiError::UnknownTopicOrPartition),
            }],
        )
        .unwrap();

        let resp = DeleteTopicsResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(
            resp.responses[0].error,
            Some(ApiError::UnknownTopicOrPartition)
        );
    }
}
