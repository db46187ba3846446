use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    traits::{ReadError, ReadType, WriteError, WriteType},
};

/// `i16 api_key | i16 api_version | i32 correlation_id | nullable_string client_id`.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestHeader {
    pub request_api_key: ApiKey,
    pub request_api_version: ApiVersion,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl<R: Read> ReadType<R> for RequestHeader {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            request_api_key: ApiKey::from(i16::read(reader)?),
            request_api_version: ApiVersion(i16::read(reader)?),
            correlation_id: i32::read(reader)?,
            client_id: Option::<String>::read(reader)?,
        })
    }
}

impl<W: Write> WriteType<W> for RequestHeader {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        i16::from(self.request_api_key).write(writer)?;
        self.request_api_version.0.write(writer)?;
        self.correlation_id.write(writer)?;
        self.client_id.write(writer)?;
        Ok(())
    }
}

/// `i32 correlation_id`.
#[derive(Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

impl<R: Read> ReadType<R> for ResponseHeader {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            correlation_id: i32::read(reader)?,
        })
    }
}

impl<W: Write> WriteType<W> for ResponseHeader {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.correlation_id.write(writer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_header_roundtrip() {
        let header = RequestHeader {
            request_api_key: ApiKey::Produce,
            request_api_version: ApiVersion(0),
            correlation_id: 42,
            client_id: Some("fluvio-core".into()),
        };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let restored = RequestHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header, restored);
    }

    #[test]
    fn test_request_header_null_client_id() {
        let header = RequestHeader {
            request_api_key: ApiKey::Fetch,
            request_api_version: ApiVersion(0),
            correlation_id: 1,
            client_id: None,
        };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let restored = RequestHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header.client_id, restored.client_id);
    }

    #[test]
    fn test_response_header_roundtrip() {
        let header = ResponseHeader { correlation_id: 7 };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let restored = ResponseHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header, restored);
    }
}
