//! API-Version negotiation: the first request/response exchanged after
//! connect, used to carry the platform-version handshake (see
//! [`crate::version`]) and, in a real cluster, advertise per-API support.

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    traits::{ReadError, ReadType, WriteError, WriteType},
};

use super::{read_array, write_array, RequestBody};

#[derive(Debug, PartialEq, Eq)]
pub struct ApiVersionsRequest {
    pub client_software_name: Option<String>,
    pub client_software_version: Option<String>,
}

impl<W: Write> WriteType<W> for ApiVersionsRequest {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.client_software_name.write(writer)?;
        self.client_software_version.write(writer)
    }
}

impl RequestBody for ApiVersionsRequest {
    type ResponseBody = ApiVersionsResponse;

    const API_KEY: ApiKey = ApiKey::ApiVersions;
    const API_VERSION: ApiVersion = ApiVersion(0);
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ApiVersionsResponseApiKey {
    pub api_key: ApiKey,
    pub min_version: ApiVersion,
    pub max_version: ApiVersion,
}

impl<R: Read> ReadType<R> for ApiVersionsResponseApiKey {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            api_key: ApiKey::from(i16::read(reader)?),
            min_version: ApiVersion(i16::read(reader)?),
            max_version: ApiVersion(i16::read(reader)?),
        })
    }
}

impl<W: Write> WriteType<W> for ApiVersionsResponseApiKey {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        i16::from(self.api_key).write(writer)?;
        self.min_version.0.write(writer)?;
        self.max_version.0.write(writer)
    }
}

/// `platform_version` is the cluster's `Major.Minor.Patch` string, parsed
/// by [`crate::version::Version`] and compared against this client's
/// minimum supported version at connect time.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ApiVersionsResponse {
    pub error_code: Option<crate::protocol::error::ApiError>,
    pub api_keys: Vec<ApiVersionsResponseApiKey>,
    pub platform_version: String,
}

impl<R: Read> ReadType<R> for ApiVersionsResponse {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self {
            error_code: crate::protocol::error::ApiError::new(i16::read(reader)?),
            api_keys: read_array(reader)?,
            platform_version: String::read(reader)?,
        })
    }
}

impl<W: Write> WriteType<W> for ApiVersionsResponse {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let code = self.error_code.map(|e| e.code()).unwrap_or(0);
        code.write(writer)?;
        write_array(writer, &self.api_keys)?;
        self.platform_version.write(writer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = ApiVersionsRequest {
            client_software_name: Some("fluvio-core".into()),
            client_software_version: Some("0.1.0".into()),
        };
        let mut buf = Vec::new();
        req.write(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            Option::<String>::read(&mut cursor).unwrap(),
            Some("fluvio-core".to_string())
        );
    }

    #[test]
    fn test_response_carries_platform_version() {
        let resp = ApiVersionsResponse {
            error_code: None,
            api_keys: vec![ApiVersionsResponseApiKey {
                api_key: ApiKey::Produce,
                min_version: ApiVersion(0),
                max_version: ApiVersion(0),
            }],
            platform_version: "0.10.2".into(),
        };

        let mut buf = Vec::new();
        resp.write(&mut buf).unwrap();
        let restored = ApiVersionsResponse::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, resp);
    }
}
