//! Request/response message bodies.
//!
//! Every API in this protocol has exactly one wire shape (no per-field
//! version branching like Kafka's), so message bodies implement the plain
//! [`ReadType`]/[`WriteType`] traits directly rather than a parallel
//! versioned hierarchy.

use std::io::{Cursor, Read, Write};

use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::ApiVersion;
use crate::protocol::traits::{ReadError, ReadType, WriteError, WriteType};

pub mod api_versions;
pub mod create_topics;
pub mod delete_topics;
pub mod fetch;
pub mod header;
pub mod metadata;
pub mod produce;
pub mod stream_fetch;

pub use api_versions::{ApiVersionsRequest, ApiVersionsResponse, ApiVersionsResponseApiKey};
pub use create_topics::{CreateTopicRequest, CreateTopicResult, CreateTopicsRequest, CreateTopicsResponse};
pub use delete_topics::{DeleteTopicsRequest, DeleteTopicsResponse, DeleteTopicsResponseTopic};
pub use fetch::{FetchRequest, FetchRequestPartition, FetchRequestTopic, FetchResponse, FetchResponsePartition, FetchResponseTopic};
pub use header::{RequestHeader, ResponseHeader};
pub use metadata::{MetadataRequest, MetadataResponse, MetadataResponseBroker, MetadataResponsePartition, MetadataResponseTopic};
pub use produce::{Acks, ProducePartitionData, ProduceRequest, ProduceResponse, ProduceResponsePartition, ProduceResponseTopic, ProduceTopicData};
pub use stream_fetch::{StreamFetchRequest, StreamFetchResponse};

/// Ties a request body to its fixed API key/version and response type.
pub trait RequestBody: WriteType<Vec<u8>> {
    type ResponseBody: ReadType<Cursor<Vec<u8>>>;

    const API_KEY: ApiKey;
    const API_VERSION: ApiVersion;
}

/// `ARRAY<T>`: `i32` count (negative treated as empty/null) then that many
/// `T`s, read/written with plain [`ReadType`]/[`WriteType`].
pub fn read_array<T, R>(reader: &mut R) -> Result<Vec<T>, ReadError>
where
    T: ReadType<R>,
    R: Read,
{
    let len = i32::read(reader)?;
    if len <= 0 {
        return Ok(vec![]);
    }
    let len = usize::try_from(len)?;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(T::read(reader)?);
    }
    Ok(out)
}

pub fn write_array<T, W>(writer: &mut W, items: &[T]) -> Result<(), WriteError>
where
    T: WriteType<W>,
    W: Write,
{
    if items.is_empty() {
        return (-1i32).write(writer);
    }
    let len = i32::try_from(items.len()).map_err(WriteError::Overflow)?;
    len.write(writer)?;
    for item in items {
        item.write(writer)?;
    }
    Ok(())
}

/// Like [`read_array`]/[`write_array`], but `-1` (null) and an explicit
/// zero-length array stay distinguishable: used where "all topics" (null)
/// and "no topics" (empty) are different requests.
pub fn read_nullable_array<T, R>(reader: &mut R) -> Result<Option<Vec<T>>, ReadError>
where
    T: ReadType<R>,
    R: Read,
{
    let len = i32::read(reader)?;
    match len {
        l if l < -1 => Err(ReadError::Malformed(
            format!("invalid negative array length: {l}").into(),
        )),
        -1 => Ok(None),
        l => {
            let l = usize::try_from(l)?;
            let mut out = Vec::with_capacity(l);
            for _ in 0..l {
                out.push(T::read(reader)?);
            }
            Ok(Some(out))
        }
    }
}

pub fn write_nullable_array<T, W>(writer: &mut W, items: Option<&[T]>) -> Result<(), WriteError>
where
    T: WriteType<W>,
    W: Write,
{
    match items {
        None => (-1i32).write(writer),
        Some(items) => {
            let len = i32::try_from(items.len()).map_err(WriteError::Overflow)?;
            len.write(writer)?;
            for item in items {
                item.write(writer)?;
            }
            Ok(())
        }
    }
}
