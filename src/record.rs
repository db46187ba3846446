//! Wire representation of a record batch, as carried inside Produce and
//! Fetch payloads.
//!
//! Unlike the top-level `NULLABLE_BYTES` primitive (which conflates absent
//! and empty into a single `-1` sentinel), a record's key/value/header
//! values keep the distinction: `-1` means absent, `0` means present and
//! empty.

use std::io::{Cursor, Read, Write};

use crate::protocol::primitives::{UnsignedVarint, Varint};
use crate::protocol::traits::{ReadError, ReadType, WriteError, WriteType};

/// `varint length (-1 = absent) | bytes`, used for record key/value and
/// header value -- the one place on the wire that can tell "absent" and
/// "present but empty" apart.
fn write_varint_bytes<W: Write>(b: &Option<Vec<u8>>, writer: &mut W) -> Result<(), WriteError> {
    match b {
        Some(b) => {
            Varint(i32::try_from(b.len()).map_err(WriteError::Overflow)?).write(writer)?;
            writer.write_all(b)?;
        }
        None => Varint(-1).write(writer)?,
    }
    Ok(())
}

fn read_varint_bytes<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, ReadError> {
    let len = Varint::read(reader)?.0;
    match len {
        l if l < -1 => Err(ReadError::Malformed(
            format!("invalid negative record length: {l}").into(),
        )),
        -1 => Ok(None),
        l => {
            let mut buf = vec![0u8; usize::try_from(l)?];
            reader.read_exact(&mut buf)?;
            Ok(Some(buf))
        }
    }
}

/// A single header entry: `varint name_length | utf8 name | varint
/// value_length (-1 = absent) | bytes value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

impl<R: Read> ReadType<R> for RecordHeader {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let name_len = Varint::read(reader)?.0;
        let name_len = usize::try_from(name_len)?;
        let mut name_buf = vec![0u8; name_len];
        reader.read_exact(&mut name_buf)?;
        let key = String::from_utf8(name_buf).map_err(|e| ReadError::Malformed(Box::new(e)))?;

        let value = read_varint_bytes(reader)?;
        Ok(Self { key, value })
    }
}

impl<W: Write> WriteType<W> for RecordHeader {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let name = self.key.as_bytes();
        Varint(i32::try_from(name.len()).map_err(WriteError::Overflow)?).write(writer)?;
        writer.write_all(name)?;
        write_varint_bytes(&self.value, writer)
    }
}

/// A single record inside a [`RecordBatch`].
///
/// `timestamp_delta`/`offset_delta` are relative to the batch's
/// `base_timestamp`/`base_offset`; callers normally work with absolute
/// values via [`RecordBatch::records_with_absolute_offsets`].
///
/// `headers` distinguishes an absent header mapping (`None`, length prefix
/// `-1`) from an explicit empty one (`Some(vec![])`, length prefix `0`) --
/// the same absent/empty split the key and value carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub attributes: i8,
    pub timestamp_delta: i64,
    pub offset_delta: i32,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Option<Vec<RecordHeader>>,
}

impl<R: Read> ReadType<R> for Record {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = Varint::read(reader)?.0;
        let len = usize::try_from(len)?;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let mut cursor = Cursor::new(buf);

        let attributes = i8::read(&mut cursor)?;
        let timestamp_delta = Varint::read(&mut cursor)?.0.into();
        let offset_delta = Varint::read(&mut cursor)?.0;
        let key = read_varint_bytes(&mut cursor)?;
        let value = read_varint_bytes(&mut cursor)?;

        let header_count = Varint::read(&mut cursor)?.0;
        let headers = match header_count {
            l if l < -1 => {
                return Err(ReadError::Malformed(
                    format!("invalid negative header count: {l}").into(),
                ))
            }
            -1 => None,
            l => {
                let l = usize::try_from(l)?;
                let mut headers = Vec::with_capacity(l);
                for _ in 0..l {
                    headers.push(RecordHeader::read(&mut cursor)?);
                }
                Some(headers)
            }
        };

        Ok(Self {
            attributes,
            timestamp_delta,
            offset_delta,
            key,
            value,
            headers,
        })
    }
}

impl<W: Write> WriteType<W> for Record {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let mut body = Vec::new();
        self.attributes.write(&mut body)?;
        Varint(i32::try_from(self.timestamp_delta).map_err(WriteError::Overflow)?)
            .write(&mut body)?;
        Varint(self.offset_delta).write(&mut body)?;
        write_varint_bytes(&self.key, &mut body)?;
        write_varint_bytes(&self.value, &mut body)?;

        match &self.headers {
            None => Varint(-1).write(&mut body)?,
            Some(headers) => {
                Varint(i32::try_from(headers.len()).map_err(WriteError::Overflow)?)
                    .write(&mut body)?;
                for header in headers {
                    header.write(&mut body)?;
                }
            }
        }

        Varint(i32::try_from(body.len()).map_err(WriteError::Overflow)?).write(writer)?;
        writer.write_all(&body)?;
        Ok(())
    }
}

/// Bit layout of [`RecordBatch::attributes`].
pub mod attributes {
    pub const COMPRESSION_MASK: i16 = 0b0000_0111;
    pub const TIMESTAMP_TYPE_BIT: i16 = 0b0000_1000;
    pub const TRANSACTIONAL_BIT: i16 = 0b0001_0000;
    pub const CONTROL_BIT: i16 = 0b0010_0000;
}

/// A record batch, the nested frame carried inside Produce requests and
/// Fetch responses.
///
/// `batch_length` is derived on write and verified on read; `crc` is
/// computed over every field after it (`attributes` through the record
/// array) and checked on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub partition_leader_epoch: i32,
    pub magic: i8,
    pub attributes: i16,
    pub last_offset_delta: i32,
    pub base_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub records: Vec<Record>,
}

pub const MAGIC: i8 = 2;

impl RecordBatch {
    pub fn is_compressed(&self) -> bool {
        self.attributes & attributes::COMPRESSION_MASK != 0
    }
}

impl<R: Read> ReadType<R> for RecordBatch {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let base_offset = i64::read(reader)?;
        let batch_length = i32::read(reader)?;
        let batch_length = usize::try_from(batch_length)?;

        let mut rest = vec![0u8; batch_length];
        reader.read_exact(&mut rest)?;
        let mut cursor = Cursor::new(rest);

        let partition_leader_epoch = i32::read(&mut cursor)?;
        let magic = i8::read(&mut cursor)?;
        let crc = u32::read(&mut cursor)?;

        let after_crc = &cursor.get_ref()[cursor.position() as usize..];
        let computed = crc32c::crc32c(after_crc);
        if computed != crc {
            return Err(ReadError::CrcMismatch {
                expected: crc,
                computed,
            });
        }

        let attributes = i16::read(&mut cursor)?;
        let last_offset_delta = i32::read(&mut cursor)?;
        let base_timestamp = i64::read(&mut cursor)?;
        let max_timestamp = i64::read(&mut cursor)?;
        let producer_id = i64::read(&mut cursor)?;
        let producer_epoch = i16::read(&mut cursor)?;
        let base_sequence = i32::read(&mut cursor)?;
        let record_count = i32::read(&mut cursor)?;
        let record_count = usize::try_from(record_count)?;

        // Only the record array itself is compressed; every field above
        // (including `record_count`) stays in the clear so a consumer can
        // size its read without decompressing first.
        let remaining = cursor.get_ref()[cursor.position() as usize..].to_vec();
        let compression = crate::compression::Compression::from_attribute_bits(attributes)
            .map_err(|e| ReadError::Malformed(Box::new(e)))?;
        let decompressed = compression
            .decompress(&remaining)
            .map_err(|e| ReadError::Malformed(Box::new(e)))?;
        let mut records_cursor = Cursor::new(decompressed);

        let mut records = Vec::with_capacity(record_count.min(1024));
        for _ in 0..record_count {
            // A batch can be truncated by the broker when it doesn't fit the
            // fetch's max_bytes budget; stop at the first short read instead
            // of erroring the whole response.
            match Record::read(&mut records_cursor) {
                Ok(r) => records.push(r),
                Err(ReadError::IO(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            base_offset,
            partition_leader_epoch,
            magic,
            attributes,
            last_offset_delta,
            base_timestamp,
            max_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            records,
        })
    }
}

impl<W: Write> WriteType<W> for RecordBatch {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let mut header = Vec::new();
        self.attributes.write(&mut header)?;
        self.last_offset_delta.write(&mut header)?;
        self.base_timestamp.write(&mut header)?;
        self.max_timestamp.write(&mut header)?;
        self.producer_id.write(&mut header)?;
        self.producer_epoch.write(&mut header)?;
        self.base_sequence.write(&mut header)?;
        let record_count = i32::try_from(self.records.len()).map_err(WriteError::Overflow)?;
        record_count.write(&mut header)?;

        let mut records_buf = Vec::new();
        for record in &self.records {
            record.write(&mut records_buf)?;
        }

        let compression = crate::compression::Compression::from_attribute_bits(self.attributes)
            .map_err(|e| WriteError::Malformed(Box::new(e)))?;
        let records_buf = compression
            .compress(&records_buf)
            .map_err(|e| WriteError::Malformed(Box::new(e)))?;

        let mut after_crc = header;
        after_crc.extend_from_slice(&records_buf);

        let crc = crc32c::crc32c(&after_crc);

        let mut rest = Vec::new();
        self.partition_leader_epoch.write(&mut rest)?;
        self.magic.write(&mut rest)?;
        crc.write(&mut rest)?;
        rest.extend_from_slice(&after_crc);

        self.base_offset.write(writer)?;
        let batch_length = i32::try_from(rest.len()).map_err(WriteError::Overflow)?;
        batch_length.write(writer)?;
        writer.write_all(&rest)?;
        Ok(())
    }
}

/// `write_uvarint`/`read_uvarint` are exposed at the crate root's codec
/// surface via [`UnsignedVarint`]; re-exported here since record headers and
/// batches are the only place this module otherwise touches varints.
pub use crate::protocol::primitives::UnsignedVarint as HeaderCount;

/// A `BYTES`-wrapped sequence of zero or more [`RecordBatch`]es, as carried
/// in a Fetch/Stream-Fetch partition response.
///
/// A single fetch response can span several batches (the broker appends
/// them back to back up to the requested `max_bytes`); the outer `i32`
/// length covers every batch, and a batch cut short by that budget is
/// dropped rather than erroring the whole response (same truncation
/// discipline as a single batch's own trailing record, see
/// [`RecordBatch::read`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Records(pub Vec<RecordBatch>);

impl<R: Read> ReadType<R> for Records {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len < 0 {
            return Err(ReadError::Malformed(
                format!("invalid negative records length: {len}").into(),
            ));
        }
        let len = usize::try_from(len)?;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let mut cursor = Cursor::new(buf);

        let mut batches = Vec::new();
        loop {
            let remaining = cursor.get_ref().len() as u64 - cursor.position();
            if remaining == 0 {
                break;
            }
            match RecordBatch::read(&mut cursor) {
                Ok(b) => batches.push(b),
                Err(ReadError::IO(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(ReadError::CrcMismatch { expected, computed }) => {
                    tracing::warn!(
                        expected = format_args!("{expected:#x}"),
                        computed = format_args!("{computed:#x}"),
                        "discarding record batch with CRC mismatch"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self(batches))
    }
}

impl<W: Write> WriteType<W> for Records {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let mut body = Vec::new();
        for batch in &self.0 {
            batch.write(&mut body)?;
        }
        let len = i32::try_from(body.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        writer.write_all(&body)?;
        Ok(())
    }
}

/// A produced record, not yet assigned an offset. `headers` follows
/// the wire distinction between an absent mapping and an explicit empty
/// one; order is preserved and duplicate names are permitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceRecord {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Option<Vec<(String, Option<Vec<u8>>)>>,
}

impl ProduceRecord {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: None,
            value: value.into(),
            headers: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, Option<Vec<u8>>)>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// A consumed record: a [`Record`] resolved to absolute offset and
/// timestamp, with a UTC [`chrono::DateTime`] rather than the wire's raw
/// millisecond epoch -- the boundary where wire values become the public
/// type a caller of [`crate::client::consumer::Consumer`] actually sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub offset: i64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Option<Vec<(String, Option<Vec<u8>>)>>,
}

impl RecordBatch {
    /// Resolves every contained [`Record`]'s delta-encoded offset and
    /// timestamp to absolute values, in record order.
    pub fn records_with_absolute_offsets(&self) -> Vec<ConsumedRecord> {
        self.records
            .iter()
            .map(|r| ConsumedRecord {
                offset: self.base_offset + i64::from(r.offset_delta),
                timestamp: chrono::DateTime::from_timestamp_millis(
                    self.base_timestamp + r.timestamp_delta,
                )
                .unwrap_or_default(),
                key: r.key.clone(),
                value: r.value.clone(),
                headers: r.headers.as_ref().map(|hs| {
                    hs.iter()
                        .map(|h| (h.key.clone(), h.value.clone()))
                        .collect()
                }),
            })
            .collect()
    }

    /// Builds a batch carrying `records`, assigning sequential offset
    /// deltas starting at `0` and timestamp deltas relative to
    /// `base_timestamp` (the producer's send-time clock reading, in epoch
    /// milliseconds). `base_offset` is `0` for a produce batch -- the
    /// broker assigns the real base offset and returns it in the response.
    /// `compression`'s codec bits are stored in `attributes`; the record
    /// array itself is compressed when the batch is serialized.
    pub fn from_produce_records(
        records: &[ProduceRecord],
        base_timestamp: i64,
        producer_id: i64,
        producer_epoch: i16,
        base_sequence: i32,
        compression: crate::compression::Compression,
    ) -> Self {
        let wire_records = records
            .iter()
            .enumerate()
            .map(|(i, r)| Record {
                attributes: 0,
                timestamp_delta: 0,
                offset_delta: i32::try_from(i).unwrap_or(i32::MAX),
                key: r.key.clone(),
                value: Some(r.value.clone()),
                headers: r.headers.as_ref().map(|hs| {
                    hs.iter()
                        .map(|(key, value)| RecordHeader {
                            key: key.clone(),
                            value: value.clone(),
                        })
                        .collect()
                }),
            })
            .collect::<Vec<_>>();

        Self {
            base_offset: 0,
            partition_leader_epoch: -1,
            magic: MAGIC,
            attributes: compression.attribute_bits(),
            last_offset_delta: i32::try_from(wire_records.len().saturating_sub(1)).unwrap_or(0),
            base_timestamp,
            max_timestamp: base_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            records: wire_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn sample_batch() -> RecordBatch {
        RecordBatch {
            base_offset: 0,
            partition_leader_epoch: -1,
            magic: MAGIC,
            attributes: 0,
            last_offset_delta: 1,
            base_timestamp: 1_700_000_000_000,
            max_timestamp: 1_700_000_000_100,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            records: vec![
                Record {
                    attributes: 0,
                    timestamp_delta: 0,
                    offset_delta: 0,
                    key: Some(b"key-0".to_vec()),
                    value: Some(b"Hello, Fluvio! Message #0".to_vec()),
                    headers: None,
                },
                Record {
                    attributes: 0,
                    timestamp_delta: 100,
                    offset_delta: 1,
                    key: None,
                    value: Some(vec![]),
                    headers: Some(vec![RecordHeader {
                        key: "trace-id".into(),
                        value: Some(b"abc123".to_vec()),
                    }]),
                },
            ],
        }
    }

    #[test]
    fn test_record_batch_roundtrip() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        batch.write(&mut buf).unwrap();

        let restored = RecordBatch::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(batch, restored);
    }

    #[test]
    fn test_record_key_absent_vs_present_empty_distinguishable() {
        let mut absent = Vec::new();
        write_varint_bytes(&None, &mut absent).unwrap();
        let mut empty = Vec::new();
        write_varint_bytes(&Some(vec![]), &mut empty).unwrap();

        assert_ne!(absent, empty);
        assert_eq!(read_varint_bytes(&mut Cursor::new(absent)).unwrap(), None);
        assert_eq!(
            read_varint_bytes(&mut Cursor::new(empty)).unwrap(),
            Some(vec![])
        );
    }

    #[test]
    fn test_crc_mismatch_rejected() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        batch.write(&mut buf).unwrap();

        // Flip a byte inside the CRC-protected region (well past the header).
        let last = buf.len() - 1;
        buf[last] ^= 0xff;

        let err = RecordBatch::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ReadError::CrcMismatch { .. }));
    }

    #[test]
    fn test_records_skips_crc_mismatched_batch_and_keeps_the_rest() {
        let mut corrupt = sample_batch();
        corrupt.base_offset = 0;
        let mut good = sample_batch();
        good.base_offset = 2;

        let mut corrupt_buf = Vec::new();
        corrupt.write(&mut corrupt_buf).unwrap();
        let last = corrupt_buf.len() - 1;
        corrupt_buf[last] ^= 0xff;

        let mut good_buf = Vec::new();
        good.write(&mut good_buf).unwrap();

        let mut body = corrupt_buf;
        body.extend_from_slice(&good_buf);
        let mut buf = Vec::new();
        i32::try_from(body.len()).unwrap().write(&mut buf).unwrap();
        buf.extend_from_slice(&body);

        let restored = Records::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, Records(vec![good]));
    }

    #[test]
    fn test_records_multi_batch_roundtrip() {
        let a = sample_batch();
        let mut b = sample_batch();
        b.base_offset = 2;

        let records = Records(vec![a, b]);
        let mut buf = Vec::new();
        records.write(&mut buf).unwrap();

        let restored = Records::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(records, restored);
    }

    #[test]
    fn test_records_empty() {
        let records = Records(vec![]);
        let mut buf = Vec::new();
        records.write(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);

        let restored = Records::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, Records(vec![]));
    }

    #[test]
    fn test_header_mapping_absent_vs_empty_distinguishable() {
        let absent = Record {
            attributes: 0,
            timestamp_delta: 0,
            offset_delta: 0,
            key: None,
            value: None,
            headers: None,
        };
        let empty = Record {
            headers: Some(vec![]),
            ..absent.clone()
        };

        let mut absent_buf = Vec::new();
        absent.write(&mut absent_buf).unwrap();
        let mut empty_buf = Vec::new();
        empty.write(&mut empty_buf).unwrap();

        assert_ne!(absent_buf, empty_buf);
        assert_eq!(
            Record::read(&mut Cursor::new(absent_buf)).unwrap().headers,
            None
        );
        assert_eq!(
            Record::read(&mut Cursor::new(empty_buf)).unwrap().headers,
            Some(vec![])
        );
    }

    #[test]
    fn test_records_with_absolute_offsets() {
        let batch = sample_batch();
        let resolved = batch.records_with_absolute_offsets();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].offset, 0);
        assert_eq!(resolved[1].offset, 1);
        assert_eq!(
            resolved[1].headers,
            Some(vec![("trace-id".to_string(), Some(b"abc123".to_vec()))])
        );
    }

    #[test]
    fn test_from_produce_records_assigns_sequential_deltas() {
        let records = vec![
            ProduceRecord::new(b"a".to_vec()).with_key(b"k1".to_vec()),
            ProduceRecord::new(b"b".to_vec()),
        ];
        let batch = RecordBatch::from_produce_records(
            &records,
            1_700_000_000_000,
            -1,
            -1,
            -1,
            crate::compression::Compression::None,
        );

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].offset_delta, 0);
        assert_eq!(batch.records[1].offset_delta, 1);
        assert_eq!(batch.last_offset_delta, 1);

        let mut buf = Vec::new();
        batch.write(&mut buf).unwrap();
        let restored = RecordBatch::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, batch);
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_compressed_batch_roundtrips() {
        let records = vec![
            ProduceRecord::new(b"hello, fluvio! ".repeat(8)).with_key(b"k1".to_vec()),
            ProduceRecord::new(b"more data here".to_vec()),
        ];
        let batch = RecordBatch::from_produce_records(
            &records,
            1_700_000_000_000,
            -1,
            -1,
            -1,
            crate::compression::Compression::Gzip,
        );
        assert!(batch.is_compressed());

        let mut buf = Vec::new();
        batch.write(&mut buf).unwrap();
        let restored = RecordBatch::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, batch);
        assert_eq!(restored.records.len(), 2);
    }

    #[test]
    fn test_truncated_batch_stops_at_partial_record() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        batch.write(&mut buf).unwrap();

        // Cut the frame off mid-way through the second record; the reader
        // must recompute batch_length against the truncated input or bail
        // cleanly via IO/UnexpectedEof, not panic.
        let truncated_len = buf.len() - 5;
        buf.truncate(truncated_len);

        let result = RecordBatch::read(&mut Cursor::new(buf));
        assert!(result.is_err());
    }
}
