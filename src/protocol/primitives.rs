//! Primitive wire types.
//!
//! All multi-byte integers are big-endian. Variable-length integers use the
//! ZigZag + LEB128 encoding described in [RFC: Protocol Buffers encoding].
//!
//! [RFC: Protocol Buffers encoding]: https://developers.google.com/protocol-buffers/docs/encoding

use std::io::{Read, Write};

use integer_encoding::{VarIntReader, VarIntWriter};
#[cfg(test)]
use proptest::prelude::*;

use super::traits::{ReadError, ReadType, WriteError, WriteType};

impl<R: Read> ReadType<R> for bool {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

impl<W: Write> WriteType<W> for bool {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&[u8::from(*self)])?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i8 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(i8::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i8 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i16 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i16 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i32 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i32 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for u32 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for u32 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i64 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i64 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

/// Signed, variable-length integer using ZigZag + LEB128 encoding.
///
/// `(n << 1) XOR (n >> 31)` maps small-magnitude negative numbers to small
/// encoded lengths, then LEB128 splits the result into 7-bit groups, LSB
/// first, with the continuation bit set on every group but the last.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Varint(pub i32);

impl<R: Read> ReadType<R> for Varint {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        // integer-encoding decodes into an i64 internally; downcast with a checked
        // conversion rather than trusting the wire to respect our 32-bit domain.
        let i: i64 = reader.read_varint()?;
        Ok(Self(i32::try_from(i)?))
    }
}

impl<W: Write> WriteType<W> for Varint {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_varint(self.0)?;
        Ok(())
    }
}

/// Signed, variable-length 64-bit integer, same encoding as [`Varint`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Varlong(pub i64);

impl<R: Read> ReadType<R> for Varlong {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Ok(Self(reader.read_varint()?))
    }
}

impl<W: Write> WriteType<W> for Varlong {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_varint(self.0)?;
        Ok(())
    }
}

/// Unsigned LEB128 variable-length integer (no ZigZag step).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct UnsignedVarint(pub u32);

impl<R: Read> ReadType<R> for UnsignedVarint {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        let mut res: u32 = 0;
        let mut shift = 0;
        loop {
            reader.read_exact(&mut buf)?;
            let c: u32 = buf[0].into();

            res |= (c & 0x7f) << shift;
            shift += 7;

            if (c & 0x80) == 0 {
                break;
            }
            if shift > 31 {
                return Err(ReadError::Malformed(
                    String::from("Overflow while reading unsigned varint").into(),
                ));
            }
        }

        Ok(Self(res))
    }
}

impl<W: Write> WriteType<W> for UnsignedVarint {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let mut curr = self.0;
        loop {
            let mut c = (curr & 0x7f) as u8;
            curr >>= 7;
            if curr > 0 {
                c |= 0x80;
            }
            writer.write_all(&[c])?;

            if curr == 0 {
                break;
            }
        }
        Ok(())
    }
}

/// `NULLABLE_STRING`: `i16` length (`-1` for absent) followed by UTF-8 bytes.
///
/// Max length is `i16::MAX` (32767); longer strings fail encoding rather
/// than silently truncating.
impl<R: Read> ReadType<R> for Option<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i16::read(reader)?;
        match len {
            l if l < -1 => Err(ReadError::Malformed(
                format!("Invalid negative length for nullable string: {l}").into(),
            )),
            -1 => Ok(None),
            l => {
                let len = usize::try_from(l)?;
                let mut buf = vec![0u8; len];
                reader.read_exact(&mut buf)?;
                let s = String::from_utf8(buf).map_err(|e| ReadError::Malformed(Box::new(e)))?;
                Ok(Some(s))
            }
        }
    }
}

impl<W: Write> WriteType<W> for Option<String> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        match self {
            Some(s) => {
                let l = i16::try_from(s.len()).map_err(|_| {
                    WriteError::Malformed(
                        format!("string of {} bytes exceeds max length 32767", s.len()).into(),
                    )
                })?;
                l.write(writer)?;
                writer.write_all(s.as_bytes())?;
                Ok(())
            }
            None => (-1i16).write(writer),
        }
    }
}

impl<R: Read> ReadType<R> for String {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        Option::<String>::read(reader)?
            .ok_or_else(|| ReadError::Malformed("unexpected null string".into()))
    }
}

impl<W: Write> WriteType<W> for String {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        Some(self.clone()).write(writer)
    }
}

/// `NULLABLE_BYTES`: absent *or* empty both collapse to `i32 = -1`. This
/// is a lossy convention inherent to this particular wire field -- see
/// [`crate::record`] for the distinct, non-lossy convention used inside a
/// record batch.
pub fn write_nullable_bytes<W: Write>(b: Option<&[u8]>, writer: &mut W) -> Result<(), WriteError> {
    match b {
        Some(b) if !b.is_empty() => {
            let l = i32::try_from(b.len()).map_err(WriteError::Overflow)?;
            l.write(writer)?;
            writer.write_all(b)?;
            Ok(())
        }
        _ => (-1i32).write(writer),
    }
}

pub fn read_nullable_bytes<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, ReadError> {
    let len = i32::read(reader)?;
    match len {
        l if l < -1 => Err(ReadError::Malformed(
            format!("Invalid negative length for nullable bytes: {l}").into(),
        )),
        -1 => Ok(None),
        l => {
            let len = usize::try_from(l)?;
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            Ok(Some(buf))
        }
    }
}

/// `BYTES`: always-present, `i32`-length-prefixed byte string.
impl<R: Read> ReadType<R> for Vec<u8> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len < 0 {
            return Err(ReadError::Malformed(
                format!("Invalid length for bytes: {len}").into(),
            ));
        }
        let len = usize::try_from(len)?;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<W: Write> WriteType<W> for Vec<u8> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let l = i32::try_from(self.len()).map_err(WriteError::Overflow)?;
        l.write(writer)?;
        writer.write_all(self)?;
        Ok(())
    }
}

/// `ARRAY<STRING>`: `i32` count (`-1` for null, treated as empty) then
/// that many [`String`]s.
impl<R: Read> ReadType<R> for Vec<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len <= 0 {
            return Ok(vec![]);
        }
        let len = usize::try_from(len)?;
        let mut res = Vec::with_capacity(len);
        for _ in 0..len {
            res.push(String::read(reader)?);
        }
        Ok(res)
    }
}

impl<W: Write> WriteType<W> for Vec<String> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        if self.is_empty() {
            return (-1i32).write(writer);
        }
        let len = i32::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        for elem in self {
            elem.write(writer)?;
        }
        Ok(())
    }
}

/// `ARRAY<INT32>`.
impl<R: Read> ReadType<R> for Vec<i32> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len <= 0 {
            return Ok(vec![]);
        }
        let len = usize::try_from(len)?;
        let mut res = Vec::with_capacity(len);
        for _ in 0..len {
            res.push(i32::read(reader)?);
        }
        Ok(res)
    }
}

impl<W: Write> WriteType<W> for Vec<i32> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        if self.is_empty() {
            return (-1i32).write(writer);
        }
        let len = i32::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        for elem in self {
            elem.write(writer)?;
        }
        Ok(())
    }
}
