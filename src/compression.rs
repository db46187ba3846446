//! Record batch compression. Each variant maps to one of the
//! three low bits of [`crate::record::attributes::COMPRESSION_MASK`];
//! the codec itself is gated behind the matching `compression-*` Cargo
//! feature, one optional `flate2`/`lz4`/`snap`/`zstd` dependency per codec.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    /// The value stored in a record batch's `attributes` low bits.
    pub fn attribute_bits(self) -> i16 {
        match self {
            Self::None => 0,
            Self::Gzip => 1,
            Self::Snappy => 2,
            Self::Lz4 => 3,
            Self::Zstd => 4,
        }
    }

    pub fn from_attribute_bits(bits: i16) -> Result<Self> {
        match bits & crate::record::attributes::COMPRESSION_MASK {
            0 => Ok(Self::None),
            1 => Ok(Self::Gzip),
            2 => Ok(Self::Snappy),
            3 => Ok(Self::Lz4),
            4 => Ok(Self::Zstd),
            other => Err(Error::Malformed(format!(
                "unknown compression codec {other}"
            ))),
        }
    }

    pub fn compress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::None => Ok(input.to_vec()),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => {
                use std::io::Write;
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(input)
                    .map_err(|e| Error::EncodingError(e.to_string()))?;
                encoder
                    .finish()
                    .map_err(|e| Error::EncodingError(e.to_string()))
            }
            #[cfg(not(feature = "compression-gzip"))]
            Self::Gzip => Err(Error::EncodingError(
                "gzip compression requires the compression-gzip feature".into(),
            )),
            #[cfg(feature = "compression-snappy")]
            Self::Snappy => snap::raw::Encoder::new()
                .compress_vec(input)
                .map_err(|e| Error::EncodingError(e.to_string())),
            #[cfg(not(feature = "compression-snappy"))]
            Self::Snappy => Err(Error::EncodingError(
                "snappy compression requires the compression-snappy feature".into(),
            )),
            #[cfg(feature = "compression-lz4")]
            Self::Lz4 => {
                use std::io::Write;
                let mut encoder = lz4::EncoderBuilder::new()
                    .build(Vec::new())
                    .map_err(|e| Error::EncodingError(e.to_string()))?;
                encoder
                    .write_all(input)
                    .map_err(|e| Error::EncodingError(e.to_string()))?;
                let (buf, result) = encoder.finish();
                result.map_err(|e| Error::EncodingError(e.to_string()))?;
                Ok(buf)
            }
            #[cfg(not(feature = "compression-lz4"))]
            Self::Lz4 => Err(Error::EncodingError(
                "lz4 compression requires the compression-lz4 feature".into(),
            )),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd => {
                zstd::stream::encode_all(input, 0).map_err(|e| Error::EncodingError(e.to_string()))
            }
            #[cfg(not(feature = "compression-zstd"))]
            Self::Zstd => Err(Error::EncodingError(
                "zstd compression requires the compression-zstd feature".into(),
            )),
        }
    }

    pub fn decompress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::None => Ok(input.to_vec()),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => {
                use std::io::Read;
                let mut decoder = flate2::read::GzDecoder::new(input);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| Error::Malformed(e.to_string()))?;
                Ok(out)
            }
            #[cfg(not(feature = "compression-gzip"))]
            Self::Gzip => Err(Error::Malformed(
                "gzip decompression requires the compression-gzip feature".into(),
            )),
            #[cfg(feature = "compression-snappy")]
            Self::Snappy => snap::raw::Decoder::new()
                .decompress_vec(input)
                .map_err(|e| Error::Malformed(e.to_string())),
            #[cfg(not(feature = "compression-snappy"))]
            Self::Snappy => Err(Error::Malformed(
                "snappy decompression requires the compression-snappy feature".into(),
            )),
            #[cfg(feature = "compression-lz4")]
            Self::Lz4 => {
                use std::io::Read;
                let mut decoder = lz4::Decoder::new(input).map_err(|e| Error::Malformed(e.to_string()))?;
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| Error::Malformed(e.to_string()))?;
                Ok(out)
            }
            #[cfg(not(feature = "compression-lz4"))]
            Self::Lz4 => Err(Error::Malformed(
                "lz4 decompression requires the compression-lz4 feature".into(),
            )),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd => {
                zstd::stream::decode_all(input).map_err(|e| Error::Malformed(e.to_string()))
            }
            #[cfg(not(feature = "compression-zstd"))]
            Self::Zstd => Err(Error::Malformed(
                "zstd decompression requires the compression-zstd feature".into(),
            )),
        }
    }
}
