//! Top-level encode/decode entry points, the shared error type, and [`Codec`],
//! which bundles one set of encode options with one set of decode options.

use crate::decoder::{DecodeOptions, Decoder};
use crate::encoder::{EncodeOptions, Encoder};
use crate::reader::{SliceReader, StreamReader};
use crate::value::Value;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No bytes at all were available for the field being read.
    #[error("EOF")]
    Eof,
    /// Some, but not all, bytes of the field being read were available.
    #[error("Unexpected EOF")]
    UnexpectedEof,
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Tag byte 0xc1.
    #[error("Invalid format")]
    InvalidFormat,
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Duplicate key")]
    DuplicateKey,
    #[error("Unsupported key type")]
    UnsupportedKeyType,
    #[error("Unsupported extension type: {0}")]
    UnsupportedExtensionType(i8),
    #[error("Unsupported type for encoding: {0}")]
    UnsupportedType(&'static str),
    #[error("Object too big for encoding: {0} elements")]
    TooBig(u64),
    #[error("Nesting exceeds {0} levels")]
    DepthLimitExceeded(usize),
    /// Raised by an application transformer or extension resolver.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl CodecError {
    pub fn custom(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        CodecError::Custom(e.into())
    }

    /// True for the two end-of-input variants.
    pub fn is_eof(&self) -> bool {
        matches!(self, CodecError::Eof | CodecError::UnexpectedEof)
    }
}

/// Encode one value to `w`. On error, `w` may hold a truncated encoding.
pub fn encode<W: Write>(w: W, value: &Value, opts: &EncodeOptions) -> Result<(), CodecError> {
    Encoder::new(w, opts).encode(value)
}

pub fn encode_to_vec(value: &Value, opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode(&mut out, value, opts)?;
    Ok(out)
}

/// Decode one value from a stream. Bytes after the value are left unread.
pub fn decode<R: Read>(r: R, opts: &DecodeOptions) -> Result<Value, CodecError> {
    Decoder::new(StreamReader::new(r), opts).decode()
}

/// Decode one value from the front of `bytes`; trailing bytes are ignored.
pub fn decode_slice(bytes: &[u8], opts: &DecodeOptions) -> Result<Value, CodecError> {
    decode_slice_with_extent(bytes, opts).1
}

/// Decode one value and return (bytes_consumed, result). On error the count is
/// how far the decoder got before failing.
pub fn decode_slice_with_extent(
    bytes: &[u8],
    opts: &DecodeOptions,
) -> (usize, Result<Value, CodecError>) {
    let mut reader = SliceReader::new(bytes);
    let result = Decoder::new(&mut reader, opts).decode();
    (reader.position(), result)
}

/// One encode configuration plus one decode configuration.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    pub encode_options: EncodeOptions,
    pub decode_options: DecodeOptions,
}

impl Codec {
    pub fn new() -> Self {
        Codec::default()
    }

    pub fn with_options(encode_options: EncodeOptions, decode_options: DecodeOptions) -> Self {
        Codec { encode_options, decode_options }
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        encode_to_vec(value, &self.encode_options)
    }

    pub fn encode_to<W: Write>(&self, w: W, value: &Value) -> Result<(), CodecError> {
        encode(w, value, &self.encode_options)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        decode_slice(bytes, &self.decode_options)
    }

    pub fn decode_from<R: Read>(&self, r: R) -> Result<Value, CodecError> {
        decode(r, &self.decode_options)
    }

    pub fn decode_with_extent(&self, bytes: &[u8]) -> (usize, Result<Value, CodecError>) {
        decode_slice_with_extent(bytes, &self.decode_options)
    }
}
