//! Sequences: several complete values written back to back in one buffer.

use crate::codec::{decode_slice_with_extent, encode, CodecError};
use crate::decoder::DecodeOptions;
use crate::encoder::EncodeOptions;
use crate::value::Value;

/// One value of a decoded sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedValue {
    pub value: Value,
    /// Start and end offset of the value's bytes in the input.
    pub byte_range: (usize, usize),
}

/// A sequence failed to decode; `offset` is where the failing value starts.
#[derive(Debug, thiserror::Error)]
#[error("value at byte {offset}: {source}")]
pub struct SequenceError {
    pub offset: usize,
    #[source]
    pub source: CodecError,
}

/// Encode each value in turn into one buffer.
pub fn encode_sequence<'a, I>(values: I, opts: &EncodeOptions) -> Result<Vec<u8>, CodecError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = Vec::new();
    for v in values {
        encode(&mut out, v, opts)?;
    }
    Ok(out)
}

/// Decode values until `bytes` is used up. The input must end exactly at a value
/// boundary; a truncated last value is an error like any other.
pub fn decode_sequence(bytes: &[u8], opts: &DecodeOptions) -> Result<Vec<DecodedValue>, SequenceError> {
    let mut values = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (consumed, result) = decode_slice_with_extent(&bytes[offset..], opts);
        match result {
            Ok(value) => {
                values.push(DecodedValue { value, byte_range: (offset, offset + consumed) });
                offset += consumed;
            }
            Err(source) => return Err(SequenceError { offset, source }),
        }
    }
    Ok(values)
}
