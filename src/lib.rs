//! # minipack: compact self-describing binary codec
//!
//! Converts between the MessagePack wire format and a dynamic [`Value`] tree.
//!
//! ## Wire model
//!
//! - Nil, booleans, signed and unsigned integers (up to 64 bits), 32/64-bit floats
//! - Strings (UTF-8 not enforced) and binary blobs
//! - Arrays and maps (keys restricted to nil, booleans, numbers, strings and
//!   resolved extensions that declare themselves key-eligible)
//! - Typed extension blocks: negative types are standard (timestamp = -1),
//!   0..=127 belong to applications
//!
//! ## Guarantees
//!
//! - Encoding is canonical: the narrowest tag that holds the value, and signed
//!   and unsigned integers never cross tag families.
//! - Decoding never trusts a length prefix for allocation, and nesting is bounded
//!   by [`DecodeOptions::max_depth`].
//!
//! ## Extensibility
//!
//! Encoding runs pre-encode transformers, then extension encoders, then late
//! transformers for host values nothing else could encode (see [`transform`] and
//! [`record`]). Decoding resolves extensions by type and then runs post-decode
//! transformers.
//!
//! ## Usage
//!
//! ```
//! use minipack::{Codec, Map, Value};
//!
//! let mut m = Map::new();
//! m.insert("foo", "bar");
//! let v = Value::Array(vec![Value::Map(m), Value::Int(123), Value::F64(4.5)]);
//!
//! let codec = Codec::new();
//! let bytes = codec.encode(&v).unwrap();
//! assert_eq!(bytes[..3], [0x93, 0x81, 0xa3]);
//! assert_eq!(codec.decode(&bytes).unwrap(), v);
//! ```

pub mod codec;
pub mod decoder;
pub mod dump;
pub mod encoder;
pub mod format;
pub mod reader;
pub mod record;
pub mod sequence;
pub mod timestamp;
pub mod transform;
pub mod value;

pub use codec::{decode, decode_slice, decode_slice_with_extent, encode, encode_to_vec, Codec, CodecError};
pub use decoder::{DecodeOptions, Decoder, DuplicateKeyPolicy, UnknownExtensionPolicy, UnsupportedKeyPolicy};
pub use encoder::{EncodeOptions, Encoder};
pub use record::{record_transformer, Record, RecordOptions};
pub use sequence::{decode_sequence, encode_sequence, DecodedValue, SequenceError};
pub use timestamp::Timestamp;
pub use transform::{
    compose_decode_transformers, compose_encode_transformers, extension_decode_transformer,
    map_transformer, seq_transformer, DecodeTransformer, EncodeTransformer, ExtensionDecoder,
    ExtensionEncoder,
};
pub use value::{Extension, Host, HostValue, Map, Value};
