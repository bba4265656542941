//! Recursive-descent decoder: one tag byte, one routine per [`Format`].
//!
//! Every decoded value comes with a key-eligibility flag. Nil, booleans, numbers
//! and strings are eligible; binaries, containers and unresolved extensions are
//! not; a resolved extension reports its own eligibility. Map entries are checked
//! against the flag of their key and against [`DecodeOptions`] policies.

use crate::codec::CodecError;
use crate::format::Format;
use crate::reader::BoundedRead;
use crate::transform::{standard_extension_decoder, DecodeTransformer, ExtensionDecoder};
use crate::value::{Extension, KeyIndex, Map, Value};
use byteorder::{BigEndian, ByteOrder};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Containers never pre-allocate more than this many slots from a wire count.
pub const MAX_PREALLOC: usize = 1000;

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyPolicy {
    #[default]
    Error,
    /// Keep the first entry, drop later ones.
    FirstWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedKeyPolicy {
    #[default]
    Error,
    /// Drop the whole entry.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownExtensionPolicy {
    /// Return `Value::Ext` with the raw payload.
    #[default]
    Passthrough,
    Error,
}

/// Decode-side configuration. Defaults are strict on keys and pass unknown
/// extensions through.
#[derive(Clone)]
pub struct DecodeOptions {
    pub duplicate_keys: DuplicateKeyPolicy,
    pub unsupported_keys: UnsupportedKeyPolicy,
    pub unknown_extensions: UnknownExtensionPolicy,
    pub max_depth: usize,
    extensions: HashMap<i8, ExtensionDecoder>,
    transformers: Vec<DecodeTransformer>,
    standard_extensions: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            duplicate_keys: DuplicateKeyPolicy::default(),
            unsupported_keys: UnsupportedKeyPolicy::default(),
            unknown_extensions: UnknownExtensionPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            extensions: HashMap::new(),
            transformers: Vec::new(),
            standard_extensions: true,
        }
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<i8> = self.extensions.keys().copied().collect();
        types.sort_unstable();
        f.debug_struct("DecodeOptions")
            .field("duplicate_keys", &self.duplicate_keys)
            .field("unsupported_keys", &self.unsupported_keys)
            .field("unknown_extensions", &self.unknown_extensions)
            .field("max_depth", &self.max_depth)
            .field("extensions", &types)
            .field("transformers", &self.transformers.len())
            .field("standard_extensions", &self.standard_extensions)
            .finish()
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        DecodeOptions::default()
    }

    /// First-wins duplicates, ineligible keys dropped.
    pub fn lenient() -> Self {
        DecodeOptions::default()
            .with_duplicate_keys(DuplicateKeyPolicy::FirstWins)
            .with_unsupported_keys(UnsupportedKeyPolicy::Drop)
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn with_unsupported_keys(mut self, policy: UnsupportedKeyPolicy) -> Self {
        self.unsupported_keys = policy;
        self
    }

    pub fn with_unknown_extensions(mut self, policy: UnknownExtensionPolicy) -> Self {
        self.unknown_extensions = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Register the decoder for application extension `ext_type`. Negative types
    /// are reserved for standard extensions; registering one is ignored.
    pub fn with_extension<F>(mut self, ext_type: i8, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<(Value, bool), CodecError> + Send + Sync + 'static,
    {
        if ext_type < 0 {
            log::warn!("ignoring application decoder for reserved extension type {}", ext_type);
            return self;
        }
        self.extensions.insert(ext_type, Arc::new(f));
        self
    }

    /// Append a post-decode transformer, applied to every decoded value.
    pub fn with_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, bool) -> Result<(Value, bool), CodecError> + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(f));
        self
    }

    /// Same as [`DecodeOptions::with_transformer`] for an already shared transformer.
    pub fn with_decode_transformer(mut self, t: DecodeTransformer) -> Self {
        self.transformers.push(t);
        self
    }

    /// Leave standard extensions (timestamps) unresolved.
    pub fn without_standard_extensions(mut self) -> Self {
        self.standard_extensions = false;
        self
    }
}

/// Decodes values from a [`BoundedRead`] source.
pub struct Decoder<'o, R> {
    r: R,
    opts: &'o DecodeOptions,
    depth: usize,
}

impl<'o, R: BoundedRead> Decoder<'o, R> {
    pub fn new(r: R, opts: &'o DecodeOptions) -> Self {
        Decoder { r, opts, depth: 0 }
    }

    pub fn into_inner(self) -> R {
        self.r
    }

    /// Decode one complete value.
    pub fn decode(&mut self) -> Result<Value, CodecError> {
        self.decode_with_key_eligibility().map(|(v, _)| v)
    }

    /// Decode one complete value and report whether it may be used as a map key.
    pub fn decode_with_key_eligibility(&mut self) -> Result<(Value, bool), CodecError> {
        if self.depth >= self.opts.max_depth {
            return Err(CodecError::DepthLimitExceeded(self.opts.max_depth));
        }
        self.depth += 1;
        let result = self.decode_raw().and_then(|(v, eligible)| self.transform(v, eligible));
        self.depth -= 1;
        result
    }

    fn transform(&self, v: Value, eligible: bool) -> Result<(Value, bool), CodecError> {
        self.opts
            .transformers
            .iter()
            .try_fold((v, eligible), |(v, eligible), t| t(v, eligible))
    }

    fn decode_raw(&mut self) -> Result<(Value, bool), CodecError> {
        let tag = self.r.read_byte()?;
        match Format::from_byte(tag) {
            Format::PositiveFixInt(v) => Ok((Value::Int(i64::from(v)), true)),
            Format::NegativeFixInt(v) => Ok((Value::Int(i64::from(v)), true)),
            Format::Nil => Ok((Value::Nil, true)),
            Format::False => Ok((Value::Bool(false), true)),
            Format::True => Ok((Value::Bool(true), true)),
            Format::NeverUsed => Err(CodecError::InvalidFormat),

            Format::UInt8 => Ok((Value::UInt(u64::from(self.r.read_byte()?)), true)),
            Format::UInt16 => Ok((Value::UInt(u64::from(BigEndian::read_u16(&self.r.read_array::<2>()?))), true)),
            Format::UInt32 => Ok((Value::UInt(u64::from(BigEndian::read_u32(&self.r.read_array::<4>()?))), true)),
            Format::UInt64 => Ok((Value::UInt(BigEndian::read_u64(&self.r.read_array::<8>()?)), true)),
            Format::Int8 => Ok((Value::Int(i64::from(self.r.read_byte()? as i8)), true)),
            Format::Int16 => Ok((Value::Int(i64::from(BigEndian::read_i16(&self.r.read_array::<2>()?))), true)),
            Format::Int32 => Ok((Value::Int(i64::from(BigEndian::read_i32(&self.r.read_array::<4>()?))), true)),
            Format::Int64 => Ok((Value::Int(BigEndian::read_i64(&self.r.read_array::<8>()?)), true)),
            Format::Float32 => Ok((Value::F32(BigEndian::read_f32(&self.r.read_array::<4>()?)), true)),
            Format::Float64 => Ok((Value::F64(BigEndian::read_f64(&self.r.read_array::<8>()?)), true)),

            Format::FixStr(n) => self.decode_str(usize::from(n)),
            Format::Str8 => {
                let n = self.read_len8()?;
                self.decode_str(n)
            }
            Format::Str16 => {
                let n = self.read_len16()?;
                self.decode_str(n)
            }
            Format::Str32 => {
                let n = self.read_len32()?;
                self.decode_str(n)
            }

            Format::Bin8 => {
                let n = self.read_len8()?;
                self.decode_bin(n)
            }
            Format::Bin16 => {
                let n = self.read_len16()?;
                self.decode_bin(n)
            }
            Format::Bin32 => {
                let n = self.read_len32()?;
                self.decode_bin(n)
            }

            Format::FixArray(n) => self.decode_array(usize::from(n)),
            Format::Array16 => {
                let n = self.read_len16()?;
                self.decode_array(n)
            }
            Format::Array32 => {
                let n = self.read_len32()?;
                self.decode_array(n)
            }

            Format::FixMap(n) => self.decode_map(usize::from(n)),
            Format::Map16 => {
                let n = self.read_len16()?;
                self.decode_map(n)
            }
            Format::Map32 => {
                let n = self.read_len32()?;
                self.decode_map(n)
            }

            Format::FixExt1 => self.decode_ext(1),
            Format::FixExt2 => self.decode_ext(2),
            Format::FixExt4 => self.decode_ext(4),
            Format::FixExt8 => self.decode_ext(8),
            Format::FixExt16 => self.decode_ext(16),
            Format::Ext8 => {
                let n = self.read_len8()?;
                self.decode_ext(n)
            }
            Format::Ext16 => {
                let n = self.read_len16()?;
                self.decode_ext(n)
            }
            Format::Ext32 => {
                let n = self.read_len32()?;
                self.decode_ext(n)
            }
        }
    }

    fn read_len8(&mut self) -> Result<usize, CodecError> {
        Ok(usize::from(self.r.read_byte()?))
    }

    fn read_len16(&mut self) -> Result<usize, CodecError> {
        Ok(usize::from(BigEndian::read_u16(&self.r.read_array::<2>()?)))
    }

    fn read_len32(&mut self) -> Result<usize, CodecError> {
        let n = BigEndian::read_u32(&self.r.read_array::<4>()?);
        usize::try_from(n).map_err(|_| CodecError::TooBig(u64::from(n)))
    }

    fn decode_str(&mut self, n: usize) -> Result<(Value, bool), CodecError> {
        Ok((Value::Str(self.r.read_exact(n)?), true))
    }

    fn decode_bin(&mut self, n: usize) -> Result<(Value, bool), CodecError> {
        Ok((Value::Bin(self.r.read_exact(n)?), false))
    }

    fn decode_array(&mut self, n: usize) -> Result<(Value, bool), CodecError> {
        let mut items = Vec::with_capacity(n.min(MAX_PREALLOC));
        for _ in 0..n {
            items.push(self.decode()?);
        }
        Ok((Value::Array(items), false))
    }

    fn decode_map(&mut self, n: usize) -> Result<(Value, bool), CodecError> {
        let mut map = Map::with_capacity(n.min(MAX_PREALLOC));
        let mut index = KeyIndex::new();
        for _ in 0..n {
            // Both halves are read before any policy applies, so a dropped entry
            // leaves the reader at the next key.
            let (key, eligible) = self.decode_with_key_eligibility()?;
            let value = self.decode()?;
            if !eligible {
                match self.opts.unsupported_keys {
                    UnsupportedKeyPolicy::Error => return Err(CodecError::UnsupportedKeyType),
                    UnsupportedKeyPolicy::Drop => {
                        log::debug!("dropping map entry with {} key", key.type_name());
                        continue;
                    }
                }
            }
            if !index.insert_if_absent(&map, &key) {
                match self.opts.duplicate_keys {
                    DuplicateKeyPolicy::Error => return Err(CodecError::DuplicateKey),
                    DuplicateKeyPolicy::FirstWins => {
                        log::debug!("keeping first entry for duplicate {:?} key", key);
                        continue;
                    }
                }
            }
            map.push(key, value);
        }
        Ok((Value::Map(map), false))
    }

    fn decode_ext(&mut self, len: usize) -> Result<(Value, bool), CodecError> {
        let ext_type = self.r.read_byte()? as i8;
        let data = self.r.read_exact(len)?;
        if ext_type >= 0 {
            if let Some(f) = self.opts.extensions.get(&ext_type) {
                return f(data.as_slice());
            }
        } else if self.opts.standard_extensions {
            if let Some(f) = standard_extension_decoder(ext_type) {
                return f(data.as_slice());
            }
        }
        match self.opts.unknown_extensions {
            UnknownExtensionPolicy::Passthrough => {
                log::debug!("passing through unresolved extension type {} ({} bytes)", ext_type, len);
                Ok((Value::Ext(Extension::new(ext_type, data)), false))
            }
            UnknownExtensionPolicy::Error => Err(CodecError::UnsupportedExtensionType(ext_type)),
        }
    }
}
