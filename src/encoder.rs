//! Encode a [`Value`] tree to its canonical (minimal-width) wire form.
//!
//! Per value, in order:
//!
//! 1. every pre-encode transformer runs, each one fed the previous one's output;
//! 2. extension encoders get a chance to claim the value: application ones first,
//!    then the standard ones (timestamp); the first claim wins;
//! 3. a value that is still not wire-native goes through the late transformers;
//!    the first one that fires restarts the pipeline at step 1 on its output.
//!    A late transformer fires at most once per input value, so the loop
//!    always ends, either in a wire-native value or in `UnsupportedType`;
//! 4. the value is written with the narrowest tag that represents it exactly.
//!
//! Signed integers only ever use fixint / int 8..64; unsigned integers only ever
//! use uint 8..64. Floats keep their width.

use crate::codec::CodecError;
use crate::format::{Format, FIXARRAY_MAX, FIXMAP_MAX, FIXSTR_MAX, NEGATIVE_FIXINT_MIN, POSITIVE_FIXINT_MAX};
use crate::transform::{EncodeTransformer, ExtensionEncoder, STANDARD_EXTENSION_ENCODERS};
use crate::value::{Extension, Map, Value};
use byteorder::{BigEndian, WriteBytesExt};
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Encode-side configuration. Cheap to clone; shareable across threads.
#[derive(Clone)]
pub struct EncodeOptions {
    transformers: Vec<EncodeTransformer>,
    extensions: Vec<ExtensionEncoder>,
    late_transformers: Vec<EncodeTransformer>,
    standard_extensions: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            transformers: Vec::new(),
            extensions: Vec::new(),
            late_transformers: Vec::new(),
            standard_extensions: true,
        }
    }
}

impl fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("transformers", &self.transformers.len())
            .field("extensions", &self.extensions.len())
            .field("late_transformers", &self.late_transformers.len())
            .field("standard_extensions", &self.standard_extensions)
            .finish()
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        EncodeOptions::default()
    }

    /// Append a pre-encode transformer. Return `Ok(None)` to decline.
    pub fn with_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Value>, CodecError> + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(f));
        self
    }

    /// Append an application extension encoder (types 0..=127 by convention).
    pub fn with_extension<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Extension>, CodecError> + Send + Sync + 'static,
    {
        self.extensions.push(Arc::new(f));
        self
    }

    /// Append a late transformer, tried only on values nothing else could encode.
    pub fn with_late_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Value>, CodecError> + Send + Sync + 'static,
    {
        self.late_transformers.push(Arc::new(f));
        self
    }

    /// Same as [`EncodeOptions::with_late_transformer`] for an already shared transformer
    /// (e.g. from [`crate::transform::seq_transformer`]).
    pub fn with_late(mut self, t: EncodeTransformer) -> Self {
        self.late_transformers.push(t);
        self
    }

    /// Do not encode standard extension types (timestamps become `UnsupportedType`
    /// unless something else handles them).
    pub fn without_standard_extensions(mut self) -> Self {
        self.standard_extensions = false;
        self
    }
}

/// Writes values to a byte sink. Nothing is buffered; pass a `BufWriter` for
/// sinks that are expensive to write to in small pieces.
pub struct Encoder<'o, W> {
    w: W,
    opts: &'o EncodeOptions,
}

impl<'o, W: Write> Encoder<'o, W> {
    pub fn new(w: W, opts: &'o EncodeOptions) -> Self {
        Encoder { w, opts }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    /// Encode one complete value tree.
    pub fn encode(&mut self, value: &Value) -> Result<(), CodecError> {
        self.encode_value(value)
    }

    fn encode_value(&mut self, value: &Value) -> Result<(), CodecError> {
        let opts = self.opts;
        let mut current = Cow::Borrowed(value);
        // Late transformers that already fired for this value.
        let mut fired: Vec<bool> = Vec::new();
        loop {
            for t in &opts.transformers {
                if let Some(next) = t(&*current)? {
                    current = Cow::Owned(next);
                }
            }
            if let Some(ext) = self.resolve_extension(&current)? {
                return self.write_ext(ext.ext_type, &ext.data);
            }
            if current.is_wire_native() {
                return self.write_native(&current);
            }
            if fired.is_empty() {
                fired = vec![false; opts.late_transformers.len()];
            }
            match self.apply_late(&current, &mut fired)? {
                Some(next) => current = Cow::Owned(next),
                None => {
                    log::trace!("no encoder for {}", current.type_name());
                    return Err(CodecError::UnsupportedType(current.type_name()));
                }
            }
        }
    }

    fn resolve_extension(&self, v: &Value) -> Result<Option<Extension>, CodecError> {
        for f in &self.opts.extensions {
            if let Some(ext) = f(v)? {
                return Ok(Some(ext));
            }
        }
        if self.opts.standard_extensions {
            for f in STANDARD_EXTENSION_ENCODERS {
                if let Some(ext) = f(v)? {
                    return Ok(Some(ext));
                }
            }
        }
        Ok(None)
    }

    fn apply_late(&self, v: &Value, fired: &mut [bool]) -> Result<Option<Value>, CodecError> {
        for (i, t) in self.opts.late_transformers.iter().enumerate() {
            if fired[i] {
                continue;
            }
            if let Some(next) = t(v)? {
                log::trace!("late transformer #{} rewrote {} as {}", i, v.type_name(), next.type_name());
                fired[i] = true;
                return Ok(Some(next));
            }
        }
        Ok(None)
    }

    fn write_native(&mut self, v: &Value) -> Result<(), CodecError> {
        match v {
            Value::Nil => self.write_format(Format::Nil),
            Value::Bool(false) => self.write_format(Format::False),
            Value::Bool(true) => self.write_format(Format::True),
            Value::Int(i) => self.write_int(*i),
            Value::UInt(u) => self.write_uint(*u),
            Value::F32(x) => {
                self.write_format(Format::Float32)?;
                self.w.write_f32::<BigEndian>(*x)?;
                Ok(())
            }
            Value::F64(x) => {
                self.write_format(Format::Float64)?;
                self.w.write_f64::<BigEndian>(*x)?;
                Ok(())
            }
            Value::Str(s) => {
                self.write_len_prefix(Prefixed::Str, s.len())?;
                self.w.write_all(s)?;
                Ok(())
            }
            Value::Bin(b) => {
                self.write_len_prefix(Prefixed::Bin, b.len())?;
                self.w.write_all(b)?;
                Ok(())
            }
            Value::Array(items) => {
                self.write_len_prefix(Prefixed::Array, items.len())?;
                for item in items {
                    self.encode_value(item)?;
                }
                Ok(())
            }
            Value::Map(m) => self.write_map(m),
            Value::Ext(e) => self.write_ext(e.ext_type, &e.data),
            Value::Host(h) => Err(CodecError::UnsupportedType(h.type_name())),
        }
    }

    fn write_format(&mut self, f: Format) -> Result<(), CodecError> {
        self.w.write_u8(f.to_byte())?;
        Ok(())
    }

    fn write_int(&mut self, i: i64) -> Result<(), CodecError> {
        match i {
            0..=POSITIVE_FIXINT_MAX => self.write_format(Format::PositiveFixInt(i as u8))?,
            NEGATIVE_FIXINT_MIN..=-1 => self.write_format(Format::NegativeFixInt(i as i8))?,
            _ if i8::try_from(i).is_ok() => {
                self.write_format(Format::Int8)?;
                self.w.write_i8(i as i8)?;
            }
            _ if i16::try_from(i).is_ok() => {
                self.write_format(Format::Int16)?;
                self.w.write_i16::<BigEndian>(i as i16)?;
            }
            _ if i32::try_from(i).is_ok() => {
                self.write_format(Format::Int32)?;
                self.w.write_i32::<BigEndian>(i as i32)?;
            }
            _ => {
                self.write_format(Format::Int64)?;
                self.w.write_i64::<BigEndian>(i)?;
            }
        }
        Ok(())
    }

    fn write_uint(&mut self, u: u64) -> Result<(), CodecError> {
        if let Ok(v) = u8::try_from(u) {
            self.write_format(Format::UInt8)?;
            self.w.write_u8(v)?;
        } else if let Ok(v) = u16::try_from(u) {
            self.write_format(Format::UInt16)?;
            self.w.write_u16::<BigEndian>(v)?;
        } else if let Ok(v) = u32::try_from(u) {
            self.write_format(Format::UInt32)?;
            self.w.write_u32::<BigEndian>(v)?;
        } else {
            self.write_format(Format::UInt64)?;
            self.w.write_u64::<BigEndian>(u)?;
        }
        Ok(())
    }

    fn write_len_prefix(&mut self, kind: Prefixed, len: usize) -> Result<(), CodecError> {
        if let Some(f) = kind.fix(len) {
            return self.write_format(f);
        }
        let (f8, f16, f32) = kind.forms();
        match (f8, u8::try_from(len), u16::try_from(len), u32::try_from(len)) {
            (Some(f), Ok(n), _, _) => {
                self.write_format(f)?;
                self.w.write_u8(n)?;
            }
            (_, _, Ok(n), _) => {
                self.write_format(f16)?;
                self.w.write_u16::<BigEndian>(n)?;
            }
            (_, _, _, Ok(n)) => {
                self.write_format(f32)?;
                self.w.write_u32::<BigEndian>(n)?;
            }
            _ => return Err(CodecError::TooBig(len as u64)),
        }
        Ok(())
    }

    fn write_map(&mut self, m: &Map) -> Result<(), CodecError> {
        self.write_len_prefix(Prefixed::Map, m.len())?;
        for (k, v) in m {
            self.encode_value(k)?;
            self.encode_value(v)?;
        }
        Ok(())
    }

    fn write_ext(&mut self, ext_type: i8, data: &[u8]) -> Result<(), CodecError> {
        self.write_len_prefix(Prefixed::Ext, data.len())?;
        self.w.write_i8(ext_type)?;
        self.w.write_all(data)?;
        Ok(())
    }
}

/// Length-prefixed wire types.
#[derive(Debug, Clone, Copy)]
enum Prefixed {
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

impl Prefixed {
    /// Form with the length packed into (or implied by) the tag, if `len` allows one.
    fn fix(self, len: usize) -> Option<Format> {
        match (self, len) {
            (Prefixed::Str, 0..=FIXSTR_MAX) => Some(Format::FixStr(len as u8)),
            (Prefixed::Array, 0..=FIXARRAY_MAX) => Some(Format::FixArray(len as u8)),
            (Prefixed::Map, 0..=FIXMAP_MAX) => Some(Format::FixMap(len as u8)),
            (Prefixed::Ext, 1) => Some(Format::FixExt1),
            (Prefixed::Ext, 2) => Some(Format::FixExt2),
            (Prefixed::Ext, 4) => Some(Format::FixExt4),
            (Prefixed::Ext, 8) => Some(Format::FixExt8),
            (Prefixed::Ext, 16) => Some(Format::FixExt16),
            _ => None,
        }
    }

    /// 8-bit (if any), 16-bit and 32-bit length-prefixed forms.
    fn forms(self) -> (Option<Format>, Format, Format) {
        match self {
            Prefixed::Str => (Some(Format::Str8), Format::Str16, Format::Str32),
            Prefixed::Bin => (Some(Format::Bin8), Format::Bin16, Format::Bin32),
            Prefixed::Array => (None, Format::Array16, Format::Array32),
            Prefixed::Map => (None, Format::Map16, Format::Map32),
            Prefixed::Ext => (Some(Format::Ext8), Format::Ext16, Format::Ext32),
        }
    }
}
