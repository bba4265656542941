//! Transformer and extension hooks.
//!
//! Every hook is a shared function object, so option values stay cheap to clone
//! and can be used from several threads at once. Encode-side hooks return
//! `Ok(None)` to decline.

use crate::codec::CodecError;
use crate::timestamp::{self, Timestamp};
use crate::value::{Extension, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Pre-encode or late rewrite of one value.
pub type EncodeTransformer = Arc<dyn Fn(&Value) -> Result<Option<Value>, CodecError> + Send + Sync>;

/// Claims a value as an extension (type + payload).
pub type ExtensionEncoder = Arc<dyn Fn(&Value) -> Result<Option<Extension>, CodecError> + Send + Sync>;

/// Resolves one extension payload to a value and its key eligibility.
pub type ExtensionDecoder = Arc<dyn Fn(&[u8]) -> Result<(Value, bool), CodecError> + Send + Sync>;

/// Post-decode rewrite of a value and its key eligibility.
pub type DecodeTransformer = Arc<dyn Fn(Value, bool) -> Result<(Value, bool), CodecError> + Send + Sync>;

type StandardEncoder = fn(&Value) -> Result<Option<Extension>, CodecError>;
type StandardDecoder = fn(&[u8]) -> Result<(Value, bool), CodecError>;

/// Standard (negative type) extension encoders, tried after application ones.
pub(crate) static STANDARD_EXTENSION_ENCODERS: &[StandardEncoder] = &[timestamp::encode_extension];

/// Standard decoder for a reserved extension type, if there is one.
pub(crate) fn standard_extension_decoder(ext_type: i8) -> Option<StandardDecoder> {
    match ext_type {
        Timestamp::EXT_TYPE => Some(timestamp::decode_extension),
        _ => None,
    }
}

/// Chain encode transformers: each one sees the previous one's output. Declines
/// only if every transformer in the chain declined.
pub fn compose_encode_transformers(list: Vec<EncodeTransformer>) -> EncodeTransformer {
    Arc::new(move |v: &Value| -> Result<Option<Value>, CodecError> {
        let mut current: Option<Value> = None;
        for t in &list {
            let input = current.as_ref().unwrap_or(v);
            if let Some(next) = t(input)? {
                current = Some(next);
            }
        }
        Ok(current)
    })
}

pub fn compose_decode_transformers(list: Vec<DecodeTransformer>) -> DecodeTransformer {
    Arc::new(move |v: Value, eligible: bool| -> Result<(Value, bool), CodecError> {
        list.iter().try_fold((v, eligible), |(v, eligible), t| t(v, eligible))
    })
}

/// Late transformer: host `Vec<T>` becomes `Array`.
pub fn seq_transformer<T>() -> EncodeTransformer
where
    T: Clone + Into<Value> + 'static,
{
    Arc::new(|v: &Value| -> Result<Option<Value>, CodecError> {
        Ok(v.as_host::<Vec<T>>()
            .map(|items| Value::Array(items.iter().cloned().map(Into::into).collect())))
    })
}

/// Late transformer: host `BTreeMap<K, V>` or `HashMap<K, V>` becomes `Map`.
///
/// A `BTreeMap` is written in key order; a `HashMap` in its iteration order.
pub fn map_transformer<K, V>() -> EncodeTransformer
where
    K: Clone + Into<Value> + 'static,
    V: Clone + Into<Value> + 'static,
{
    Arc::new(|v: &Value| -> Result<Option<Value>, CodecError> {
        if let Some(m) = v.as_host::<BTreeMap<K, V>>() {
            return Ok(Some(Value::Map(to_map(m.len(), m.iter()))));
        }
        if let Some(m) = v.as_host::<HashMap<K, V>>() {
            return Ok(Some(Value::Map(to_map(m.len(), m.iter()))));
        }
        Ok(None)
    })
}

// Source keys are already distinct, so pairs are appended without a lookup.
fn to_map<'a, K, V>(len: usize, entries: impl Iterator<Item = (&'a K, &'a V)>) -> Map
where
    K: Clone + Into<Value> + 'a,
    V: Clone + Into<Value> + 'a,
{
    let mut map = Map::with_capacity(len);
    for (k, v) in entries {
        map.push(k.clone().into(), v.clone().into());
    }
    map
}

/// Post-decode transformer resolving unresolved extensions whose type is in
/// `table`. Anything else passes through untouched.
pub fn extension_decode_transformer(table: HashMap<i8, ExtensionDecoder>) -> DecodeTransformer {
    Arc::new(move |v: Value, eligible: bool| -> Result<(Value, bool), CodecError> {
        match v {
            Value::Ext(ext) => match table.get(&ext.ext_type) {
                Some(f) => f(ext.data.as_slice()),
                None => Ok((Value::Ext(ext), eligible)),
            },
            other => Ok((other, eligible)),
        }
    })
}
