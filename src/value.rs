//! Runtime values for encoding/decoding (dynamic representation of one wire value tree).

use std::any::Any;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

/// A single encoded or decoded value.
#[derive(Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Any integer that came from (or goes to) the signed wire family.
    Int(i64),
    /// Any integer that came from (or goes to) the unsigned wire family.
    UInt(u64),
    F32(f32),
    F64(f64),
    /// String bytes. UTF-8 validity is not enforced; see [`Value::as_str`].
    Str(Vec<u8>),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(Map),
    /// Extension that no resolver claimed.
    Ext(Extension),
    /// Resolved extension or any other host value; opaque to the codec.
    Host(HostValue),
}

/// Payload of an extension type nobody resolved. Types < 0 are reserved for
/// standard extensions; 0..=127 belong to applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extension {
    pub ext_type: i8,
    pub data: Vec<u8>,
}

impl Extension {
    pub fn new(ext_type: i8, data: impl Into<Vec<u8>>) -> Self {
        Extension { ext_type, data: data.into() }
    }
}

/// Object-safe view of a host value. Implemented for every
/// `T: Any + Debug + PartialEq + Send + Sync`.
pub trait Host: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn host_eq(&self, other: &dyn Host) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T> Host for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn host_eq(&self, other: &dyn Host) -> bool {
        (*other).as_any().downcast_ref::<T>().is_some_and(|o| self == o)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Hashes the value behind a `&dyn Any` as its concrete type.
type HostHashFn = fn(&dyn Any, &mut dyn Hasher);

fn hash_host<T: Any + Hash>(v: &dyn Any, mut state: &mut dyn Hasher) {
    if let Some(v) = v.downcast_ref::<T>() {
        v.hash(&mut state);
    }
}

/// Shared handle to a host value (e.g. a decoded timestamp, or an application
/// type waiting for a transformer to rewrite it).
///
/// Host values built with [`HostValue::hashable`] carry their type's `Hash`, which the
/// decoder uses to index map keys. Others are indexed by type only, so a map with many
/// keys of one such type costs a comparison per earlier key of that type. Wrap every
/// value of a given type the same way.
#[derive(Clone)]
pub struct HostValue {
    value: Arc<dyn Host>,
    hash: Option<HostHashFn>,
}

impl HostValue {
    pub fn new<T: Host>(value: T) -> Self {
        HostValue { value: Arc::new(value), hash: None }
    }

    pub fn hashable<T: Host + Hash>(value: T) -> Self {
        HostValue { value: Arc::new(value), hash: Some(hash_host::<T>) }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.value).as_any().is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        (*self.value).type_name()
    }

    pub fn is_hashable(&self) -> bool {
        self.hash.is_some()
    }

    fn key_hash(&self, mut state: &mut dyn Hasher) {
        (*self.value).as_any().type_id().hash(&mut state);
        if let Some(f) = self.hash {
            f((*self.value).as_any(), state);
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        (*self.value).host_eq(&*other.value)
    }
}

/// Map value: pairs in insertion (or wire) order.
///
/// Equality is order-sensitive. Lookups are linear; the decoder uses its own
/// hashed index while building a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: Vec<(Value, Value)>,
}

impl Map {
    pub fn new() -> Self {
        Map::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Map { entries: Vec::with_capacity(n) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| key_eq(k, key)).map(|(_, v)| v)
    }

    /// Lookup by string key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Str(s) if s.as_slice() == key.as_bytes()))
            .map(|(_, v)| v)
    }

    /// Insert or replace. Returns the previous value for an equal key.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| key_eq(k, &key)) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Append without checking for an existing key. The encoder writes every
    /// pair, so a map built this way may encode duplicate keys.
    pub fn push(&mut self, key: Value, value: Value) {
        self.entries.push((key, value));
    }

    pub(crate) fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }
}

impl IntoIterator for Map {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = &'a (Value, Value);
    type IntoIter = std::slice::Iter<'a, (Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Value {
    /// Wrap any host value.
    pub fn host<T: Host>(value: T) -> Value {
        Value::Host(HostValue::new(value))
    }

    /// Wrap a host value whose type is `Hash`. Resolvers returning key-eligible
    /// values should use this so decoded maps index them by value.
    pub fn hashable_host<T: Host + Hash>(value: T) -> Value {
        Value::Host(HostValue::hashable(value))
    }

    /// Short type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::Str(_) => "str",
            Value::Bin(_) => "bin",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Ext(_) => "ext",
            Value::Host(h) => h.type_name(),
        }
    }

    /// True for every variant the encoder can write without help.
    pub fn is_wire_native(&self) -> bool {
        !matches!(self, Value::Host(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            Value::UInt(x) => i64::try_from(*x).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(x) => Some(*x),
            Value::Int(x) => u64::try_from(*x).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(x) => Some(*x),
            Value::F32(x) => Some(*x as f64),
            _ => None,
        }
    }

    /// String contents, if this is a `Str` holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) | Value::Str(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_ext(&self) -> Option<&Extension> {
        match self {
            Value::Ext(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_host<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Host(h) => h.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(x) => f.debug_tuple("Int").field(x).finish(),
            Value::UInt(x) => f.debug_tuple("UInt").field(x).finish(),
            Value::F32(x) => f.debug_tuple("F32").field(x).finish(),
            Value::F64(x) => f.debug_tuple("F64").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(&String::from_utf8_lossy(s)).finish(),
            Value::Bin(b) => f.debug_tuple("Bin").field(b).finish(),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Map(m) => f.debug_map().entries(m.iter().map(|(k, v)| (k, v))).finish(),
            Value::Ext(e) => fmt::Debug::fmt(e, f),
            Value::Host(h) => f.debug_tuple("Host").field(h).finish(),
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::$variant(x.into())
                }
            }
        )*
    };
}

value_from!(Int: i8, i16, i32, i64);
value_from!(UInt: u8, u16, u32, u64);
value_from!(Bool: bool);
value_from!(F32: f32);
value_from!(F64: f64);
value_from!(Bin: Vec<u8>, &[u8]);
value_from!(Array: Vec<Value>);
value_from!(Map: Map);
value_from!(Ext: Extension);

impl From<isize> for Value {
    fn from(x: isize) -> Self {
        Value::Int(x as i64)
    }
}

impl From<usize> for Value {
    fn from(x: usize) -> Self {
        Value::UInt(x as u64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into_bytes())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        x.map_or(Value::Nil, Into::into)
    }
}

// ---- Map key identity -------------------------------------------------------------------------

/// Equality used for map keys: variants must match (`Int(1)` is not `UInt(1)`), floats compare
/// numerically, host values use their own `PartialEq`.
pub(crate) fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::UInt(x), Value::UInt(y)) => x == y,
        (Value::F32(x), Value::F32(y)) => x == y,
        (Value::F64(x), Value::F64(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bin(x), Value::Bin(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| key_eq(x, y))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter().zip(y.iter()).all(|((xk, xv), (yk, yv))| key_eq(xk, yk) && key_eq(xv, yv))
        }
        (Value::Ext(x), Value::Ext(y)) => x == y,
        (Value::Host(x), Value::Host(y)) => x == y,
        _ => false,
    }
}

/// Hash consistent with [`key_eq`].
fn key_hash<H: Hasher>(v: &Value, state: &mut H) {
    std::mem::discriminant(v).hash(state);
    match v {
        Value::Nil => {}
        Value::Bool(b) => b.hash(state),
        Value::Int(x) => x.hash(state),
        Value::UInt(x) => x.hash(state),
        // 0.0 == -0.0
        Value::F32(x) => (if *x == 0.0 { 0 } else { x.to_bits() }).hash(state),
        Value::F64(x) => (if *x == 0.0 { 0 } else { x.to_bits() }).hash(state),
        Value::Str(s) | Value::Bin(s) => s.hash(state),
        Value::Array(a) => {
            a.len().hash(state);
            for x in a {
                key_hash(x, state);
            }
        }
        Value::Map(m) => {
            m.len().hash(state);
            for (k, v) in m {
                key_hash(k, state);
                key_hash(v, state);
            }
        }
        Value::Ext(e) => e.hash(state),
        Value::Host(h) => h.key_hash(state),
    }
}

/// Hashed index over the keys of a map under construction.
pub(crate) struct KeyIndex {
    state: RandomState,
    buckets: HashMap<u64, Vec<usize>>,
}

impl KeyIndex {
    pub(crate) fn new() -> Self {
        KeyIndex { state: RandomState::new(), buckets: HashMap::new() }
    }

    fn hash_of(&self, key: &Value) -> u64 {
        let mut h = self.state.build_hasher();
        key_hash(key, &mut h);
        h.finish()
    }

    /// Returns true if `key` was absent (and records it at `map.len()`); false if already present.
    pub(crate) fn insert_if_absent(&mut self, map: &Map, key: &Value) -> bool {
        let hash = self.hash_of(key);
        let bucket = self.buckets.entry(hash).or_default();
        if bucket.iter().any(|&i| key_eq(&map.entries()[i].0, key)) {
            return false;
        }
        bucket.push(map.len());
        true
    }
}
