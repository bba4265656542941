//! Records: host structs that encode as maps with string keys.
//!
//! The codec core knows nothing about records. [`record_transformer`] builds a
//! late transformer, so a record only reaches the wire after nothing else
//! claimed it.

use crate::codec::CodecError;
use crate::transform::EncodeTransformer;
use crate::value::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A host struct viewed as named fields.
///
/// ```
/// use minipack::{Record, Value};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Record for Point {
///     fn fields(&self) -> Vec<(&'static str, Value)> {
///         vec![("x", self.x.into()), ("y", self.y.into())]
///     }
/// }
/// ```
pub trait Record {
    /// Field names and values, in declaration order.
    fn fields(&self) -> Vec<(&'static str, Value)>;
}

/// Decides whether a field is written and under which key.
pub type FieldFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct RecordOptions {
    field_fn: Option<FieldFn>,
}

impl fmt::Debug for RecordOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordOptions")
            .field("field_fn", &self.field_fn.is_some())
            .finish()
    }
}

impl RecordOptions {
    pub fn new() -> Self {
        RecordOptions::default()
    }

    /// `f(name)` returns the map key for a field, or `None` to skip it. Without
    /// one, every field is written under its own name.
    pub fn with_field_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.field_fn = Some(Arc::new(f));
        self
    }

    fn to_map(&self, fields: Vec<(&'static str, Value)>) -> Map {
        let mut map = Map::with_capacity(fields.len());
        for (name, value) in fields {
            let key = match &self.field_fn {
                Some(f) => match f(name) {
                    Some(key) => key,
                    None => continue,
                },
                None => name.to_string(),
            };
            map.insert(key, value);
        }
        map
    }
}

/// Late transformer turning host values of type `T` into a `Map`.
pub fn record_transformer<T>(opts: RecordOptions) -> EncodeTransformer
where
    T: Record + 'static,
{
    Arc::new(move |v: &Value| -> Result<Option<Value>, CodecError> {
        Ok(v.as_host::<T>().map(|r| Value::Map(opts.to_map(r.fields()))))
    })
}
