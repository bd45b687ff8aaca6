//! Loggable values and ordered field sets.
//!
//! A [`Fields`] set is what a logger carries: the `service`/`env` tags, the
//! correlation fields of a request, and any extra key/value pairs attached
//! with `with`. Keys keep their insertion order; writing an existing key
//! replaces its value in place.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single loggable scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer too large for `Int`
    Uint(u64),
    /// Floating point number
    Float(f64),
    /// Text
    Str(String),
}

impl FieldValue {
    /// The text of a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON scalar. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Int(i) => serde_json::Value::from(*i),
            FieldValue::Uint(u) => serde_json::Value::from(*u),
            FieldValue::Float(f) => serde_json::Value::from(*f),
            FieldValue::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Uint(u) => write!(f, "{}", u),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64, isize);
impl_from_int!(Uint, u64: u8, u16, u32, u64, usize);

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(f64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Str(v.clone())
    }
}

impl From<char> for FieldValue {
    fn from(v: char) -> Self {
        FieldValue::Str(v.to_string())
    }
}

/// Insertion-ordered set of named values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(IndexMap<String, FieldValue>);

impl Fields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Build from typed `(name, value)` pairs. Pairs with an empty name are
    /// dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut fields = Self::new();
        for (key, value) in pairs {
            fields.insert(key, value);
        }
        fields
    }

    /// Build from a flat, alternating key/value list.
    ///
    /// Keys must be `Str` values; a pair whose key is anything else is
    /// skipped, and a trailing key without a value is ignored.
    pub fn from_flat<I>(values: I) -> Self
    where
        I: IntoIterator<Item = FieldValue>,
    {
        let mut fields = Self::new();
        let mut iter = values.into_iter();
        while let Some(key) = iter.next() {
            let Some(value) = iter.next() else {
                break;
            };
            if let FieldValue::Str(key) = key {
                fields.insert(key, value);
            }
        }
        fields
    }

    /// Set `key` to `value`. An empty key is ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.0.insert(key, value.into());
    }

    /// Copy every entry of `other` over this set.
    pub fn extend_from(&mut self, other: &Fields) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// This set with `other` merged on top.
    pub fn merged(&self, other: &Fields) -> Fields {
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, FieldValue> {
        self.0.iter()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = indexmap::map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Fields::from_pairs(iter)
    }
}

/// Build a [`Fields`] set from `key => value` pairs.
///
/// ```
/// use slogging_types::fields;
///
/// let fields = fields! { "user" => "alice", "attempt" => 3 };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::Fields::new();
        $( fields.insert($key, $value); )+
        fields
    }};
}

/// Build a flat key/value list of [`FieldValue`]s for `Fields::from_flat`.
///
/// ```
/// use slogging_types::{kv, Fields, FieldValue};
///
/// let fields = Fields::from_flat(kv!["a", 1, "b"]);
/// assert_eq!(fields.get("a"), Some(&FieldValue::Int(1)));
/// assert!(!fields.contains_key("b"));
/// ```
#[macro_export]
macro_rules! kv {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::FieldValue::from($value)),*]
    };
}
