use std::fmt;

use serde_json::{Number, Value as JsonValue};

/// Largest magnitude below which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Identifier of a decoded metadata tag: either the decoder's symbolic name
/// (`CreateDate`) or a bare numeric code for tags it does not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagKey {
    Name(String),
    Code(u32),
}

impl TagKey {
    /// Purely numeric keys become `Code`, everything else stays a name.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<u32>() {
            Ok(code) if raw.chars().all(|c| c.is_ascii_digit()) => TagKey::Code(code),
            _ => TagKey::Name(raw.to_string()),
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKey::Name(name) => f.write_str(name),
            TagKey::Code(code) => write!(f, "{}", code),
        }
    }
}

impl From<&str> for TagKey {
    fn from(raw: &str) -> Self {
        TagKey::parse(raw)
    }
}

impl From<u16> for TagKey {
    fn from(code: u16) -> Self {
        TagKey::Code(u32::from(code))
    }
}

/// Loosely typed value as handed over by a metadata decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<RawValue>),
    /// Key/value pairs in the order the decoder produced them.
    Map(Vec<(String, RawValue)>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Null, empty text and empty containers count as "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.is_empty(),
            RawValue::Bytes(b) => b.is_empty(),
            RawValue::List(items) => items.is_empty(),
            RawValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Lossy conversion used for compact textual rendering. Integral floats
    /// print as integers, matching scalar rendering; non-finite floats have no
    /// JSON form and become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            RawValue::Null => JsonValue::Null,
            RawValue::Bool(b) => JsonValue::Bool(*b),
            RawValue::Integer(i) => JsonValue::Number((*i).into()),
            RawValue::Float(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
                JsonValue::Number((*f as i64).into())
            }
            RawValue::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            RawValue::Text(s) => JsonValue::String(s.clone()),
            RawValue::Bytes(bytes) => {
                JsonValue::Array(bytes.iter().map(|&b| JsonValue::from(b)).collect())
            }
            RawValue::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            RawValue::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RawValue::Null,
            JsonValue::Bool(b) => RawValue::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                None => n.as_f64().map(RawValue::Float).unwrap_or(RawValue::Null),
            },
            JsonValue::String(s) => RawValue::Text(s.clone()),
            JsonValue::Array(items) => RawValue::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(map) => RawValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        RawValue::Bytes(bytes)
    }
}

/// Decoded metadata of one image, in decoder order. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    entries: Vec<(TagKey, RawValue)>,
}

impl RawMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value for `key`, keeping the first position.
    pub fn insert(&mut self, key: impl Into<TagKey>, value: impl Into<RawValue>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<TagKey>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        let key = TagKey::parse(name);
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<TagKey>, V: Into<RawValue>> FromIterator<(K, V)> for RawMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = RawMetadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}
