use std::{collections::HashMap, fmt::Write};

use chrono::{DateTime, NaiveDateTime};
use log::debug;
use serde_json::Value as JsonValue;

use crate::{
    FormattedEntry,
    error::{InsightError, Result},
    metadata::{
        tags::{TagNameTable, space_words},
        value::{RawMetadata, RawValue, TagKey},
    },
};

pub const NOT_AVAILABLE: &str = "N/A";

const EXIF_DATE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// What a field means, independent of how the decoder spelled its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Timestamp,
    CameraSettings,
    UniqueId,
    Generic,
}

impl FieldRole {
    pub fn of(key: &TagKey) -> Self {
        let label = TagNameTable::resolve(key);
        let normalized: String = label
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "createdate" | "modifydate" | "datetime" | "datetimeoriginal" | "datetimedigitized" => {
                FieldRole::Timestamp
            }
            "camerasettings" => FieldRole::CameraSettings,
            "uniqueimageid" => FieldRole::UniqueId,
            _ => FieldRole::Generic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// chrono pattern used for timestamps.
    pub date_format: String,
    /// Entries whose value has at least this many characters are dropped.
    pub max_value_len: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            date_format: "%-m/%-d/%Y, %-I:%M:%S %p".into(),
            max_value_len: 100,
        }
    }
}

pub type FieldFormatter = fn(&RawValue, &FormatOptions) -> Result<String>;

/// Role-keyed table of value formatters. A formatter error never escapes:
/// the value falls back to its generic rendering.
pub struct FormatterRegistry {
    formatters: HashMap<FieldRole, FieldFormatter>,
    options: FormatOptions,
}

impl FormatterRegistry {
    pub fn new(options: FormatOptions) -> Self {
        let mut registry = Self {
            formatters: HashMap::new(),
            options,
        };

        registry.register(FieldRole::Timestamp, format_timestamp);
        registry.register(FieldRole::CameraSettings, format_camera_settings);
        registry.register(FieldRole::UniqueId, format_unique_id);
        registry.register(FieldRole::Generic, |value, _| Ok(render_generic(value)));
        registry
    }

    pub fn register(&mut self, role: FieldRole, formatter: FieldFormatter) {
        self.formatters.insert(role, formatter);
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn format_value(&self, role: FieldRole, value: &RawValue) -> String {
        if value.is_null() {
            return NOT_AVAILABLE.into();
        }

        if role != FieldRole::Generic && value.is_empty() {
            return NOT_AVAILABLE.into();
        }

        let Some(formatter) = self.formatters.get(&role) else {
            return render_generic(value);
        };

        match formatter(value, &self.options) {
            Ok(formatted) => formatted,
            Err(e) => {
                debug!("Falling back to raw rendering for {:?} field: {}", role, e);
                render_generic(value)
            }
        }
    }

    pub fn format_entry(&self, key: &TagKey, value: &RawValue) -> FormattedEntry {
        let label = TagNameTable::resolve(key);

        FormattedEntry {
            key: space_words(&label),
            value: self.format_value(FieldRole::of(key), value),
        }
    }

    /// Formats every entry in decoder order and applies the length filter.
    pub fn format_all(&self, metadata: &RawMetadata) -> Vec<FormattedEntry> {
        let entries = metadata
            .iter()
            .map(|(key, value)| self.format_entry(key, value))
            .collect();

        filter_entries(entries, self.options.max_value_len)
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

/// Drops entries whose value is `max_len` characters or longer.
pub fn filter_entries(entries: Vec<FormattedEntry>, max_len: usize) -> Vec<FormattedEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.value.chars().count() < max_len)
        .collect()
}

pub fn render_generic(value: &RawValue) -> String {
    match value {
        RawValue::Null => NOT_AVAILABLE.into(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Integer(i) => i.to_string(),
        RawValue::Float(f) => f.to_string(),
        RawValue::Text(s) => s.clone(),
        RawValue::Bytes(_) | RawValue::List(_) | RawValue::Map(_) => value.to_json().to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim_end_matches('\0').trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    EXIF_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn format_timestamp(value: &RawValue, options: &FormatOptions) -> Result<String> {
    let raw = value
        .as_text()
        .ok_or_else(|| InsightError::FieldFormat("timestamp is not text".into()))?;

    let parsed = parse_timestamp(raw)
        .ok_or_else(|| InsightError::FieldFormat(format!("unrecognized timestamp '{}'", raw)))?;

    let mut rendered = String::new();
    write!(rendered, "{}", parsed.format(&options.date_format))
        .map_err(|_| InsightError::FieldFormat(format!("bad date pattern '{}'", options.date_format)))?;

    Ok(rendered)
}

fn format_camera_settings(value: &RawValue, _: &FormatOptions) -> Result<String> {
    let pairs: Vec<(String, JsonValue)> = match value {
        RawValue::Text(raw) => match serde_json::from_str::<JsonValue>(raw)? {
            JsonValue::Object(map) => map.into_iter().collect(),
            _ => {
                return Err(InsightError::FieldFormat(
                    "camera settings are not key/value data".into(),
                ));
            }
        },
        RawValue::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
        _ => {
            return Err(InsightError::FieldFormat(
                "camera settings are not key/value data".into(),
            ));
        }
    };

    Ok(pairs
        .iter()
        .map(|(k, v)| match v {
            JsonValue::String(s) => format!("{}: {}", k, s),
            other => format!("{}: {}", k, other),
        })
        .collect::<Vec<_>>()
        .join(", "))
}

fn format_unique_id(value: &RawValue, _: &FormatOptions) -> Result<String> {
    let bytes: Vec<u8> = match value {
        RawValue::Bytes(bytes) => bytes.clone(),
        RawValue::List(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Integer(i) => u8::try_from(*i).ok(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InsightError::FieldFormat("unique id is not a byte list".into()))?,
        RawValue::Text(s) => return Ok(s.clone()),
        _ => {
            return Err(InsightError::FieldFormat(
                "unique id is neither bytes nor text".into(),
            ));
        }
    };

    let mut hex = String::with_capacity(2 + bytes.len() * 2);
    hex.push_str("0x");
    for byte in bytes {
        let _ = write!(hex, "{:02x}", byte);
    }

    Ok(hex)
}
