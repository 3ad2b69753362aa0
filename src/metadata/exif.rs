use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::Path,
};

use exif::{In, Value};
use log::debug;

use crate::{
    error::Result,
    metadata::value::{RawMetadata, RawValue, TagKey},
};

pub struct ExifExtractor;

impl ExifExtractor {
    /// Decodes the EXIF block of an in-memory image. Containers without EXIF
    /// (or formats the decoder does not understand) yield an empty map.
    pub fn extract(bytes: &[u8]) -> RawMetadata {
        let mut reader = Cursor::new(bytes);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif_data) => Self::parse_exif(&exif_data),
            Err(e) => {
                debug!("No usable EXIF data: {}", e);
                RawMetadata::new()
            }
        }
    }

    pub fn extract_path<P: AsRef<Path>>(path: P) -> Result<RawMetadata> {
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif_data) => Ok(Self::parse_exif(&exif_data)),
            Err(e) => {
                debug!("No usable EXIF data in {}: {}", path.as_ref().display(), e);
                Ok(RawMetadata::new())
            }
        }
    }

    fn parse_exif(exif: &exif::Exif) -> RawMetadata {
        let mut metadata = RawMetadata::new();

        for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
            let name = field.tag.to_string();
            let key = if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) {
                TagKey::Name(name)
            } else {
                TagKey::from(field.tag.number())
            };

            metadata.insert(key, Self::convert_value(&field.value));
        }

        metadata
    }

    fn convert_value(value: &Value) -> RawValue {
        match value {
            Value::Byte(bytes) => RawValue::Bytes(bytes.clone()),
            Value::Undefined(bytes, _) => RawValue::Bytes(bytes.clone()),
            Value::Ascii(parts) => collapse(
                parts
                    .iter()
                    .map(|p| {
                        RawValue::Text(String::from_utf8_lossy(p).trim_end_matches('\0').to_string())
                    })
                    .collect(),
            ),
            Value::Short(v) => collapse(v.iter().map(|&x| RawValue::Integer(x.into())).collect()),
            Value::Long(v) => collapse(v.iter().map(|&x| RawValue::Integer(x.into())).collect()),
            Value::SByte(v) => collapse(v.iter().map(|&x| RawValue::Integer(x.into())).collect()),
            Value::SShort(v) => collapse(v.iter().map(|&x| RawValue::Integer(x.into())).collect()),
            Value::SLong(v) => collapse(v.iter().map(|&x| RawValue::Integer(x.into())).collect()),
            Value::Rational(v) => collapse(v.iter().map(|r| RawValue::Float(r.to_f64())).collect()),
            Value::SRational(v) => collapse(v.iter().map(|r| RawValue::Float(r.to_f64())).collect()),
            Value::Float(v) => collapse(v.iter().map(|&x| RawValue::Float(x.into())).collect()),
            Value::Double(v) => collapse(v.iter().map(|&x| RawValue::Float(x)).collect()),
            Value::Unknown(..) => RawValue::Null,
        }
    }
}

/// Single-element arrays read as scalars, the way metadata viewers show them.
fn collapse(mut items: Vec<RawValue>) -> RawValue {
    match items.len() {
        0 => RawValue::Null,
        1 => items.remove(0),
        _ => RawValue::List(items),
    }
}

#[cfg(test)]
mod tests {
    use exif::{Context, Field, Rational, Tag, experimental::Writer};

    use super::*;
    use crate::{
        FormattedEntry, GeoPoint,
        metadata::formatter::FormatterRegistry,
    };

    fn ascii(tag: Tag, text: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        }
    }

    fn dms(tag: Tag, d: u32, m: u32, s: u32) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational { num: d, denom: 1 },
                Rational { num: m, denom: 1 },
                Rational { num: s, denom: 1 },
            ]),
        }
    }

    /// A bare little-endian TIFF carrying camera, date, GPS and one
    /// vendor tag the decoder has no name for.
    fn sample_tiff() -> Vec<u8> {
        let fields = vec![
            ascii(Tag::Make, "Canon"),
            ascii(Tag::DateTimeOriginal, "2021:03:04 12:34:56"),
            ascii(Tag(Context::Exif, 39321), r#"{"iso": 100}"#),
            ascii(Tag::GPSLatitudeRef, "N"),
            dms(Tag::GPSLatitude, 40, 26, 46),
            ascii(Tag::GPSLongitudeRef, "W"),
            dms(Tag::GPSLongitude, 79, 58, 56),
        ];

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }

        let mut buffer = Cursor::new(Vec::new());
        writer.write(&mut buffer, true).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_extracts_named_and_numeric_tags() {
        let metadata = ExifExtractor::extract(&sample_tiff());

        assert_eq!(metadata.get("Make"), Some(&RawValue::Text("Canon".into())));
        assert_eq!(
            metadata.get("39321"),
            Some(&RawValue::Text(r#"{"iso": 100}"#.into()))
        );
        assert!(metadata.iter().any(|(key, _)| *key == TagKey::Code(39321)));
        assert!(
            metadata
                .iter()
                .all(|(key, _)| !matches!(key, TagKey::Name(name) if name.contains('(')))
        );
    }

    #[test]
    fn test_extracted_metadata_formats_and_locates() {
        let metadata = ExifExtractor::extract(&sample_tiff());

        let entries = FormatterRegistry::default().format_all(&metadata);
        let find = |key: &str| entries.iter().find(|e| e.key == key).cloned();
        assert_eq!(
            find("Camera Settings"),
            Some(FormattedEntry {
                key: "Camera Settings".into(),
                value: "iso: 100".into(),
            })
        );
        assert_eq!(find("Make").map(|e| e.value).as_deref(), Some("Canon"));
        assert_eq!(
            find("Date Time Original").map(|e| e.value).as_deref(),
            Some("3/4/2021, 12:34:56 PM")
        );

        let point = GeoPoint::from_metadata(&metadata);
        let (lat, lon) = point.coordinates().expect("coordinates");
        assert!((lat - 40.446_111).abs() < 1e-6);
        assert!((lon + 79.982_222).abs() < 1e-6);
    }

    #[test]
    fn test_missing_exif_is_empty() {
        let metadata = ExifExtractor::extract(b"definitely not an image");
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_collapse() {
        assert_eq!(collapse(vec![]), RawValue::Null);
        assert_eq!(collapse(vec![RawValue::Integer(3)]), RawValue::Integer(3));
        assert_eq!(
            collapse(vec![RawValue::Integer(3), RawValue::Integer(4)]),
            RawValue::List(vec![RawValue::Integer(3), RawValue::Integer(4)])
        );
    }

    #[test]
    fn test_rationals_become_floats() {
        let value = Value::Rational(vec![
            exif::Rational { num: 51, denom: 1 },
            exif::Rational { num: 30, denom: 1 },
            exif::Rational { num: 1525, denom: 100 },
        ]);
        assert_eq!(
            ExifExtractor::convert_value(&value),
            RawValue::List(vec![
                RawValue::Float(51.0),
                RawValue::Float(30.0),
                RawValue::Float(15.25),
            ])
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(ExifExtractor::extract_path("/nonexistent/photo.jpg").is_err());
    }
}
