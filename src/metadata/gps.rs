use log::warn;
use serde::Deserialize;

use crate::{
    GeoPoint,
    error::{InsightError, Result},
    metadata::value::{RawMetadata, RawValue},
};

pub const LOCATION_NOT_FOUND: &str = "Location not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().trim_end_matches('\0').to_ascii_uppercase().as_str() {
            "N" => Some(Hemisphere::North),
            "S" => Some(Hemisphere::South),
            "E" => Some(Hemisphere::East),
            "W" => Some(Hemisphere::West),
            _ => None,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Hemisphere::South | Hemisphere::West => -1.0,
            Hemisphere::North | Hemisphere::East => 1.0,
        }
    }
}

/// Degrees/minutes/seconds to signed decimal degrees, unrounded.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: Hemisphere) -> f64 {
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    decimal * reference.sign()
}

fn read_axis(metadata: &RawMetadata, value_tag: &str, ref_tag: &str) -> Option<f64> {
    let parts: Vec<f64> = match metadata.get(value_tag)? {
        RawValue::List(items) => items.iter().map(RawValue::as_f64).collect::<Option<_>>()?,
        single => vec![single.as_f64()?],
    };

    let (degrees, minutes, seconds) = match parts.as_slice() {
        [d, m, s] => (*d, *m, *s),
        [d, m] => (*d, *m, 0.0),
        [d] => (*d, 0.0, 0.0),
        _ => return None,
    };

    if degrees < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }

    let reference = metadata
        .get(ref_tag)
        .and_then(RawValue::as_text)
        .and_then(Hemisphere::parse)?;

    Some(dms_to_decimal(degrees, minutes, seconds, reference))
}

impl GeoPoint {
    /// Reads the GPS pair from decoded metadata. Both coordinates are present
    /// or neither is.
    pub fn from_metadata(metadata: &RawMetadata) -> Self {
        let latitude = read_axis(metadata, "GPSLatitude", "GPSLatitudeRef")
            .filter(|lat| (-90.0..=90.0).contains(lat));
        let longitude = read_axis(metadata, "GPSLongitude", "GPSLongitudeRef")
            .filter(|lon| (-180.0..=180.0).contains(lon));

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => GeoPoint {
                latitude: Some(latitude),
                longitude: Some(longitude),
                location_name: None,
            },
            _ => GeoPoint::default(),
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Resolves the place name. A failed lookup yields "Location not found";
    /// without coordinates the point is returned unchanged.
    pub fn resolve_with(mut self, geocoder: &dyn ReverseGeocoder) -> Self {
        if let Some((lat, lon)) = self.coordinates() {
            let name = match geocoder.reverse(lat, lon) {
                Ok(name) => name,
                Err(e) => {
                    warn!("Reverse geocoding failed for ({}, {}): {}", lat, lon, e);
                    LOCATION_NOT_FOUND.to_string()
                }
            };
            self.location_name = Some(name);
        }
        self
    }
}

/// Place-name lookup for a coordinate pair. Implementations usually talk to a
/// network service and may fail.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<String>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
}

/// Body of an OpenStreetMap Nominatim `reverse?format=json` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimResponse {
    pub display_name: Option<String>,
    pub address: Option<NominatimAddress>,
}

impl NominatimResponse {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// The city when known, otherwise the full display name.
    pub fn place_name(&self) -> Result<String> {
        self.address
            .as_ref()
            .and_then(|a| a.city.clone())
            .or_else(|| self.display_name.clone())
            .ok_or_else(|| InsightError::ExternalService("response carries no place name".into()))
    }

    pub fn reverse_url(base: &str, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/reverse?format=json&lat={}&lon={}",
            base.trim_end_matches('/'),
            latitude,
            longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGeocoder(Option<&'static str>);

    impl ReverseGeocoder for FixedGeocoder {
        fn reverse(&self, _: f64, _: f64) -> Result<String> {
            self.0
                .map(String::from)
                .ok_or_else(|| InsightError::ExternalService("offline".into()))
        }
    }

    fn dms(d: i64, m: i64, s: f64) -> RawValue {
        RawValue::List(vec![
            RawValue::Integer(d),
            RawValue::Integer(m),
            RawValue::Float(s),
        ])
    }

    #[test]
    fn test_dms_conversion() {
        assert_eq!(dms_to_decimal(48.0, 0.0, 0.0, Hemisphere::North), 48.0);
        assert_eq!(dms_to_decimal(48.0, 30.0, 0.0, Hemisphere::East), 48.5);

        let north = dms_to_decimal(33.0, 51.0, 54.36, Hemisphere::North);
        let south = dms_to_decimal(33.0, 51.0, 54.36, Hemisphere::South);
        assert_eq!(south, -north);

        let west = dms_to_decimal(151.0, 12.0, 40.0, Hemisphere::West);
        assert_eq!(west, -(151.0 + 12.0 / 60.0 + 40.0 / 3600.0));
    }

    #[test]
    fn test_geo_point_from_metadata() {
        let metadata = RawMetadata::new()
            .with("GPSLatitude", dms(40, 26, 46.0))
            .with("GPSLatitudeRef", "N")
            .with("GPSLongitude", dms(79, 58, 56.0))
            .with("GPSLongitudeRef", "W");

        let point = GeoPoint::from_metadata(&metadata);
        let (lat, lon) = point.coordinates().expect("coordinates");
        assert!((lat - 40.446_111).abs() < 1e-6);
        assert!((lon + 79.982_222).abs() < 1e-6);
        assert!(point.location_name.is_none());
    }

    #[test]
    fn test_half_a_pair_yields_nothing() {
        let metadata = RawMetadata::new()
            .with("GPSLatitude", dms(40, 26, 46.0))
            .with("GPSLatitudeRef", "N");

        let point = GeoPoint::from_metadata(&metadata);
        assert_eq!(point, GeoPoint::default());
    }

    #[test]
    fn test_resolve_with_geocoder() {
        let point = GeoPoint {
            latitude: Some(1.0),
            longitude: Some(2.0),
            location_name: None,
        };

        let found = point.clone().resolve_with(&FixedGeocoder(Some("Lisbon")));
        assert_eq!(found.location_name.as_deref(), Some("Lisbon"));

        let failed = point.resolve_with(&FixedGeocoder(None));
        assert_eq!(failed.location_name.as_deref(), Some(LOCATION_NOT_FOUND));

        let empty = GeoPoint::default().resolve_with(&FixedGeocoder(Some("Lisbon")));
        assert!(empty.location_name.is_none());
    }

    #[test]
    fn test_nominatim_place_name() {
        let with_city = NominatimResponse::parse(
            r#"{"display_name": "1 Main St, Springfield", "address": {"city": "Springfield"}}"#,
        )
        .unwrap();
        assert_eq!(with_city.place_name().unwrap(), "Springfield");

        let without_city =
            NominatimResponse::parse(r#"{"display_name": "Somewhere rural", "address": {}}"#).unwrap();
        assert_eq!(without_city.place_name().unwrap(), "Somewhere rural");

        let empty = NominatimResponse::parse("{}").unwrap();
        assert!(empty.place_name().is_err());
    }

    #[test]
    fn test_nominatim_reverse_url() {
        assert_eq!(
            NominatimResponse::reverse_url("https://nominatim.openstreetmap.org/", 40.5, -79.25),
            "https://nominatim.openstreetmap.org/reverse?format=json&lat=40.5&lon=-79.25"
        );
    }
}
