//! Coordinate recovery from whatever GPS-like fields a report carries

use crate::classifier::{classify, GPS_TABLE};
use crate::coordinate::parse_coordinate;
use crate::report::{FieldBucket, MetadataReport};

/// Lookup keys in preference order, compared after normalization
const LATITUDE_KEYS: &[&str] = &["gpslatitude", "latitude"];
const LONGITUDE_KEYS: &[&str] = &["gpslongitude", "longitude"];
const POSITION_KEYS: &[&str] = &["gpsposition", "position"];

/// GPS bucket plus the coordinates resolved from it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsExtraction {
    pub bucket: FieldBucket,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GpsExtraction {
    /// Both coordinates, or nothing
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Classify GPS fields and resolve latitude/longitude from them.
///
/// Discrete latitude/longitude fields are preferred. When either is missing a
/// combined position field is split into coordinate/hemisphere pairs instead.
pub fn extract_gps_info(report: &MetadataReport) -> GpsExtraction {
    let bucket = classify(report, &GPS_TABLE);

    let mut latitude = find_field(&bucket, LATITUDE_KEYS).map(str::to_string);
    let mut longitude = find_field(&bucket, LONGITUDE_KEYS).map(str::to_string);

    if latitude.is_none() || longitude.is_none() {
        if let Some((lat, lon)) = find_field(&bucket, POSITION_KEYS).and_then(split_position) {
            latitude = Some(lat);
            longitude = Some(lon);
        }
    }

    GpsExtraction {
        latitude: latitude.as_deref().and_then(parse_coordinate),
        longitude: longitude.as_deref().and_then(parse_coordinate),
        bucket,
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_field<'a>(bucket: &'a FieldBucket, preferred: &[&str]) -> Option<&'a str> {
    preferred.iter().find_map(|wanted| {
        bucket
            .iter()
            .find(|(key, _)| normalize_key(key) == *wanted)
            .map(|(_, value)| value.as_str())
    })
}

/// Split `"40.7 N, 74.0 W"` (value and hemisphere apart) or `"40.7N, 74.0W"`
fn split_position(position: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = position
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    match tokens.len() {
        n if n >= 4 => Some((
            format!("{}{}", tokens[0], tokens[1]),
            format!("{}{}", tokens[2], tokens[3]),
        )),
        2 => Some((tokens[0].to_string(), tokens[1].to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: Option<f64>, expected: f64) -> bool {
        value.map(|v| (v - expected).abs() < 1e-6).unwrap_or(false)
    }

    #[test]
    fn test_discrete_fields() {
        let report: MetadataReport = [
            ("GPS", "GPSLatitude", "48.8584 N"),
            ("GPS", "GPSLongitude", "2.2945 E"),
            ("GPS", "GPSAltitude", "35 m"),
        ]
        .into_iter()
        .collect();

        let gps = extract_gps_info(&report);
        assert!(approx(gps.latitude, 48.8584));
        assert!(approx(gps.longitude, 2.2945));
        assert_eq!(gps.bucket.len(), 3);
        assert!(gps.coordinates().is_some());
    }

    #[test]
    fn test_gps_key_preferred_over_generic() {
        let report: MetadataReport = [
            ("Metadata", "Latitude", "1.0"),
            ("Metadata", "Longitude", "2.0"),
            ("Metadata", "GPS Latitude", "10.0"),
            ("Metadata", "GPS Longitude", "20.0"),
        ]
        .into_iter()
        .collect();

        let gps = extract_gps_info(&report);
        assert_eq!(gps.latitude, Some(10.0));
        assert_eq!(gps.longitude, Some(20.0));
    }

    #[test]
    fn test_position_with_attached_hemisphere() {
        let report: MetadataReport = [("Metadata", "GPS Position", "40.7N, 74.0W")]
            .into_iter()
            .collect();

        let gps = extract_gps_info(&report);
        assert!(approx(gps.latitude, 40.7));
        assert!(approx(gps.longitude, -74.0));
    }

    #[test]
    fn test_position_with_separate_hemisphere() {
        let report: MetadataReport = [("Composite", "GPSPosition", "33.8688 S, 151.2093 E")]
            .into_iter()
            .collect();

        let gps = extract_gps_info(&report);
        assert!(approx(gps.latitude, -33.8688));
        assert!(approx(gps.longitude, 151.2093));
    }

    #[test]
    fn test_position_fills_missing_longitude() {
        let report: MetadataReport = [
            ("GPS", "GPSLatitude", "1.0 N"),
            ("GPS", "GPSPosition", "40.7 N, 74.0 W"),
        ]
        .into_iter()
        .collect();

        let gps = extract_gps_info(&report);
        assert!(approx(gps.latitude, 40.7));
        assert!(approx(gps.longitude, -74.0));
    }

    #[test]
    fn test_unsplittable_position_yields_nothing() {
        let report: MetadataReport = [("GPS", "GPSPosition", "somewhere nice")]
            .into_iter()
            .collect();

        let gps = extract_gps_info(&report);
        assert_eq!(gps.latitude, None);
        assert_eq!(gps.longitude, None);
        assert_eq!(gps.coordinates(), None);
        // Bucket still exposed for display
        assert_eq!(gps.bucket.len(), 1);
    }

    #[test]
    fn test_one_bad_coordinate_keeps_the_other() {
        let report: MetadataReport = [
            ("GPS", "GPSLatitude", "garbage"),
            ("GPS", "GPSLongitude", "74.0 W"),
        ]
        .into_iter()
        .collect();

        let gps = extract_gps_info(&report);
        assert_eq!(gps.latitude, None);
        assert!(approx(gps.longitude, -74.0));
        assert_eq!(gps.coordinates(), None);
    }

    #[test]
    fn test_no_gps_fields() {
        let report: MetadataReport = [("Exif", "Make", "Canon")].into_iter().collect();
        let gps = extract_gps_info(&report);
        assert!(gps.bucket.is_empty());
        assert_eq!(gps.coordinates(), None);
    }

    #[test]
    fn test_ref_fields_are_not_coordinates() {
        let report: MetadataReport = [
            ("GPS", "GPSLatitudeRef", "N"),
            ("GPS", "GPSLongitudeRef", "W"),
        ]
        .into_iter()
        .collect();

        let gps = extract_gps_info(&report);
        assert_eq!(gps.latitude, None);
        assert_eq!(gps.longitude, None);
    }
}
