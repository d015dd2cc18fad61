//! Metadata extraction backends
//!
//! Turns a file on disk into a [`MetadataReport`]:
//! - **ExifTool** (if installed and enabled): `-j -G` JSON, one category per group
//! - **kamadak-exif** (pure Rust): EXIF fields of still images, grouped by IFD
//!
//! The analysis pipeline only depends on the [`MetadataSource`] trait, so any
//! parser (or a canned report in tests) can stand in for these backends.

use indexmap::IndexMap;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::error::{MetadataError, Result};
use crate::report::MetadataReport;

/// Anything that can produce a metadata report for a path.
///
/// Implementations return [`MetadataError::UnrecognizedFile`] when the format
/// is not understood at all, [`MetadataError::Extraction`] when parsing
/// started but failed, and an empty report when the file simply carries no
/// metadata.
pub trait MetadataSource: Send + Sync {
    fn extract(&self, path: &Path) -> Result<MetadataReport>;
}

/// A fixed report, returned for every path
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub MetadataReport);

impl MetadataSource for StaticSource {
    fn extract(&self, _path: &Path) -> Result<MetadataReport> {
        Ok(self.0.clone())
    }
}

/// ExifTool errors that mean "not a file we can read" rather than a crash
const UNRECOGNIZED_MARKERS: &[&str] = &["Unknown file type", "File not found", "File is empty"];

/// Default extraction backend chain
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    config: ExtractorConfig,
    exiftool: bool,
}

impl MetadataExtractor {
    /// Probe for ExifTool once, up front
    pub fn new(config: ExtractorConfig) -> Self {
        let exiftool = config.use_exiftool && exiftool_available(&config.exiftool_path);
        debug!("ExifTool backend {}", if exiftool { "enabled" } else { "disabled" });
        Self { config, exiftool }
    }

    pub fn uses_exiftool(&self) -> bool {
        self.exiftool
    }

    pub fn backend_name(&self) -> &'static str {
        if self.exiftool {
            "exiftool"
        } else {
            "kamadak-exif"
        }
    }
}

impl MetadataSource for MetadataExtractor {
    fn extract(&self, path: &Path) -> Result<MetadataReport> {
        if self.exiftool {
            extract_with_exiftool(&self.config.exiftool_path, path)
        } else {
            extract_with_kamadak_exif(path)
        }
    }
}

/// Check if ExifTool is available on the system
pub fn exiftool_available(program: &str) -> bool {
    Command::new(program)
        .arg("-ver")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ============================================================================
// ExifTool Backend
// ============================================================================

fn extract_with_exiftool(program: &str, path: &Path) -> Result<MetadataReport> {
    debug!("Running {} on {}", program, path.display());

    let output = Command::new(program)
        .arg("-j") // JSON output
        .arg("-G") // Group names
        .arg("-a") // Allow duplicates
        .arg("-u") // Unknown tags
        .arg(path)
        .output()
        .map_err(|e| MetadataError::Extraction(format!("ExifTool failed: {}", e)))?;

    // Unreadable files still produce JSON (with ExifTool:Error) and a non-zero exit
    if output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(classify_exiftool_error(&stderr));
    }

    report_from_exiftool_json(&String::from_utf8_lossy(&output.stdout))
}

/// Build a report from `exiftool -j -G` output.
///
/// Keys look like `Group:Tag`; the group becomes the category. Keys without a
/// group (`SourceFile`) are skipped.
pub fn report_from_exiftool_json(json: &str) -> Result<MetadataReport> {
    let parsed: Vec<IndexMap<String, Value>> = serde_json::from_str(json)
        .map_err(|e| MetadataError::Extraction(format!("JSON parse error: {}", e)))?;

    let Some(tags) = parsed.into_iter().next() else {
        return Ok(MetadataReport::new());
    };

    if let Some(error) = tags.get("ExifTool:Error") {
        return Err(classify_exiftool_error(&render_value(error)));
    }

    let mut report = MetadataReport::new();
    for (key, value) in &tags {
        let Some((group, tag)) = key.split_once(':') else {
            continue;
        };
        report.insert(group, tag, render_value(value));
    }

    Ok(report)
}

fn classify_exiftool_error(message: &str) -> MetadataError {
    if UNRECOGNIZED_MARKERS.iter().any(|m| message.contains(m)) {
        MetadataError::UnrecognizedFile(message.to_string())
    } else {
        MetadataError::Extraction(message.to_string())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// kamadak-exif Backend
// ============================================================================

/// Containers kamadak-exif can pull an EXIF block out of
const EXIF_CONTAINERS: &[&str] = &[
    "image/jpeg",
    "image/tiff",
    "image/png",
    "image/webp",
    "image/heif",
    "image/avif",
];

fn extract_with_kamadak_exif(path: &Path) -> Result<MetadataReport> {
    let kind = infer::get_from_path(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            MetadataError::UnrecognizedFile(format!("{}: file not found", path.display()))
        }
        _ => MetadataError::Extraction(format!("{}: {}", path.display(), e)),
    })?;

    let kind = match kind {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind,
        Some(kind) => {
            return Err(MetadataError::UnrecognizedFile(format!(
                "{} is {}, not an image",
                path.display(),
                kind.mime_type()
            )))
        }
        None => {
            return Err(MetadataError::UnrecognizedFile(format!(
                "{}: unknown file type",
                path.display()
            )))
        }
    };

    if !EXIF_CONTAINERS.contains(&kind.mime_type()) {
        debug!("{} cannot carry EXIF, reporting no metadata", kind.mime_type());
        return Ok(MetadataReport::new());
    }

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif_data = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif_data) => exif_data,
        Err(exif::Error::NotFound(_)) => return Ok(MetadataReport::new()),
        Err(exif::Error::NotSupported(e)) => {
            return Err(MetadataError::UnrecognizedFile(e.to_string()))
        }
        Err(e) => return Err(MetadataError::Extraction(format!("EXIF parse error: {}", e))),
    };

    Ok(report_from_exif(&exif_data))
}

/// Group EXIF fields into report categories by the IFD they came from
pub fn report_from_exif(exif_data: &exif::Exif) -> MetadataReport {
    let mut report = MetadataReport::new();

    for field in exif_data.fields() {
        let category = ifd_category(field);
        let value = match field.tag {
            exif::Tag::GPSLatitude => {
                let hemisphere = reference(exif_data, exif::Tag::GPSLatitudeRef, field.ifd_num);
                dms_text(&field.value, hemisphere.as_deref())
            }
            exif::Tag::GPSLongitude => {
                let hemisphere = reference(exif_data, exif::Tag::GPSLongitudeRef, field.ifd_num);
                dms_text(&field.value, hemisphere.as_deref())
            }
            _ => None,
        };

        let value = value.unwrap_or_else(|| field.display_value().with_unit(exif_data).to_string());
        report.insert(category, field.tag.to_string(), value);
    }

    report
}

fn ifd_category(field: &exif::Field) -> &'static str {
    if field.ifd_num == exif::In::THUMBNAIL {
        return "Thumbnail";
    }
    match field.tag.context() {
        exif::Context::Tiff => "Image",
        exif::Context::Exif => "Exif",
        exif::Context::Gps => "GPS",
        exif::Context::Interop => "Interoperability",
        _ => "Other",
    }
}

fn reference(exif_data: &exif::Exif, tag: exif::Tag, ifd: exif::In) -> Option<String> {
    exif_data
        .get_field(tag, ifd)
        .map(|f| f.display_value().to_string().trim().to_string())
        .filter(|r| !r.is_empty())
}

/// Render a degrees/minutes/seconds rational triple as `D° M' S" <ref>`
pub fn dms_text(value: &exif::Value, hemisphere: Option<&str>) -> Option<String> {
    match value {
        exif::Value::Rational(v) if v.len() >= 3 => {
            let degrees = v[0].to_f64();
            let minutes = v[1].to_f64();
            let seconds = v[2].to_f64();
            if !(degrees.is_finite() && minutes.is_finite() && seconds.is_finite()) {
                return None;
            }

            let mut text = format!("{}° {}' {}\"", degrees, minutes, seconds);
            if let Some(hemisphere) = hemisphere {
                text.push(' ');
                text.push_str(hemisphere);
            }
            Some(text)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::parse_coordinate;
    use std::io::Write;

    fn offline() -> MetadataExtractor {
        MetadataExtractor::new(ExtractorConfig {
            use_exiftool: false,
            ..ExtractorConfig::default()
        })
    }

    fn write_temp(bytes: &[u8], suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_exiftool_available() {
        // Just check it doesn't panic
        let _ = exiftool_available("exiftool");
    }

    #[test]
    fn test_exiftool_json_groups() {
        let json = r#"[{
            "SourceFile": "photo.jpg",
            "File:FileType": "JPEG",
            "EXIF:Make": "Apple",
            "EXIF:ISO": 100,
            "GPS:GPSLatitude": "40 deg 26' 46.80\" N",
            "XMP:Subject": ["beach", "sunset"]
        }]"#;

        let report = report_from_exiftool_json(json).unwrap();
        let names: Vec<&str> = report.categories().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["File", "EXIF", "GPS", "XMP"]);

        let exif = report.category("EXIF").unwrap();
        assert_eq!(exif["Make"], "Apple");
        assert_eq!(exif["ISO"], "100");
        assert_eq!(report.category("XMP").unwrap()["Subject"], "beach, sunset");

        let lat = parse_coordinate(&report.category("GPS").unwrap()["GPSLatitude"]).unwrap();
        assert!((lat - 40.4463).abs() < 1e-4);
    }

    #[test]
    fn test_exiftool_unknown_type_is_unrecognized() {
        let json = r#"[{"SourceFile": "x.bin", "ExifTool:Error": "Unknown file type"}]"#;
        let err = report_from_exiftool_json(json).unwrap_err();
        assert!(matches!(err, MetadataError::UnrecognizedFile(_)));
    }

    #[test]
    fn test_exiftool_other_error_is_extraction_failure() {
        let json = r#"[{"SourceFile": "x.jpg", "ExifTool:Error": "Corrupted JPEG image"}]"#;
        let err = report_from_exiftool_json(json).unwrap_err();
        assert!(matches!(err, MetadataError::Extraction(_)));
    }

    #[test]
    fn test_exiftool_garbage_output() {
        let err = report_from_exiftool_json("not json").unwrap_err();
        assert!(matches!(err, MetadataError::Extraction(_)));
    }

    #[test]
    fn test_jpeg_without_exif_is_empty() {
        let file = write_temp(&[0xFF, 0xD8, 0xFF, 0xD9], ".jpg");
        let report = offline().extract(file.path()).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_text_file_is_unrecognized() {
        let file = write_temp(b"hello, this is not an image", ".txt");
        let err = offline().extract(file.path()).unwrap_err();
        assert!(matches!(err, MetadataError::UnrecognizedFile(_)));
    }

    #[test]
    fn test_missing_file_is_unrecognized() {
        let err = offline()
            .extract(Path::new("/nonexistent/photo.jpg"))
            .unwrap_err();
        assert!(matches!(err, MetadataError::UnrecognizedFile(_)));
    }

    #[test]
    fn test_dms_text() {
        let value = exif::Value::Rational(vec![
            exif::Rational { num: 40, denom: 1 },
            exif::Rational { num: 26, denom: 1 },
            exif::Rational { num: 4680, denom: 100 },
        ]);

        let text = dms_text(&value, Some("N")).unwrap();
        assert_eq!(text, "40° 26' 46.8\" N");
        assert!((parse_coordinate(&text).unwrap() - 40.4463).abs() < 1e-4);

        assert_eq!(dms_text(&value, None).unwrap(), "40° 26' 46.8\"");
        assert_eq!(dms_text(&exif::Value::Ascii(vec![]), Some("N")), None);
    }

    #[test]
    fn test_static_source() {
        let report: MetadataReport = [("Exif", "Make", "Canon")].into_iter().collect();
        let source = StaticSource(report.clone());
        assert_eq!(source.extract(Path::new("anything")).unwrap(), report);
    }
}
