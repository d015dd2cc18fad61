//! End-to-end analysis of one file
//!
//! extract → classify (device, date/time) → GPS → reverse geocode → assemble.
//! Steps run one after the other; collaborator failures are folded into an
//! [`AnalysisOutcome`] so callers always get something to display.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::assembler::{build_report, ReportNode};
use crate::classifier::{classify, is_phone, DATETIME_TABLE, DEVICE_TABLE};
use crate::config::ViewerConfig;
use crate::error::{MetadataError, Result};
use crate::export::{self, ExportPayload};
use crate::extractor::{MetadataExtractor, MetadataSource};
use crate::geocode::GeocodeClient;
use crate::gps::{extract_gps_info, GpsExtraction};
use crate::report::{FieldBucket, MetadataReport};

pub const UNRECOGNIZED_MESSAGE: &str = "Unable to parse file";
pub const NO_METADATA_MESSAGE: &str = "No metadata found.";

/// Everything derived from one metadata report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub report: MetadataReport,
    pub device: FieldBucket,
    #[serde(skip)]
    pub gps: GpsExtraction,
    pub datetime: FieldBucket,
    pub is_phone: bool,
    /// Resolved address or geocoder placeholder; `None` when not attempted
    pub address: Option<String>,
}

impl AnalysisResult {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.gps.coordinates()
    }

    pub fn report_nodes(&self) -> Vec<ReportNode> {
        build_report(
            &self.device,
            &self.gps.bucket,
            &self.datetime,
            &self.report,
            self.address.as_deref(),
        )
    }

    pub fn export_payload(&self) -> ExportPayload {
        export::export_payload(&self.report, self.address.as_deref())
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        export::export_json(path, &self.report, self.address.as_deref())
    }
}

/// What happened to an analysis request
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Analyzed(Box<AnalysisResult>),
    /// The file parsed but carried no metadata
    NoMetadata,
    /// No parser understood the file
    Unrecognized,
    /// Extraction started and failed
    Failed(String),
}

impl AnalysisOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Analyzed(_) => "analyzed",
            Self::NoMetadata => "no_metadata",
            Self::Unrecognized => "unrecognized",
            Self::Failed(_) => "failed",
        }
    }

    /// User-facing message for the non-analyzed outcomes
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Analyzed(_) => None,
            Self::NoMetadata => Some(NO_METADATA_MESSAGE.to_string()),
            Self::Unrecognized => Some(UNRECOGNIZED_MESSAGE.to_string()),
            Self::Failed(e) => Some(MetadataError::Extraction(e.clone()).to_string()),
        }
    }

    /// Display tree, or a single message node
    pub fn display_nodes(&self) -> Vec<ReportNode> {
        match self {
            Self::Analyzed(result) => result.report_nodes(),
            other => other
                .message()
                .map(ReportNode::leaf)
                .into_iter()
                .collect(),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Analyzed(result) => Some(&**result),
            _ => None,
        }
    }
}

/// Runs the analysis steps against a metadata source and optional geocoder
pub struct Analyzer {
    source: Box<dyn MetadataSource>,
    geocoder: Option<GeocodeClient>,
}

impl Analyzer {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let geocoder = if config.geocoder.enabled {
            Some(GeocodeClient::new(&config.geocoder)?)
        } else {
            None
        };

        Ok(Self {
            source: Box::new(MetadataExtractor::new(config.extractor.clone())),
            geocoder,
        })
    }

    /// Analyzer over a custom source
    pub fn with_source(source: Box<dyn MetadataSource>, geocoder: Option<GeocodeClient>) -> Self {
        Self { source, geocoder }
    }

    pub fn geocoder(&self) -> Option<&GeocodeClient> {
        self.geocoder.as_ref()
    }

    /// Analyze a file, geocoding when a geocoder is configured
    pub async fn analyze(&self, path: &Path) -> AnalysisOutcome {
        self.analyze_with(path, true).await
    }

    /// Analyze a file, optionally skipping the geocoding step
    pub async fn analyze_with(&self, path: &Path, geocode: bool) -> AnalysisOutcome {
        debug!("Analyzing {}", path.display());

        let report = match self.source.extract(path) {
            Ok(report) => report,
            Err(MetadataError::UnrecognizedFile(e)) => {
                warn!("Unrecognized file {}: {}", path.display(), e);
                return AnalysisOutcome::Unrecognized;
            }
            Err(e) => {
                warn!("Extraction failed for {}: {}", path.display(), e);
                return AnalysisOutcome::Failed(detail(e));
            }
        };

        if report.is_empty() {
            info!("No metadata in {}", path.display());
            return AnalysisOutcome::NoMetadata;
        }

        let result = self.analyze_report_with(report, geocode).await;
        info!(
            "Analyzed {}: {} fields, phone={}, coordinates={:?}",
            path.display(),
            result.report.field_count(),
            result.is_phone,
            result.coordinates()
        );
        AnalysisOutcome::Analyzed(Box::new(result))
    }

    /// Derive buckets, coordinates and address from an existing report
    pub async fn analyze_report(&self, report: MetadataReport) -> AnalysisResult {
        self.analyze_report_with(report, true).await
    }

    async fn analyze_report_with(&self, report: MetadataReport, geocode: bool) -> AnalysisResult {
        let device = classify(&report, &DEVICE_TABLE);
        let datetime = classify(&report, &DATETIME_TABLE);
        let gps = extract_gps_info(&report);

        let address = match (gps.coordinates(), self.geocoder.as_ref()) {
            (Some((lat, lon)), Some(geocoder)) if geocode => {
                Some(geocoder.reverse_geocode(lat, lon).await)
            }
            _ => None,
        };

        AnalysisResult {
            is_phone: is_phone(&device),
            report,
            device,
            gps,
            datetime,
            address,
        }
    }

    /// Map tile for the result's coordinates, if any
    pub async fn map_image(&self, result: &AnalysisResult) -> Option<Vec<u8>> {
        let (lat, lon) = result.coordinates()?;
        self.geocoder.as_ref()?.get_map_image(lat, lon).await
    }
}

/// Error text without the variant prefix
fn detail(e: MetadataError) -> String {
    match e {
        MetadataError::Extraction(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{NO_DEVICE, PHONE_VERDICT};
    use crate::extractor::StaticSource;

    struct FailingSource(fn() -> MetadataError);

    impl MetadataSource for FailingSource {
        fn extract(&self, _path: &Path) -> Result<MetadataReport> {
            Err((self.0)())
        }
    }

    fn offline(report: MetadataReport) -> Analyzer {
        Analyzer::with_source(Box::new(StaticSource(report)), None)
    }

    fn phone_report() -> MetadataReport {
        [
            ("Exif", "Make", "Samsung"),
            ("Exif", "Model", "Galaxy S21"),
            ("Exif", "DateTimeOriginal", "2022:08:14 18:30:00"),
            ("GPS", "GPSLatitude", "37.7749 N"),
            ("GPS", "GPSLongitude", "122.4194 W"),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_analyze_offline() {
        let outcome = offline(phone_report()).analyze(Path::new("photo.jpg")).await;
        let result = outcome.result().unwrap();

        assert!(result.is_phone);
        assert_eq!(result.device.len(), 2);
        assert_eq!(result.datetime.len(), 1);
        let (lat, lon) = result.coordinates().unwrap();
        assert!((lat - 37.7749).abs() < 1e-6);
        assert!((lon + 122.4194).abs() < 1e-6);
        assert_eq!(result.address, None);

        let nodes = outcome.display_nodes();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].children.last().unwrap().label, PHONE_VERDICT);
    }

    #[tokio::test]
    async fn test_empty_report_is_no_metadata() {
        let outcome = offline(MetadataReport::new()).analyze(Path::new("a.jpg")).await;
        assert_eq!(outcome, AnalysisOutcome::NoMetadata);
        assert_eq!(outcome.message().as_deref(), Some(NO_METADATA_MESSAGE));
        assert_eq!(outcome.display_nodes(), vec![ReportNode::leaf(NO_METADATA_MESSAGE)]);
    }

    #[tokio::test]
    async fn test_unrecognized_file() {
        let analyzer = Analyzer::with_source(
            Box::new(FailingSource(|| MetadataError::UnrecognizedFile("x".into()))),
            None,
        );
        let outcome = analyzer.analyze(Path::new("a.bin")).await;
        assert_eq!(outcome, AnalysisOutcome::Unrecognized);
        assert_eq!(outcome.message().as_deref(), Some(UNRECOGNIZED_MESSAGE));
    }

    #[tokio::test]
    async fn test_extraction_failure_message() {
        let analyzer = Analyzer::with_source(
            Box::new(FailingSource(|| MetadataError::Extraction("truncated IFD".into()))),
            None,
        );
        let outcome = analyzer.analyze(Path::new("a.jpg")).await;
        assert_eq!(outcome, AnalysisOutcome::Failed("truncated IFD".into()));
        assert_eq!(
            outcome.message().as_deref(),
            Some("Metadata extraction error: truncated IFD")
        );
    }

    #[tokio::test]
    async fn test_report_without_device_fields() {
        let report: MetadataReport = [("File", "FileSize", "12 kB")].into_iter().collect();
        let outcome = offline(report).analyze(Path::new("a.png")).await;
        let nodes = outcome.display_nodes();
        assert_eq!(nodes[0], ReportNode::leaf(NO_DEVICE));
        assert!(!outcome.result().unwrap().is_phone);
    }

    #[tokio::test]
    async fn test_map_image_requires_geocoder() {
        let analyzer = offline(phone_report());
        let result = analyzer.analyze_report(phone_report()).await;
        assert_eq!(analyzer.map_image(&result).await, None);
    }

    #[tokio::test]
    async fn test_export_from_result() {
        let analyzer = offline(phone_report());
        let mut result = analyzer.analyze_report(phone_report()).await;
        result.address = Some("San Francisco, CA".to_string());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        result.export_json(&path).unwrap();

        let payload = result.export_payload();
        assert_eq!(payload.len(), 3);
        assert!(std::fs::read_to_string(&path).unwrap().contains("San Francisco, CA"));
    }
}
