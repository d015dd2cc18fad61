//! metascope - photo metadata classification and geolocation
//!
//! Takes the flat `category → field → value` metadata of a file and turns it
//! into something a person can read: which device took it, when, where
//! (coordinates plus a reverse-geocoded address), and whether that device is
//! a phone.
//!
//! ```rust,no_run
//! use metascope::{Analyzer, ViewerConfig, render_tree};
//! use std::path::Path;
//!
//! # async fn example() -> metascope::Result<()> {
//! let analyzer = Analyzer::new(&ViewerConfig::default())?;
//! let outcome = analyzer.analyze(Path::new("photo.jpg")).await;
//! print!("{}", render_tree(&outcome.display_nodes()));
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod export;
pub mod extractor;
pub mod geocode;
pub mod gps;
pub mod metrics;
pub mod organ;
pub mod pipeline;
pub mod report;
pub mod validation;

pub use assembler::{build_report, render_tree, ReportNode};
pub use classifier::{extract_info, is_phone, KeywordTable};
pub use config::{ExtractorConfig, GeocoderConfig, ViewerConfig};
pub use coordinate::parse_coordinate;
pub use error::{MetadataError, Result};
pub use export::{export_json, export_payload, ExportPayload};
pub use extractor::{MetadataExtractor, MetadataSource, StaticSource};
pub use geocode::{GeocodeClient, GeocodeError};
pub use gps::{extract_gps_info, GpsExtraction};
pub use pipeline::{AnalysisOutcome, AnalysisResult, Analyzer};
pub use report::{FieldBucket, MetadataReport};
