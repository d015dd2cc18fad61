//! Stimulus/response interface for metascope
//!
//! Exposes the analysis pipeline to orchestrators that speak the organ
//! protocol: a JSON [`Stimulus`] names an operation, the organ answers with a
//! [`Response`], and [`Organ::describe`] returns a capability card listing
//! every operation with its input schema.
//!
//! ## Available Operations
//!
//! 1. `metadata.analyze` - Classify metadata, resolve GPS and address
//! 2. `metadata.export` - Analyze and write the report as JSON
//! 3. `geo.reverse` - Reverse geocode a coordinate pair
//! 4. `geo.map` - Fetch a map tile for a coordinate pair
//! 5. `metadata.capabilities` - Capability card query
//! 6. `metrics` - Request and outcome counters
//!
//! ## Example
//!
//! ```rust,no_run
//! use metascope::organ::{MetadataOrgan, Organ, Stimulus};
//! use metascope::ViewerConfig;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let organ = MetadataOrgan::from_config(&ViewerConfig::default())?;
//!
//! let response = organ.stimulate(Stimulus {
//!     op: "metadata.analyze".to_string(),
//!     input: json!({"input_path": "photo.jpg"}),
//!     context: HashMap::new(),
//! }).await?;
//! println!("{}", response.output["status"]);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ViewerConfig;
use crate::error::MetadataError;
use crate::metrics::{Metrics, Timer};
use crate::pipeline::{AnalysisOutcome, Analyzer};
use crate::validation::validate_input;

/// Stimulus - input to organ operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stimulus {
    pub op: String,
    pub input: Value,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

/// Response - output from organ operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub output: Value,
    pub latency_ms: u64,
    pub cost: Option<f64>,
}

/// Organ trait - every stimulus-driven service implements this
#[async_trait]
pub trait Organ: Send + Sync {
    async fn stimulate(&self, stimulus: Stimulus) -> Result<Response, OrganError>;
    fn describe(&self) -> OrganCard;
}

/// Organ-level errors
#[derive(Debug, Error)]
pub enum OrganError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Organ capability card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganCard {
    pub name: String,
    pub version: String,
    pub description: String,
    pub division: String,
    pub subsystem: String,
    pub tags: Vec<String>,
    pub execution_modes: Vec<String>,
    pub functions: Vec<FunctionCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Function capability card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCard {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    pub idempotent: bool,
    pub side_effects: Vec<String>,
    pub input_schema: Option<Value>,
    pub output_schema: Value,
}

const OPERATIONS: &[&str] = &[
    "metadata.analyze",
    "metadata.export",
    "geo.reverse",
    "geo.map",
    "metadata.capabilities",
    "metrics",
];

/// Metadata analysis organ
pub struct MetadataOrgan {
    analyzer: Analyzer,
    metrics: Arc<Metrics>,
}

impl MetadataOrgan {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            metrics: Metrics::new(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> crate::Result<Self> {
        Ok(Self::new(Analyzer::new(config)?))
    }

    pub fn with_metrics(analyzer: Analyzer, metrics: Arc<Metrics>) -> Self {
        Self { analyzer, metrics }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle metadata.analyze operation
    async fn handle_analyze(&self, input: &Value) -> Result<Value, OrganError> {
        let input_path = required_str(input, "input_path")?;
        let geocode = input["geocode"].as_bool().unwrap_or(true);

        let outcome = self.analyzer.analyze_with(Path::new(input_path), geocode).await;
        self.metrics.record_outcome(&outcome);

        let nodes = serde_json::to_value(outcome.display_nodes())?;
        let mut output = json!({
            "status": outcome.status(),
            "message": outcome.message(),
            "nodes": nodes,
        });

        if let Some(result) = outcome.result() {
            output["coordinates"] = match result.coordinates() {
                Some((lat, lon)) => json!({ "lat": lat, "lon": lon }),
                None => Value::Null,
            };
            output["address"] = json!(result.address);
            output["is_phone"] = json!(result.is_phone);
            output["metadata"] = serde_json::to_value(&result.report)?;
        }

        Ok(output)
    }

    /// Handle metadata.export operation
    async fn handle_export(&self, input: &Value) -> Result<Value, OrganError> {
        let input_path = required_str(input, "input_path")?;
        let output_path = required_str(input, "output_path")?;
        let geocode = input["geocode"].as_bool().unwrap_or(true);

        let outcome = self.analyzer.analyze_with(Path::new(input_path), geocode).await;
        self.metrics.record_outcome(&outcome);

        let result = match outcome {
            AnalysisOutcome::Analyzed(result) => result,
            other => {
                let message = other.message().unwrap_or_default();
                return Err(OrganError::ProcessingError(message));
            }
        };

        result.export_json(Path::new(output_path))?;

        Ok(json!({
            "exported": true,
            "output_path": output_path,
            "address_included": result.address.is_some(),
            "categories": result.report.category_count(),
        }))
    }

    /// Handle geo.reverse operation
    async fn handle_reverse(&self, input: &Value) -> Result<Value, OrganError> {
        let (lat, lon) = coordinates(input)?;
        let geocoder = self
            .analyzer
            .geocoder()
            .ok_or_else(|| OrganError::ProcessingError("Geocoding is disabled".to_string()))?;

        let (address, resolved) = match geocoder.lookup_address(lat, lon).await {
            Ok(address) => (address, true),
            Err(e) => {
                warn!("Reverse geocoding failed for {}, {}: {:?}", lat, lon, e);
                (e.to_string(), false)
            }
        };

        Ok(json!({
            "lat": lat,
            "lon": lon,
            "address": address,
            "resolved": resolved,
        }))
    }

    /// Handle geo.map operation
    async fn handle_map(&self, input: &Value) -> Result<Value, OrganError> {
        let (lat, lon) = coordinates(input)?;
        let output_path = required_str(input, "output_path")?;
        let geocoder = self
            .analyzer
            .geocoder()
            .ok_or_else(|| OrganError::ProcessingError("Geocoding is disabled".to_string()))?;

        let Some(image) = geocoder.get_map_image(lat, lon).await else {
            return Ok(json!({ "written": false }));
        };

        std::fs::write(output_path, &image)
            .map_err(|e| OrganError::ProcessingError(format!("Failed to write map: {}", e)))?;

        Ok(json!({
            "written": true,
            "output_path": output_path,
            "size_bytes": image.len(),
        }))
    }

    /// Handle metadata.capabilities operation
    fn handle_capabilities(&self) -> Result<Value, OrganError> {
        let card = self.describe();
        serde_json::to_value(&card).map_err(OrganError::SerializationError)
    }

    async fn dispatch(&self, op: &str, input: &Value) -> Result<Value, OrganError> {
        if let Some(schema) = self.input_schema(op) {
            validate_input(input, &schema).map_err(|e| OrganError::InvalidInput(e.to_string()))?;
        }

        match op {
            "metadata.analyze" => self.handle_analyze(input).await,
            "metadata.export" => self.handle_export(input).await,
            "geo.reverse" => self.handle_reverse(input).await,
            "geo.map" => self.handle_map(input).await,
            "metadata.capabilities" => self.handle_capabilities(),
            "metrics" => Ok(json!(self.metrics.snapshot())),
            other => Err(OrganError::UnsupportedOperation(other.to_string())),
        }
    }

    fn input_schema(&self, op: &str) -> Option<Value> {
        self.describe()
            .functions
            .into_iter()
            .find(|f| f.name == op)
            .and_then(|f| f.input_schema)
    }
}

fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, OrganError> {
    input[key]
        .as_str()
        .ok_or_else(|| OrganError::InvalidInput(format!("Missing {}", key)))
}

fn coordinates(input: &Value) -> Result<(f64, f64), OrganError> {
    let lat = input["lat"]
        .as_f64()
        .ok_or_else(|| OrganError::InvalidInput("Missing lat".to_string()))?;
    let lon = input["lon"]
        .as_f64()
        .ok_or_else(|| OrganError::InvalidInput("Missing lon".to_string()))?;
    Ok((lat, lon))
}

fn coordinate_properties() -> Value {
    json!({
        "lat": { "type": "number", "minimum": -90.0, "maximum": 90.0 },
        "lon": { "type": "number", "minimum": -180.0, "maximum": 180.0 }
    })
}

#[async_trait]
impl Organ for MetadataOrgan {
    async fn stimulate(&self, stimulus: Stimulus) -> Result<Response, OrganError> {
        let timer = Timer::new();
        debug!("Stimulus {}", stimulus.op);

        let result = self.dispatch(&stimulus.op, &stimulus.input).await;
        let latency = timer.elapsed_ms();
        self.metrics.record_request(&stimulus.op, result.is_ok(), latency);

        let (ok, output) = match result {
            Ok(output) => (true, output),
            Err(OrganError::UnsupportedOperation(op)) => (
                false,
                json!({
                    "error": "UnsupportedOperation",
                    "op": op,
                    "available_operations": OPERATIONS,
                }),
            ),
            Err(e) => {
                warn!("{} failed: {}", stimulus.op, e);
                (false, json!({ "error": e.to_string(), "op": stimulus.op }))
            }
        };

        Ok(Response {
            ok,
            output,
            latency_ms: latency,
            cost: None,
        })
    }

    fn describe(&self) -> OrganCard {
        let coordinate = coordinate_properties();

        OrganCard {
            name: "metascope".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: concat!(
                "Photo metadata classification and geolocation: device, ",
                "date/time and GPS extraction with reverse geocoding"
            )
            .to_string(),
            division: "media".to_string(),
            subsystem: "metadata".to_string(),
            tags: vec![
                "metadata".to_string(),
                "exif".to_string(),
                "gps".to_string(),
                "geocoding".to_string(),
                "forensics".to_string(),
            ],
            execution_modes: vec![
                "embedded".to_string(),
                "server".to_string(),
            ],
            author: None,
            repository: None,
            functions: vec![
                FunctionCard {
                    name: "metadata.analyze".to_string(),
                    description: concat!(
                        "Extract and classify file metadata; ",
                        "resolve coordinates and address"
                    )
                    .to_string(),
                    tags: vec!["metadata".to_string(), "exif".to_string(), "gps".to_string()],
                    examples: vec![
                        "Identify which phone took a photo".to_string(),
                        "Find where a photo was taken".to_string(),
                    ],
                    idempotent: true,
                    side_effects: vec!["network".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "required": ["input_path"],
                        "properties": {
                            "input_path": { "type": "string" },
                            "geocode": { "type": "boolean" }
                        }
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "status": { "type": "string" },
                            "message": { "type": ["string", "null"] },
                            "nodes": { "type": "array" },
                            "coordinates": { "type": ["object", "null"] },
                            "address": { "type": ["string", "null"] },
                            "is_phone": { "type": "boolean" },
                            "metadata": { "type": "object" }
                        }
                    }),
                },
                FunctionCard {
                    name: "metadata.export".to_string(),
                    description:
                        "Analyze a file and write its metadata (plus address) as JSON".to_string(),
                    tags: vec!["metadata".to_string(), "export".to_string(), "json".to_string()],
                    examples: vec!["Save a photo's metadata report for later review".to_string()],
                    idempotent: true,
                    side_effects: vec!["filesystem".to_string(), "network".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "required": ["input_path", "output_path"],
                        "properties": {
                            "input_path": { "type": "string" },
                            "output_path": { "type": "string" },
                            "geocode": { "type": "boolean" }
                        }
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "exported": { "type": "boolean" },
                            "output_path": { "type": "string" },
                            "address_included": { "type": "boolean" },
                            "categories": { "type": "integer" }
                        }
                    }),
                },
                FunctionCard {
                    name: "geo.reverse".to_string(),
                    description:
                        "Resolve a latitude/longitude pair to a postal address".to_string(),
                    tags: vec!["gps".to_string(), "geocoding".to_string()],
                    examples: vec!["Turn 40.7128, -74.0060 into an address".to_string()],
                    idempotent: true,
                    side_effects: vec!["network".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "required": ["lat", "lon"],
                        "properties": coordinate.clone()
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "address": { "type": "string" },
                            "resolved": { "type": "boolean" }
                        }
                    }),
                },
                FunctionCard {
                    name: "geo.map".to_string(),
                    description:
                        "Download a static map image centered on a coordinate pair".to_string(),
                    tags: vec!["gps".to_string(), "map".to_string()],
                    examples: vec!["Render a map preview for a photo's location".to_string()],
                    idempotent: true,
                    side_effects: vec!["filesystem".to_string(), "network".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "required": ["lat", "lon", "output_path"],
                        "properties": {
                            "lat": coordinate["lat"].clone(),
                            "lon": coordinate["lon"].clone(),
                            "output_path": { "type": "string" }
                        }
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "written": { "type": "boolean" },
                            "output_path": { "type": "string" },
                            "size_bytes": { "type": "integer" }
                        }
                    }),
                },
                FunctionCard {
                    name: "metadata.capabilities".to_string(),
                    description:
                        "Return organ capability card with all available functions".to_string(),
                    tags: vec!["discovery".to_string()],
                    examples: vec!["Query organ capabilities for orchestration".to_string()],
                    idempotent: true,
                    side_effects: vec![],
                    input_schema: None,
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "version": { "type": "string" },
                            "functions": { "type": "array" }
                        }
                    }),
                },
                FunctionCard {
                    name: "metrics".to_string(),
                    description: "Request counters, latency and analysis outcomes".to_string(),
                    tags: vec!["observability".to_string()],
                    examples: vec![],
                    idempotent: true,
                    side_effects: vec![],
                    input_schema: None,
                    output_schema: json!({ "type": "object" }),
                },
            ],
        }
    }
}
