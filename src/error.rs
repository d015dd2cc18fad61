use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Unable to parse file: {0}")]
    UnrecognizedFile(String),

    #[error("Metadata extraction error: {0}")]
    Extraction(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
