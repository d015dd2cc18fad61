//! Runtime configuration
//!
//! Everything has a default, so the config file is optional. A TOML file only
//! needs the keys it wants to change:
//!
//! ```toml
//! [geocoder]
//! enabled = true
//! timeout_secs = 5
//! user_agent = "my-viewer/1.0"
//!
//! [extractor]
//! use_exiftool = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MetadataError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub extractor: ExtractorConfig,
    pub geocoder: GeocoderConfig,
}

/// Metadata extraction backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Prefer ExifTool when it is installed
    pub use_exiftool: bool,
    /// ExifTool executable name or path
    pub exiftool_path: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            use_exiftool: true,
            exiftool_path: "exiftool".to_string(),
        }
    }
}

/// Reverse geocoding and map tile endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Disable to keep analyses fully offline
    pub enabled: bool,
    pub reverse_url: String,
    pub map_url: String,
    /// Sent as User-Agent on every request
    pub user_agent: String,
    pub timeout_secs: u64,
    pub map_zoom: u8,
    pub map_width: u32,
    pub map_height: u32,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reverse_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            map_url: "https://static-maps.yandex.ru/1.x/".to_string(),
            user_agent: format!("metascope/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
            map_zoom: 15,
            map_width: 450,
            map_height: 450,
        }
    }
}

impl ViewerConfig {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            MetadataError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| MetadataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.geocoder.timeout_secs == 0 {
            return Err(MetadataError::Config(
                "geocoder.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.geocoder.user_agent.trim().is_empty() {
            return Err(MetadataError::Config(
                "geocoder.user_agent must not be empty".to_string(),
            ));
        }
        if self.geocoder.map_zoom > 21 {
            return Err(MetadataError::Config(
                "geocoder.map_zoom must be between 0 and 21".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::load(None).unwrap();
        assert!(config.geocoder.enabled);
        assert!(config.extractor.use_exiftool);
        assert_eq!(config.geocoder.timeout_secs, 10);
        assert!(config.geocoder.user_agent.starts_with("metascope/"));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = ViewerConfig::from_toml(
            r#"
            [geocoder]
            enabled = false
            timeout_secs = 3
            "#,
        )
        .unwrap();

        assert!(!config.geocoder.enabled);
        assert_eq!(config.geocoder.timeout_secs, 3);
        assert_eq!(config.geocoder.map_zoom, 15);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ViewerConfig::from_toml("[geocoder]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, MetadataError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[extractor]\nuse_exiftool = false").unwrap();

        let config = ViewerConfig::load(Some(file.path())).unwrap();
        assert!(!config.extractor.use_exiftool);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ViewerConfig::load(Some(Path::new("/nonexistent/metascope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }
}
