//! JSON export of an analyzed report

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::error::{MetadataError, Result};
use crate::report::MetadataReport;

/// Report categories in order, plus an optional trailing `"Address"` entry
pub type ExportPayload = IndexMap<String, Value>;

pub const ADDRESS_KEY: &str = "Address";

/// Copy the report into an export payload, injecting the address if any
pub fn export_payload(report: &MetadataReport, address: Option<&str>) -> ExportPayload {
    let mut payload: ExportPayload = report
        .categories()
        .map(|(category, fields)| {
            let object: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            (category.to_string(), Value::Object(object))
        })
        .collect();

    if let Some(address) = address {
        payload.insert(ADDRESS_KEY.to_string(), Value::String(address.to_string()));
    }

    payload
}

/// Serialize with 4-space indentation
pub fn to_json_string(payload: &ExportPayload) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    payload.serialize(&mut ser)?;

    String::from_utf8(buf).map_err(|e| MetadataError::Export(e.to_string()))
}

/// Write the report (and address) to `path` as UTF-8 JSON.
///
/// The document is fully rendered before the file is touched.
pub fn export_json(path: &Path, report: &MetadataReport, address: Option<&str>) -> Result<()> {
    let payload = export_payload(report, address);
    let json = to_json_string(&payload)?;

    std::fs::write(path, json.as_bytes())
        .map_err(|e| MetadataError::Export(format!("{}: {}", path.display(), e)))?;

    info!("Exported {} categories to {}", report.category_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> MetadataReport {
        [
            ("Exif", "Model", "Pixel 7"),
            ("Exif", "Make", "Google"),
            ("GPS", "GPSLatitude", "51.5 N"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_address_omitted_when_absent() {
        let payload = export_payload(&report(), None);
        assert!(!payload.contains_key(ADDRESS_KEY));
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_address_injected_verbatim() {
        let payload = export_payload(&report(), Some("Westminster, London"));
        assert_eq!(
            payload.get(ADDRESS_KEY),
            Some(&Value::String("Westminster, London".to_string()))
        );
        assert_eq!(payload.keys().last().map(String::as_str), Some(ADDRESS_KEY));
    }

    #[test]
    fn test_report_not_mutated() {
        let report = report();
        let before = report.clone();
        let _ = export_payload(&report, Some("somewhere"));
        assert_eq!(report, before);
    }

    #[test]
    fn test_four_space_indent_and_order() {
        let json = to_json_string(&export_payload(&report(), None)).unwrap();
        let expected = concat!(
            "{\n",
            "    \"Exif\": {\n",
            "        \"Model\": \"Pixel 7\",\n",
            "        \"Make\": \"Google\"\n",
            "    },\n",
            "    \"GPS\": {\n",
            "        \"GPSLatitude\": \"51.5 N\"\n",
            "    }\n",
            "}"
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_field_order_survives_value_conversion() {
        let payload = export_payload(&report(), Some("London"));
        let fields: Vec<&str> = payload["Exif"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(fields, vec!["Model", "Make"]);

        // Organ responses go through serde_json::Value as a whole
        let value = serde_json::to_value(&payload).unwrap();
        let top: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(top, vec!["Exif", "GPS", "Address"]);
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        export_json(&path, &report(), Some("London")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["Address"], "London");
        assert_eq!(written["Exif"]["Make"], "Google");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");

        let err = export_json(&path, &report(), None).unwrap_err();
        assert!(matches!(err, MetadataError::Export(_)));
    }
}
