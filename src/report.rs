//! Metadata report data model
//!
//! A [`MetadataReport`] is the nested `category → field → value` structure
//! produced for one analyzed file. Categories and fields keep the order in
//! which the extraction backend produced them; that order drives both the
//! classifier's last-category-wins merge and the export layout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Keyword-selected view over a report: field name → value
pub type FieldBucket = IndexMap<String, String>;

/// Ordered category → field → value mapping for one analyzed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataReport {
    categories: IndexMap<String, FieldBucket>,
}

impl MetadataReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one field, creating its category on first use.
    ///
    /// A repeated field name inside the same category replaces the value but
    /// keeps its original position.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.categories
            .entry(category.into())
            .or_default()
            .insert(field.into(), value.into());
    }

    pub fn category(&self, name: &str) -> Option<&FieldBucket> {
        self.categories.get(name)
    }

    /// Categories in insertion order
    pub fn categories(&self) -> impl Iterator<Item = (&str, &FieldBucket)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(|fields| fields.is_empty())
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn field_count(&self) -> usize {
        self.categories.values().map(|fields| fields.len()).sum()
    }
}

impl<C, F, V> FromIterator<(C, F, V)> for MetadataReport
where
    C: Into<String>,
    F: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, F, V)>>(iter: I) -> Self {
        let mut report = MetadataReport::new();
        for (category, field, value) in iter {
            report.insert(category, field, value);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let report: MetadataReport = [
            ("Exif", "Make", "Apple"),
            ("GPS", "GPSLatitude", "40.7 N"),
            ("Exif", "Model", "iPhone 12"),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = report.categories().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Exif", "GPS"]);

        let exif: Vec<&String> = report.category("Exif").unwrap().keys().collect();
        assert_eq!(exif, vec!["Make", "Model"]);
        assert_eq!(report.field_count(), 3);
    }

    #[test]
    fn test_empty_report() {
        let report = MetadataReport::new();
        assert!(report.is_empty());
        assert_eq!(report.category_count(), 0);
    }

    #[test]
    fn test_serializes_as_plain_nested_object() {
        let report: MetadataReport = [("Exif", "Make", "Canon")].into_iter().collect();
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"Exif":{"Make":"Canon"}}"#);
    }
}
