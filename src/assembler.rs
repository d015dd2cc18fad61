//! Display tree assembly
//!
//! The presentation layer only ever sees a list of [`ReportNode`]s. Four
//! top-level slots always exist (device, GPS, date/time, full dump); a slot
//! whose bucket is empty holds a single placeholder node instead of a header.

use serde::Serialize;

use crate::classifier::is_phone;
use crate::report::{FieldBucket, MetadataReport};

pub const DEVICE_TITLE: &str = "Device Information";
pub const GPS_TITLE: &str = "GPS Information";
pub const DATETIME_TITLE: &str = "Date/Time Information";
pub const ALL_METADATA_TITLE: &str = "All Metadata";

pub const NO_DEVICE: &str = "No device information found in metadata.";
pub const NO_GPS: &str = "No GPS information found in metadata.";
pub const NO_DATETIME: &str = "No date/time information found in metadata.";

pub const PHONE_VERDICT: &str = "The device is a phone.";
pub const NOT_PHONE_VERDICT: &str = "The device is not identified as a phone.";

/// One line of the display tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNode {
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportNode>,
}

impl ReportNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(label: impl Into<String>, children: Vec<ReportNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    fn field(key: &str, value: &str) -> Self {
        Self::leaf(format!("{}: {}", key, value))
    }
}

/// Assemble the four-section display tree
pub fn build_report(
    device: &FieldBucket,
    gps: &FieldBucket,
    datetime: &FieldBucket,
    full: &MetadataReport,
    address: Option<&str>,
) -> Vec<ReportNode> {
    vec![
        device_section(device),
        gps_section(gps, address),
        bucket_section(DATETIME_TITLE, NO_DATETIME, datetime),
        all_metadata_section(full),
    ]
}

fn field_nodes(bucket: &FieldBucket) -> Vec<ReportNode> {
    bucket
        .iter()
        .map(|(key, value)| ReportNode::field(key, value))
        .collect()
}

fn bucket_section(title: &str, placeholder: &str, bucket: &FieldBucket) -> ReportNode {
    if bucket.is_empty() {
        return ReportNode::leaf(placeholder);
    }
    ReportNode::branch(title, field_nodes(bucket))
}

fn device_section(device: &FieldBucket) -> ReportNode {
    if device.is_empty() {
        return ReportNode::leaf(NO_DEVICE);
    }

    let mut children = field_nodes(device);
    let verdict = if is_phone(device) {
        PHONE_VERDICT
    } else {
        NOT_PHONE_VERDICT
    };
    children.push(ReportNode::leaf(verdict));

    ReportNode::branch(DEVICE_TITLE, children)
}

fn gps_section(gps: &FieldBucket, address: Option<&str>) -> ReportNode {
    if gps.is_empty() {
        return ReportNode::leaf(NO_GPS);
    }

    let mut children = field_nodes(gps);
    if let Some(address) = address {
        children.push(ReportNode::field("Address", address));
    }

    ReportNode::branch(GPS_TITLE, children)
}

fn all_metadata_section(full: &MetadataReport) -> ReportNode {
    let categories = full
        .categories()
        .map(|(category, fields)| ReportNode::branch(category, field_nodes(fields)))
        .collect();

    ReportNode::branch(ALL_METADATA_TITLE, categories)
}

/// Indented text rendering, two spaces per level
pub fn render_tree(nodes: &[ReportNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &ReportNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.label);
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
