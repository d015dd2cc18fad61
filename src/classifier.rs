//! Keyword-driven field classification
//!
//! Buckets are described by a [`KeywordTable`]: a name plus an ordered set of
//! lowercase keyword substrings. A field lands in a bucket when either its
//! category name or its own field name contains one of the keywords,
//! compared case-insensitively. A category-level hit takes the whole
//! category verbatim.

use crate::report::{FieldBucket, MetadataReport};

/// Named keyword set driving one classification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordTable {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const DEVICE_TABLE: KeywordTable = KeywordTable {
    name: "device",
    keywords: &[
        "make",
        "model",
        "device",
        "manufacturer",
        "camera",
        "phone",
        "lens",
        "serial",
        "software",
    ],
};

pub const DATETIME_TABLE: KeywordTable = KeywordTable {
    name: "datetime",
    keywords: &["date", "time"],
};

pub const GPS_TABLE: KeywordTable = KeywordTable {
    name: "gps",
    keywords: &["gps", "latitude", "longitude", "altitude", "location"],
};

/// Manufacturers whose name in any device field marks the device as a phone
pub const PHONE_MAKERS: &[&str] = &[
    "Apple",
    "Samsung",
    "Huawei",
    "Xiaomi",
    "Google",
    "OnePlus",
    "Sony",
    "LG",
    "Nokia",
    "Motorola",
    "HTC",
    "Oppo",
    "Vivo",
    "Realme",
    "Lenovo",
    "Asus",
    "BlackBerry",
    "ZTE",
    "Alcatel",
    "Meizu",
    "Tecno",
];

/// Run one classification pass with a keyword table
pub fn classify(report: &MetadataReport, table: &KeywordTable) -> FieldBucket {
    extract_info(report, table.keywords)
}

/// Collect every field whose category or field name contains a keyword.
///
/// Later categories overwrite earlier ones on duplicate field names.
pub fn extract_info<S: AsRef<str>>(report: &MetadataReport, keywords: &[S]) -> FieldBucket {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.as_ref().to_lowercase())
        .collect();
    let mut bucket = FieldBucket::new();

    for (category, fields) in report.categories() {
        if contains_keyword(category, &keywords) {
            for (key, value) in fields {
                bucket.insert(key.clone(), value.clone());
            }
            continue;
        }

        for (key, value) in fields {
            if contains_keyword(key, &keywords) {
                bucket.insert(key.clone(), value.clone());
            }
        }
    }

    bucket
}

/// True when any known phone maker appears in any device value
pub fn is_phone(device: &FieldBucket) -> bool {
    let values: Vec<String> = device.values().map(|v| v.to_lowercase()).collect();

    PHONE_MAKERS.iter().any(|make| {
        let make = make.to_lowercase();
        values.iter().any(|value| value.contains(&make))
    })
}

fn contains_keyword(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords.iter().any(|k| name.contains(k.as_str()))
}
