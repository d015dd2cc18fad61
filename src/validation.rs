//! Stimulus input checks against a function card's JSON schema
//!
//! Only the subset the organ's schemas use: `required`, property `type`,
//! and numeric `minimum`/`maximum`.

use serde_json::Value;

use crate::error::{MetadataError, Result};

/// Validate input against a JSON schema
pub fn validate_input(input: &Value, schema: &Value) -> Result<()> {
    let Some(input_obj) = input.as_object() else {
        if schema.get("required").is_some() || schema.get("properties").is_some() {
            return Err(MetadataError::ValidationError(
                "Input must be a JSON object".to_string(),
            ));
        }
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field_name in required {
            let field = field_name.as_str().ok_or_else(|| {
                MetadataError::ValidationError(
                    "Invalid schema: required field not a string".to_string(),
                )
            })?;

            if !input_obj.contains_key(field) {
                return Err(MetadataError::ValidationError(format!(
                    "Missing required field: {}",
                    field
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, value) in input_obj {
            if let Some(prop_schema) = properties.get(key) {
                validate_property(key, value, prop_schema)?;
            }
        }
    }

    Ok(())
}

fn validate_property(key: &str, value: &Value, schema: &Value) -> Result<()> {
    if let Some(expected_type) = schema.get("type").and_then(|t| t.as_str()) {
        let valid = match expected_type {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            "null" => value.is_null(),
            _ => true, // Unknown types pass validation
        };

        if !valid {
            return Err(MetadataError::ValidationError(format!(
                "Type mismatch for {}: expected {}, got {}",
                key, expected_type, value
            )));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if number < min {
                return Err(MetadataError::ValidationError(format!(
                    "{} must be >= {}",
                    key, min
                )));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if number > max {
                return Err(MetadataError::ValidationError(format!(
                    "{} must be <= {}",
                    key, max
                )));
            }
        }
    }

    Ok(())
}
